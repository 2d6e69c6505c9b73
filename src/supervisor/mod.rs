//! Usage: Embedded-view lifecycle supervision (health monitor, recovery policy
//! execution, offline fallback, navigation guard dispatch).
//!
//! All state lives behind one mutex; event handlers lock, transition, and
//! issue effects through the [`ViewHost`] boundary. Timers never hold the
//! lock while sleeping and re-validate epoch + lifecycle before acting, so a
//! stale firing against an already-recovered view is a no-op.

pub(crate) mod health;
pub(crate) mod host;
pub(crate) mod housekeeping;
pub(crate) mod nav_guard;
pub(crate) mod network;
pub(crate) mod policy;

#[cfg(test)]
mod tests;

pub(crate) use health::{ViewId, ViewLifecycle, ViewRecord, ViewStatus};
pub(crate) use host::{TauriViewHost, ViewDescriptor, ViewHost};

use crate::mutex_ext::MutexExt;
use crate::settings::AppSettings;
use health::PendingCacheProbe;
use policy::{FailureKind, RecoveryAction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// The hosted web app occasionally serves an "unsupported browser"
/// interstitial to embedded user agents; hiding its download banner keeps the
/// conversation pane usable.
const HIDE_DOWNLOAD_BANNER_CSS: &str =
    r#"[data-testid="banner-download-app"] { display: none !important; }"#;

const OFFLINE_NO_CACHE_MESSAGE: &str = "当前处于离线状态，且没有可用的缓存内容";
const CRASH_MESSAGE: &str = "页面渲染进程已崩溃";
const UNRESPONSIVE_MESSAGE: &str = "页面长时间无响应";

struct SupervisorInner {
    views: HashMap<ViewId, ViewRecord>,
    network: network::NetworkTracker,
}

pub(crate) struct Supervisor {
    inner: Mutex<SupervisorInner>,
    host: Arc<dyn ViewHost>,
    http: reqwest::Client,
    // Self-handle for spawning delayed actions from `&self` methods.
    weak: Weak<Supervisor>,
}

impl Supervisor {
    pub(crate) fn new(host: Arc<dyn ViewHost>) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            inner: Mutex::new(SupervisorInner {
                views: HashMap::new(),
                network: network::NetworkTracker::default(),
            }),
            host,
            http: reqwest::Client::new(),
            weak: weak.clone(),
        })
    }

    /// Registers both account views from persisted settings and asks the host
    /// to attach them. Recreation after destruction goes through the same
    /// attach path.
    pub(crate) fn init_views(&self, settings: &AppSettings) {
        let mut inner = self.inner.lock_or_recover();
        for (id, account) in [
            (ViewId::Personal, &settings.personal),
            (ViewId::Business, &settings.business),
        ] {
            let record = ViewRecord::new(id, account.url.clone(), !account.notifications);
            self.host.attach(&descriptor_of(&record));
            inner.views.insert(id, record);
        }
    }

    pub(crate) fn bootstrap_descriptors(&self) -> Vec<ViewDescriptor> {
        let inner = self.inner.lock_or_recover();
        ViewId::ALL
            .iter()
            .filter_map(|id| inner.views.get(id).map(descriptor_of))
            .collect()
    }

    pub(crate) fn status(&self) -> Vec<ViewStatus> {
        let inner = self.inner.lock_or_recover();
        ViewId::ALL
            .iter()
            .filter_map(|id| inner.views.get(id).map(ViewStatus::from_record))
            .collect()
    }

    /// Applies saved settings to live views: audio mute follows the
    /// notifications toggle, URL changes navigate the view afresh.
    pub(crate) fn apply_settings(&self, settings: &AppSettings) {
        let mut inner = self.inner.lock_or_recover();
        for (id, account) in [
            (ViewId::Personal, &settings.personal),
            (ViewId::Business, &settings.business),
        ] {
            let Some(record) = inner.views.get_mut(&id) else {
                continue;
            };
            let muted = !account.notifications;
            if record.muted != muted {
                record.muted = muted;
                self.host.set_audio_muted(id, muted);
            }
            if record.url != account.url {
                record.url = account.url.clone();
                record.reset_attempts();
                self.host.set_source(id, &account.url);
            }
        }
    }

    pub(crate) fn on_view_attached(&self, id: ViewId) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        record.attached = true;
        if record.lifecycle == ViewLifecycle::Destroyed {
            record.lifecycle = ViewLifecycle::Idle;
        }
        self.host.note_attached(id);
    }

    pub(crate) fn on_view_destroyed_report(&self, id: ViewId) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        record.attached = false;
        record.lifecycle = ViewLifecycle::Destroyed;
        self.host.note_detached(id);
        tracing::warn!(view = id.as_str(), "视图容器已被销毁，等待周期性重建");
    }

    pub(crate) fn on_load_start(&self, id: ViewId) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        record.lifecycle = ViewLifecycle::Loading;
        self.host.set_loading_indicator(id, true);
        if record.overlay_visible {
            record.overlay_visible = false;
            self.host.set_error_overlay(id, None);
        }
    }

    pub(crate) fn on_load_stop(&self, id: ViewId) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        record.lifecycle = ViewLifecycle::Loaded;
        record.reset_attempts();
        record.last_error = None;
        self.host.set_loading_indicator(id, false);
        if record.overlay_visible {
            record.overlay_visible = false;
            self.host.set_error_overlay(id, None);
        }
        // Post-load content check for the unsupported-browser interstitial.
        self.host.request_content_check(id);
    }

    pub(crate) fn on_load_fail(&self, id: ViewId, error_code: i32, description: &str) {
        let mut inner = self.inner.lock_or_recover();
        let online = inner.network.is_online();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };

        let kind = policy::classify_load_failure(error_code, online);
        if kind == FailureKind::Benign {
            tracing::debug!(view = id.as_str(), error_code, "忽略良性加载中断");
            return;
        }

        record.lifecycle = ViewLifecycle::Failed;
        record.last_error = Some(policy::describe_load_failure(error_code, description));
        self.host.set_loading_indicator(id, false);
        tracing::warn!(
            view = id.as_str(),
            error_code,
            kind = kind.as_str(),
            attempts = record.attempts,
            "视图加载失败: {}",
            description
        );

        self.act_on_failure(record, kind);
    }

    pub(crate) fn on_crash(&self, id: ViewId, was_killed: bool) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        record.lifecycle = ViewLifecycle::Crashed;
        record.last_error = Some(CRASH_MESSAGE.to_string());
        self.host.set_loading_indicator(id, false);
        tracing::error!(
            view = id.as_str(),
            was_killed,
            attempts = record.attempts,
            "视图渲染进程崩溃"
        );
        self.act_on_failure(record, FailureKind::ProcessFault);
    }

    pub(crate) fn on_unresponsive(&self, id: ViewId) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        record.lifecycle = ViewLifecycle::Unresponsive;
        record.last_error = Some(UNRESPONSIVE_MESSAGE.to_string());
        tracing::warn!(
            view = id.as_str(),
            attempts = record.attempts,
            "视图停止响应"
        );
        self.act_on_failure(record, FailureKind::ProcessFault);
    }

    pub(crate) fn on_dom_ready(&self, id: ViewId) {
        self.host.insert_style(id, HIDE_DOWNLOAD_BANNER_CSS);
    }

    /// Navigation guard: same-view redirect for allow-listed targets, drop
    /// everything else.
    pub(crate) fn on_new_window(&self, id: ViewId, url: &str) {
        if nav_guard::is_allowed_target(url) {
            tracing::info!(view = id.as_str(), url, "新窗口跳转已重定向回原视图");
            self.host.set_source(id, url);
        } else {
            tracing::warn!(view = id.as_str(), url, "已拦截视图外的导航目标");
        }
    }

    pub(crate) fn on_console_message(&self, id: ViewId, level: i32, message: &str) {
        tracing::debug!(view = id.as_str(), level, "视图控制台: {}", message);
    }

    pub(crate) fn on_content_check_result(&self, id: ViewId, unsupported: bool) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        if !unsupported {
            record.browser_check_reload_done = false;
            return;
        }
        if record.browser_check_reload_done {
            tracing::warn!(
                view = id.as_str(),
                "仍检测到不支持的浏览器提示页，不再重复强制刷新"
            );
            return;
        }
        // One-shot corrective reload; a known upstream quirk, not a failure,
        // so it is not charged to the attempt counter.
        record.browser_check_reload_done = true;
        tracing::info!(view = id.as_str(), "检测到不支持的浏览器提示页，强制刷新一次");
        self.host.reload(id);
    }

    pub(crate) fn on_cache_probe_result(&self, id: ViewId, found: bool) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        let Some(pending) = record.pending_cache_probe else {
            return;
        };
        if pending.epoch != record.epoch {
            record.pending_cache_probe = None;
            return;
        }

        if found {
            record.pending_cache_probe = None;
            record.overlay_visible = false;
            self.host.set_error_overlay(id, None);
            tracing::info!(view = id.as_str(), "离线模式命中缓存内容，清除错误遮罩");
            return;
        }

        if pending.started.elapsed() >= policy::OFFLINE_CACHE_WINDOW {
            record.pending_cache_probe = None;
            record.overlay_visible = true;
            self.host.set_error_overlay(id, Some(OFFLINE_NO_CACHE_MESSAGE));
            return;
        }

        // Cached content may still materialize inside the window; re-probe.
        let Some(supervisor) = self.weak.upgrade() else {
            return;
        };
        let epoch = pending.epoch;
        tokio::spawn(async move {
            tokio::time::sleep(policy::OFFLINE_REPROBE_INTERVAL).await;
            let inner = supervisor.inner.lock_or_recover();
            let still_pending = inner
                .views
                .get(&id)
                .and_then(|r| r.pending_cache_probe)
                .is_some_and(|p| p.epoch == epoch);
            if still_pending {
                supervisor.host.request_cache_probe(id);
            }
        });
    }

    pub(crate) fn on_network_lost(&self) {
        let mut inner = self.inner.lock_or_recover();
        if inner.network.set_online(false) {
            tracing::warn!("网络连接已断开");
        }
    }

    /// `online` transition: mark online immediately (classification must see
    /// it), then reload every view showing an error overlay exactly once.
    /// The connectivity probe only delays the reload until the stack settles;
    /// a failed probe never suppresses it.
    pub(crate) async fn handle_network_online(self: Arc<Self>) {
        let probe_url = {
            let mut inner = self.inner.lock_or_recover();
            if inner.network.set_online(true) {
                tracing::info!("网络连接已恢复");
            }
            inner
                .views
                .get(&ViewId::Personal)
                .map(|r| r.url.clone())
                .unwrap_or_default()
        };

        if !network::confirm_online(&self.http, &probe_url, network::CONNECTIVITY_PROBE_TIMEOUT)
            .await
        {
            tracing::warn!("网络恢复探测未通过，仍按恢复处理并重载出错视图");
        }

        self.reload_overlay_views();
    }

    pub(crate) fn reload_overlay_views(&self) {
        let mut inner = self.inner.lock_or_recover();
        for id in ViewId::ALL {
            let Some(record) = inner.views.get_mut(&id) else {
                continue;
            };
            if record.overlay_visible {
                tracing::info!(view = id.as_str(), "网络恢复，重新加载出错视图");
                self.host.reload(id);
            }
        }
    }

    pub(crate) fn mark_online(&self, online: bool) {
        let mut inner = self.inner.lock_or_recover();
        inner.network.set_online(online);
    }

    /// Periodic reconciliation over the live view registry; the registry is
    /// the single source of truth for "is this view still valid".
    pub(crate) fn detect_destroyed(&self) {
        let mut inner = self.inner.lock_or_recover();
        for id in ViewId::ALL {
            let Some(record) = inner.views.get_mut(&id) else {
                continue;
            };
            if record.attached && self.host.is_destroyed(id) {
                record.attached = false;
                record.lifecycle = ViewLifecycle::Destroyed;
                tracing::warn!(view = id.as_str(), "检测到视图容器已销毁");
            }
            if record.lifecycle == ViewLifecycle::Destroyed {
                self.execute_recreate(record);
            }
        }
    }

    /// Best-effort cache/service-worker sweep per attached view.
    pub(crate) fn sweep_partition_storage(&self) {
        let inner = self.inner.lock_or_recover();
        for id in ViewId::ALL {
            let Some(record) = inner.views.get(&id) else {
                continue;
            };
            if !record.attached {
                continue;
            }
            if let Err(err) = self.host.clear_partition_storage(id) {
                tracing::warn!(view = id.as_str(), "清理视图缓存失败: {}", err);
            }
        }
    }

    /// Detach all views; part of the teardown order (views first).
    pub(crate) fn detach_all(&self) {
        let mut inner = self.inner.lock_or_recover();
        for id in ViewId::ALL {
            let Some(record) = inner.views.get_mut(&id) else {
                continue;
            };
            if record.attached {
                record.attached = false;
                self.host.detach(id);
            }
        }
    }

    fn act_on_failure(&self, record: &mut ViewRecord, kind: FailureKind) {
        match policy::decide(kind, record.attempts, record.terminal_notified) {
            RecoveryAction::Ignore => {}
            RecoveryAction::RetryAfterDelay(delay) => {
                if !record.overlay_visible {
                    record.overlay_visible = true;
                    self.host
                        .set_error_overlay(record.id, record.last_error.as_deref());
                }
                self.schedule_retry(record.id, record.epoch, record.attempts, delay);
            }
            RecoveryAction::OfflineFallback => {
                if !record.overlay_visible {
                    record.overlay_visible = true;
                    self.host
                        .set_error_overlay(record.id, record.last_error.as_deref());
                }
                self.start_offline_fallback(record);
            }
            RecoveryAction::ShowTerminalError => {
                record.terminal_notified = true;
                record.overlay_visible = true;
                let message = terminal_error_message(record);
                self.host.set_error_overlay(record.id, Some(&message));
                self.host.notify_terminal_failure(record.id, &message);
                tracing::error!(
                    view = record.id.as_str(),
                    attempts = record.attempts,
                    "视图连续加载失败，进入终态，等待人工干预"
                );
            }
        }
    }

    fn schedule_retry(
        &self,
        id: ViewId,
        epoch: u64,
        attempts_at_decision: u32,
        delay: std::time::Duration,
    ) {
        let Some(supervisor) = self.weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            supervisor.fire_retry(id, epoch, attempts_at_decision);
        });
    }

    /// Delayed actions re-validate their precondition instead of being
    /// cancelled: a successful load bumps the epoch, making this a no-op.
    fn fire_retry(&self, id: ViewId, epoch: u64, attempts_at_decision: u32) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        if record.epoch != epoch || record.attempts != attempts_at_decision {
            tracing::debug!(view = id.as_str(), "重试定时器已过期，跳过");
            return;
        }
        if !record.lifecycle.is_retryable_failure() {
            return;
        }
        record.attempts += 1;
        tracing::info!(
            view = id.as_str(),
            attempt = record.attempts,
            "自动重试加载视图"
        );
        self.host.reload(id);
    }

    fn start_offline_fallback(&self, record: &mut ViewRecord) {
        if record
            .pending_cache_probe
            .is_some_and(|p| p.epoch == record.epoch)
        {
            return;
        }
        record.pending_cache_probe = Some(PendingCacheProbe {
            epoch: record.epoch,
            started: tokio::time::Instant::now(),
        });
        self.host.request_cache_probe(record.id);

        let Some(supervisor) = self.weak.upgrade() else {
            return;
        };
        let id = record.id;
        let epoch = record.epoch;
        tokio::spawn(async move {
            tokio::time::sleep(policy::OFFLINE_CACHE_WINDOW).await;
            supervisor.fire_offline_deadline(id, epoch);
        });
    }

    fn fire_offline_deadline(&self, id: ViewId, epoch: u64) {
        let mut inner = self.inner.lock_or_recover();
        let Some(record) = inner.views.get_mut(&id) else {
            return;
        };
        let still_pending = record
            .pending_cache_probe
            .is_some_and(|p| p.epoch == epoch && record.epoch == epoch);
        if !still_pending {
            return;
        }
        record.pending_cache_probe = None;
        record.overlay_visible = true;
        self.host.set_error_overlay(id, Some(OFFLINE_NO_CACHE_MESSAGE));
        tracing::warn!(view = id.as_str(), "离线缓存探测超时，无可用缓存内容");
    }

    /// Full recreation with identical identity/partition, through the same
    /// attach factory as initial setup.
    fn execute_recreate(&self, record: &mut ViewRecord) {
        record.epoch = record.epoch.wrapping_add(1);
        record.lifecycle = ViewLifecycle::Idle;
        record.pending_cache_probe = None;
        tracing::info!(view = record.id.as_str(), "重建已销毁的视图容器");
        self.host.attach(&descriptor_of(record));
    }
}

fn descriptor_of(record: &ViewRecord) -> ViewDescriptor {
    ViewDescriptor {
        view_id: record.id,
        url: record.url.clone(),
        partition: record.id.partition(),
        muted: record.muted,
    }
}

fn terminal_error_message(record: &ViewRecord) -> String {
    match record.last_error.as_deref() {
        Some(detail) => format!("页面连续加载失败，已停止自动重试：{detail}"),
        None => "页面连续加载失败，已停止自动重试".to_string(),
    }
}
