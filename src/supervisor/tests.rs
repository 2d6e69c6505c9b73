use super::*;
use crate::settings::AppSettings;
use policy::{classify_load_failure, decide, FailureKind, RecoveryAction};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Effect {
    Attach(ViewId),
    Detach(ViewId),
    Reload(ViewId),
    SetSource(ViewId, String),
    SetAudioMuted(ViewId, bool),
    InsertStyle(ViewId),
    SetLoading(ViewId, bool),
    SetOverlay(ViewId, Option<String>),
    ContentCheck(ViewId),
    CacheProbe(ViewId),
    ClearStorage(ViewId),
    TerminalNotice(ViewId, String),
}

#[derive(Default)]
struct FakeViewHost {
    effects: Mutex<Vec<Effect>>,
    attached: Mutex<HashMap<ViewId, bool>>,
    destroyed: Mutex<HashMap<ViewId, bool>>,
}

impl FakeViewHost {
    fn record(&self, effect: Effect) {
        self.effects.lock().unwrap().push(effect);
    }

    fn effects(&self) -> Vec<Effect> {
        self.effects.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Effect) -> bool) -> usize {
        self.effects.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    fn mark_destroyed(&self, id: ViewId) {
        self.destroyed.lock().unwrap().insert(id, true);
    }
}

impl ViewHost for FakeViewHost {
    fn attach(&self, view: &ViewDescriptor) {
        self.record(Effect::Attach(view.view_id));
    }

    fn detach(&self, id: ViewId) {
        self.record(Effect::Detach(id));
    }

    fn reload(&self, id: ViewId) {
        self.record(Effect::Reload(id));
    }

    fn set_source(&self, id: ViewId, url: &str) {
        self.record(Effect::SetSource(id, url.to_string()));
    }

    fn set_audio_muted(&self, id: ViewId, muted: bool) {
        self.record(Effect::SetAudioMuted(id, muted));
    }

    fn insert_style(&self, id: ViewId, _css: &str) {
        self.record(Effect::InsertStyle(id));
    }

    fn set_loading_indicator(&self, id: ViewId, visible: bool) {
        self.record(Effect::SetLoading(id, visible));
    }

    fn set_error_overlay(&self, id: ViewId, message: Option<&str>) {
        self.record(Effect::SetOverlay(id, message.map(str::to_string)));
    }

    fn request_content_check(&self, id: ViewId) {
        self.record(Effect::ContentCheck(id));
    }

    fn request_cache_probe(&self, id: ViewId) {
        self.record(Effect::CacheProbe(id));
    }

    fn clear_partition_storage(&self, id: ViewId) -> Result<(), String> {
        self.record(Effect::ClearStorage(id));
        Ok(())
    }

    fn notify_terminal_failure(&self, id: ViewId, message: &str) {
        self.record(Effect::TerminalNotice(id, message.to_string()));
    }

    fn note_attached(&self, id: ViewId) {
        self.attached.lock().unwrap().insert(id, true);
    }

    fn note_detached(&self, id: ViewId) {
        self.attached.lock().unwrap().insert(id, false);
    }

    fn is_destroyed(&self, id: ViewId) -> bool {
        self.destroyed.lock().unwrap().get(&id).copied().unwrap_or(false)
    }
}

fn new_supervisor() -> (std::sync::Arc<Supervisor>, std::sync::Arc<FakeViewHost>) {
    let host = std::sync::Arc::new(FakeViewHost::default());
    let supervisor = Supervisor::new(host.clone());
    supervisor.init_views(&AppSettings::default());
    (supervisor, host)
}

fn reloads_of(host: &FakeViewHost, id: ViewId) -> usize {
    host.count(|e| *e == Effect::Reload(id))
}

async fn let_retry_timer_fire() {
    tokio::time::sleep(policy::RETRY_DELAY + Duration::from_millis(100)).await;
}

// ---- 策略纯函数 ----

#[test]
fn aborted_navigation_is_benign() {
    assert_eq!(classify_load_failure(-3, true), FailureKind::Benign);
    assert_eq!(classify_load_failure(-3, false), FailureKind::Benign);
}

#[test]
fn offline_classification_wins_over_transient() {
    assert_eq!(classify_load_failure(-106, false), FailureKind::Offline);
    assert_eq!(classify_load_failure(-2, false), FailureKind::Offline);
    assert_eq!(classify_load_failure(-2, true), FailureKind::TransientNetwork);
}

#[test]
fn retry_decision_uses_fixed_delay_until_cap() {
    for attempts in 0..policy::MAX_RELOAD_ATTEMPTS {
        assert_eq!(
            decide(FailureKind::TransientNetwork, attempts, false),
            RecoveryAction::RetryAfterDelay(policy::RETRY_DELAY)
        );
    }
    assert_eq!(
        decide(FailureKind::TransientNetwork, policy::MAX_RELOAD_ATTEMPTS, false),
        RecoveryAction::ShowTerminalError
    );
    assert_eq!(
        decide(FailureKind::ProcessFault, policy::MAX_RELOAD_ATTEMPTS, true),
        RecoveryAction::Ignore
    );
}

#[test]
fn offline_failures_never_consume_retry_attempts() {
    assert_eq!(
        decide(FailureKind::Offline, policy::MAX_RELOAD_ATTEMPTS, false),
        RecoveryAction::OfflineFallback
    );
}

// ---- 导航守卫 ----

#[test]
fn nav_guard_allows_service_hosts_only() {
    assert!(nav_guard::is_allowed_target("https://web.whatsapp.com/"));
    assert!(nav_guard::is_allowed_target("https://whatsapp.com/download"));
    assert!(nav_guard::is_allowed_target("https://faq.whatsapp.com/help"));
    assert!(!nav_guard::is_allowed_target("https://example.com/"));
    assert!(!nav_guard::is_allowed_target("http://web.whatsapp.com/"));
    assert!(!nav_guard::is_allowed_target("https://evilwhatsapp.com/"));
    assert!(!nav_guard::is_allowed_target("not a url"));
}

#[test]
fn new_window_redirects_allowed_target_into_same_view() {
    let (supervisor, host) = new_supervisor();
    supervisor.on_new_window(ViewId::Personal, "https://web.whatsapp.com/call");
    supervisor.on_new_window(ViewId::Personal, "https://example.com/phish");
    let sets = host.count(|e| matches!(e, Effect::SetSource(ViewId::Personal, _)));
    assert_eq!(sets, 1);
}

// ---- 恢复流程 ----

#[tokio::test(start_paused = true)]
async fn transient_failures_retry_three_times_then_terminal_once() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Personal;

    for _ in 0..policy::MAX_RELOAD_ATTEMPTS {
        supervisor.on_load_start(id);
        supervisor.on_load_fail(id, -2, "net::ERR_FAILED");
        let_retry_timer_fire().await;
    }
    assert_eq!(reloads_of(&host, id), 3);
    assert_eq!(host.count(|e| matches!(e, Effect::TerminalNotice(..))), 0);

    // Fourth consecutive failure exhausts the cap.
    supervisor.on_load_start(id);
    supervisor.on_load_fail(id, -2, "net::ERR_FAILED");
    let_retry_timer_fire().await;
    assert_eq!(reloads_of(&host, id), 3);
    assert_eq!(
        host.count(|e| matches!(e, Effect::TerminalNotice(ViewId::Personal, _))),
        1
    );

    // Further failures in the terminal state stay silent.
    supervisor.on_load_fail(id, -2, "net::ERR_FAILED");
    let_retry_timer_fire().await;
    assert_eq!(reloads_of(&host, id), 3);
    assert_eq!(
        host.count(|e| matches!(e, Effect::TerminalNotice(ViewId::Personal, _))),
        1
    );

    let status = supervisor.status();
    let personal = status.iter().find(|s| s.view_id == id).unwrap();
    assert_eq!(personal.lifecycle, "failed");
    assert_eq!(personal.attempts, policy::MAX_RELOAD_ATTEMPTS);
}

#[tokio::test(start_paused = true)]
async fn benign_abort_changes_nothing() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Business;

    supervisor.on_load_start(id);
    supervisor.on_load_fail(id, -3, "net::ERR_ABORTED");
    let_retry_timer_fire().await;

    assert_eq!(reloads_of(&host, id), 0);
    let status = supervisor.status();
    let business = status.iter().find(|s| s.view_id == id).unwrap();
    assert_eq!(business.lifecycle, "loading");
    assert_eq!(business.attempts, 0);
}

#[tokio::test(start_paused = true)]
async fn successful_load_resets_counter_and_voids_stale_timer() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Personal;

    supervisor.on_crash(id, false);
    // The view recovers on its own before the retry timer fires.
    supervisor.on_load_start(id);
    supervisor.on_load_stop(id);
    let_retry_timer_fire().await;

    assert_eq!(reloads_of(&host, id), 0);
    let status = supervisor.status();
    let personal = status.iter().find(|s| s.view_id == id).unwrap();
    assert_eq!(personal.lifecycle, "loaded");
    assert_eq!(personal.attempts, 0);

    // A fresh failure after recovery gets the full attempt budget again.
    supervisor.on_load_fail(id, -7, "net::ERR_TIMED_OUT");
    let_retry_timer_fire().await;
    assert_eq!(reloads_of(&host, id), 1);
}

#[tokio::test(start_paused = true)]
async fn unresponsive_view_is_reloaded() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Business;

    supervisor.on_unresponsive(id);
    let_retry_timer_fire().await;

    assert_eq!(reloads_of(&host, id), 1);
}

// ---- 离线回退 ----

#[tokio::test(start_paused = true)]
async fn offline_failure_probes_cache_instead_of_retrying() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Personal;

    supervisor.on_network_lost();
    supervisor.on_load_start(id);
    supervisor.on_load_fail(id, -106, "net::ERR_INTERNET_DISCONNECTED");

    assert_eq!(host.count(|e| matches!(e, Effect::CacheProbe(ViewId::Personal))), 1);
    assert_eq!(reloads_of(&host, id), 0);

    // Cached content found: overlay cleared, no terminal escalation.
    supervisor.on_cache_probe_result(id, true);
    assert!(host
        .effects()
        .iter()
        .rev()
        .any(|e| *e == Effect::SetOverlay(id, None)));

    let_retry_timer_fire().await;
    assert_eq!(reloads_of(&host, id), 0);
    assert_eq!(host.count(|e| matches!(e, Effect::TerminalNotice(..))), 0);
}

#[tokio::test(start_paused = true)]
async fn offline_window_expiry_shows_no_cache_message() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Business;

    supervisor.on_network_lost();
    supervisor.on_load_fail(id, -2, "net::ERR_FAILED");
    supervisor.on_cache_probe_result(id, false);

    tokio::time::sleep(policy::OFFLINE_CACHE_WINDOW + Duration::from_millis(200)).await;

    let shown = host.effects().into_iter().any(|e| {
        matches!(e, Effect::SetOverlay(v, Some(msg)) if v == id && msg == OFFLINE_NO_CACHE_MESSAGE)
    });
    assert!(shown);
    assert_eq!(reloads_of(&host, id), 0);
}

#[tokio::test(start_paused = true)]
async fn network_restoration_reloads_only_overlay_views() {
    let (supervisor, host) = new_supervisor();

    supervisor.on_load_fail(ViewId::Personal, -2, "net::ERR_FAILED");
    // Business stays healthy.
    supervisor.on_load_start(ViewId::Business);
    supervisor.on_load_stop(ViewId::Business);

    let before = reloads_of(&host, ViewId::Personal);
    supervisor.mark_online(true);
    supervisor.reload_overlay_views();

    assert_eq!(reloads_of(&host, ViewId::Personal), before + 1);
    assert_eq!(reloads_of(&host, ViewId::Business), 0);
}

#[tokio::test]
async fn online_transition_reloads_overlay_view_even_when_probe_fails() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Personal;

    // Offline failure: overlay shown, no retry timer competing for reloads.
    supervisor.on_network_lost();
    supervisor.on_load_fail(id, -106, "net::ERR_INTERNET_DISCONNECTED");
    assert_eq!(reloads_of(&host, id), 0);

    // The probe outcome must not matter: whether it passes or fails, the
    // overlay view gets its one-shot reload.
    std::sync::Arc::clone(&supervisor).handle_network_online().await;

    assert_eq!(reloads_of(&host, id), 1);
}

#[tokio::test]
async fn connectivity_probe_rejects_unusable_urls() {
    let client = reqwest::Client::new();
    assert!(!network::confirm_online(&client, "", Duration::from_millis(10)).await);
    assert!(!network::confirm_online(&client, "not a url", Duration::from_millis(10)).await);
}

// ---- 周期性维护 ----

#[tokio::test(start_paused = true)]
async fn destroyed_view_is_recreated_with_same_identity() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Personal;

    supervisor.on_view_attached(id);
    host.mark_destroyed(id);
    supervisor.detect_destroyed();

    // init_views attached once; reconciliation attaches again.
    assert_eq!(host.count(|e| *e == Effect::Attach(id)), 2);
    let status = supervisor.status();
    let personal = status.iter().find(|s| s.view_id == id).unwrap();
    assert_eq!(personal.lifecycle, "idle");
}

#[tokio::test(start_paused = true)]
async fn storage_sweep_covers_attached_views_only() {
    let (supervisor, host) = new_supervisor();
    supervisor.on_view_attached(ViewId::Personal);

    supervisor.sweep_partition_storage();

    assert_eq!(host.count(|e| *e == Effect::ClearStorage(ViewId::Personal)), 1);
    assert_eq!(host.count(|e| *e == Effect::ClearStorage(ViewId::Business)), 0);
}

// ---- 设置应用 ----

#[tokio::test(start_paused = true)]
async fn apply_settings_updates_mute_and_url() {
    let (supervisor, host) = new_supervisor();

    let mut settings = AppSettings::default();
    settings.business.notifications = false;
    settings.personal.url = "https://web.whatsapp.com/alt".to_string();
    supervisor.apply_settings(&settings);

    assert_eq!(
        host.count(|e| *e == Effect::SetAudioMuted(ViewId::Business, true)),
        1
    );
    assert_eq!(
        host.count(|e| matches!(
            e,
            Effect::SetSource(ViewId::Personal, url) if url == "https://web.whatsapp.com/alt"
        )),
        1
    );

    // Re-applying identical settings is a no-op.
    supervisor.apply_settings(&settings);
    assert_eq!(
        host.count(|e| matches!(e, Effect::SetAudioMuted(ViewId::Business, _))),
        1
    );
}

// ---- 内容校验 ----

#[tokio::test(start_paused = true)]
async fn unsupported_browser_page_triggers_one_corrective_reload() {
    let (supervisor, host) = new_supervisor();
    let id = ViewId::Personal;

    supervisor.on_content_check_result(id, true);
    assert_eq!(reloads_of(&host, id), 1);

    // Still unsupported after the corrective reload: give up, no loop.
    supervisor.on_content_check_result(id, true);
    assert_eq!(reloads_of(&host, id), 1);

    // A clean check re-arms the one-shot.
    supervisor.on_content_check_result(id, false);
    supervisor.on_content_check_result(id, true);
    assert_eq!(reloads_of(&host, id), 2);
}

#[tokio::test(start_paused = true)]
async fn dom_ready_injects_banner_hiding_style() {
    let (supervisor, host) = new_supervisor();
    supervisor.on_dom_ready(ViewId::Personal);
    assert_eq!(host.count(|e| *e == Effect::InsertStyle(ViewId::Personal)), 1);
}

#[tokio::test(start_paused = true)]
async fn successful_load_requests_content_check() {
    let (supervisor, host) = new_supervisor();
    supervisor.on_load_start(ViewId::Business);
    supervisor.on_load_stop(ViewId::Business);
    assert_eq!(
        host.count(|e| *e == Effect::ContentCheck(ViewId::Business)),
        1
    );
}
