//! Usage: Periodic resource housekeeping (storage sweep, destroyed-view
//! reconciliation, memory sampling).

use super::Supervisor;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};
use tauri::Manager;
use tokio::sync::watch;

const STORAGE_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);
const DESTROYED_RECONCILE_INTERVAL: Duration = Duration::from_secs(60);
const MEMORY_SAMPLE_INTERVAL: Duration = Duration::from_secs(5 * 60);
const MEMORY_WARNING_THRESHOLD_MB: u64 = 1000;

const MEMORY_WARNING_EVENT: &str = "app:memory-warning";

#[derive(Debug, Clone, serde::Serialize)]
struct MemoryWarningPayload {
    usage_mb: u64,
}

/// Handle over the three background loops; dropped through [`Housekeeping::stop`]
/// during exit cleanup.
pub(crate) struct Housekeeping {
    shutdown: watch::Sender<bool>,
    tasks: Vec<tauri::async_runtime::JoinHandle<()>>,
}

impl Housekeeping {
    pub(crate) fn start(app: tauri::AppHandle, supervisor: Arc<Supervisor>) -> Self {
        let (shutdown, _) = watch::channel(false);
        let mut tasks = Vec::new();

        {
            let supervisor = Arc::clone(&supervisor);
            let mut rx = shutdown.subscribe();
            tasks.push(tauri::async_runtime::spawn(async move {
                // Skip the immediate tick; the first sweep runs a full
                // interval after startup.
                let start = tokio::time::Instant::now() + STORAGE_SWEEP_INTERVAL;
                let mut ticker = tokio::time::interval_at(start, STORAGE_SWEEP_INTERVAL);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            tracing::info!("开始周期性清理视图缓存");
                            supervisor.sweep_partition_storage();
                        }
                        _ = rx.changed() => break,
                    }
                }
            }));
        }

        {
            let supervisor = Arc::clone(&supervisor);
            let mut rx = shutdown.subscribe();
            tasks.push(tauri::async_runtime::spawn(async move {
                let start = tokio::time::Instant::now() + DESTROYED_RECONCILE_INTERVAL;
                let mut ticker = tokio::time::interval_at(start, DESTROYED_RECONCILE_INTERVAL);
                loop {
                    tokio::select! {
                        _ = ticker.tick() => supervisor.detect_destroyed(),
                        _ = rx.changed() => break,
                    }
                }
            }));
        }

        {
            let mut rx = shutdown.subscribe();
            tasks.push(tauri::async_runtime::spawn(async move {
                let start = tokio::time::Instant::now() + MEMORY_SAMPLE_INTERVAL;
                let mut ticker = tokio::time::interval_at(start, MEMORY_SAMPLE_INTERVAL);
                let mut system = System::new();
                loop {
                    tokio::select! {
                        _ = ticker.tick() => sample_memory(&app, &mut system),
                        _ = rx.changed() => break,
                    }
                }
            }));
        }

        Self { shutdown, tasks }
    }

    pub(crate) async fn stop(mut self) {
        let _ = self.shutdown.send(true);

        let stop_timeout = Duration::from_secs(3);
        let join_all = async {
            for task in &mut self.tasks {
                let _ = task.await;
            }
        };

        if tokio::time::timeout(stop_timeout, join_all).await.is_err() {
            tracing::warn!("退出清理：后台维护任务停止超时，正在中止");
            for task in &self.tasks {
                task.abort();
            }
        }
    }
}

fn sample_memory(app: &tauri::AppHandle, system: &mut System) {
    let pid = sysinfo::get_current_pid();
    let Ok(pid) = pid else {
        return;
    };
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let Some(process) = system.process(pid) else {
        return;
    };

    let usage_mb = process.memory() / (1024 * 1024);
    tracing::debug!(usage_mb, "内存采样");
    if usage_mb <= MEMORY_WARNING_THRESHOLD_MB {
        return;
    }

    tracing::warn!(
        usage_mb,
        threshold_mb = MEMORY_WARNING_THRESHOLD_MB,
        "内存占用超过阈值"
    );
    // Advisory only; the presentation layer decides whether to surface it.
    if app.get_webview_window("main").is_some() {
        if let Err(err) = tauri::Emitter::emit(
            app,
            MEMORY_WARNING_EVENT,
            MemoryWarningPayload { usage_mb },
        ) {
            tracing::warn!("内存告警事件发送失败: {}", err);
        }
    }
}
