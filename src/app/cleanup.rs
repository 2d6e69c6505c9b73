//! Usage: Best-effort cleanup hooks for app lifecycle events (exit/restart).

use super::app_state::SupervisorState;
use crate::mutex_ext::MutexExt;
use std::sync::atomic::{AtomicBool, Ordering};
use tauri::Manager;

static CLEANUP_STARTED: AtomicBool = AtomicBool::new(false);

/// Teardown order: stop the background maintenance loops first, then detach
/// the views so no timer fires against a detached container.
pub(crate) async fn cleanup_before_exit(app: &tauri::AppHandle) {
    if CLEANUP_STARTED.swap(true, Ordering::SeqCst) {
        return;
    }

    let state = app.state::<SupervisorState>();

    let housekeeping = { state.housekeeping.lock_or_recover().take() };
    if let Some(housekeeping) = housekeeping {
        tracing::info!("退出清理：停止后台维护任务");
        housekeeping.stop().await;
    }

    if let Some(supervisor) = state.try_get() {
        tracing::info!("退出清理：分离所有视图");
        supervisor.detach_all();
    }
}
