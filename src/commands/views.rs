//! Usage: View lifecycle commands — the presentation layer reports embedded
//! view events here, and the supervisor reacts through the host boundary.

use crate::app::app_state::SupervisorState;
use crate::supervisor::{ViewDescriptor, ViewId, ViewStatus};
use std::sync::Arc;
use tauri::State;

#[tauri::command]
pub(crate) fn views_bootstrap(
    state: State<'_, SupervisorState>,
) -> Result<Vec<ViewDescriptor>, String> {
    Ok(state.get()?.bootstrap_descriptors())
}

#[tauri::command]
pub(crate) fn views_status_get(state: State<'_, SupervisorState>) -> Result<Vec<ViewStatus>, String> {
    Ok(state.get()?.status())
}

#[tauri::command]
pub(crate) fn view_attached(state: State<'_, SupervisorState>, view_id: ViewId) -> Result<(), String> {
    state.get()?.on_view_attached(view_id);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_destroyed_report(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
) -> Result<(), String> {
    state.get()?.on_view_destroyed_report(view_id);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_load_started(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
) -> Result<(), String> {
    state.get()?.on_load_start(view_id);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_load_finished(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
) -> Result<(), String> {
    state.get()?.on_load_stop(view_id);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_load_failed(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
    error_code: i32,
    error_description: Option<String>,
) -> Result<(), String> {
    state
        .get()?
        .on_load_fail(view_id, error_code, error_description.as_deref().unwrap_or(""));
    Ok(())
}

#[tauri::command]
pub(crate) fn view_crashed(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
    was_killed: Option<bool>,
) -> Result<(), String> {
    state.get()?.on_crash(view_id, was_killed.unwrap_or(false));
    Ok(())
}

#[tauri::command]
pub(crate) fn view_unresponsive(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
) -> Result<(), String> {
    state.get()?.on_unresponsive(view_id);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_dom_ready(state: State<'_, SupervisorState>, view_id: ViewId) -> Result<(), String> {
    state.get()?.on_dom_ready(view_id);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_new_window(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
    url: String,
) -> Result<(), String> {
    state.get()?.on_new_window(view_id, &url);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_console_message(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
    level: Option<i32>,
    message: String,
) -> Result<(), String> {
    state
        .get()?
        .on_console_message(view_id, level.unwrap_or(0), &message);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_content_check_result(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
    unsupported: bool,
) -> Result<(), String> {
    state.get()?.on_content_check_result(view_id, unsupported);
    Ok(())
}

#[tauri::command]
pub(crate) fn view_cache_probe_result(
    state: State<'_, SupervisorState>,
    view_id: ViewId,
    found: bool,
) -> Result<(), String> {
    state.get()?.on_cache_probe_result(view_id, found);
    Ok(())
}

#[tauri::command]
pub(crate) fn network_state_set(state: State<'_, SupervisorState>, online: bool) -> Result<(), String> {
    let supervisor = state.get()?;
    if online {
        tauri::async_runtime::spawn(Arc::clone(&supervisor).handle_network_online());
    } else {
        supervisor.on_network_lost();
    }
    Ok(())
}
