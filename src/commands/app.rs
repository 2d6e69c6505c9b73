//! Usage: App-level Tauri commands (about info, lifecycle, notices).

use crate::app::app_state::SettingsHealth;

#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct AppAboutInfo {
    os: String,
    arch: String,
    profile: String,
    app_version: String,
    /// True while the app is running on built-in defaults because the
    /// persisted settings could not be read.
    settings_degraded: bool,
}

#[tauri::command]
pub(crate) fn app_about_get(health: tauri::State<'_, SettingsHealth>) -> AppAboutInfo {
    AppAboutInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        profile: if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "release".to_string()
        },
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        settings_degraded: health.is_degraded(),
    }
}

#[tauri::command]
pub(crate) fn app_exit(app: tauri::AppHandle) -> Result<bool, String> {
    std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(200));
        app.exit(0);
    });
    Ok(true)
}

#[tauri::command]
pub(crate) fn app_restart(app: tauri::AppHandle) -> Result<bool, String> {
    std::thread::spawn(move || {
        std::thread::sleep(std::time::Duration::from_millis(200));
        tauri::async_runtime::block_on(crate::app::cleanup::cleanup_before_exit(&app));
        app.request_restart();
    });
    Ok(true)
}

#[tauri::command]
pub(crate) fn notice_send(
    app: tauri::AppHandle,
    level: crate::notice::NoticeLevel,
    title: Option<String>,
    body: String,
) -> Result<(), String> {
    crate::notice::emit(&app, crate::notice::build(level, title, body))
}
