//! Usage: Settings read/write commands; saved settings are applied to the
//! live views immediately.

use crate::app::app_state::{SettingsHealth, SupervisorState};
use crate::blocking;
use crate::settings::{self, AppSettings};
use tauri::Manager;

#[tauri::command]
pub(crate) async fn settings_get(app: tauri::AppHandle) -> Result<AppSettings, String> {
    let app_for_read = app.clone();
    let settings = blocking::run("settings_get", move || settings::read(&app_for_read)).await;
    match settings {
        Ok(settings) => Ok(settings),
        Err(err) => {
            // Reads never fail the UI; the degraded flag tracks persistence.
            tracing::warn!("配置读取失败，返回默认值: {}", err);
            app.state::<SettingsHealth>().set_degraded(true);
            Ok(AppSettings::default())
        }
    }
}

#[tauri::command]
pub(crate) async fn settings_set(
    app: tauri::AppHandle,
    settings: AppSettings,
) -> Result<AppSettings, String> {
    let app_for_write = app.clone();
    let saved = blocking::run("settings_set", move || {
        settings::write(&app_for_write, &settings)
    })
    .await?;

    app.state::<SettingsHealth>().set_degraded(false);

    if let Some(supervisor) = app.state::<SupervisorState>().try_get() {
        supervisor.apply_settings(&saved);
    }

    Ok(saved)
}
