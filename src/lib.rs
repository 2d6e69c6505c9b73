mod app;
mod commands;
mod infra;
mod shared;
mod supervisor;

pub(crate) use app::{app_state, notice, resident};
pub(crate) use infra::{app_paths, settings};
pub(crate) use shared::{blocking, mutex_ext};

use app_state::{SettingsHealth, SupervisorState};
use commands::*;
use mutex_ext::MutexExt;
use std::sync::Arc;
use supervisor::{Supervisor, TauriViewHost};
use tauri::Manager;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let builder = tauri::Builder::default()
        .manage(SupervisorState::default())
        .manage(SettingsHealth::default());

    #[cfg(desktop)]
    let builder = builder
        .plugin(tauri_plugin_notification::init())
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            resident::show_main_window(app);
        }));

    let app = builder
        .on_window_event(resident::on_window_event)
        .setup(|app| {
            crate::app::logging::init(app.handle());

            #[cfg(desktop)]
            {
                if let Err(err) = resident::setup_tray(app.handle()) {
                    tracing::error!("系统托盘初始化失败: {}", err);
                }
            }

            let app_handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                let settings = match blocking::run("startup_read_settings", {
                    let app_handle = app_handle.clone();
                    move || settings::read(&app_handle)
                })
                .await
                {
                    Ok(cfg) => cfg,
                    Err(err) => {
                        tracing::warn!("配置读取失败，使用默认值: {}", err);
                        app_handle.state::<SettingsHealth>().set_degraded(true);
                        let payload = notice::build(
                            notice::NoticeLevel::Warning,
                            None,
                            "配置文件读取失败，本次启动使用默认配置".to_string(),
                        );
                        let _ = notice::emit(&app_handle, payload);
                        settings::AppSettings::default()
                    }
                };

                let host = Arc::new(TauriViewHost::new(app_handle.clone()));
                let supervisor = Supervisor::new(host);
                supervisor.init_views(&settings);

                let state = app_handle.state::<SupervisorState>();
                state.set(Arc::clone(&supervisor));

                let housekeeping =
                    supervisor::housekeeping::Housekeeping::start(app_handle.clone(), supervisor);
                *state.housekeeping.lock_or_recover() = Some(housekeeping);

                tracing::info!("视图监控已启动");
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            app_about_get,
            app_exit,
            app_restart,
            notice_send,
            settings_get,
            settings_set,
            views_bootstrap,
            views_status_get,
            view_attached,
            view_destroyed_report,
            view_load_started,
            view_load_finished,
            view_load_failed,
            view_crashed,
            view_unresponsive,
            view_dom_ready,
            view_new_window,
            view_console_message,
            view_content_check_result,
            view_cache_probe_result,
            network_state_set
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app_handle, event| {
        if let tauri::RunEvent::ExitRequested { api, code, .. } = &event {
            // Note: `prevent_exit` is ignored for restart requests.
            // For app_restart we run cleanup explicitly before requesting restart.
            if *code != Some(tauri::RESTART_EXIT_CODE) {
                tracing::info!("收到退出请求，开始清理...");
                api.prevent_exit();

                let app_handle = app_handle.clone();
                tauri::async_runtime::spawn(async move {
                    crate::app::cleanup::cleanup_before_exit(&app_handle).await;
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    std::process::exit(0);
                });
            }
            return;
        }

        #[cfg(target_os = "macos")]
        if let tauri::RunEvent::Reopen {
            has_visible_windows,
            ..
        } = event
        {
            if !has_visible_windows {
                resident::show_main_window(app_handle);
            }
        }
    });
}
