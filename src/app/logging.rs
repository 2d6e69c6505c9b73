//! Usage: Global tracing setup (stderr + daily rolling file in the app data dir).
//!
//! Filter comes from `DUAL_MESSENGER_LOG` (`RUST_LOG` syntax), default `info`.

use crate::app_paths;
use std::sync::OnceLock;
use tracing_subscriber::fmt::writer::MakeWriterExt;

const LOG_ENV_VAR: &str = "DUAL_MESSENGER_LOG";
const LOG_DIR_NAME: &str = "logs";
const LOG_FILE_PREFIX: &str = "dual-messenger.log";

// The non-blocking writer stops flushing once its guard drops; keep it for
// the process lifetime.
static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

pub(crate) fn init(app: &tauri::AppHandle) {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_writer = match app_paths::app_data_dir(app) {
        Ok(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join(LOG_DIR_NAME), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = LOG_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("日志目录解析失败，仅输出到 stderr: {err}");
            None
        }
    };

    let result = match file_writer {
        Some(writer) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(writer.and(std::io::stderr))
            .try_init(),
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if let Err(err) = result {
        eprintln!("tracing 初始化失败: {err}");
        return;
    }

    // Route `log`-facade records from dependencies into tracing.
    if let Err(err) = tracing_log::LogTracer::init() {
        tracing::warn!("log 桥接初始化失败: {}", err);
    }
}
