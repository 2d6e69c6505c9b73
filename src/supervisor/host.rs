//! Usage: Effect boundary between the supervisor and the embedded view containers.
//!
//! Every command issued to a view goes through [`ViewHost`]. The production
//! implementation bridges to the presentation layer over the `view:command`
//! event; tests substitute a recording fake.

use super::health::ViewId;
use crate::mutex_ext::MutexExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use tauri::Emitter;

pub(crate) const VIEW_COMMAND_EVENT: &str = "view:command";

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ViewDescriptor {
    pub(crate) view_id: ViewId,
    pub(crate) url: String,
    pub(crate) partition: &'static str,
    pub(crate) muted: bool,
}

pub(crate) trait ViewHost: Send + Sync {
    /// Factory entry point used identically by initial setup and recovery:
    /// creates (or recreates) the container for `view` and wires listeners.
    fn attach(&self, view: &ViewDescriptor);
    fn detach(&self, id: ViewId);
    fn reload(&self, id: ViewId);
    fn set_source(&self, id: ViewId, url: &str);
    fn set_audio_muted(&self, id: ViewId, muted: bool);
    fn insert_style(&self, id: ViewId, css: &str);
    fn set_loading_indicator(&self, id: ViewId, visible: bool);
    fn set_error_overlay(&self, id: ViewId, message: Option<&str>);
    fn request_content_check(&self, id: ViewId);
    fn request_cache_probe(&self, id: ViewId);
    fn clear_partition_storage(&self, id: ViewId) -> Result<(), String>;
    fn notify_terminal_failure(&self, id: ViewId, message: &str);
    fn note_attached(&self, id: ViewId);
    fn note_detached(&self, id: ViewId);
    /// Polled predicate; the hosting container may tear a view down without
    /// a direct callback.
    fn is_destroyed(&self, id: ViewId) -> bool;
}

#[derive(Debug, Clone, Serialize)]
struct ViewCommandPayload {
    view_id: ViewId,
    command: &'static str,
    args: serde_json::Value,
}

/// Bridges supervisor effects to the presentation layer via Tauri events.
pub(crate) struct TauriViewHost {
    app: tauri::AppHandle,
    attached: Mutex<HashMap<ViewId, bool>>,
}

impl TauriViewHost {
    pub(crate) fn new(app: tauri::AppHandle) -> Self {
        Self {
            app,
            attached: Mutex::new(HashMap::new()),
        }
    }

    fn emit(&self, view_id: ViewId, command: &'static str, args: serde_json::Value) {
        let payload = ViewCommandPayload {
            view_id,
            command,
            args,
        };
        if let Err(err) = self.app.emit(VIEW_COMMAND_EVENT, payload) {
            tracing::warn!(
                view = view_id.as_str(),
                command,
                "视图指令事件发送失败: {}",
                err
            );
        }
    }
}

impl ViewHost for TauriViewHost {
    fn attach(&self, view: &ViewDescriptor) {
        self.emit(
            view.view_id,
            "attach",
            serde_json::json!({
                "url": view.url,
                "partition": view.partition,
                "muted": view.muted,
            }),
        );
    }

    fn detach(&self, id: ViewId) {
        self.note_detached(id);
        self.emit(id, "detach", serde_json::Value::Null);
    }

    fn reload(&self, id: ViewId) {
        self.emit(id, "reload", serde_json::Value::Null);
    }

    fn set_source(&self, id: ViewId, url: &str) {
        self.emit(id, "set_source", serde_json::json!({ "url": url }));
    }

    fn set_audio_muted(&self, id: ViewId, muted: bool) {
        self.emit(id, "set_audio_muted", serde_json::json!({ "muted": muted }));
    }

    fn insert_style(&self, id: ViewId, css: &str) {
        self.emit(id, "insert_style", serde_json::json!({ "css": css }));
    }

    fn set_loading_indicator(&self, id: ViewId, visible: bool) {
        self.emit(id, "set_loading", serde_json::json!({ "visible": visible }));
    }

    fn set_error_overlay(&self, id: ViewId, message: Option<&str>) {
        self.emit(id, "set_overlay", serde_json::json!({ "message": message }));
    }

    fn request_content_check(&self, id: ViewId) {
        self.emit(id, "content_check", serde_json::Value::Null);
    }

    fn request_cache_probe(&self, id: ViewId) {
        self.emit(id, "cache_probe", serde_json::Value::Null);
    }

    fn clear_partition_storage(&self, id: ViewId) -> Result<(), String> {
        let payload = ViewCommandPayload {
            view_id: id,
            command: "clear_storage",
            args: serde_json::Value::Null,
        };
        self.app
            .emit(VIEW_COMMAND_EVENT, payload)
            .map_err(|e| format!("failed to emit clear_storage for {}: {e}", id.as_str()))
    }

    fn notify_terminal_failure(&self, id: ViewId, message: &str) {
        let body = format!("{}账号: {message}", view_label(id));
        let payload = crate::notice::build(crate::notice::NoticeLevel::Error, None, body);
        if let Err(err) = crate::notice::emit(&self.app, payload) {
            tracing::warn!(view = id.as_str(), "终态错误通知发送失败: {}", err);
        }
    }

    fn note_attached(&self, id: ViewId) {
        self.attached.lock_or_recover().insert(id, true);
    }

    fn note_detached(&self, id: ViewId) {
        self.attached.lock_or_recover().insert(id, false);
    }

    fn is_destroyed(&self, id: ViewId) -> bool {
        !self
            .attached
            .lock_or_recover()
            .get(&id)
            .copied()
            .unwrap_or(false)
    }
}

fn view_label(id: ViewId) -> &'static str {
    match id {
        ViewId::Personal => "个人",
        ViewId::Business => "商务",
    }
}
