//! Usage: Shared Tauri state types used by `commands/*` and startup wiring.

use crate::supervisor::{housekeeping::Housekeeping, Supervisor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

/// The supervisor is built during async startup (settings must be read
/// first); commands arriving before that report not-ready instead of
/// panicking.
#[derive(Default)]
pub(crate) struct SupervisorState {
    supervisor: OnceLock<Arc<Supervisor>>,
    pub(crate) housekeeping: Mutex<Option<Housekeeping>>,
}

impl SupervisorState {
    pub(crate) fn set(&self, supervisor: Arc<Supervisor>) {
        let _ = self.supervisor.set(supervisor);
    }

    pub(crate) fn get(&self) -> Result<Arc<Supervisor>, String> {
        self.supervisor
            .get()
            .cloned()
            .ok_or_else(|| "SUPERVISOR_NOT_READY: 视图监控尚未就绪".to_string())
    }

    pub(crate) fn try_get(&self) -> Option<Arc<Supervisor>> {
        self.supervisor.get().cloned()
    }
}

/// Set when settings could not be read at startup and defaults were used;
/// cleared by the next successful save.
#[derive(Default)]
pub(crate) struct SettingsHealth {
    degraded: AtomicBool,
}

impl SettingsHealth {
    pub(crate) fn set_degraded(&self, degraded: bool) {
        self.degraded.store(degraded, Ordering::Relaxed);
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}
