//! Usage: Per-view health records (lifecycle states, attempt counters, epochs).

use serde::{Deserialize, Serialize};

/// One embedded view per hosted account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ViewId {
    Personal,
    Business,
}

impl ViewId {
    pub(crate) const ALL: [ViewId; 2] = [ViewId::Personal, ViewId::Business];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Business => "business",
        }
    }

    /// Isolated storage/cookie scope so the two accounts never share sessions.
    pub(crate) fn partition(self) -> &'static str {
        match self {
            Self::Personal => "persist:personal",
            Self::Business => "persist:business",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ViewLifecycle {
    Idle,
    Loading,
    Loaded,
    Failed,
    Crashed,
    Unresponsive,
    Destroyed,
}

impl ViewLifecycle {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
            Self::Failed => "failed",
            Self::Crashed => "crashed",
            Self::Unresponsive => "unresponsive",
            Self::Destroyed => "destroyed",
        }
    }

    /// States a scheduled retry is still allowed to act on.
    pub(crate) fn is_retryable_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Crashed | Self::Unresponsive)
    }
}

/// Pending offline cached-content probe, tagged with the epoch it was
/// started under so late replies against a recovered view are dropped.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PendingCacheProbe {
    pub(crate) epoch: u64,
    pub(crate) started: tokio::time::Instant,
}

#[derive(Debug)]
pub(crate) struct ViewRecord {
    pub(crate) id: ViewId,
    pub(crate) url: String,
    pub(crate) lifecycle: ViewLifecycle,
    pub(crate) attempts: u32,
    /// Bumped on every counter reset and recreation. Delayed actions capture
    /// the epoch at decision time and re-validate before acting.
    pub(crate) epoch: u64,
    pub(crate) muted: bool,
    pub(crate) attached: bool,
    pub(crate) terminal_notified: bool,
    pub(crate) overlay_visible: bool,
    /// One-shot guard for the unsupported-browser corrective reload.
    pub(crate) browser_check_reload_done: bool,
    pub(crate) pending_cache_probe: Option<PendingCacheProbe>,
    pub(crate) last_error: Option<String>,
}

impl ViewRecord {
    pub(crate) fn new(id: ViewId, url: String, muted: bool) -> Self {
        Self {
            id,
            url,
            lifecycle: ViewLifecycle::Idle,
            attempts: 0,
            epoch: 0,
            muted,
            attached: false,
            terminal_notified: false,
            overlay_visible: false,
            browser_check_reload_done: false,
            pending_cache_probe: None,
            last_error: None,
        }
    }

    /// `loaded` is the only state that resets the attempt counter.
    pub(crate) fn reset_attempts(&mut self) {
        self.attempts = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.terminal_notified = false;
        self.pending_cache_probe = None;
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ViewStatus {
    pub(crate) view_id: ViewId,
    pub(crate) url: String,
    pub(crate) lifecycle: &'static str,
    pub(crate) attempts: u32,
    pub(crate) muted: bool,
    pub(crate) overlay_visible: bool,
    pub(crate) last_error: Option<String>,
}

impl ViewStatus {
    pub(crate) fn from_record(record: &ViewRecord) -> Self {
        Self {
            view_id: record.id,
            url: record.url.clone(),
            lifecycle: record.lifecycle.as_str(),
            attempts: record.attempts,
            muted: record.muted,
            overlay_visible: record.overlay_visible,
            last_error: record.last_error.clone(),
        }
    }
}
