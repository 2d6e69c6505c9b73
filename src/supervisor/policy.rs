//! Usage: Recovery policy (failure classification + retry/terminal decisions).

use std::time::Duration;

pub(crate) const MAX_RELOAD_ATTEMPTS: u32 = 3;

/// Fixed backoff, deliberately not adaptive: the hosted service either comes
/// back quickly or the failure escalates to terminal within three attempts.
pub(crate) const RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Observation window for cached content to materialize while offline.
pub(crate) const OFFLINE_CACHE_WINDOW: Duration = Duration::from_millis(5000);
pub(crate) const OFFLINE_REPROBE_INTERVAL: Duration = Duration::from_millis(1000);

/// Aborted navigation (`ERR_ABORTED`), not a real failure.
const ERROR_CODE_ABORTED: i32 = -3;

const ERROR_CODE_FAILED: i32 = -2;
const ERROR_CODE_TIMED_OUT: i32 = -7;
const ERROR_CODE_NETWORK_CHANGED: i32 = -21;
const ERROR_CODE_INTERNET_DISCONNECTED: i32 = -106;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    Benign,
    TransientNetwork,
    Offline,
    ProcessFault,
}

impl FailureKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Benign => "benign",
            Self::TransientNetwork => "transient_network",
            Self::Offline => "offline",
            Self::ProcessFault => "process_fault",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RecoveryAction {
    Ignore,
    RetryAfterDelay(Duration),
    OfflineFallback,
    ShowTerminalError,
}

/// Classify a `did-fail-load` style platform error code. Process faults
/// (crash/unresponsive) are separate events and enter `decide` directly as
/// [`FailureKind::ProcessFault`].
pub(crate) fn classify_load_failure(error_code: i32, online: bool) -> FailureKind {
    if error_code == ERROR_CODE_ABORTED {
        return FailureKind::Benign;
    }
    if !online {
        return FailureKind::Offline;
    }
    FailureKind::TransientNetwork
}

/// Pure decision function. Once the cap is reached, no further automatic
/// retry or recreation is issued until a successful load resets the counter;
/// the terminal error fires exactly once.
pub(crate) fn decide(kind: FailureKind, attempts: u32, already_terminal: bool) -> RecoveryAction {
    match kind {
        FailureKind::Benign => RecoveryAction::Ignore,
        FailureKind::Offline => RecoveryAction::OfflineFallback,
        FailureKind::TransientNetwork | FailureKind::ProcessFault => {
            if attempts < MAX_RELOAD_ATTEMPTS {
                RecoveryAction::RetryAfterDelay(RETRY_DELAY)
            } else if already_terminal {
                RecoveryAction::Ignore
            } else {
                RecoveryAction::ShowTerminalError
            }
        }
    }
}

pub(crate) fn describe_load_failure(error_code: i32, description: &str) -> String {
    let label = match error_code {
        ERROR_CODE_FAILED => "加载失败",
        ERROR_CODE_TIMED_OUT => "连接超时",
        ERROR_CODE_NETWORK_CHANGED => "网络环境发生变化",
        ERROR_CODE_INTERNET_DISCONNECTED => "网络连接已断开",
        _ => "页面加载出错",
    };
    if description.trim().is_empty() {
        format!("{label} (code {error_code})")
    } else {
        format!("{label} (code {error_code}: {description})")
    }
}
