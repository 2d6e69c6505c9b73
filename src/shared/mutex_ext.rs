//! Usage: Poisoned-mutex recovery helper (lock_or_recover).

use std::sync::{Mutex, MutexGuard};

pub(crate) trait MutexExt<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T>;
}

impl<T> MutexExt<T> for Mutex<T> {
    fn lock_or_recover(&self) -> MutexGuard<'_, T> {
        match self.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("互斥锁已中毒，恢复内部状态继续使用");
                poisoned.into_inner()
            }
        }
    }
}
