//! Per-record mutual exclusion.

use std::sync::Arc;
use std::time::Duration;

use fnv::FnvHashMap;
use parking_lot::Mutex;

use crate::error::{lock_timeout_error, Result};
use crate::record::RecordKey;

/// Map of per-key locks, created on demand and dropped once unused.
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<FnvHashMap<RecordKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` while holding the lock for `key`.
    ///
    /// Waits at most `timeout` for the lock, then fails with `LockTimeout`
    /// without running `work`.
    pub fn with_key<T>(
        &self,
        key: &RecordKey,
        timeout: Duration,
        work: impl FnOnce() -> Result<T>,
    ) -> Result<T> {
        let slot = {
            let mut slots = self.slots.lock();
            slots.entry(key.clone()).or_default().clone()
        };

        let result = match slot.try_lock_for(timeout) {
            Some(_guard) => work(),
            None => Err(lock_timeout_error(&format!("record lock {key}"), timeout)),
        };

        self.release_slot(key, &slot);
        result
    }

    /// Number of keys currently locked or waited on.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release_slot(&self, key: &RecordKey, slot: &Arc<Mutex<()>>) {
        let mut slots = self.slots.lock();
        let unused = slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && Arc::strong_count(slot) == 2);
        if unused {
            slots.remove(key);
        }
    }
}
