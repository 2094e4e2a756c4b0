//! Per-dataset serialization of publishes
//!
//! Two publishes that clear and load the same staging table must not
//! interleave. Within one process, [`DatasetLocks`] hands out one mutex per
//! staging table; publishes to different tables never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Lock registry keyed by staging table
#[derive(Debug, Default)]
pub struct DatasetLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl DatasetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for one staging table, created on first use
    pub fn handle(&self, staging_table: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(staging_table.to_lowercase())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Number of staging tables seen so far
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hold a dataset lock
///
/// A publish that panicked leaves nothing half-done behind (its transaction
/// was rolled back), so a poisoned lock is simply taken over.
pub fn acquire(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
