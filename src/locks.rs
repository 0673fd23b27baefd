//! Per-key async locks
//!
//! Serializes work on a single cluster name while letting different names
//! proceed in parallel. Used for client construction and for the
//! read-modify-write of a cluster's annotations.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily created mutex per key
#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to `key`
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard guard is released before awaiting
        let mutex = self.locks.entry(key.to_string()).or_default().clone();
        mutex.lock_owned().await
    }

    /// Drop the mutex for `key` if nobody holds or waits on it
    pub fn forget(&self, key: &str) {
        self.locks
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of keys with a live mutex
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns true if no key has a live mutex
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
