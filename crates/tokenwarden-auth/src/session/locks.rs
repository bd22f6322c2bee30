//! Per-identity exclusive locks.
//!
//! Mutating session operations load a record, change it and write it back.
//! Holding the identity's lock across that sequence keeps concurrent
//! requests for the same email from losing each other's updates, while
//! requests for different emails proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A set of async mutexes keyed by identity email.
///
/// An entry exists only while some task holds or waits for its lock; the
/// last guard to be released removes it, so the map never outgrows the
/// number of in-flight requests.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive hold on one key of a [`KeyedLocks`].
///
/// Dropping the guard releases the lock and prunes the key if no other task
/// is waiting on it.
#[derive(Debug)]
pub struct KeyedLockGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
}

impl Drop for KeyedLockGuard<'_> {
    fn drop(&mut self) {
        // Release the mutex first so its Arc is back to the map's reference.
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl KeyedLocks {
    /// Creates an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and acquires the lock for `key`.
    ///
    /// The lock is released when the returned guard is dropped.
    pub async fn lock(&self, key: &str) -> KeyedLockGuard<'_> {
        // Clone the Arc out so the DashMap shard is not held across the await.
        let mutex = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        // Built before awaiting so a cancelled waiter still prunes the key.
        let mut held = KeyedLockGuard {
            guard: None,
            locks: &self.locks,
            key: key.to_string(),
        };
        held.guard = Some(mutex.lock_owned().await);
        held
    }

    /// Returns the number of keys currently held or awaited.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Returns `true` if no key is held or awaited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
