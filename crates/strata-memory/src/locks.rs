// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-id write serialisation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per entry id, created on first use and dropped once no
/// guard holds or waits for it.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds one id's lock. Dropping it releases the lock and forgets the slot
/// if nobody else is queued on it.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters clone the slot under the shard lock, so a count of one
        // means the map holds the only reference.
        self.locks
            .locks
            .remove_if(&self.id, |_, slot| Arc::strong_count(slot) == 1);
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Hold the lock for one id until the guard drops.
    pub async fn lock(&self, id: &str) -> KeyGuard<'_> {
        let guard = self.slot(id).lock_owned().await;
        KeyGuard {
            locks: self,
            id: id.to_string(),
            guard: Some(guard),
        }
    }

    /// Ids with a live slot.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Lock several ids. Ids are taken in sorted order so two callers
    /// locking overlapping sets cannot deadlock.
    pub async fn lock_many(&self, ids: &[&str]) -> Vec<KeyGuard<'_>> {
        let mut sorted: Vec<&str> = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        let mut guards = Vec::with_capacity(sorted.len());
        for id in sorted {
            guards.push(self.lock(id).await);
        }
        guards
    }
}
