// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `EntryStore` over in-process maps, for service-level tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use strata_core::traits::entry_store::content_matches;
use strata_core::{
    BackendAdapter, BackendKind, ChangeSet, Clock, EntryStore, HealthStatus, MemoryEntry,
    MemoryFilter, PruneRecord, StrataError,
};

#[derive(Default)]
struct State {
    entries: BTreeMap<String, MemoryEntry>,
    history: Vec<PruneRecord>,
}

/// A map-backed store. Changesets are applied under one write lock.
pub struct InMemoryStore {
    state: RwLock<State>,
    clock: Arc<dyn Clock>,
    recoverable: bool,
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            clock,
            recoverable: false,
        }
    }

    /// Pretend removed content is recoverable elsewhere.
    pub fn with_recoverable_history(mut self) -> Self {
        self.recoverable = true;
        self
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl BackendAdapter for InMemoryStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Vector
    }

    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EntryStore for InMemoryStore {
    async fn fetch(&self, id: &str) -> Result<Option<MemoryEntry>, StrataError> {
        let today = self.clock.today();
        Ok(self
            .state
            .read()
            .await
            .entries
            .get(id)
            .cloned()
            .map(|e| e.refresh(today)))
    }

    async fn insert(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        let mut state = self.state.write().await;
        if state.entries.contains_key(&entry.id) {
            return Err(StrataError::AlreadyExists { id: entry.id });
        }
        state.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn replace(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        let mut state = self.state.write().await;
        match state.entries.get_mut(&entry.id) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(StrataError::entry_not_found(entry.id)),
        }
    }

    async fn remove(&self, id: &str) -> Result<bool, StrataError> {
        Ok(self.state.write().await.entries.remove(id).is_some())
    }

    async fn list(&self, filter: &MemoryFilter) -> Result<Vec<MemoryEntry>, StrataError> {
        let today = self.clock.today();
        Ok(self
            .state
            .read()
            .await
            .entries
            .values()
            .filter(|e| filter.matches(&e.key))
            .map(|e| e.clone().refresh(today))
            .collect())
    }

    async fn search_entries(
        &self,
        pattern: &str,
        filter: &MemoryFilter,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        Ok(self
            .list(filter)
            .await?
            .into_iter()
            .filter(|e| content_matches(&e.content, pattern))
            .collect())
    }

    async fn apply(&self, changes: ChangeSet) -> Result<(), StrataError> {
        changes.ensure_committable()?;
        let mut state = self.state.write().await;
        for entry in changes.upserts {
            state.entries.insert(entry.id.clone(), entry);
        }
        state.history.extend(changes.records);
        Ok(())
    }

    async fn prune_history(&self, entry_id: Option<&str>) -> Result<Vec<PruneRecord>, StrataError> {
        Ok(self
            .state
            .read()
            .await
            .history
            .iter()
            .filter(|r| entry_id.is_none_or(|id| r.entry_id == id))
            .cloned()
            .collect())
    }

    fn history_is_recoverable(&self) -> bool {
        self.recoverable
    }
}
