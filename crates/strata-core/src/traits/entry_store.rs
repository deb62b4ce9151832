// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory half of the backend contract.

use async_trait::async_trait;

use crate::error::StrataError;
use crate::traits::adapter::BackendAdapter;
use crate::types::{ChangeSet, MemoryEntry, MemoryFilter, PruneRecord};

/// Storage primitives for memory entries and their prune audit trail.
///
/// Backends return entries with staleness already classified against their
/// clock. Lifecycle rules (pruning on append, locking, archive siblings) live
/// above this trait so every backend behaves the same.
#[async_trait]
pub trait EntryStore: BackendAdapter {
    /// Look up one entry by id.
    async fn fetch(&self, id: &str) -> Result<Option<MemoryEntry>, StrataError>;

    /// Store a new entry as given, dates included.
    ///
    /// Fails with [`StrataError::AlreadyExists`] if the id is taken.
    async fn insert(&self, entry: MemoryEntry) -> Result<(), StrataError>;

    /// Overwrite an existing entry. Fails with [`StrataError::NotFound`] if absent.
    async fn replace(&self, entry: MemoryEntry) -> Result<(), StrataError>;

    /// Delete an entry. Its prune history is kept.
    async fn remove(&self, id: &str) -> Result<bool, StrataError>;

    /// Every entry matching `filter`, sorted by id.
    async fn list(&self, filter: &MemoryFilter) -> Result<Vec<MemoryEntry>, StrataError>;

    /// Entries matching `filter` whose content contains `pattern`, ignoring
    /// case. Sorted by id.
    async fn search_entries(
        &self,
        pattern: &str,
        filter: &MemoryFilter,
    ) -> Result<Vec<MemoryEntry>, StrataError>;

    /// Upsert every entry and append every record of a changeset.
    ///
    /// Must call [`ChangeSet::ensure_committable`] before touching storage.
    async fn apply(&self, changes: ChangeSet) -> Result<(), StrataError>;

    /// Prune records, oldest first, optionally restricted to one entry.
    async fn prune_history(&self, entry_id: Option<&str>) -> Result<Vec<PruneRecord>, StrataError>;

    /// Whether removed content can be recovered outside this store (e.g. from
    /// version control). When false, removals keep a content snapshot.
    fn history_is_recoverable(&self) -> bool {
        false
    }
}

/// Case-insensitive substring match used by every `search_entries`.
pub fn content_matches(content: &str, pattern: &str) -> bool {
    content.to_lowercase().contains(&pattern.to_lowercase())
}
