// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the backend traits.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use strata_config::model::StorageConfig;
use strata_core::knowledge::rank;
use strata_core::{
    BackendAdapter, BackendKind, Catalog, ChangeSet, Clock, ContextProvider, DomainIndex,
    EntryStore, HealthStatus, KnowledgeReference, MemoryEntry, MemoryFilter, PruneRecord,
    ScoredReference, Staleness, StrataError,
};
use strata_files::KnowledgeTree;
use strata_files::tree::INDEX_FILE;
use tracing::{debug, info, warn};

use crate::database::{Database, map_tr_err};
use crate::queries::entries::EntryRow;
use crate::queries::{entries, history, knowledge};

/// SQLite-backed memory store and knowledge provider.
///
/// Knowledge is not read from disk on demand; it is loaded with
/// [`SqliteBackend::import_knowledge`] (usually during migration) and served
/// from the `knowledge_files` table afterwards.
pub struct SqliteBackend {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl SqliteBackend {
    /// Open the database named by the configuration.
    pub async fn open(config: &StorageConfig, clock: Arc<dyn Clock>) -> Result<Self, StrataError> {
        let db = Database::open(&config.database_path, config.wal_mode, Arc::clone(&clock)).await?;
        debug!(path = %config.database_path, "sqlite backend initialized");
        Ok(Self { db, clock })
    }

    /// A private in-memory database.
    pub async fn in_memory(clock: Arc<dyn Clock>) -> Result<Self, StrataError> {
        let db = Database::open_in_memory(Arc::clone(&clock)).await?;
        Ok(Self { db, clock })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Replace the stored knowledge with an already scanned tree.
    pub async fn import_knowledge(&self, tree: &KnowledgeTree) -> Result<usize, StrataError> {
        let count = knowledge::replace_tree(&self.db, tree).await?;
        info!(files = count, "knowledge imported into sqlite");
        Ok(count)
    }

    /// Scan a context directory and import it.
    pub async fn import_tree(&self, context_dir: &Path) -> Result<usize, StrataError> {
        let tree = strata_files::scan_tree(context_dir).await?;
        self.import_knowledge(&tree).await
    }

    /// Staleness of every entry, computed inside SQLite by the
    /// `memory_staleness` view. Sorted by id.
    pub async fn staleness_report(&self) -> Result<Vec<(String, Staleness)>, StrataError> {
        let rows = entries::staleness_view(&self.db).await?;
        rows.into_iter()
            .map(|(id, label)| {
                let staleness = label.parse::<Staleness>().map_err(|e| {
                    StrataError::Internal(format!("unexpected staleness label `{label}`: {e}"))
                })?;
                Ok((id, staleness))
            })
            .collect()
    }

    /// Checkpoint the WAL before the process exits.
    pub async fn close(&self) -> Result<(), StrataError> {
        self.db.checkpoint().await
    }

    fn into_entries(&self, rows: Vec<EntryRow>) -> Result<Vec<MemoryEntry>, StrataError> {
        let today = self.clock.today();
        rows.into_iter().map(|row| row.into_entry(today)).collect()
    }
}

#[async_trait]
impl BackendAdapter for SqliteBackend {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        self.db
            .reader()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EntryStore for SqliteBackend {
    async fn fetch(&self, id: &str) -> Result<Option<MemoryEntry>, StrataError> {
        entries::fetch_entry(&self.db, id)
            .await?
            .map(|row| row.into_entry(self.clock.today()))
            .transpose()
    }

    async fn insert(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        if !entries::insert_entry(&self.db, &entry).await? {
            return Err(StrataError::AlreadyExists { id: entry.id });
        }
        Ok(())
    }

    async fn replace(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        if !entries::replace_entry(&self.db, &entry).await? {
            return Err(StrataError::entry_not_found(entry.id));
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, StrataError> {
        entries::delete_entry(&self.db, id).await
    }

    async fn list(&self, filter: &MemoryFilter) -> Result<Vec<MemoryEntry>, StrataError> {
        let rows = entries::list_entries(&self.db, filter).await?;
        self.into_entries(rows)
    }

    async fn search_entries(
        &self,
        pattern: &str,
        filter: &MemoryFilter,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        let rows = entries::search_entries(&self.db, pattern, filter).await?;
        self.into_entries(rows)
    }

    async fn apply(&self, changes: ChangeSet) -> Result<(), StrataError> {
        let (upserts, records) = (changes.upserts.len(), changes.records.len());
        entries::apply_changes(&self.db, changes).await?;
        debug!(upserts, records, "changeset committed");
        Ok(())
    }

    async fn prune_history(&self, entry_id: Option<&str>) -> Result<Vec<PruneRecord>, StrataError> {
        history::list_records(&self.db, entry_id).await
    }
}

#[async_trait]
impl ContextProvider for SqliteBackend {
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError> {
        let domains = match domain {
            Some(d) => vec![d.to_string()],
            None => knowledge::list_domains(&self.db).await?,
        };
        let mut indexes = Vec::new();
        for d in &domains {
            match self.get_domain_index(d).await {
                Ok(index) => indexes.push(index),
                Err(StrataError::NotFound { .. }) if domain.is_none() => {
                    warn!(domain = %d, "skipping domain without an index");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Catalog::from_indexes(&indexes))
    }

    async fn get_domain_index(&self, domain: &str) -> Result<DomainIndex, StrataError> {
        let rows = knowledge::domain_files(&self.db, domain).await?;
        let Some(index) = rows.iter().find(|r| r.reference.file == INDEX_FILE) else {
            return Err(StrataError::knowledge_not_found(KnowledgeReference::make_id(
                domain, INDEX_FILE,
            )));
        };
        let reference = index.reference.clone();
        let cross_domain = index.cross_domain.clone();
        Ok(DomainIndex::assemble(
            reference,
            rows.into_iter().map(|r| r.reference),
            cross_domain,
        ))
    }

    async fn get_loading_protocol(&self) -> Result<String, StrataError> {
        knowledge::loading_protocol(&self.db)
            .await?
            .ok_or_else(|| StrataError::knowledge_not_found(strata_files::tree::LOADING_PROTOCOL_FILE))
    }

    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError> {
        knowledge::get_file(&self.db, domain, file)
            .await?
            .map(|row| row.reference)
            .ok_or_else(|| StrataError::knowledge_not_found(KnowledgeReference::make_id(domain, file)))
    }

    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        knowledge::get_body(&self.db, &reference.id)
            .await?
            .ok_or_else(|| StrataError::knowledge_not_found(reference.id.clone()))
    }

    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError> {
        let hits = knowledge::search(&self.db, query, domain)
            .await?
            .into_iter()
            .map(|(reference, score)| ScoredReference { reference, score })
            .collect();
        Ok(rank(hits))
    }
}
