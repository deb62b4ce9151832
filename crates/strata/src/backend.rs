// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The closed set of backends a session can run on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strata_config::StrataConfig;
use strata_core::{
    BackendAdapter, BackendKind, Catalog, ChangeSet, Clock, ContextProvider, DomainIndex,
    EntryStore, HealthStatus, KnowledgeReference, MemoryEntry, MemoryFilter, PruneRecord,
    ScoredReference, StrataError,
};
use strata_files::FileBackend;
use strata_router::{HybridProvider, RemoteSource, RouteTable};
use strata_storage::SqliteBackend;
use strata_vector::VectorBackend;
use tracing::info;

/// One of the four backend variants.
///
/// The hybrid variant serves knowledge through the fallback router and keeps
/// memory in its local flat-file backend.
pub enum Backend {
    Files(FileBackend),
    Sqlite(SqliteBackend),
    Vector(VectorBackend),
    Hybrid(HybridProvider<FileBackend>),
}

impl Backend {
    /// Open the backend selected by `config.backend.kind`.
    pub async fn from_config(
        config: &StrataConfig,
        clock: Arc<dyn Clock>,
        remote: Option<Arc<dyn RemoteSource>>,
    ) -> Result<Self, StrataError> {
        Self::open(config.backend.kind, config, clock, remote).await
    }

    /// Open a backend of the given kind with the rest of `config`.
    ///
    /// The vector index lives in process memory, so it is seeded from the
    /// flat-file knowledge tree every time it opens. The hybrid variant needs
    /// a remote source; no network transport is built in.
    pub async fn open(
        kind: BackendKind,
        config: &StrataConfig,
        clock: Arc<dyn Clock>,
        remote: Option<Arc<dyn RemoteSource>>,
    ) -> Result<Self, StrataError> {
        let backend = match kind {
            BackendKind::Files => Backend::Files(FileBackend::new(&config.files, clock)),
            BackendKind::Sqlite => Backend::Sqlite(SqliteBackend::open(&config.storage, clock).await?),
            BackendKind::Vector => {
                let vector = VectorBackend::new(&config.vector, clock);
                vector
                    .import_tree(std::path::Path::new(&config.files.context_dir))
                    .await?;
                Backend::Vector(vector)
            }
            BackendKind::Hybrid => {
                let remote = remote.ok_or_else(|| {
                    StrataError::Config(
                        "the hybrid backend needs a remote documentation source".into(),
                    )
                })?;
                let routes = RouteTable::from_config(&config.remote)?;
                Backend::Hybrid(HybridProvider::new(
                    FileBackend::new(&config.files, clock),
                    remote,
                    routes,
                    Duration::from_millis(config.remote.timeout_ms),
                ))
            }
        };
        info!(backend = %kind, "backend opened");
        Ok(backend)
    }

    /// Knowledge side of the backend.
    pub fn knowledge(&self) -> &dyn ContextProvider {
        match self {
            Backend::Files(b) => b,
            Backend::Sqlite(b) => b,
            Backend::Vector(b) => b,
            Backend::Hybrid(b) => b,
        }
    }

    /// Memory side of the backend.
    pub fn memory(&self) -> &dyn EntryStore {
        match self {
            Backend::Files(b) => b,
            Backend::Sqlite(b) => b,
            Backend::Vector(b) => b,
            Backend::Hybrid(b) => b.local(),
        }
    }

    /// Flush whatever the backend buffers. Only SQLite has anything to do.
    pub async fn close(&self) -> Result<(), StrataError> {
        match self {
            Backend::Sqlite(b) => b.close().await,
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl BackendAdapter for Backend {
    fn name(&self) -> &str {
        self.knowledge().name()
    }

    fn kind(&self) -> BackendKind {
        match self {
            Backend::Files(_) => BackendKind::Files,
            Backend::Sqlite(_) => BackendKind::Sqlite,
            Backend::Vector(_) => BackendKind::Vector,
            Backend::Hybrid(_) => BackendKind::Hybrid,
        }
    }

    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        self.knowledge().health_check().await
    }
}

#[async_trait]
impl ContextProvider for Backend {
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError> {
        self.knowledge().get_catalog(domain).await
    }

    async fn get_domain_index(&self, domain: &str) -> Result<DomainIndex, StrataError> {
        self.knowledge().get_domain_index(domain).await
    }

    async fn get_loading_protocol(&self) -> Result<String, StrataError> {
        self.knowledge().get_loading_protocol().await
    }

    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError> {
        self.knowledge().get_reference(domain, file).await
    }

    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        self.knowledge().materialize(reference).await
    }

    async fn materialize_sections(
        &self,
        reference: &KnowledgeReference,
        names: &[String],
    ) -> Result<String, StrataError> {
        self.knowledge().materialize_sections(reference, names).await
    }

    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError> {
        self.knowledge().search(query, domain).await
    }
}

#[async_trait]
impl EntryStore for Backend {
    async fn fetch(&self, id: &str) -> Result<Option<MemoryEntry>, StrataError> {
        self.memory().fetch(id).await
    }

    async fn insert(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        self.memory().insert(entry).await
    }

    async fn replace(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        self.memory().replace(entry).await
    }

    async fn remove(&self, id: &str) -> Result<bool, StrataError> {
        self.memory().remove(id).await
    }

    async fn list(&self, filter: &MemoryFilter) -> Result<Vec<MemoryEntry>, StrataError> {
        self.memory().list(filter).await
    }

    async fn search_entries(
        &self,
        pattern: &str,
        filter: &MemoryFilter,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        self.memory().search_entries(pattern, filter).await
    }

    async fn apply(&self, changes: ChangeSet) -> Result<(), StrataError> {
        self.memory().apply(changes).await
    }

    async fn prune_history(&self, entry_id: Option<&str>) -> Result<Vec<PruneRecord>, StrataError> {
        self.memory().prune_history(entry_id).await
    }

    fn history_is_recoverable(&self) -> bool {
        self.memory().history_is_recoverable()
    }
}
