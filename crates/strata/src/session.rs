// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One caller session: a fresh knowledge cache plus the memory service.

use std::sync::Arc;

use strata_cache::{CacheStats, TieredCache};
use strata_config::StrataConfig;
use strata_core::{Clock, StrataError};
use strata_memory::MemoryService;
use strata_prune::PruneEngine;
use strata_router::RemoteSource;
use tracing::info;

use crate::backend::Backend;

/// Session-scoped view of a backend.
///
/// The cache starts empty and is emptied by [`Session::end`]; a new session
/// always re-reads knowledge from the backend. Memory writes go straight to
/// the backend through [`MemoryService`].
pub struct Session {
    backend: Arc<Backend>,
    cache: TieredCache<Backend>,
    memory: MemoryService<Backend>,
}

impl Session {
    pub fn new(backend: Arc<Backend>, engine: PruneEngine, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: TieredCache::new(Arc::clone(&backend), Arc::clone(&clock)),
            memory: MemoryService::new(Arc::clone(&backend), engine, clock),
            backend,
        }
    }

    /// Open the configured backend and start a session on it.
    pub async fn open(
        config: &StrataConfig,
        clock: Arc<dyn Clock>,
        remote: Option<Arc<dyn RemoteSource>>,
    ) -> Result<Self, StrataError> {
        let backend = Backend::from_config(config, Arc::clone(&clock), remote).await?;
        Ok(Self::new(
            Arc::new(backend),
            PruneEngine::from_config(&config.pruning),
            clock,
        ))
    }

    /// Cached knowledge reads.
    pub fn knowledge(&self) -> &TieredCache<Backend> {
        &self.cache
    }

    pub fn memory(&self) -> &MemoryService<Backend> {
        &self.memory
    }

    pub fn backend(&self) -> &Arc<Backend> {
        &self.backend
    }

    /// Tear the session down: report and drop every cached tier, then let
    /// the backend flush.
    pub async fn end(self) -> Result<CacheStats, StrataError> {
        let stats = self.cache.stats().await;
        self.cache.clear().await;
        info!(
            catalog_hits = stats.catalog.hits,
            reference_hits = stats.reference.hits,
            content_hits = stats.content.hits,
            content_misses = stats.content.misses,
            "session ended"
        );
        self.backend.close().await?;
        Ok(stats)
    }
}
