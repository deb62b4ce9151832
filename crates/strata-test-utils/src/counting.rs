// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A `ContextProvider` wrapper that counts backend reads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use strata_core::{
    BackendAdapter, BackendKind, Catalog, ContextProvider, DomainIndex, HealthStatus,
    KnowledgeReference, ScoredReference, StrataError,
};

/// Per-method call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    catalog: AtomicUsize,
    domain_index: AtomicUsize,
    loading_protocol: AtomicUsize,
    reference: AtomicUsize,
    materialize: AtomicUsize,
    search: AtomicUsize,
}

impl CallCounts {
    pub fn catalog(&self) -> usize {
        self.catalog.load(Ordering::SeqCst)
    }

    pub fn domain_index(&self) -> usize {
        self.domain_index.load(Ordering::SeqCst)
    }

    pub fn loading_protocol(&self) -> usize {
        self.loading_protocol.load(Ordering::SeqCst)
    }

    pub fn reference(&self) -> usize {
        self.reference.load(Ordering::SeqCst)
    }

    pub fn materialize(&self) -> usize {
        self.materialize.load(Ordering::SeqCst)
    }

    pub fn search(&self) -> usize {
        self.search.load(Ordering::SeqCst)
    }

    /// Sum of every counter.
    pub fn total(&self) -> usize {
        self.catalog()
            + self.domain_index()
            + self.loading_protocol()
            + self.reference()
            + self.materialize()
            + self.search()
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// Delegates to `inner`, counting each storage-facing call.
///
/// The default selection methods are not overridden, so they reach the
/// counters through `get_domain_index` and `materialize` like any caller.
pub struct CountingProvider<P> {
    inner: P,
    counts: Arc<CallCounts>,
}

impl<P: ContextProvider> CountingProvider<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            counts: Arc::new(CallCounts::default()),
        }
    }

    /// Shared handle to the counters; stays valid after the provider moves.
    pub fn counts(&self) -> Arc<CallCounts> {
        Arc::clone(&self.counts)
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: ContextProvider> BackendAdapter for CountingProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl<P: ContextProvider> ContextProvider for CountingProvider<P> {
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError> {
        bump(&self.counts.catalog);
        self.inner.get_catalog(domain).await
    }

    async fn get_domain_index(&self, domain: &str) -> Result<DomainIndex, StrataError> {
        bump(&self.counts.domain_index);
        self.inner.get_domain_index(domain).await
    }

    async fn get_loading_protocol(&self) -> Result<String, StrataError> {
        bump(&self.counts.loading_protocol);
        self.inner.get_loading_protocol().await
    }

    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError> {
        bump(&self.counts.reference);
        self.inner.get_reference(domain, file).await
    }

    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        bump(&self.counts.materialize);
        self.inner.materialize(reference).await
    }

    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError> {
        bump(&self.counts.search);
        self.inner.search(query, domain).await
    }
}
