// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tier behavior over the flat-file backend, observed through read counters.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use strata_cache::TieredCache;
use strata_core::{
    BackendAdapter, BackendKind, Catalog, ContextProvider, DomainIndex, HealthStatus,
    KnowledgeReference, ScoredReference, Staleness, StrataError,
};
use strata_files::FileBackend;
use strata_test_utils::fixtures::knowledge_workspace;
use strata_test_utils::{CallCounts, CountingProvider, clock};
use tokio::sync::{Notify, Semaphore};

type Cache = TieredCache<CountingProvider<FileBackend>>;

fn cached() -> (tempfile::TempDir, Cache, Arc<CallCounts>) {
    let dir = knowledge_workspace().unwrap();
    let files = FileBackend::with_dirs(dir.path().join("context"), dir.path().join("memory"), clock());
    let counting = CountingProvider::new(files);
    let counts = counting.counts();
    (dir, TieredCache::new(Arc::new(counting), clock()), counts)
}

#[tokio::test]
async fn second_materialize_is_served_from_the_cache() {
    let (_dir, cache, counts) = cached();
    let reference = cache.get_reference("python", "django").await.unwrap();
    let first = cache.materialize(&reference).await.unwrap();
    let second = cache.materialize(&reference).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(counts.materialize(), 1);
    let stats = cache.stats().await;
    assert_eq!((stats.content.hits, stats.content.misses), (1, 1));
    assert_eq!(stats.content.entries, 1);
}

#[tokio::test]
async fn selection_reruns_but_file_reads_do_not() {
    let (_dir, cache, counts) = cached();
    for _ in 0..2 {
        let always = cache.get_always_load_files("python").await.unwrap();
        assert_eq!(always[0].reference.id, "python/style");
        let cross = cache
            .get_cross_domain_context("python", &["authentication".into()])
            .await
            .unwrap();
        assert_eq!(cross[0].reference.id, "security/auth");
    }
    assert_eq!(counts.domain_index(), 1);
    assert_eq!(counts.reference(), 1);
    assert_eq!(counts.materialize(), 2);
}

#[tokio::test]
async fn detection_and_search_are_recomputed() {
    let (_dir, cache, counts) = cached();
    let django = cache
        .detect_project_type("python", &["manage.py".into()])
        .await
        .unwrap();
    let fastapi = cache
        .detect_project_type("python", &["uvicorn main:app".into()])
        .await
        .unwrap();
    assert!(django.names().contains("django"));
    assert!(fastapi.names().contains("fastapi"));
    assert_eq!(counts.domain_index(), 1);

    cache.search("django", None).await.unwrap();
    cache.search("django", None).await.unwrap();
    assert_eq!(counts.search(), 2);
}

#[tokio::test]
async fn file_invalidation_leaves_the_catalog_tier() {
    let (dir, cache, counts) = cached();
    let path = dir.path().join("context/python/style.md");
    cache.get_domain_index("python").await.unwrap();
    let before = cache.load("python", "style").await.unwrap();
    assert!(before.content.contains("Use black."));

    let edited = std::fs::read_to_string(&path).unwrap().replace("Use black.", "Use ruff format.");
    std::fs::write(&path, edited).unwrap();
    assert_eq!(cache.load("python", "style").await.unwrap(), before);

    cache.invalidate(Some("python"), Some("style")).await.unwrap();
    let after = cache.load("python", "style").await.unwrap();
    assert!(after.content.contains("Use ruff format."));
    assert_eq!(counts.reference(), 2);
    assert_eq!(counts.materialize(), 2);

    cache.get_domain_index("python").await.unwrap();
    assert_eq!(counts.domain_index(), 1);
}

#[tokio::test]
async fn domain_invalidation_spares_other_domains() {
    let (_dir, cache, counts) = cached();
    cache.get_catalog(None).await.unwrap();
    cache.get_loading_protocol().await.unwrap();
    cache.get_domain_index("python").await.unwrap();
    cache.load("python", "django").await.unwrap();
    cache.load("security", "auth").await.unwrap();

    cache.invalidate(Some("python"), None).await.unwrap();

    cache.load("security", "auth").await.unwrap();
    cache.get_loading_protocol().await.unwrap();
    assert_eq!(counts.materialize(), 2);
    assert_eq!(counts.loading_protocol(), 1);

    cache.get_domain_index("python").await.unwrap();
    cache.get_catalog(None).await.unwrap();
    cache.load("python", "django").await.unwrap();
    assert_eq!(counts.domain_index(), 2);
    assert_eq!(counts.catalog(), 2);
    assert_eq!(counts.materialize(), 3);
}

#[tokio::test]
async fn full_invalidation_and_session_end_empty_every_tier() {
    let (_dir, cache, counts) = cached();
    cache.get_catalog(None).await.unwrap();
    cache.load("python", "django").await.unwrap();
    assert!(cache.stats().await.entries() > 0);

    cache.invalidate(None, None).await.unwrap();
    assert_eq!(cache.stats().await.entries(), 0);
    cache.get_catalog(None).await.unwrap();
    assert_eq!(counts.catalog(), 2);

    cache.clear().await;
    let stats = cache.stats().await;
    assert_eq!(stats.entries(), 0);
    assert_eq!(stats.catalog.hits + stats.catalog.misses, 0);
}

#[tokio::test]
async fn sections_reuse_a_cached_body() {
    let (_dir, cache, counts) = cached();
    let auth = cache.get_reference("security", "auth").await.unwrap();
    let tokens = cache
        .materialize_sections(&auth, &["Tokens".into()])
        .await
        .unwrap();
    assert_eq!(tokens, "## Tokens\nRotate signing keys.\n");
    assert_eq!(counts.materialize(), 1);

    cache.materialize(&auth).await.unwrap();
    assert_eq!(counts.materialize(), 2);
    let passwords = cache
        .materialize_sections(&auth, &["passwords".into()])
        .await
        .unwrap();
    assert!(passwords.starts_with("## Passwords\n"));
    cache
        .materialize_sections(&auth, &[" tokens ".into()])
        .await
        .unwrap();
    assert_eq!(counts.materialize(), 2);
}

#[tokio::test]
async fn load_reports_freshness() {
    let (_dir, cache, _counts) = cached();
    assert_eq!(cache.load("python", "style").await.unwrap().staleness, Staleness::Fresh);
    assert_eq!(cache.load("python", "django").await.unwrap().staleness, Staleness::Aging);
    assert_eq!(cache.load("python", "testing").await.unwrap().staleness, Staleness::Stale);
}

#[tokio::test]
async fn misses_are_not_cached_and_bad_arguments_fail() {
    let (_dir, cache, counts) = cached();
    for _ in 0..2 {
        assert!(matches!(
            cache.get_reference("python", "missing").await,
            Err(StrataError::NotFound { .. })
        ));
    }
    assert_eq!(counts.reference(), 2);
    assert!(matches!(
        cache.invalidate(None, Some("style")).await,
        Err(StrataError::InvalidKey(_))
    ));
}

/// Flat-file provider whose next `materialize` parks after reading the
/// file, until the test releases it.
struct GatedFiles {
    inner: FileBackend,
    armed: AtomicBool,
    entered: Notify,
    release: Semaphore,
}

impl GatedFiles {
    fn new(inner: FileBackend) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }
}

#[async_trait]
impl BackendAdapter for GatedFiles {
    fn name(&self) -> &str {
        "gated"
    }

    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl ContextProvider for GatedFiles {
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError> {
        self.inner.get_catalog(domain).await
    }

    async fn get_domain_index(&self, domain: &str) -> Result<DomainIndex, StrataError> {
        self.inner.get_domain_index(domain).await
    }

    async fn get_loading_protocol(&self) -> Result<String, StrataError> {
        self.inner.get_loading_protocol().await
    }

    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError> {
        self.inner.get_reference(domain, file).await
    }

    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        let body = self.inner.materialize(reference).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release
                .acquire()
                .await
                .map_err(|e| StrataError::Internal(e.to_string()))?
                .forget();
        }
        Ok(body)
    }

    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError> {
        self.inner.search(query, domain).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalidation_during_a_read_is_not_undone() {
    let dir = knowledge_workspace().unwrap();
    let files = FileBackend::with_dirs(dir.path().join("context"), dir.path().join("memory"), clock());
    let provider = Arc::new(GatedFiles::new(files));
    let cache = Arc::new(TieredCache::new(Arc::clone(&provider), clock()));
    let reference = cache.get_reference("python", "style").await.unwrap();

    provider.armed.store(true, Ordering::SeqCst);
    let in_flight = {
        let cache = Arc::clone(&cache);
        let reference = reference.clone();
        tokio::spawn(async move { cache.materialize(&reference).await })
    };
    provider.entered.notified().await;

    let path = dir.path().join("context/python/style.md");
    let edited = std::fs::read_to_string(&path).unwrap().replace("Use black.", "Use ruff.");
    std::fs::write(&path, edited).unwrap();
    cache.invalidate(Some("python"), Some("style")).await.unwrap();
    provider.release.add_permits(1);

    let stale = in_flight.await.unwrap().unwrap();
    assert!(stale.contains("Use black."));
    let stats = cache.stats().await;
    assert_eq!(stats.content.entries, 0);
    assert_eq!(stats.reference.entries, 0);

    let fresh = cache.materialize(&reference).await.unwrap();
    assert!(fresh.contains("Use ruff."));
    assert!(!fresh.contains("Use black."));
}
