// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tiered cache and its invalidation rules.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use strata_core::markdown::extract_sections;
use strata_core::{
    BackendAdapter, BackendKind, Catalog, Clock, ContextProvider, DomainIndex, HealthStatus,
    KnowledgeReference, ScoredReference, Staleness, StrataError,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::stats::{CacheStats, Counters, Tier};

/// Key of a Tier 3 slot: a file id plus the section filter, if any.
///
/// Section names are normalized (trimmed, lowercased, sorted, deduplicated)
/// so that equivalent requests share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub id: String,
    pub sections: Option<Vec<String>>,
}

impl ContentKey {
    pub fn full(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sections: None,
        }
    }

    pub fn sections(id: impl Into<String>, names: &[String]) -> Self {
        let mut sections: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
        sections.sort();
        sections.dedup();
        Self {
            id: id.into(),
            sections: Some(sections),
        }
    }

    fn in_domain(&self, domain: &str) -> bool {
        in_domain(&self.id, domain)
    }
}

fn in_domain(id: &str, domain: &str) -> bool {
    KnowledgeReference::split_id(id).is_ok_and(|(d, _)| d == domain)
}

/// Tier 1 contents.
///
/// `generation` moves on every invalidation. A fill started under an older
/// generation raced an invalidation and is dropped instead of stored.
#[derive(Debug, Default)]
struct CatalogTier {
    catalogs: HashMap<Option<String>, Catalog>,
    indexes: HashMap<String, DomainIndex>,
    loading_protocol: Option<String>,
    generation: u64,
}

impl CatalogTier {
    fn len(&self) -> usize {
        self.catalogs.len() + self.indexes.len() + usize::from(self.loading_protocol.is_some())
    }

    /// Drop everything describing `domain`. The unscoped catalog lists every
    /// domain, so it goes too. The loading protocol belongs to no domain.
    fn remove_domain(&mut self, domain: &str) {
        self.generation += 1;
        self.catalogs.remove(&Some(domain.to_string()));
        self.catalogs.remove(&None);
        self.indexes.remove(domain);
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.catalogs.clear();
        self.indexes.clear();
        self.loading_protocol = None;
    }
}

/// Tier 2 and Tier 3 storage, with the same generation rule as Tier 1.
#[derive(Debug)]
struct Slots<K, V> {
    map: HashMap<K, V>,
    generation: u64,
}

impl<K, V> Default for Slots<K, V> {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            generation: 0,
        }
    }
}

impl<K: Eq + Hash, V: Clone> Slots<K, V> {
    fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.map.get(key).cloned()
    }

    /// Store `value` unless an invalidation ran since `generation` was read.
    fn fill(&mut self, generation: u64, key: K, value: V) -> bool {
        if self.generation != generation {
            return false;
        }
        self.map.insert(key, value);
        true
    }

    fn retain(&mut self, keep: impl FnMut(&K, &mut V) -> bool) {
        self.generation += 1;
        self.map.retain(keep);
    }

    fn clear(&mut self) {
        self.generation += 1;
        self.map.clear();
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// A materialized file together with its freshness at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedContent {
    pub reference: KnowledgeReference,
    pub content: String,
    pub staleness: Staleness,
}

/// Session-scoped cache in front of one knowledge provider.
///
/// `detect_project_type` and `search` always reach the provider. The
/// selection methods (`get_always_load_files`, `get_conditional_context`,
/// `get_cross_domain_context`) re-run their matching on every call and only
/// the per-file lookups they make are served from the tiers.
///
/// Provider reads happen outside the tier locks. A read that overlaps an
/// invalidation of its tier is returned to its caller but not stored.
pub struct TieredCache<P: ?Sized> {
    inner: Arc<P>,
    clock: Arc<dyn Clock>,
    catalog: RwLock<CatalogTier>,
    references: RwLock<Slots<String, KnowledgeReference>>,
    content: RwLock<Slots<ContentKey, String>>,
    counters: Counters,
}

impl<P: ContextProvider + ?Sized> TieredCache<P> {
    /// An empty cache in front of `inner`. The provider may be shared with
    /// other owners, such as a memory service over the same backend.
    pub fn new(inner: Arc<P>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            clock,
            catalog: RwLock::new(CatalogTier::default()),
            references: RwLock::new(Slots::default()),
            content: RwLock::new(Slots::default()),
            counters: Counters::default(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Hit/miss counters and entry counts per tier.
    pub async fn stats(&self) -> CacheStats {
        let catalog = self.catalog.read().await.len();
        let references = self.references.read().await.len();
        let content = self.content.read().await.len();
        self.counters.snapshot(catalog, references, content)
    }

    /// Freshness of a reference as of the cache's clock.
    pub fn freshness(&self, reference: &KnowledgeReference) -> Staleness {
        reference.staleness(self.clock.today())
    }

    /// Reference, full body and freshness of one file, through Tiers 2 and 3.
    pub async fn load(&self, domain: &str, file: &str) -> Result<CachedContent, StrataError> {
        let reference = self.get_reference(domain, file).await?;
        let content = self.materialize(&reference).await?;
        let staleness = self.freshness(&reference);
        Ok(CachedContent {
            reference,
            content,
            staleness,
        })
    }

    /// Drop cached state.
    ///
    /// - no arguments: every tier is emptied
    /// - `domain`: that domain's slice of all three tiers
    /// - `domain` and `file`: Tiers 2 and 3 for that file only; catalog
    ///   membership has not changed, so Tier 1 is kept
    ///
    /// A file without a domain cannot be resolved and is rejected.
    pub async fn invalidate(
        &self,
        domain: Option<&str>,
        file: Option<&str>,
    ) -> Result<(), StrataError> {
        match (domain, file) {
            (None, None) => {
                self.empty_tiers().await;
                info!("cache invalidated");
            }
            (Some(domain), None) => {
                self.catalog.write().await.remove_domain(domain);
                self.references
                    .write()
                    .await
                    .retain(|id, _| !in_domain(id, domain));
                self.content.write().await.retain(|key, _| !key.in_domain(domain));
                info!(domain, "cache invalidated for domain");
            }
            (Some(domain), Some(file)) => {
                let id = KnowledgeReference::make_id(domain, file);
                self.references.write().await.retain(|key, _| *key != id);
                self.content.write().await.retain(|key, _| key.id != id);
                info!(domain, file, "cache invalidated for file");
            }
            (None, Some(file)) => {
                return Err(StrataError::InvalidKey(format!(
                    "cannot invalidate file `{file}` without its domain"
                )));
            }
        }
        Ok(())
    }

    /// End of session: empty every tier and reset the counters.
    pub async fn clear(&self) {
        self.empty_tiers().await;
        self.counters.reset();
        debug!("cache cleared");
    }

    async fn empty_tiers(&self) {
        self.catalog.write().await.clear();
        self.references.write().await.clear();
        self.content.write().await.clear();
    }

    fn record(&self, tier: Tier, hit: bool, key: &str) {
        let counters = self.counters.tier(tier);
        if hit {
            counters.hit();
        } else {
            counters.miss();
        }
        debug!(tier = %tier, key, hit, "cache lookup");
    }

    fn discarded(&self, tier: Tier, key: &str) {
        debug!(tier = %tier, key, "fill raced an invalidation, not stored");
    }

    async fn remember_reference(&self, generation: u64, reference: &KnowledgeReference) {
        let mut references = self.references.write().await;
        if references.map.contains_key(&reference.id) {
            return;
        }
        if !references.fill(generation, reference.id.clone(), reference.clone()) {
            self.discarded(Tier::Reference, &reference.id);
        }
    }

    async fn reference_generation(&self) -> u64 {
        self.references.read().await.generation
    }
}

#[async_trait]
impl<P: ContextProvider + ?Sized> BackendAdapter for TieredCache<P> {
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
impl<P: ContextProvider + ?Sized> ContextProvider for TieredCache<P> {
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError> {
        let key = domain.map(str::to_string);
        let (cached, generation) = {
            let tier = self.catalog.read().await;
            (tier.catalogs.get(&key).cloned(), tier.generation)
        };
        self.record(Tier::Catalog, cached.is_some(), domain.unwrap_or("*"));
        if let Some(catalog) = cached {
            return Ok(catalog);
        }
        let catalog = self.inner.get_catalog(domain).await?;
        let mut tier = self.catalog.write().await;
        if tier.generation == generation {
            tier.catalogs.insert(key, catalog.clone());
        } else {
            self.discarded(Tier::Catalog, domain.unwrap_or("*"));
        }
        Ok(catalog)
    }

    async fn get_domain_index(&self, domain: &str) -> Result<DomainIndex, StrataError> {
        let (cached, generation) = {
            let tier = self.catalog.read().await;
            (tier.indexes.get(domain).cloned(), tier.generation)
        };
        self.record(Tier::Catalog, cached.is_some(), domain);
        if let Some(index) = cached {
            return Ok(index);
        }
        let index = self.inner.get_domain_index(domain).await?;
        let mut tier = self.catalog.write().await;
        if tier.generation == generation {
            tier.indexes.insert(domain.to_string(), index.clone());
        } else {
            self.discarded(Tier::Catalog, domain);
        }
        Ok(index)
    }

    async fn get_loading_protocol(&self) -> Result<String, StrataError> {
        let (cached, generation) = {
            let tier = self.catalog.read().await;
            (tier.loading_protocol.clone(), tier.generation)
        };
        self.record(Tier::Catalog, cached.is_some(), "loading_protocol");
        if let Some(text) = cached {
            return Ok(text);
        }
        let text = self.inner.get_loading_protocol().await?;
        let mut tier = self.catalog.write().await;
        if tier.generation == generation {
            tier.loading_protocol = Some(text.clone());
        } else {
            self.discarded(Tier::Catalog, "loading_protocol");
        }
        Ok(text)
    }

    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError> {
        let id = KnowledgeReference::make_id(domain, file);
        let (cached, generation) = {
            let references = self.references.read().await;
            (references.get(&id), references.generation)
        };
        self.record(Tier::Reference, cached.is_some(), &id);
        if let Some(reference) = cached {
            return Ok(reference);
        }
        let reference = self.inner.get_reference(domain, file).await?;
        self.remember_reference(generation, &reference).await;
        Ok(reference)
    }

    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        let key = ContentKey::full(reference.id.clone());
        let reference_generation = self.reference_generation().await;
        let (cached, generation) = {
            let content = self.content.read().await;
            (content.get(&key), content.generation)
        };
        self.record(Tier::Content, cached.is_some(), &reference.id);
        if let Some(text) = cached {
            return Ok(text);
        }
        let text = self.inner.materialize(reference).await?;
        if !self.content.write().await.fill(generation, key, text.clone()) {
            self.discarded(Tier::Content, &reference.id);
        }
        self.remember_reference(reference_generation, reference).await;
        Ok(text)
    }

    /// A full body already in Tier 3 is filtered locally instead of asking
    /// the provider again.
    async fn materialize_sections(
        &self,
        reference: &KnowledgeReference,
        names: &[String],
    ) -> Result<String, StrataError> {
        let key = ContentKey::sections(reference.id.clone(), names);
        let reference_generation = self.reference_generation().await;
        let (cached, full, generation) = {
            let content = self.content.read().await;
            (
                content.get(&key),
                content.get(&ContentKey::full(reference.id.clone())),
                content.generation,
            )
        };
        self.record(Tier::Content, cached.is_some(), &reference.id);
        if let Some(text) = cached {
            return Ok(text);
        }
        let text = match full {
            Some(body) => extract_sections(&body, names),
            None => self.inner.materialize_sections(reference, names).await?,
        };
        if !self.content.write().await.fill(generation, key, text.clone()) {
            self.discarded(Tier::Content, &reference.id);
        }
        self.remember_reference(reference_generation, reference).await;
        Ok(text)
    }

    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError> {
        self.inner.search(query, domain).await
    }
}
