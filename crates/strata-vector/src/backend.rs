// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `VectorBackend`: entries, prune history and knowledge held in process
//! alongside their embeddings.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use strata_config::model::VectorConfig;
use strata_core::knowledge::rank;
use strata_core::traits::entry_store::content_matches;
use strata_core::{
    BackendAdapter, BackendKind, Catalog, ChangeSet, Clock, ContextProvider, CrossDomainRule,
    DomainIndex, EntryStore, HealthStatus, KnowledgeReference, MemoryEntry, MemoryFilter,
    PruneRecord, ScoredReference, StrataError,
};
use strata_files::KnowledgeTree;
use strata_files::tree::{INDEX_FILE, LOADING_PROTOCOL_FILE};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::embedding::{Embedder, HashingEmbedder, cosine_similarity};

struct IndexedEntry {
    entry: MemoryEntry,
    embedding: Vec<f32>,
}

struct IndexedDocument {
    reference: KnowledgeReference,
    cross_domain: Vec<CrossDomainRule>,
    body: String,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct State {
    entries: BTreeMap<String, IndexedEntry>,
    history: Vec<PruneRecord>,
    documents: BTreeMap<String, IndexedDocument>,
    loading_protocol: Option<String>,
}

/// Vector-indexed backend.
pub struct VectorBackend {
    embedder: Arc<dyn Embedder>,
    similarity_threshold: f32,
    clock: Arc<dyn Clock>,
    state: RwLock<State>,
}

/// Text embedded for a knowledge file: title, tags, section names and body.
fn document_text(reference: &KnowledgeReference, body: &str) -> String {
    let mut text = reference.title.clone();
    for tag in &reference.tags {
        text.push(' ');
        text.push_str(tag);
    }
    for section in &reference.sections {
        text.push(' ');
        text.push_str(section);
    }
    text.push('\n');
    text.push_str(body);
    text
}

impl VectorBackend {
    pub fn new(config: &VectorConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_embedder(
            Arc::new(HashingEmbedder::new(config.dimensions)),
            config.similarity_threshold,
            clock,
        )
    }

    pub fn with_embedder(
        embedder: Arc<dyn Embedder>,
        similarity_threshold: f32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            embedder,
            similarity_threshold,
            clock,
            state: RwLock::new(State::default()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Replace the held knowledge with `tree`, embedding every document.
    pub async fn import_knowledge(&self, tree: &KnowledgeTree) -> usize {
        let documents: BTreeMap<String, IndexedDocument> = tree
            .documents
            .iter()
            .map(|doc| {
                let embedding = self.embedder.embed(&document_text(&doc.reference, &doc.body));
                (
                    doc.reference.id.clone(),
                    IndexedDocument {
                        reference: doc.reference.clone(),
                        cross_domain: doc.cross_domain.clone(),
                        body: doc.body.clone(),
                        embedding,
                    },
                )
            })
            .collect();
        let count = documents.len();
        let mut state = self.state.write().await;
        state.documents = documents;
        state.loading_protocol = tree.loading_protocol.clone();
        info!(files = count, dimensions = self.dimensions(), "knowledge embedded");
        count
    }

    /// Scan a context directory and import it.
    pub async fn import_tree(&self, context_dir: &std::path::Path) -> Result<usize, StrataError> {
        let tree = strata_files::scan_tree(context_dir).await?;
        Ok(self.import_knowledge(&tree).await)
    }

    /// Entries inside `filter` ranked by cosine similarity to `query`, best
    /// first, keeping only those at or above the similarity threshold.
    pub async fn semantic_search(
        &self,
        query: &str,
        filter: &MemoryFilter,
        limit: usize,
    ) -> Vec<(MemoryEntry, f32)> {
        let query = self.embedder.embed(query);
        let today = self.clock.today();
        let state = self.state.read().await;
        let mut hits: Vec<(MemoryEntry, f32)> = state
            .entries
            .values()
            .filter(|e| filter.matches(&e.entry.key))
            .filter_map(|e| {
                let similarity = cosine_similarity(&query, &e.embedding);
                (similarity >= self.similarity_threshold)
                    .then(|| (e.entry.clone().refresh(today), similarity))
            })
            .collect();
        hits.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.id.cmp(&b.0.id)));
        hits.truncate(limit);
        hits
    }

    fn index(&self, entry: MemoryEntry) -> IndexedEntry {
        IndexedEntry {
            embedding: self.embedder.embed(&entry.content),
            entry,
        }
    }
}

#[async_trait]
impl BackendAdapter for VectorBackend {
    fn name(&self) -> &str {
        "vector"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Vector
    }

    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl EntryStore for VectorBackend {
    async fn fetch(&self, id: &str) -> Result<Option<MemoryEntry>, StrataError> {
        let today = self.clock.today();
        Ok(self
            .state
            .read()
            .await
            .entries
            .get(id)
            .map(|e| e.entry.clone().refresh(today)))
    }

    async fn insert(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        let indexed = self.index(entry);
        let mut state = self.state.write().await;
        if state.entries.contains_key(&indexed.entry.id) {
            return Err(StrataError::AlreadyExists {
                id: indexed.entry.id,
            });
        }
        state.entries.insert(indexed.entry.id.clone(), indexed);
        Ok(())
    }

    async fn replace(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        let indexed = self.index(entry);
        let mut state = self.state.write().await;
        match state.entries.get_mut(&indexed.entry.id) {
            Some(slot) => {
                *slot = indexed;
                Ok(())
            }
            None => Err(StrataError::entry_not_found(indexed.entry.id)),
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
            .filter(|e| filter.matches(&e.entry.key))
            .map(|e| e.entry.clone().refresh(today))
            .collect())
    }

    async fn search_entries(
        &self,
        pattern: &str,
        filter: &MemoryFilter,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        let today = self.clock.today();
        Ok(self
            .state
            .read()
            .await
            .entries
            .values()
            .filter(|e| filter.matches(&e.entry.key) && content_matches(&e.entry.content, pattern))
            .map(|e| e.entry.clone().refresh(today))
            .collect())
    }

    async fn apply(&self, changes: ChangeSet) -> Result<(), StrataError> {
        changes.ensure_committable()?;
        // Embed outside the write lock.
        let indexed: Vec<IndexedEntry> = changes.upserts.into_iter().map(|e| self.index(e)).collect();
        let mut state = self.state.write().await;
        let upserts = indexed.len();
        for entry in indexed {
            state.entries.insert(entry.entry.id.clone(), entry);
        }
        let records = changes.records.len();
        state.history.extend(changes.records);
        debug!(upserts, records, "changeset applied");
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
}

#[async_trait]
impl ContextProvider for VectorBackend {
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError> {
        let domains: Vec<String> = match domain {
            Some(d) => vec![d.to_string()],
            None => {
                let state = self.state.read().await;
                let domains: BTreeSet<String> =
                    state.documents.values().map(|d| d.reference.domain.clone()).collect();
                domains.into_iter().collect()
            }
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
        let state = self.state.read().await;
        let index_id = KnowledgeReference::make_id(domain, INDEX_FILE);
        let Some(index) = state.documents.get(&index_id) else {
            return Err(StrataError::knowledge_not_found(index_id));
        };
        Ok(DomainIndex::assemble(
            index.reference.clone(),
            state
                .documents
                .values()
                .filter(|d| d.reference.domain == domain)
                .map(|d| d.reference.clone()),
            index.cross_domain.clone(),
        ))
    }

    async fn get_loading_protocol(&self) -> Result<String, StrataError> {
        self.state
            .read()
            .await
            .loading_protocol
            .clone()
            .ok_or_else(|| StrataError::knowledge_not_found(LOADING_PROTOCOL_FILE))
    }

    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError> {
        let id = KnowledgeReference::make_id(domain, file);
        self.state
            .read()
            .await
            .documents
            .get(&id)
            .map(|d| d.reference.clone())
            .ok_or_else(|| StrataError::knowledge_not_found(id))
    }

    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        self.state
            .read()
            .await
            .documents
            .get(&reference.id)
            .map(|d| d.body.clone())
            .ok_or_else(|| StrataError::knowledge_not_found(reference.id.clone()))
    }

    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed(query);
        let state = self.state.read().await;
        let hits = state
            .documents
            .values()
            .filter(|d| domain.is_none_or(|dom| d.reference.domain == dom))
            .filter_map(|d| {
                let score = cosine_similarity(&query, &d.embedding);
                (score >= self.similarity_threshold && score > 0.0).then(|| ScoredReference {
                    reference: d.reference.clone(),
                    score,
                })
            })
            .collect();
        Ok(rank(hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use strata_core::{FixedClock, MemoryKey, PruneAction};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    fn backend() -> VectorBackend {
        VectorBackend::new(&VectorConfig::default(), Arc::new(FixedClock(today())))
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let b = backend();
        let e = MemoryEntry::new(MemoryKey::shared("acme", "notes"), "x", today());
        b.insert(e.clone()).await.unwrap();
        assert!(matches!(b.insert(e).await, Err(StrataError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn replace_requires_existing_entry() {
        let b = backend();
        let e = MemoryEntry::new(MemoryKey::shared("acme", "notes"), "x", today());
        assert!(matches!(b.replace(e).await, Err(StrataError::NotFound { .. })));
    }

    #[tokio::test]
    async fn semantic_search_ranks_by_similarity() {
        let b = backend();
        for (file_type, content) in [
            ("stack", "The service uses PostgreSQL with pgbouncer pooling"),
            ("ci", "CI runs lint then unit tests on every push"),
        ] {
            b.insert(MemoryEntry::new(MemoryKey::shared("acme", file_type), content, today()))
                .await
                .unwrap();
        }
        let hits = b
            .semantic_search("postgresql pooling", &MemoryFilter::project("acme"), 5)
            .await;
        assert_eq!(hits[0].0.id, "projects/acme/stack");
        assert!(hits.iter().all(|(_, s)| *s >= 0.1));
    }

    #[tokio::test]
    async fn apply_appends_history() {
        let b = backend();
        let record = PruneRecord {
            entry_id: "projects/acme/notes".into(),
            action: PruneAction::Flagged,
            reason: "test".into(),
            pruned_at: today(),
            content_snapshot: None,
        };
        b.apply(ChangeSet {
            upserts: vec![],
            records: vec![record.clone()],
            dry_run: false,
        })
        .await
        .unwrap();
        assert_eq!(b.prune_history(None).await.unwrap(), [record]);
        assert!(b.prune_history(Some("other")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_reports_identity() {
        let b = backend();
        assert_eq!(b.name(), "vector");
        assert_eq!(b.kind(), BackendKind::Vector);
        assert_eq!(b.dimensions(), 256);
        assert_eq!(b.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
