// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ContextProvider` over the markdown knowledge tree.

use async_trait::async_trait;
use strata_core::knowledge::rank;
use strata_core::{
    Catalog, ContextProvider, DomainIndex, KnowledgeReference, ScoredReference, StrataError,
};
use tracing::{debug, warn};

use crate::backend::FileBackend;
use crate::tree::{self, INDEX_FILE, StoredDocument};

/// Keyword relevance of one document: title hits weigh most, then tags,
/// then section headings, then the body.
pub(crate) fn keyword_score(doc: &StoredDocument, query: &str) -> f32 {
    let title = doc.reference.title.to_lowercase();
    let headings: Vec<String> = doc
        .reference
        .sections
        .iter()
        .map(|s| s.to_lowercase())
        .collect();
    let body = doc.body.to_lowercase();
    let mut score = 0.0;
    for term in query.split_whitespace().map(str::to_lowercase) {
        if title.contains(&term) {
            score += 3.0;
        }
        if doc.reference.tags.iter().any(|t| t.eq_ignore_ascii_case(&term)) {
            score += 2.0;
        }
        if headings.iter().any(|h| h.contains(&term)) {
            score += 1.5;
        }
        if body.contains(&term) {
            score += 1.0;
        }
    }
    score
}

impl FileBackend {
    async fn domain_documents(&self, domain: &str) -> Result<Vec<StoredDocument>, StrataError> {
        let mut docs = Vec::new();
        for file in tree::list_files(&self.context_dir, domain).await? {
            docs.push(tree::read_document(&self.context_dir, domain, &file).await?);
        }
        Ok(docs)
    }
}

#[async_trait]
impl ContextProvider for FileBackend {
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError> {
        let domains = match domain {
            Some(d) => vec![d.to_string()],
            None => tree::list_domains(&self.context_dir).await?,
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
        let docs = self.domain_documents(domain).await?;
        let Some(index) = docs.iter().find(|d| d.reference.file == INDEX_FILE) else {
            return Err(StrataError::knowledge_not_found(KnowledgeReference::make_id(
                domain, INDEX_FILE,
            )));
        };
        let reference = index.reference.clone();
        let cross_domain = index.cross_domain.clone();
        debug!(domain, files = docs.len(), "domain index read from disk");
        Ok(DomainIndex::assemble(
            reference,
            docs.into_iter().map(|d| d.reference),
            cross_domain,
        ))
    }

    async fn get_loading_protocol(&self) -> Result<String, StrataError> {
        tree::read_loading_protocol(&self.context_dir)
            .await?
            .ok_or_else(|| StrataError::knowledge_not_found(tree::LOADING_PROTOCOL_FILE))
    }

    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError> {
        Ok(tree::read_document(&self.context_dir, domain, file)
            .await?
            .reference)
    }

    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        let doc = tree::read_document(&self.context_dir, &reference.domain, &reference.file).await?;
        Ok(doc.body)
    }

    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError> {
        let domains = match domain {
            Some(d) => vec![d.to_string()],
            None => tree::list_domains(&self.context_dir).await?,
        };
        let mut hits = Vec::new();
        for d in &domains {
            for doc in self.domain_documents(d).await? {
                let score = keyword_score(&doc, query);
                if score > 0.0 {
                    hits.push(ScoredReference {
                        reference: doc.reference,
                        score,
                    });
                }
            }
        }
        Ok(rank(hits))
    }
}
