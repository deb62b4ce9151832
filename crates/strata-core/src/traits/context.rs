// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge half of the backend contract.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StrataError;
use crate::knowledge::{
    Catalog, DetectedType, DetectionResult, DomainIndex, KnowledgeReference, LoadedContext,
    ScoredReference,
};
use crate::markdown::extract_sections;
use crate::traits::adapter::BackendAdapter;

/// Read access to a tree of knowledge domains.
///
/// Implementors supply the storage-facing methods. The selection methods
/// (`get_always_load_files`, `detect_project_type`, `get_conditional_context`,
/// `get_cross_domain_context`) are provided in terms of those, so a wrapper
/// that overrides `get_domain_index` and `materialize` gets caching of the
/// per-file lookups while the selection itself re-runs on every call.
#[async_trait]
pub trait ContextProvider: BackendAdapter {
    /// Domain listing. `Some(domain)` restricts it to that domain.
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError>;

    /// The index of one domain with every file reference it contains.
    async fn get_domain_index(&self, domain: &str) -> Result<DomainIndex, StrataError>;

    /// Body of the top-level loading protocol document.
    async fn get_loading_protocol(&self) -> Result<String, StrataError>;

    /// Metadata for one file. Must not read more than the front matter needs.
    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError>;

    /// Full body text of a file, without front matter.
    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError>;

    /// Only the named `## ` sections of a file, in document order.
    async fn materialize_sections(
        &self,
        reference: &KnowledgeReference,
        names: &[String],
    ) -> Result<String, StrataError> {
        let body = self.materialize(reference).await?;
        Ok(extract_sections(&body, names))
    }

    /// Ranked references matching `query`.
    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError>;

    /// Every `loadingStrategy: always` file of a domain, materialized.
    async fn get_always_load_files(&self, domain: &str) -> Result<Vec<LoadedContext>, StrataError> {
        let index = self.get_domain_index(domain).await?;
        let mut loaded = Vec::new();
        for reference in index.always_load() {
            let content = self.materialize(reference).await?;
            loaded.push(LoadedContext {
                reference: reference.clone(),
                content,
            });
        }
        Ok(loaded)
    }

    /// Match caller signals against the domain's detection rules.
    async fn detect_project_type(
        &self,
        domain: &str,
        signals: &[String],
    ) -> Result<DetectionResult, StrataError> {
        let index = self.get_domain_index(domain).await?;
        Ok(match_detection(&index, signals))
    }

    /// Files whose `appliesTo` names one of the detected project types.
    async fn get_conditional_context(
        &self,
        domain: &str,
        detection: &DetectionResult,
    ) -> Result<Vec<LoadedContext>, StrataError> {
        let index = self.get_domain_index(domain).await?;
        let wanted: BTreeSet<String> = detection.names().iter().map(|n| n.to_lowercase()).collect();
        let mut loaded = Vec::new();
        for reference in index
            .files
            .iter()
            .filter(|r| !r.applies_to.is_disjoint(&wanted))
        {
            let content = self.materialize(reference).await?;
            loaded.push(LoadedContext {
                reference: reference.clone(),
                content,
            });
        }
        Ok(loaded)
    }

    /// Files from other domains pulled in by the index's cross-domain rules.
    ///
    /// Self-referential and dangling targets are skipped with a warning.
    async fn get_cross_domain_context(
        &self,
        domain: &str,
        triggers: &[String],
    ) -> Result<Vec<LoadedContext>, StrataError> {
        let index = self.get_domain_index(domain).await?;
        let mut seen = BTreeSet::new();
        let mut loaded = Vec::new();
        for rule in &index.cross_domain {
            if !triggers.iter().any(|t| t.eq_ignore_ascii_case(&rule.trigger)) {
                continue;
            }
            let (target_domain, target_file) = match KnowledgeReference::split_id(&rule.target) {
                Ok(parts) => parts,
                Err(e) => {
                    warn!(domain, target = %rule.target, error = %e, "skipping malformed cross-domain target");
                    continue;
                }
            };
            if target_domain == domain {
                warn!(domain, target = %rule.target, "skipping self-referential cross-domain rule");
                continue;
            }
            if !seen.insert(rule.target.clone()) {
                continue;
            }
            let reference = match self.get_reference(target_domain, target_file).await {
                Ok(reference) => reference,
                Err(StrataError::NotFound { .. }) => {
                    warn!(domain, target = %rule.target, "cross-domain target does not exist");
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!(domain, trigger = %rule.trigger, target = %rule.target, "cross-domain rule fired");
            let content = self.materialize(&reference).await?;
            loaded.push(LoadedContext { reference, content });
        }
        Ok(loaded)
    }
}

/// Score every project type declared by the index's detection files.
///
/// An indicator matches a signal when the signal contains it, ignoring case.
/// Types are ordered by match count, then by name.
pub fn match_detection(index: &DomainIndex, signals: &[String]) -> DetectionResult {
    let signals: Vec<String> = signals.iter().map(|s| s.to_lowercase()).collect();
    let mut types: Vec<DetectedType> = Vec::new();
    for file in index.detection_files() {
        for rule in &file.project_types {
            let matched: Vec<String> = rule
                .indicators
                .iter()
                .filter(|indicator| {
                    let needle = indicator.to_lowercase();
                    !needle.is_empty() && signals.iter().any(|s| s.contains(&needle))
                })
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }
            types.push(DetectedType {
                name: rule.name.clone(),
                matched_indicators: matched,
                source: file.id.clone(),
            });
        }
    }
    types.sort_by(|a, b| {
        b.matched_indicators
            .len()
            .cmp(&a.matched_indicators.len())
            .then_with(|| a.name.cmp(&b.name))
    });
    DetectionResult {
        domain: index.domain.clone(),
        project_types: types,
    }
}
