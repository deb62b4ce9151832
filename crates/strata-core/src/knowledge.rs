// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge reference and domain index types served by context providers.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::StrataError;
use crate::staleness::Staleness;

/// Role of a knowledge file within its domain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeKind {
    Index,
    Detection,
    #[default]
    Reference,
}

/// When a file is pulled into context.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum LoadingStrategy {
    #[strum(serialize = "always")]
    Always,
    #[default]
    #[strum(to_string = "onDemand", serialize = "on-demand", serialize = "ondemand")]
    OnDemand,
}

/// Metadata describing one knowledge file. Never carries body text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeReference {
    /// `{domain}/{file}`.
    pub id: String,
    pub domain: String,
    /// File stem without extension.
    pub file: String,
    pub title: String,
    pub kind: KnowledgeKind,
    pub estimated_tokens: u32,
    pub loading_strategy: LoadingStrategy,
    pub version: Option<String>,
    pub last_updated: Option<NaiveDate>,
    pub tags: BTreeSet<String>,
    pub sections: Vec<String>,
    /// Project types this file is conditionally loaded for.
    pub applies_to: BTreeSet<String>,
    /// Detection rules, only populated on `detection` files.
    pub project_types: Vec<ProjectTypeRule>,
}

impl KnowledgeReference {
    /// Composite id for a domain and file stem.
    pub fn make_id(domain: &str, file: &str) -> String {
        format!("{domain}/{file}")
    }

    /// Split `domain/file` into its two halves.
    pub fn split_id(id: &str) -> Result<(&str, &str), StrataError> {
        match id.split_once('/') {
            Some((domain, file)) if !domain.is_empty() && !file.is_empty() && !file.contains('/') => {
                Ok((domain, file))
            }
            _ => Err(StrataError::InvalidKey(format!(
                "knowledge id `{id}` must have the form domain/file"
            ))),
        }
    }

    /// Freshness of this file's content as of `today`.
    pub fn staleness(&self, today: NaiveDate) -> Staleness {
        crate::staleness::classify(self.last_updated, today)
    }
}

/// Indicator set identifying a project type within a detection file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTypeRule {
    pub name: String,
    #[serde(default)]
    pub indicators: Vec<String>,
}

/// A rule that pulls a file from another domain when a trigger is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossDomainRule {
    pub trigger: String,
    /// `domain/file` of the target.
    pub target: String,
}

/// A domain's index file plus the references of every file in the domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainIndex {
    pub domain: String,
    pub reference: KnowledgeReference,
    /// All non-index files, sorted by id.
    pub files: Vec<KnowledgeReference>,
    pub cross_domain: Vec<CrossDomainRule>,
}

impl DomainIndex {
    /// Build an index around its own reference. The index file itself is
    /// dropped from `files` and the rest are sorted by id.
    pub fn assemble(
        reference: KnowledgeReference,
        files: impl IntoIterator<Item = KnowledgeReference>,
        cross_domain: Vec<CrossDomainRule>,
    ) -> Self {
        let mut files: Vec<KnowledgeReference> = files
            .into_iter()
            .filter(|r| r.id != reference.id)
            .collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            domain: reference.domain.clone(),
            reference,
            files,
            cross_domain,
        }
    }

    pub fn file(&self, file: &str) -> Option<&KnowledgeReference> {
        self.files.iter().find(|r| r.file == file)
    }

    pub fn always_load(&self) -> impl Iterator<Item = &KnowledgeReference> {
        self.files
            .iter()
            .filter(|r| r.loading_strategy == LoadingStrategy::Always)
    }

    pub fn detection_files(&self) -> impl Iterator<Item = &KnowledgeReference> {
        self.files
            .iter()
            .filter(|r| r.kind == KnowledgeKind::Detection)
    }
}

/// One line of the catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub domain: String,
    pub title: String,
    pub file_count: usize,
    pub estimated_tokens: u64,
    pub last_updated: Option<NaiveDate>,
}

/// Domain-level listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub domains: Vec<DomainSummary>,
}

impl Catalog {
    /// Summarise a set of domain indexes, sorted by domain name.
    pub fn from_indexes<'a>(indexes: impl IntoIterator<Item = &'a DomainIndex>) -> Self {
        let mut domains: Vec<DomainSummary> = indexes
            .into_iter()
            .map(|index| DomainSummary {
                domain: index.domain.clone(),
                title: index.reference.title.clone(),
                file_count: index.files.len(),
                estimated_tokens: index
                    .files
                    .iter()
                    .map(|r| u64::from(r.estimated_tokens))
                    .sum(),
                last_updated: index
                    .files
                    .iter()
                    .filter_map(|r| r.last_updated)
                    .chain(index.reference.last_updated)
                    .max(),
            })
            .collect();
        domains.sort_by(|a, b| a.domain.cmp(&b.domain));
        Self { domains }
    }
}

/// Outcome of matching caller signals against a domain's detection rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub domain: String,
    /// Matched project types, best match first.
    pub project_types: Vec<DetectedType>,
}

impl DetectionResult {
    pub fn is_empty(&self) -> bool {
        self.project_types.is_empty()
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.project_types.iter().map(|t| t.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedType {
    pub name: String,
    pub matched_indicators: Vec<String>,
    /// Detection file that declared the type.
    pub source: String,
}

/// A reference paired with its materialized body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedContext {
    pub reference: KnowledgeReference,
    pub content: String,
}

/// Search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredReference {
    pub reference: KnowledgeReference,
    pub score: f32,
}

/// Sort hits by descending score, breaking ties on id so results are stable.
pub fn rank(mut hits: Vec<ScoredReference>) -> Vec<ScoredReference> {
    hits.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.reference.id.cmp(&b.reference.id))
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn split_id_requires_two_segments() {
        assert_eq!(KnowledgeReference::split_id("python/django").unwrap(), ("python", "django"));
        assert!(KnowledgeReference::split_id("python").is_err());
        assert!(KnowledgeReference::split_id("/django").is_err());
        assert!(KnowledgeReference::split_id("a/b/c").is_err());
    }

    #[test]
    fn loading_strategy_parses_spellings() {
        assert_eq!(LoadingStrategy::from_str("always").unwrap(), LoadingStrategy::Always);
        assert_eq!(LoadingStrategy::from_str("onDemand").unwrap(), LoadingStrategy::OnDemand);
        assert_eq!(LoadingStrategy::from_str("on-demand").unwrap(), LoadingStrategy::OnDemand);
        assert_eq!(KnowledgeKind::from_str("Detection").unwrap(), KnowledgeKind::Detection);
    }

    #[test]
    fn rank_orders_by_score_then_id() {
        let mk = |id: &str, score: f32| ScoredReference {
            reference: KnowledgeReference {
                id: id.into(),
                domain: "d".into(),
                file: id.into(),
                title: id.into(),
                kind: KnowledgeKind::Reference,
                estimated_tokens: 1,
                loading_strategy: LoadingStrategy::OnDemand,
                version: None,
                last_updated: None,
                tags: BTreeSet::new(),
                sections: vec![],
                applies_to: BTreeSet::new(),
                project_types: vec![],
            },
            score,
        };
        let ranked = rank(vec![mk("b", 1.0), mk("c", 2.0), mk("a", 1.0)]);
        let ids: Vec<_> = ranked.iter().map(|h| h.reference.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn assemble_drops_index_and_sorts() {
        let mk = |file: &str, kind: KnowledgeKind| KnowledgeReference {
            id: KnowledgeReference::make_id("python", file),
            domain: "python".into(),
            file: file.into(),
            title: file.into(),
            kind,
            estimated_tokens: 1,
            loading_strategy: LoadingStrategy::OnDemand,
            version: None,
            last_updated: None,
            tags: BTreeSet::new(),
            sections: vec![],
            applies_to: BTreeSet::new(),
            project_types: vec![],
        };
        let index = DomainIndex::assemble(
            mk("index", KnowledgeKind::Index),
            [
                mk("style", KnowledgeKind::Reference),
                mk("index", KnowledgeKind::Index),
                mk("detection", KnowledgeKind::Detection),
            ],
            vec![],
        );
        assert_eq!(index.domain, "python");
        let files: Vec<_> = index.files.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, ["detection", "style"]);
        assert_eq!(index.detection_files().count(), 1);
    }
}
