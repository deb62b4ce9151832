// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lint checks over one domain of the knowledge tree.

use std::fmt;
use std::path::Path;

use strata_core::{KnowledgeKind, KnowledgeReference, LoadingStrategy, StrataError};

use crate::tree::{self, INDEX_FILE};

/// Upper bound (exclusive) for a believable `estimatedTokens`.
pub const MAX_ESTIMATED_TOKENS: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    MissingIndex,
    IndexKind,
    DomainMismatch,
    TokenEstimate,
    AlwaysLoadKind,
    CrossDomainTarget,
}

/// One problem found in a knowledge file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssue {
    /// `domain/file` of the offending document.
    pub id: String,
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.message)
    }
}

fn issue(id: &str, kind: IssueKind, message: String) -> IntegrityIssue {
    IntegrityIssue {
        id: id.to_string(),
        kind,
        message,
    }
}

/// Check a domain directory. A missing domain is `NotFound`; everything
/// else is reported as issues.
pub async fn validate_domain(
    context_dir: &Path,
    domain: &str,
) -> Result<Vec<IntegrityIssue>, StrataError> {
    let mut issues = Vec::new();
    let mut docs = Vec::new();
    for file in tree::list_files(context_dir, domain).await? {
        docs.push(tree::read_document(context_dir, domain, &file).await?);
    }

    let index_id = KnowledgeReference::make_id(domain, INDEX_FILE);
    match docs.iter().find(|d| d.reference.file == INDEX_FILE) {
        None => issues.push(issue(
            &index_id,
            IssueKind::MissingIndex,
            format!("domain `{domain}` has no {INDEX_FILE}.md"),
        )),
        Some(index) if index.reference.kind != KnowledgeKind::Index => issues.push(issue(
            &index_id,
            IssueKind::IndexKind,
            format!("index declares type `{}`", index.reference.kind),
        )),
        Some(_) => {}
    }

    for doc in &docs {
        let r = &doc.reference;
        if let Some(declared) = &doc.declared_domain {
            if declared != domain {
                issues.push(issue(
                    &r.id,
                    IssueKind::DomainMismatch,
                    format!("declares domain `{declared}` but lives in `{domain}`"),
                ));
            }
        }
        if r.estimated_tokens == 0 || r.estimated_tokens >= MAX_ESTIMATED_TOKENS {
            issues.push(issue(
                &r.id,
                IssueKind::TokenEstimate,
                format!(
                    "estimatedTokens {} outside 1..{MAX_ESTIMATED_TOKENS}",
                    r.estimated_tokens
                ),
            ));
        }
        if r.loading_strategy == LoadingStrategy::Always && r.kind != KnowledgeKind::Reference {
            issues.push(issue(
                &r.id,
                IssueKind::AlwaysLoadKind,
                format!("{} files cannot be loaded always", r.kind),
            ));
        }
        for rule in &doc.cross_domain {
            let problem = match KnowledgeReference::split_id(&rule.target) {
                Err(_) => Some("is not of the form domain/file".to_string()),
                Ok((target_domain, _)) if target_domain == domain => {
                    Some("points back into the same domain".to_string())
                }
                Ok((target_domain, target_file)) => {
                    match tree::read_document(context_dir, target_domain, target_file).await {
                        Ok(_) => None,
                        Err(StrataError::NotFound { .. }) | Err(StrataError::InvalidKey(_)) => {
                            Some("does not exist".to_string())
                        }
                        Err(e) => return Err(e),
                    }
                }
            };
            if let Some(problem) = problem {
                issues.push(issue(
                    &r.id,
                    IssueKind::CrossDomainTarget,
                    format!("cross-domain target `{}` {problem}", rule.target),
                ));
            }
        }
    }
    Ok(issues)
}
