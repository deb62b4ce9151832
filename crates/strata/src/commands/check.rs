// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strata check <domain>`: integrity of the on-disk tree plus the freshness
//! of every file the session's backend serves for the domain.

use std::fmt::Write;
use std::path::Path;

use strata_core::{ContextProvider, Staleness, StrataError};
use strata_files::{IntegrityIssue, validate_domain};

use crate::session::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub domain: String,
    pub issues: Vec<IntegrityIssue>,
    /// `(id, staleness)` for every file of the domain index, in index order.
    pub freshness: Vec<(String, Staleness)>,
}

impl CheckReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Validate `domain` under `context_dir`. Freshness is read through the
/// session cache; a backend that does not serve the domain contributes no
/// freshness rows.
pub async fn run_check(
    session: &Session,
    context_dir: &Path,
    domain: &str,
) -> Result<CheckReport, StrataError> {
    let issues = validate_domain(context_dir, domain).await?;
    let cache = session.knowledge();
    let freshness = match cache.get_domain_index(domain).await {
        Ok(index) => index
            .files
            .iter()
            .map(|r| (r.id.clone(), cache.freshness(r)))
            .collect(),
        Err(StrataError::NotFound { .. }) => Vec::new(),
        Err(e) => return Err(e),
    };
    Ok(CheckReport {
        domain: domain.to_string(),
        issues,
        freshness,
    })
}

pub fn render_check(report: &CheckReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "strata check {}", report.domain);
    for (id, staleness) in &report.freshness {
        let _ = writeln!(out, "  {staleness:<6} {id}");
    }
    if report.passed() {
        let _ = writeln!(out, "  no integrity issues");
    } else {
        for issue in &report.issues {
            let _ = writeln!(out, "  issue: {issue}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_files::integrity::IssueKind;

    #[test]
    fn render_shows_freshness_then_issues() {
        let report = CheckReport {
            domain: "python".into(),
            issues: vec![IntegrityIssue {
                id: "python/index".into(),
                kind: IssueKind::CrossDomainTarget,
                message: "cross-domain target security/vault does not exist".into(),
            }],
            freshness: vec![
                ("python/django".into(), Staleness::Aging),
                ("python/testing".into(), Staleness::Stale),
            ],
        };
        let text = render_check(&report);
        assert_eq!(
            text,
            "strata check python\n  aging  python/django\n  stale  python/testing\n  issue: python/index: cross-domain target security/vault does not exist\n"
        );
        assert!(!report.passed());
    }
}
