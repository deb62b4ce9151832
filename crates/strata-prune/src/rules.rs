// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The file type to rule table.
//!
//! Adding a file type means adding a row here; the engine only knows the
//! rule kinds.

use std::collections::HashMap;

use strata_config::PruningConfig;

use crate::issues::IssueThresholds;

/// Heading of the section that collapsed session logs are folded into.
pub const SUMMARY_HEADING: &str = "Summary of earlier sessions";

/// Suffix of the sibling entry that receives archived sections.
pub const ARCHIVE_SUFFIX: &str = "_archive";

/// Retention behaviour for one file type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Move all but the `keep` most recent sections into the archive sibling.
    ArchiveOldest { keep: usize },
    /// Remove old resolved issues and flag unverified ones.
    IssueLifecycle(IssueThresholds),
    /// Fold all but the `keep` most recent sections into one summary section.
    CollapseSessions { keep: usize },
    /// Leave content untouched.
    Retain,
}

/// Lookup from file type to rule, with per-type line budgets.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: HashMap<String, RuleKind>,
    budgets: HashMap<String, usize>,
    default_budget: usize,
}

impl RuleTable {
    /// The built-in table, parameterised by configuration.
    pub fn from_config(config: &PruningConfig) -> Self {
        let sessions = RuleKind::CollapseSessions {
            keep: config.session_keep,
        };
        let rules = HashMap::from([
            (
                "review_history".to_string(),
                RuleKind::ArchiveOldest {
                    keep: config.review_history_keep,
                },
            ),
            (
                "known_issues".to_string(),
                RuleKind::IssueLifecycle(IssueThresholds {
                    resolved_retention_days: config.resolved_retention_days,
                    verification_after_days: config.verification_after_days,
                }),
            ),
            ("test_results_history".to_string(), sessions),
            ("session_history".to_string(), sessions),
            ("session_log".to_string(), sessions),
        ]);
        Self {
            rules,
            budgets: config
                .line_budgets
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            default_budget: config.default_line_budget,
        }
    }

    /// Add or replace the rule for a file type.
    pub fn insert(&mut self, file_type: impl Into<String>, rule: RuleKind) {
        self.rules.insert(file_type.into(), rule);
    }

    /// Rule for a file type. Unknown types (archives included) are retained.
    pub fn rule_for(&self, file_type: &str) -> RuleKind {
        self.rules
            .get(file_type)
            .copied()
            .unwrap_or(RuleKind::Retain)
    }

    pub fn line_budget(&self, file_type: &str) -> usize {
        self.budgets
            .get(file_type)
            .copied()
            .unwrap_or(self.default_budget)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::from_config(&PruningConfig::default())
    }
}

/// File type of the archive sibling for `file_type`.
pub fn archive_file_type(file_type: &str) -> String {
    format!("{file_type}{ARCHIVE_SUFFIX}")
}
