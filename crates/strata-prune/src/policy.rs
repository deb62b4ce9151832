// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prune policies and the reports they produce.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use strata_core::{Layer, MemoryFilter, PruneRecord, StrataError};

/// Which entries an explicit prune covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PruneScope {
    /// Every entry of one project, in every layer.
    Project(String),
    /// Every entry owned by one skill.
    Skill(String),
    #[default]
    All,
}

impl PruneScope {
    pub fn filter(&self) -> MemoryFilter {
        match self {
            PruneScope::Project(name) => MemoryFilter::project(name.clone()),
            PruneScope::Skill(name) => MemoryFilter::owned_by(Layer::SkillSpecific, name.clone()),
            PruneScope::All => MemoryFilter::default(),
        }
    }
}

impl fmt::Display for PruneScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruneScope::Project(name) => write!(f, "project:{name}"),
            PruneScope::Skill(name) => write!(f, "skill:{name}"),
            PruneScope::All => f.write_str("all"),
        }
    }
}

impl FromStr for PruneScope {
    type Err = StrataError;

    /// Parses `all`, `project:<name>` or `skill:<name>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let scope = match s.split_once(':') {
            None if s == "all" => PruneScope::All,
            Some(("project", name)) if !name.is_empty() => PruneScope::Project(name.to_string()),
            Some(("skill", name)) if !name.is_empty() => PruneScope::Skill(name.to_string()),
            _ => {
                return Err(StrataError::InvalidKey(format!(
                    "prune scope `{s}` must be all, project:<name> or skill:<name>"
                )));
            }
        };
        Ok(scope)
    }
}

/// Parameters of an explicit prune run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrunePolicy {
    pub scope: PruneScope,
    /// Compute and report every change without committing any.
    pub dry_run: bool,
}

impl PrunePolicy {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// An entry that exceeded its line budget. Never mutates content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetWarning {
    pub entry_id: String,
    pub file_type: String,
    pub lines: usize,
    pub limit: usize,
}

impl fmt::Display for BudgetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} has {} lines, over the {} line budget for {}",
            self.entry_id, self.lines, self.limit, self.file_type
        )
    }
}

/// What pruning did (or would do) to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryChange {
    pub entry_id: String,
    pub lines_before: usize,
    pub lines_after: usize,
    /// Archive sibling that received moved sections.
    pub archived_to: Option<String>,
}

/// Result of an explicit prune run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PruneReport {
    pub dry_run: bool,
    pub examined: usize,
    pub changes: Vec<EntryChange>,
    #[serde(skip)]
    pub records: Vec<PruneRecord>,
    pub warnings: Vec<BudgetWarning>,
}

impl PruneReport {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty() && self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_parses_and_displays() {
        for raw in ["all", "project:acme", "skill:python-code-review"] {
            let scope: PruneScope = raw.parse().unwrap();
            assert_eq!(scope.to_string(), raw);
        }
        assert!("project:".parse::<PruneScope>().is_err());
        assert!("team:x".parse::<PruneScope>().is_err());
    }

    #[test]
    fn scope_filters() {
        assert_eq!(
            PruneScope::Project("acme".into()).filter(),
            MemoryFilter::project("acme")
        );
        assert_eq!(PruneScope::All.filter(), MemoryFilter::default());
        assert_eq!(
            PruneScope::Skill("lint".into()).filter().layer,
            Some(Layer::SkillSpecific)
        );
    }
}
