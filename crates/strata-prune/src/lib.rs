// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention rules for memory entries.
//!
//! Rules are keyed by file type in a [`RuleTable`]:
//!
//! - **review_history**: all but the most recent sections move to a
//!   `review_history_archive` sibling, verbatim.
//! - **known_issues**: old resolved issues are removed, stale or undated
//!   ones are tagged for verification, in-progress ones are never removed.
//! - **session logs**: excess old sessions collapse into a summary section.
//!
//! Line budgets are checked separately and only ever produce warnings.

pub mod engine;
pub mod issues;
pub mod policy;
pub mod rules;

pub use engine::{PruneEngine, RuleOutcome};
pub use policy::{BudgetWarning, EntryChange, PrunePolicy, PruneReport, PruneScope};
pub use rules::{ARCHIVE_SUFFIX, RuleKind, RuleTable, SUMMARY_HEADING, archive_file_type};
