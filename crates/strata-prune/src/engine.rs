// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The pruning engine.
//!
//! [`PruneEngine::evaluate`] is pure: it takes an entry's content and returns
//! the new content, the sections to move into the archive sibling, and the
//! audit records. Committing the result is the caller's job.

use chrono::NaiveDate;
use strata_config::PruningConfig;
use strata_core::markdown::{Section, join_sections, split_sections};
use strata_core::types::count_lines;
use strata_core::{PruneAction, PruneRecord};
use tracing::{debug, warn};

use crate::issues::{self, IssueThresholds, IssueVerdict};
use crate::policy::BudgetWarning;
use crate::rules::{RuleKind, RuleTable, SUMMARY_HEADING};

/// Result of running one rule over one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Content the entry should hold afterwards.
    pub content: String,
    /// Section texts to append, in order, to the archive sibling.
    pub archived: Vec<String>,
    pub records: Vec<PruneRecord>,
}

impl RuleOutcome {
    fn unchanged(content: &str) -> Self {
        Self {
            content: content.to_string(),
            archived: Vec::new(),
            records: Vec::new(),
        }
    }

    /// True when the rule found nothing to do.
    pub fn is_noop(&self) -> bool {
        self.records.is_empty()
    }
}

/// Applies the [`RuleTable`] to entry content.
#[derive(Debug, Clone, Default)]
pub struct PruneEngine {
    table: RuleTable,
}

impl PruneEngine {
    pub fn new(table: RuleTable) -> Self {
        Self { table }
    }

    pub fn from_config(config: &PruningConfig) -> Self {
        Self::new(RuleTable::from_config(config))
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    /// Run the rule for `file_type` over `content`.
    ///
    /// `recoverable` tells the engine removed text can be recovered outside
    /// the store; only then do removal records drop their snapshot.
    pub fn evaluate(
        &self,
        entry_id: &str,
        file_type: &str,
        content: &str,
        today: NaiveDate,
        recoverable: bool,
    ) -> RuleOutcome {
        let rule = self.table.rule_for(file_type);
        let ctx = Ctx {
            entry_id,
            today,
            recoverable,
        };
        let outcome = match rule {
            RuleKind::ArchiveOldest { keep } => archive_oldest(&ctx, content, keep),
            RuleKind::IssueLifecycle(thresholds) => issue_lifecycle(&ctx, content, thresholds),
            RuleKind::CollapseSessions { keep } => collapse_sessions(&ctx, content, keep),
            RuleKind::Retain => RuleOutcome::unchanged(content),
        };
        if !outcome.is_noop() {
            debug!(
                entry_id,
                file_type,
                records = outcome.records.len(),
                archived = outcome.archived.len(),
                "prune rule applied"
            );
        }
        outcome
    }

    /// Report an entry over its line budget. Content is never touched.
    pub fn check_budget(
        &self,
        entry_id: &str,
        file_type: &str,
        content: &str,
    ) -> Option<BudgetWarning> {
        let limit = self.table.line_budget(file_type);
        let lines = count_lines(content);
        if lines <= limit {
            return None;
        }
        warn!(entry_id, file_type, lines, limit, "memory entry over line budget");
        Some(BudgetWarning {
            entry_id: entry_id.to_string(),
            file_type: file_type.to_string(),
            lines,
            limit,
        })
    }
}

struct Ctx<'a> {
    entry_id: &'a str,
    today: NaiveDate,
    recoverable: bool,
}

impl Ctx<'_> {
    fn record(&self, action: PruneAction, reason: String, snapshot: Option<String>) -> PruneRecord {
        PruneRecord {
            entry_id: self.entry_id.to_string(),
            action,
            reason,
            pruned_at: self.today,
            content_snapshot: snapshot,
        }
    }

    fn removal_snapshot(&self, text: String) -> Option<String> {
        if self.recoverable { None } else { Some(text) }
    }
}

fn heading(section: &Section) -> &str {
    section.heading.as_deref().unwrap_or_default()
}

fn archive_oldest(ctx: &Ctx<'_>, content: &str, keep: usize) -> RuleOutcome {
    let sections = split_sections(content);
    let headed = sections.iter().filter(|s| !s.is_preamble()).count();
    if headed <= keep {
        return RuleOutcome::unchanged(content);
    }
    let mut excess = headed - keep;
    let mut kept = Vec::new();
    let mut archived = Vec::new();
    let mut records = Vec::new();
    for section in sections {
        if section.is_preamble() || excess == 0 {
            kept.push(section);
            continue;
        }
        excess -= 1;
        records.push(ctx.record(
            PruneAction::Archived,
            format!(
                "archived `{}`: more than {keep} sections",
                heading(&section)
            ),
            Some(section.text.clone()),
        ));
        archived.push(section.text);
    }
    RuleOutcome {
        content: join_sections(&kept),
        archived,
        records,
    }
}

fn issue_lifecycle(ctx: &Ctx<'_>, content: &str, thresholds: IssueThresholds) -> RuleOutcome {
    let mut kept = Vec::new();
    let mut records = Vec::new();
    for section in split_sections(content) {
        if section.is_preamble() {
            kept.push(section);
            continue;
        }
        let status = issues::find_status(&section.text);
        let tagged = issues::is_tagged(&section.text);
        match issues::judge(status.as_ref(), tagged, ctx.today, thresholds) {
            IssueVerdict::Keep => kept.push(section),
            IssueVerdict::Remove { reason } => {
                records.push(ctx.record(
                    PruneAction::Removed,
                    format!("removed `{}`: {reason}", heading(&section)),
                    ctx.removal_snapshot(section.text),
                ));
            }
            IssueVerdict::Flag { reason } => {
                records.push(ctx.record(
                    PruneAction::Flagged,
                    format!("flagged `{}`: {reason}", heading(&section)),
                    None,
                ));
                let text = issues::tag(&section, status.as_ref());
                kept.push(Section {
                    heading: section.heading,
                    text,
                });
            }
        }
    }
    if records.is_empty() {
        return RuleOutcome::unchanged(content);
    }
    RuleOutcome {
        content: join_sections(&kept),
        archived: Vec::new(),
        records,
    }
}

fn is_summary(section: &Section) -> bool {
    section
        .heading
        .as_deref()
        .is_some_and(|h| h.eq_ignore_ascii_case(SUMMARY_HEADING))
}

fn collapse_sessions(ctx: &Ctx<'_>, content: &str, keep: usize) -> RuleOutcome {
    let sections = split_sections(content);
    let sessions = sections
        .iter()
        .filter(|s| !s.is_preamble() && !is_summary(s))
        .count();
    if sessions <= keep {
        return RuleOutcome::unchanged(content);
    }
    let mut excess = sessions - keep;
    let mut preamble = Vec::new();
    let mut bullets = Vec::new();
    let mut collapsed = Vec::new();
    let mut kept = Vec::new();
    for section in sections {
        if section.is_preamble() {
            preamble.push(section);
        } else if is_summary(&section) {
            bullets.extend(
                section
                    .text
                    .lines()
                    .skip(1)
                    .filter(|l| !l.trim().is_empty())
                    .map(str::to_string),
            );
        } else if excess > 0 {
            excess -= 1;
            bullets.push(format!("- {}", heading(&section)));
            collapsed.push(section);
        } else {
            kept.push(section);
        }
    }

    let mut summary = format!("## {SUMMARY_HEADING}\n");
    for bullet in &bullets {
        summary.push_str(bullet);
        summary.push('\n');
    }
    summary.push('\n');

    let mut content = join_sections(&preamble);
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&summary);
    content.push_str(&join_sections(&kept));

    let record = ctx.record(
        PruneAction::Removed,
        format!(
            "collapsed {} sessions into `{SUMMARY_HEADING}`: more than {keep} sessions",
            collapsed.len()
        ),
        ctx.removal_snapshot(join_sections(&collapsed)),
    );
    RuleOutcome {
        content,
        archived: Vec::new(),
        records: vec![record],
    }
}
