// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status tracking for `known_issues` sections.
//!
//! Each issue section carries a status line such as
//! `**Status**: Resolved (2026-01-15)`. Issues that were never given a dated
//! status, or whose status has not moved for too long, get a
//! `**Needs Verification**:` line so a human looks at them.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use strata_core::markdown::{Section, heading_of};
use strata_core::staleness::{age_in_days, parse_date};
use strum::Display;

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*\*\*Status\*\*:\s*([^(]*?)\s*(?:\((\d{4}-\d{2}-\d{2})\))?\s*$")
        .expect("status regex is valid")
});

/// Prefix of the line added to issues awaiting manual verification.
pub const VERIFICATION_MARKER: &str = "**Needs Verification**:";

/// Lifecycle state named on a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum IssueState {
    Open,
    InProgress,
    Resolved,
}

impl IssueState {
    fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "resolved" | "fixed" | "closed" | "done" => IssueState::Resolved,
            "in progress" | "investigating" | "wip" => IssueState::InProgress,
            _ => IssueState::Open,
        }
    }
}

/// Parsed status line of one issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueStatus {
    pub state: IssueState,
    pub date: Option<NaiveDate>,
}

/// Decision for one issue section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueVerdict {
    Keep,
    Remove { reason: String },
    Flag { reason: String },
}

/// Thresholds for the issue lifecycle, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueThresholds {
    pub resolved_retention_days: i64,
    pub verification_after_days: i64,
}

/// First status line of a section.
pub fn find_status(text: &str) -> Option<IssueStatus> {
    text.lines().find_map(|line| {
        STATUS_LINE.captures(line).map(|caps| IssueStatus {
            state: IssueState::parse(&caps[1]),
            date: caps.get(2).and_then(|m| parse_date(m.as_str())),
        })
    })
}

pub fn is_tagged(text: &str) -> bool {
    text.lines()
        .any(|line| line.trim_start().starts_with(VERIFICATION_MARKER))
}

/// Decide what happens to one issue.
///
/// In-progress issues are never removed. Resolved issues are removed once
/// their resolution date is old enough. Anything without a recent dated
/// status is flagged, once.
pub fn judge(
    status: Option<&IssueStatus>,
    tagged: bool,
    today: NaiveDate,
    thresholds: IssueThresholds,
) -> IssueVerdict {
    let date = status.and_then(|s| s.date);
    if let (Some(IssueStatus { state: IssueState::Resolved, .. }), Some(date)) = (status, date) {
        let age = age_in_days(date, today);
        if age >= thresholds.resolved_retention_days {
            return IssueVerdict::Remove {
                reason: format!("resolved {age} days ago"),
            };
        }
        return IssueVerdict::Keep;
    }
    if tagged {
        return IssueVerdict::Keep;
    }
    match date {
        None => IssueVerdict::Flag {
            reason: "no dated status update".to_string(),
        },
        Some(date) => {
            let age = age_in_days(date, today);
            if age >= thresholds.verification_after_days {
                IssueVerdict::Flag {
                    reason: format!("no status update for {age} days"),
                }
            } else {
                IssueVerdict::Keep
            }
        }
    }
}

/// Insert the verification line after the status line, or after the heading
/// when there is no status line.
pub fn tag(section: &Section, status: Option<&IssueStatus>) -> String {
    let note = match status.and_then(|s| s.date) {
        Some(date) => format!("{VERIFICATION_MARKER} no status update since {date}\n"),
        None => format!("{VERIFICATION_MARKER} no dated status update\n"),
    };
    let mut out = String::with_capacity(section.text.len() + note.len());
    let mut inserted = false;
    let anchor_is_status = status.is_some();
    for line in section.text.split_inclusive('\n') {
        out.push_str(line);
        if inserted {
            continue;
        }
        let trimmed = line.trim_end();
        let is_anchor = if anchor_is_status {
            STATUS_LINE.is_match(trimmed)
        } else {
            heading_of(trimmed).is_some()
        };
        if is_anchor {
            if !line.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&note);
            inserted = true;
        }
    }
    if !inserted {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&note);
    }
    out
}
