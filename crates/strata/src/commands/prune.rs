// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strata prune`.

use std::fmt::Write;

use strata_core::StrataError;
use strata_prune::{PrunePolicy, PruneReport};

use crate::session::Session;

/// Run one explicit prune over the session's memory.
pub async fn run_prune(session: &Session, policy: &PrunePolicy) -> Result<PruneReport, StrataError> {
    session.memory().prune(policy).await
}

pub fn render_prune(report: &PruneReport) -> String {
    let mut out = String::new();
    let mode = if report.dry_run { " (dry run)" } else { "" };
    let _ = writeln!(out, "strata prune{mode}: {} entries examined", report.examined);
    if report.is_noop() {
        let _ = writeln!(out, "  nothing to prune");
    }
    for change in &report.changes {
        let _ = write!(
            out,
            "  {}: {} -> {} lines",
            change.entry_id, change.lines_before, change.lines_after
        );
        if let Some(archive) = &change.archived_to {
            let _ = write!(out, ", archived to {archive}");
        }
        out.push('\n');
    }
    for record in &report.records {
        let _ = writeln!(out, "  {} {}: {}", record.action, record.entry_id, record.reason);
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "  warning: {warning}");
    }
    out
}
