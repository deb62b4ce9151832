// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Copying memory between backends.

use strata_core::{ChangeSet, EntryStore, MemoryFilter, StrataError};
use tracing::info;

/// Counts from a completed migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub entries: usize,
    pub overwritten: usize,
    pub records: usize,
}

/// Copy every entry, dates included, and the whole prune history from
/// `source` into `target`.
///
/// Entries already present in the target are overwritten. Records are
/// appended as-is, so migrating twice duplicates the audit trail.
pub async fn migrate<A, B>(source: &A, target: &B) -> Result<MigrationReport, StrataError>
where
    A: EntryStore + ?Sized,
    B: EntryStore + ?Sized,
{
    let mut report = MigrationReport::default();
    for entry in source.list(&MemoryFilter::default()).await? {
        let id = entry.id.clone();
        match target.insert(entry.clone()).await {
            Ok(()) => {}
            Err(StrataError::AlreadyExists { .. }) => {
                target.replace(entry).await?;
                report.overwritten += 1;
            }
            Err(e) => return Err(e),
        }
        report.entries += 1;
        tracing::debug!(id = %id, "entry migrated");
    }

    let records = source.prune_history(None).await?;
    report.records = records.len();
    if !records.is_empty() {
        target
            .apply(ChangeSet {
                upserts: Vec::new(),
                records,
                dry_run: false,
            })
            .await?;
    }
    info!(
        from = source.name(),
        to = target.name(),
        entries = report.entries,
        records = report.records,
        "memory migration complete"
    );
    Ok(report)
}
