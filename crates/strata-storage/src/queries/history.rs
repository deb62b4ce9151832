// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only prune history.

use std::str::FromStr;

use rusqlite::{Transaction, params};
use strata_core::staleness::parse_date;
use strata_core::{PruneAction, PruneRecord, StrataError};
use tracing::warn;

use crate::database::{Database, map_tr_err};

/// Append one record inside an open transaction.
pub(crate) fn insert_in(tx: &Transaction<'_>, record: &PruneRecord) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT INTO prune_history (entry_id, action, reason, pruned_at, content_snapshot)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.entry_id,
            record.action.to_string(),
            record.reason,
            record.pruned_at.format("%Y-%m-%d").to_string(),
            record.content_snapshot,
        ],
    )?;
    Ok(())
}

type RecordRow = (String, String, String, String, Option<String>);

/// Records in insertion order, optionally for one entry.
pub async fn list_records(
    db: &Database,
    entry_id: Option<&str>,
) -> Result<Vec<PruneRecord>, StrataError> {
    let entry_id = entry_id.map(str::to_string);
    let rows = db
        .reader()
        .call(move |conn| -> Result<Vec<RecordRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT entry_id, action, reason, pruned_at, content_snapshot
                 FROM prune_history
                 WHERE (?1 IS NULL OR entry_id = ?1)
                 ORDER BY seq",
            )?;
            let rows = stmt.query_map(params![entry_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;

    let mut records = Vec::with_capacity(rows.len());
    for (entry_id, action, reason, pruned_at, content_snapshot) in rows {
        let (Ok(action), Some(pruned_at)) = (PruneAction::from_str(&action), parse_date(&pruned_at))
        else {
            warn!(entry_id = %entry_id, action = %action, "skipping unreadable prune record");
            continue;
        };
        records.push(PruneRecord {
            entry_id,
            action,
            reason,
            pruned_at,
            content_snapshot,
        });
    }
    Ok(records)
}
