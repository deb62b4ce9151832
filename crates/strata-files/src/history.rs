// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only prune audit trail as JSON lines.

use std::io::ErrorKind;
use std::path::Path;

use strata_core::{PruneRecord, StrataError};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File name of the audit trail, at the root of the memory tree.
pub const HISTORY_FILE: &str = ".prune_history.jsonl";

fn json_err(e: serde_json::Error) -> StrataError {
    StrataError::Storage {
        source: Box::new(e),
    }
}

/// Append records, one JSON object per line.
pub async fn append_records(path: &Path, records: &[PruneRecord]) -> Result<(), StrataError> {
    if records.is_empty() {
        return Ok(());
    }
    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record).map_err(json_err)?);
        buf.push('\n');
    }
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(StrataError::io)?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(StrataError::io)?;
    file.write_all(buf.as_bytes())
        .await
        .map_err(StrataError::io)?;
    file.flush().await.map_err(StrataError::io)
}

/// All records, oldest first. Lines that fail to parse are skipped.
pub async fn read_records(path: &Path) -> Result<Vec<PruneRecord>, StrataError> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StrataError::io(e)),
    };
    let mut records = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<PruneRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(path = %path.display(), line = n + 1, error = %e, "skipping malformed prune record"),
        }
    }
    Ok(records)
}
