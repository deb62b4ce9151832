// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory entries as markdown files.
//!
//! ```text
//! <!-- Last Updated: 2026-06-01 -->
//! <!-- Created: 2026-04-12 -->
//! ...content...
//! ```
//!
//! A first line that starts like a timestamp but does not parse still counts
//! as the header, so the entry reads back with no date and classifies stale.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use strata_core::staleness::{parse_date, parse_timestamp_line, timestamp_line};
use strata_core::traits::entry_store::content_matches;
use strata_core::{
    ChangeSet, EntryStore, MemoryEntry, MemoryFilter, MemoryKey, PruneRecord, StrataError,
};
use tracing::{debug, warn};

use crate::backend::FileBackend;
use crate::history::{self, HISTORY_FILE};

static CREATED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!--\s*Created:\s*(\d{4}-\d{2}-\d{2})\s*-->\s*$").expect("created regex is valid")
});

const UPDATED_PREFIX: &str = "<!-- Last Updated";

/// Header dates and content of a memory file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile<'a> {
    pub updated_at: Option<NaiveDate>,
    pub created_at: Option<NaiveDate>,
    pub content: &'a str,
}

fn split_first_line(text: &str) -> Option<(&str, &str)> {
    if text.is_empty() {
        return None;
    }
    Some(text.split_once('\n').unwrap_or((text, "")))
}

/// Split a memory file into its header dates and content.
pub fn parse_memory_file(text: &str) -> MemoryFile<'_> {
    let mut rest = text;
    let mut updated_at = None;
    if let Some((line, tail)) = split_first_line(rest) {
        if line.trim_start().starts_with(UPDATED_PREFIX) {
            updated_at = parse_timestamp_line(line);
            rest = tail;
        }
    }
    let mut created_at = None;
    if let Some((line, tail)) = split_first_line(rest) {
        if let Some(caps) = CREATED_LINE.captures(line.trim_end_matches('\r')) {
            created_at = parse_date(&caps[1]);
            rest = tail;
        }
    }
    MemoryFile {
        updated_at,
        created_at,
        content: rest,
    }
}

/// Render an entry as file text. Entries without an update date are written
/// without the timestamp line.
pub fn render_memory_file(entry: &MemoryEntry) -> String {
    let mut out = String::with_capacity(entry.content.len() + 64);
    if let Some(updated) = entry.updated_at {
        out.push_str(&timestamp_line(updated));
        out.push('\n');
    }
    out.push_str(&format!(
        "<!-- Created: {} -->\n",
        entry.created_at.format("%Y-%m-%d")
    ));
    out.push_str(&entry.content);
    out
}

impl FileBackend {
    fn entry_path(&self, id: &str) -> Result<(MemoryKey, PathBuf), StrataError> {
        let key = MemoryKey::from_id(id)?;
        Ok((key, self.memory_dir.join(format!("{id}.md"))))
    }

    fn history_path(&self) -> PathBuf {
        self.memory_dir.join(HISTORY_FILE)
    }

    async fn read_entry(&self, key: MemoryKey, path: &Path) -> Result<Option<MemoryEntry>, StrataError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StrataError::io(e)),
        };
        let today = self.clock.today();
        let file = parse_memory_file(&text);
        if file.updated_at.is_none() {
            warn!(path = %path.display(), "memory file has no parseable timestamp");
        }
        let created = file.created_at.or(file.updated_at).unwrap_or(today);
        Ok(Some(MemoryEntry::with_dates(
            key,
            file.content,
            created,
            file.updated_at,
            today,
        )))
    }

    async fn write_entry(&self, entry: &MemoryEntry) -> Result<(), StrataError> {
        let (_, path) = self.entry_path(&entry.id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StrataError::io)?;
        }
        let tmp = path.with_extension("md.tmp");
        tokio::fs::write(&tmp, render_memory_file(entry))
            .await
            .map_err(StrataError::io)?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(StrataError::io)
    }

    async fn exists(path: &Path) -> Result<bool, StrataError> {
        tokio::fs::try_exists(path).await.map_err(StrataError::io)
    }

    /// Ids of every memory file, sorted.
    async fn list_ids(&self) -> Result<Vec<String>, StrataError> {
        let mut ids = Vec::new();
        let mut stack = vec![self.memory_dir.clone()];
        while let Some(dir) = stack.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StrataError::io(e)),
            };
            while let Some(entry) = entries.next_entry().await.map_err(StrataError::io)? {
                let path = entry.path();
                if entry.file_type().await.map_err(StrataError::io)?.is_dir() {
                    stack.push(path);
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some("md") {
                    continue;
                }
                let Ok(rel) = path.strip_prefix(&self.memory_dir) else {
                    continue;
                };
                let id = rel
                    .with_extension("")
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                match MemoryKey::from_id(&id) {
                    Ok(_) => ids.push(id),
                    Err(e) => debug!(path = %path.display(), error = %e, "ignoring file outside the memory layout"),
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl EntryStore for FileBackend {
    async fn fetch(&self, id: &str) -> Result<Option<MemoryEntry>, StrataError> {
        let (key, path) = self.entry_path(id)?;
        self.read_entry(key, &path).await
    }

    async fn insert(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        let _guard = self.write_lock.lock().await;
        let (_, path) = self.entry_path(&entry.id)?;
        if Self::exists(&path).await? {
            return Err(StrataError::AlreadyExists { id: entry.id });
        }
        self.write_entry(&entry).await
    }

    async fn replace(&self, entry: MemoryEntry) -> Result<(), StrataError> {
        let _guard = self.write_lock.lock().await;
        let (_, path) = self.entry_path(&entry.id)?;
        if !Self::exists(&path).await? {
            return Err(StrataError::entry_not_found(entry.id));
        }
        self.write_entry(&entry).await
    }

    async fn remove(&self, id: &str) -> Result<bool, StrataError> {
        let _guard = self.write_lock.lock().await;
        let (_, path) = self.entry_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StrataError::io(e)),
        }
    }

    async fn list(&self, filter: &MemoryFilter) -> Result<Vec<MemoryEntry>, StrataError> {
        let mut entries = Vec::new();
        for id in self.list_ids().await? {
            let (key, path) = self.entry_path(&id)?;
            if !filter.matches(&key) {
                continue;
            }
            if let Some(entry) = self.read_entry(key, &path).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    async fn search_entries(
        &self,
        pattern: &str,
        filter: &MemoryFilter,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        Ok(self
            .list(filter)
            .await?
            .into_iter()
            .filter(|e| content_matches(&e.content, pattern))
            .collect())
    }

    /// Files are replaced one by one, then the records appended.
    async fn apply(&self, changes: ChangeSet) -> Result<(), StrataError> {
        changes.ensure_committable()?;
        let _guard = self.write_lock.lock().await;
        for entry in &changes.upserts {
            self.write_entry(entry).await?;
        }
        history::append_records(&self.history_path(), &changes.records).await?;
        debug!(
            upserts = changes.upserts.len(),
            records = changes.records.len(),
            "changeset written"
        );
        Ok(())
    }

    async fn prune_history(&self, entry_id: Option<&str>) -> Result<Vec<PruneRecord>, StrataError> {
        let records = history::read_records(&self.history_path()).await?;
        Ok(match entry_id {
            Some(id) => records.into_iter().filter(|r| r.entry_id == id).collect(),
            None => records,
        })
    }

    fn history_is_recoverable(&self) -> bool {
        self.git_tracked
    }
}
