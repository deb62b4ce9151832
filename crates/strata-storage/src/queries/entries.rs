// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory entry CRUD, full-text search and changeset commits.

use chrono::NaiveDate;
use rusqlite::{Row, Transaction, params};
use strata_core::staleness::parse_date;
use strata_core::traits::entry_store::content_matches;
use strata_core::{ChangeSet, MemoryEntry, MemoryFilter, MemoryKey, StrataError};
use tracing::warn;

use crate::database::{Database, flatten_err, map_tr_err, sql_err};
use crate::queries::history;

const ENTRY_COLUMNS: &str = "e.id, e.content, e.created_at, e.updated_at";

const FILTER_CLAUSE: &str = "(?1 IS NULL OR e.layer = ?1)
     AND (?2 IS NULL OR e.project = ?2)
     AND (?3 IS NULL OR e.owner = ?3)
     AND (?4 IS NULL OR e.file_type = ?4)";

/// Shortest pattern the trigram index can answer.
const MIN_TRIGRAM_CHARS: usize = 3;

/// An entry as stored, before key parsing and classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    }

    /// Parse the key and dates and classify against `today`.
    pub fn into_entry(self, today: NaiveDate) -> Result<MemoryEntry, StrataError> {
        let key = MemoryKey::from_id(&self.id)?;
        let updated_at = self.updated_at.as_deref().and_then(parse_date);
        let created_at = match parse_date(&self.created_at) {
            Some(date) => date,
            None => {
                warn!(id = %self.id, raw = %self.created_at, "unparseable created_at, using updated_at");
                updated_at.unwrap_or(today)
            }
        };
        Ok(MemoryEntry::with_dates(
            key,
            self.content,
            created_at,
            updated_at,
            today,
        ))
    }
}

/// Owned copy of a filter's bind values.
#[derive(Debug, Clone, Default)]
struct FilterParams {
    layer: Option<String>,
    project: Option<String>,
    owner: Option<String>,
    file_type: Option<String>,
}

impl From<&MemoryFilter> for FilterParams {
    fn from(filter: &MemoryFilter) -> Self {
        Self {
            layer: filter.layer.map(|l| l.to_string()),
            project: filter.project.clone(),
            owner: filter.owner.clone(),
            file_type: filter.file_type.clone(),
        }
    }
}

fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn upsert_in(tx: &Transaction<'_>, entry: &MemoryEntry) -> Result<(), rusqlite::Error> {
    tx.execute(
        "INSERT INTO memory_entries (id, layer, owner, project, file_type, content, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            content = excluded.content,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at",
        params![
            entry.id,
            entry.key.layer.to_string(),
            entry.key.owner,
            entry.key.project,
            entry.key.file_type,
            entry.content,
            date_text(entry.created_at),
            entry.updated_at.map(date_text),
        ],
    )?;
    Ok(())
}

/// Get one entry by id.
pub async fn fetch_entry(db: &Database, id: &str) -> Result<Option<EntryRow>, StrataError> {
    let id = id.to_string();
    db.reader()
        .call(move |conn| -> Result<Option<EntryRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM memory_entries e WHERE e.id = ?1"
            ))?;
            match stmt.query_row(params![id], EntryRow::from_row) {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a new entry. Returns false if the id was already taken.
pub async fn insert_entry(db: &Database, entry: &MemoryEntry) -> Result<bool, StrataError> {
    let entry = entry.clone();
    db.writer()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "INSERT INTO memory_entries (id, layer, owner, project, file_type, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO NOTHING",
                params![
                    entry.id,
                    entry.key.layer.to_string(),
                    entry.key.owner,
                    entry.key.project,
                    entry.key.file_type,
                    entry.content,
                    date_text(entry.created_at),
                    entry.updated_at.map(date_text),
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite content and dates of an existing entry. Returns false if absent.
pub async fn replace_entry(db: &Database, entry: &MemoryEntry) -> Result<bool, StrataError> {
    let entry = entry.clone();
    db.writer()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE memory_entries SET content = ?2, created_at = ?3, updated_at = ?4
                 WHERE id = ?1",
                params![
                    entry.id,
                    entry.content,
                    date_text(entry.created_at),
                    entry.updated_at.map(date_text),
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an entry. Prune records referencing it are untouched.
pub async fn delete_entry(db: &Database, id: &str) -> Result<bool, StrataError> {
    let id = id.to_string();
    db.writer()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute("DELETE FROM memory_entries WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Entries inside `filter`, sorted by id.
pub async fn list_entries(db: &Database, filter: &MemoryFilter) -> Result<Vec<EntryRow>, StrataError> {
    let f = FilterParams::from(filter);
    db.reader()
        .call(move |conn| -> Result<Vec<EntryRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM memory_entries e WHERE {FILTER_CLAUSE} ORDER BY e.id"
            ))?;
            let rows = stmt.query_map(
                params![f.layer, f.project, f.owner, f.file_type],
                EntryRow::from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Quote a pattern as a single FTS5 phrase.
fn fts_phrase(pattern: &str) -> String {
    format!("\"{}\"", pattern.replace('"', "\"\""))
}

/// Entries inside `filter` whose content contains `pattern`, ignoring case.
///
/// Patterns long enough for the trigram index go through FTS5; shorter ones
/// scan the filtered rows. Both paths are confirmed with the shared
/// substring matcher so results agree with every other backend.
pub async fn search_entries(
    db: &Database,
    pattern: &str,
    filter: &MemoryFilter,
) -> Result<Vec<EntryRow>, StrataError> {
    if pattern.chars().count() < MIN_TRIGRAM_CHARS {
        let mut rows = list_entries(db, filter).await?;
        rows.retain(|row| content_matches(&row.content, pattern));
        return Ok(rows);
    }

    let f = FilterParams::from(filter);
    let phrase = fts_phrase(pattern);
    let mut rows = db
        .reader()
        .call(move |conn| -> Result<Vec<EntryRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS}
                 FROM memory_entries_fts f
                 JOIN memory_entries e ON e.rowid = f.rowid
                 WHERE memory_entries_fts MATCH ?5 AND {FILTER_CLAUSE}
                 ORDER BY e.id"
            ))?;
            let rows = stmt.query_map(
                params![f.layer, f.project, f.owner, f.file_type, phrase],
                EntryRow::from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    rows.retain(|row| content_matches(&row.content, pattern));
    Ok(rows)
}

/// Upsert every entry and append every record in one transaction.
pub async fn apply_changes(db: &Database, changes: ChangeSet) -> Result<(), StrataError> {
    changes.ensure_committable()?;
    db.writer()
        .call(move |conn| -> Result<(), StrataError> {
            let tx = conn.transaction().map_err(sql_err)?;
            for entry in &changes.upserts {
                upsert_in(&tx, entry).map_err(sql_err)?;
            }
            for record in &changes.records {
                history::insert_in(&tx, record).map_err(sql_err)?;
            }
            tx.commit().map_err(sql_err)
        })
        .await
        .map_err(flatten_err)
}

/// `(id, staleness)` pairs from the `memory_staleness` view, sorted by id.
pub async fn staleness_view(db: &Database) -> Result<Vec<(String, String)>, StrataError> {
    db.reader()
        .call(|conn| -> Result<Vec<(String, String)>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT id, staleness FROM memory_staleness ORDER BY id")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata_core::{FixedClock, Layer};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    async fn db() -> Database {
        Database::open_in_memory(Arc::new(FixedClock(today())))
            .await
            .unwrap()
    }

    fn entry(key: MemoryKey, content: &str) -> MemoryEntry {
        MemoryEntry::new(key, content, today())
    }

    #[test]
    fn phrase_escapes_quotes() {
        assert_eq!(fts_phrase(r#"say "hi""#), r#""say ""hi""""#);
    }

    #[tokio::test]
    async fn insert_is_rejected_on_duplicate_id() {
        let db = db().await;
        let e = entry(MemoryKey::shared("acme", "notes"), "first");
        assert!(insert_entry(&db, &e).await.unwrap());
        assert!(!insert_entry(&db, &e).await.unwrap());
        let row = fetch_entry(&db, &e.id).await.unwrap().unwrap();
        assert_eq!(row.content, "first");
        assert_eq!(row.updated_at.as_deref(), Some("2026-06-01"));
    }

    #[tokio::test]
    async fn filter_by_layer_and_owner() {
        let db = db().await;
        for e in [
            entry(MemoryKey::shared("acme", "notes"), "a"),
            entry(
                MemoryKey::owned(Layer::SkillSpecific, "reviewer", "acme", "review_history"),
                "b",
            ),
            entry(MemoryKey::owned(Layer::Agent, "planner", "acme", "notes"), "c"),
        ] {
            insert_entry(&db, &e).await.unwrap();
        }
        let rows = list_entries(&db, &MemoryFilter::owned_by(Layer::SkillSpecific, "reviewer"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "skills/reviewer/acme/review_history");

        let rows = list_entries(&db, &MemoryFilter::project("acme")).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(
            ids,
            [
                "agents/planner/acme/notes",
                "projects/acme/notes",
                "skills/reviewer/acme/review_history"
            ]
        );
    }

    #[tokio::test]
    async fn fts_search_follows_updates_and_deletes() {
        let db = db().await;
        let mut e = entry(MemoryKey::shared("acme", "stack"), "Uses PostgreSQL 16");
        insert_entry(&db, &e).await.unwrap();
        let hits = search_entries(&db, "postgres", &MemoryFilter::default()).await.unwrap();
        assert_eq!(hits.len(), 1);

        e.content = "Moved to MySQL".into();
        replace_entry(&db, &e).await.unwrap();
        assert!(search_entries(&db, "postgres", &MemoryFilter::default()).await.unwrap().is_empty());
        assert_eq!(search_entries(&db, "mysql", &MemoryFilter::default()).await.unwrap().len(), 1);

        delete_entry(&db, &e.id).await.unwrap();
        assert!(search_entries(&db, "mysql", &MemoryFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn short_patterns_scan() {
        let db = db().await;
        insert_entry(&db, &entry(MemoryKey::shared("acme", "ci"), "CI runs on Go")).await.unwrap();
        insert_entry(&db, &entry(MemoryKey::shared("acme", "misc"), "nothing")).await.unwrap();
        let hits = search_entries(&db, "go", &MemoryFilter::default()).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "projects/acme/ci");
    }

    #[tokio::test]
    async fn view_reports_staleness() {
        let db = db().await;
        let mut old = entry(MemoryKey::shared("acme", "old"), "x");
        old.updated_at = NaiveDate::from_ymd_opt(2026, 3, 1);
        let mut undated = entry(MemoryKey::shared("acme", "undated"), "y");
        undated.updated_at = None;
        for e in [&old, &undated, &entry(MemoryKey::shared("acme", "new"), "z")] {
            insert_entry(&db, e).await.unwrap();
        }
        let view = staleness_view(&db).await.unwrap();
        assert_eq!(
            view,
            [
                ("projects/acme/new".to_string(), "fresh".to_string()),
                ("projects/acme/old".to_string(), "aging".to_string()),
                ("projects/acme/undated".to_string(), "stale".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_changeset_is_rejected() {
        let db = db().await;
        let changes = ChangeSet {
            upserts: vec![entry(MemoryKey::shared("acme", "notes"), "x")],
            records: vec![],
            dry_run: true,
        };
        assert!(matches!(
            apply_changes(&db, changes).await,
            Err(StrataError::PolicyViolation(_))
        ));
        assert!(list_entries(&db, &MemoryFilter::default()).await.unwrap().is_empty());
    }
}
