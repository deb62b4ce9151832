// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Imported knowledge files and the loading protocol.

use rusqlite::params;
use strata_core::{CrossDomainRule, KnowledgeReference, StrataError};
use strata_files::{KnowledgeTree, StoredDocument};

use crate::database::{Database, flatten_err, map_tr_err, sql_err};

const LOADING_PROTOCOL_KEY: &str = "loading_protocol";

/// A stored knowledge file with its metadata decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeRow {
    pub reference: KnowledgeReference,
    pub cross_domain: Vec<CrossDomainRule>,
}

fn json_err(e: serde_json::Error) -> StrataError {
    StrataError::Storage {
        source: Box::new(e),
    }
}

fn decode(reference: &str, cross_domain: &str) -> Result<KnowledgeRow, StrataError> {
    Ok(KnowledgeRow {
        reference: serde_json::from_str(reference).map_err(json_err)?,
        cross_domain: serde_json::from_str(cross_domain).map_err(json_err)?,
    })
}

/// Serialized form of one document, ready to bind.
struct EncodedDocument {
    id: String,
    domain: String,
    file: String,
    title: String,
    tags: String,
    reference: String,
    cross_domain: String,
    body: String,
}

impl EncodedDocument {
    fn new(doc: &StoredDocument) -> Result<Self, StrataError> {
        Ok(Self {
            id: doc.reference.id.clone(),
            domain: doc.reference.domain.clone(),
            file: doc.reference.file.clone(),
            title: doc.reference.title.clone(),
            tags: doc
                .reference
                .tags
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(" "),
            reference: serde_json::to_string(&doc.reference).map_err(json_err)?,
            cross_domain: serde_json::to_string(&doc.cross_domain).map_err(json_err)?,
            body: doc.body.clone(),
        })
    }
}

/// Replace the stored knowledge with `tree`. Returns the number of files.
pub async fn replace_tree(db: &Database, tree: &KnowledgeTree) -> Result<usize, StrataError> {
    let docs = tree
        .documents
        .iter()
        .map(EncodedDocument::new)
        .collect::<Result<Vec<_>, _>>()?;
    let protocol = tree.loading_protocol.clone();
    db.writer()
        .call(move |conn| -> Result<usize, StrataError> {
            let tx = conn.transaction().map_err(sql_err)?;
            tx.execute("DELETE FROM knowledge_files", []).map_err(sql_err)?;
            tx.execute(
                "DELETE FROM knowledge_meta WHERE key = ?1",
                params![LOADING_PROTOCOL_KEY],
            )
            .map_err(sql_err)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT INTO knowledge_files (id, domain, file, title, tags, reference, cross_domain, body)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    )
                    .map_err(sql_err)?;
                for doc in &docs {
                    stmt.execute(params![
                        doc.id,
                        doc.domain,
                        doc.file,
                        doc.title,
                        doc.tags,
                        doc.reference,
                        doc.cross_domain,
                        doc.body,
                    ])
                    .map_err(sql_err)?;
                }
            }
            if let Some(protocol) = &protocol {
                tx.execute(
                    "INSERT INTO knowledge_meta (key, value) VALUES (?1, ?2)",
                    params![LOADING_PROTOCOL_KEY, protocol],
                )
                .map_err(sql_err)?;
            }
            tx.commit().map_err(sql_err)?;
            Ok(docs.len())
        })
        .await
        .map_err(flatten_err)
}

/// Every domain that has at least one stored file, sorted.
pub async fn list_domains(db: &Database) -> Result<Vec<String>, StrataError> {
    db.reader()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT DISTINCT domain FROM knowledge_files ORDER BY domain")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// All files of a domain, sorted by id.
pub async fn domain_files(db: &Database, domain: &str) -> Result<Vec<KnowledgeRow>, StrataError> {
    let domain = domain.to_string();
    let raw = db
        .reader()
        .call(move |conn| -> Result<Vec<(String, String)>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT reference, cross_domain FROM knowledge_files WHERE domain = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![domain], |row| Ok((row.get(0)?, row.get(1)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    raw.iter().map(|(r, c)| decode(r, c)).collect()
}

/// One file's metadata.
pub async fn get_file(
    db: &Database,
    domain: &str,
    file: &str,
) -> Result<Option<KnowledgeRow>, StrataError> {
    let (domain, file) = (domain.to_string(), file.to_string());
    let raw = db
        .reader()
        .call(move |conn| -> Result<Option<(String, String)>, rusqlite::Error> {
            let result = conn.query_row(
                "SELECT reference, cross_domain FROM knowledge_files WHERE domain = ?1 AND file = ?2",
                params![domain, file],
                |row| Ok((row.get(0)?, row.get(1)?)),
            );
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;
    raw.map(|(r, c)| decode(&r, &c)).transpose()
}

/// Body text of one file.
pub async fn get_body(db: &Database, id: &str) -> Result<Option<String>, StrataError> {
    let id = id.to_string();
    db.reader()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            match conn.query_row(
                "SELECT body FROM knowledge_files WHERE id = ?1",
                params![id],
                |row| row.get(0),
            ) {
                Ok(body) => Ok(Some(body)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

pub async fn loading_protocol(db: &Database) -> Result<Option<String>, StrataError> {
    db.reader()
        .call(|conn| -> Result<Option<String>, rusqlite::Error> {
            match conn.query_row(
                "SELECT value FROM knowledge_meta WHERE key = ?1",
                params![LOADING_PROTOCOL_KEY],
                |row| row.get(0),
            ) {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// OR-query of every whitespace-separated term, each quoted as a phrase.
fn match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

/// BM25-ranked matches as `(reference, score)`, higher scores first.
pub async fn search(
    db: &Database,
    query: &str,
    domain: Option<&str>,
) -> Result<Vec<(KnowledgeReference, f32)>, StrataError> {
    let Some(expr) = match_expression(query) else {
        return Ok(Vec::new());
    };
    let domain = domain.map(str::to_string);
    let raw = db
        .reader()
        .call(move |conn| -> Result<Vec<(String, f64)>, rusqlite::Error> {
            // Column weights: title, tags, body.
            let mut stmt = conn.prepare(
                "SELECT k.reference, bm25(knowledge_files_fts, 3.0, 2.0, 1.0) AS relevance
                 FROM knowledge_files_fts
                 JOIN knowledge_files k ON k.rowid = knowledge_files_fts.rowid
                 WHERE knowledge_files_fts MATCH ?1 AND (?2 IS NULL OR k.domain = ?2)
                 ORDER BY relevance, k.id",
            )?;
            let rows = stmt.query_map(params![expr, domain], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;
    raw.into_iter()
        .map(|(reference, relevance)| {
            let reference = serde_json::from_str(&reference).map_err(json_err)?;
            // bm25() is negative; flip it so larger means more relevant.
            Ok((reference, -relevance as f32))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_expression_quotes_terms() {
        assert_eq!(match_expression("  "), None);
        assert_eq!(
            match_expression("django orm"),
            Some("\"django\" OR \"orm\"".to_string())
        );
        assert_eq!(match_expression("a\"b"), Some("\"a\"\"b\"".to_string()));
    }
}
