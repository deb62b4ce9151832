// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through the writer's tokio-rusqlite background
//! thread. Do NOT issue writes on the reader connection; it is opened with
//! `query_only` for file databases.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use rusqlite::functions::FunctionFlags;
use strata_core::staleness::{classify, parse_date};
use strata_core::{Clock, StrataError};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Special path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Convert a tokio-rusqlite error into a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> StrataError {
    StrataError::Storage {
        source: Box::new(e),
    }
}

/// Unwrap a domain error raised inside a connection closure.
pub fn flatten_err(e: tokio_rusqlite::Error<StrataError>) -> StrataError {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => StrataError::Storage {
            source: Box::new(other),
        },
    }
}

/// Wraps a rusqlite error raised inside a closure that returns `StrataError`.
pub fn sql_err(e: rusqlite::Error) -> StrataError {
    StrataError::Storage {
        source: Box::new(e),
    }
}

/// Writer and reader connections to one SQLite database.
///
/// In-memory databases share a single connection for both roles, since a
/// second `:memory:` connection would see an empty database.
#[derive(Clone)]
pub struct Database {
    writer: Connection,
    reader: Connection,
}

impl Database {
    /// Open (or create) a database file, apply PRAGMAs and run migrations.
    pub async fn open(path: &str, wal_mode: bool, clock: Arc<dyn Clock>) -> Result<Self, StrataError> {
        if path == IN_MEMORY {
            return Self::open_in_memory(clock).await;
        }
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(StrataError::io)?;
            }
        }

        let writer = Connection::open(path).await.map_err(|e| StrataError::Storage {
            source: Box::new(e),
        })?;
        let writer_clock = Arc::clone(&clock);
        writer
            .call(move |conn| -> Result<(), StrataError> {
                configure(conn, wal_mode, writer_clock).map_err(sql_err)?;
                run_migrations(conn)
            })
            .await
            .map_err(flatten_err)?;

        let reader = Connection::open(path).await.map_err(|e| StrataError::Storage {
            source: Box::new(e),
        })?;
        reader
            .call(move |conn| -> Result<(), rusqlite::Error> {
                configure(conn, false, clock)?;
                conn.execute_batch("PRAGMA query_only = ON;")
            })
            .await
            .map_err(map_tr_err)?;

        info!(path, wal_mode, "sqlite database opened");
        Ok(Self { writer, reader })
    }

    /// Open a private in-memory database with migrations applied.
    pub async fn open_in_memory(clock: Arc<dyn Clock>) -> Result<Self, StrataError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StrataError::Storage {
                source: Box::new(e),
            })?;
        conn.call(move |conn| -> Result<(), StrataError> {
            configure(conn, false, clock).map_err(sql_err)?;
            run_migrations(conn)
        })
        .await
        .map_err(flatten_err)?;
        debug!("in-memory sqlite database opened");
        Ok(Self {
            reader: conn.clone(),
            writer: conn,
        })
    }

    /// The single write connection.
    pub fn writer(&self) -> &Connection {
        &self.writer
    }

    /// Connection for reads.
    pub fn reader(&self) -> &Connection {
        &self.reader
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), StrataError> {
        self.writer
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Per-connection PRAGMAs and SQL functions.
fn configure(
    conn: &rusqlite::Connection,
    wal_mode: bool,
    clock: Arc<dyn Clock>,
) -> Result<(), rusqlite::Error> {
    if wal_mode {
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    }
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    register_staleness(conn, clock)
}

/// `strata_staleness(updated_at)` returns `fresh`, `aging` or `stale` using
/// the same classifier as every other backend.
fn register_staleness(conn: &rusqlite::Connection, clock: Arc<dyn Clock>) -> Result<(), rusqlite::Error> {
    let clock = AssertUnwindSafe(clock);
    conn.create_scalar_function(
        "strata_staleness",
        1,
        FunctionFlags::SQLITE_UTF8,
        move |ctx| {
            let updated_at: Option<String> = ctx.get(0)?;
            let date = updated_at.as_deref().and_then(parse_date);
            Ok(classify(date, clock.today()).to_string())
        },
    )
}
