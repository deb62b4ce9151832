// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite backend for the Strata knowledge cache.
//!
//! Memory entries, the append-only prune history and an imported copy of the
//! knowledge tree live in one database. Writes go through a single
//! `tokio-rusqlite` connection; reads use a second connection so WAL readers
//! never wait on the writer. Full-text search runs on FTS5 indexes kept in
//! sync by triggers.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteBackend;
pub use database::Database;
