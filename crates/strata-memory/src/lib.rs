// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory lifecycle for the Strata knowledge cache.
//!
//! [`MemoryService`] turns the storage primitives of any
//! [`EntryStore`](strata_core::EntryStore) into the full memory contract:
//! create/read/update/append/delete, aggregate reads with fresh staleness,
//! search, explicit pruning with dry runs, and the prune audit trail.
//! [`migrate`] copies memory between backends without losing dates or history.

pub mod locks;
pub mod migrate;
pub mod service;

pub use locks::{KeyGuard, KeyedLocks};
pub use migrate::{MigrationReport, migrate};
pub use service::{AppendOutcome, MemoryService, PrunePlan};
