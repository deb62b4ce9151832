// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Strata integration tests.
//!
//! - [`InMemoryStore`]: an `EntryStore` over in-process maps
//! - [`CountingProvider`]: wraps a `ContextProvider` and counts backend reads
//! - [`MockRemote`]: a scripted `RemoteSource` that can fail or stall
//! - [`fixtures`]: knowledge trees and memory content builders

pub mod counting;
pub mod fixtures;
pub mod memory_store;
pub mod mock_remote;

use std::sync::Arc;

use chrono::NaiveDate;
use strata_core::{Clock, FixedClock};

pub use counting::{CallCounts, CountingProvider};
pub use memory_store::InMemoryStore;
pub use mock_remote::{MockRemote, RemoteBehavior};

/// The date every fixture is written against.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap_or_default()
}

/// `today()` minus `days`.
pub fn days_ago(days: i64) -> NaiveDate {
    today() - chrono::Duration::days(days)
}

/// A clock pinned to [`today`].
pub fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(today()))
}
