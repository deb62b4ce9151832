// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped tiered cache for Strata knowledge providers.
//!
//! [`TieredCache`] wraps exactly one [`ContextProvider`](strata_core::ContextProvider)
//! and keeps three independently invalidated tiers:
//!
//! 1. **Catalog**: catalogs, domain indexes and the loading protocol
//! 2. **Reference**: per-file metadata
//! 3. **Content**: materialized bodies, full or section-filtered
//!
//! A cache lives for one session. It starts empty and is emptied with
//! [`TieredCache::clear`] when the session ends; nothing is persisted.

pub mod cache;
pub mod stats;

pub use cache::{CachedContent, ContentKey, TieredCache};
pub use stats::{CacheStats, Tier, TierCounters, TierSnapshot};
