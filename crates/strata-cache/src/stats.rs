// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hit and miss accounting per cache tier.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// One of the three cache levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Catalog,
    Reference,
    Content,
}

/// Live counters for one tier.
#[derive(Debug, Default)]
pub struct TierCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TierCounters {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self, entries: usize) -> TierSnapshot {
        TierSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}

/// Point-in-time view of one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl TierSnapshot {
    /// Fraction of lookups served from the cache, 0.0 when nothing was asked.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Statistics for every tier of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub catalog: TierSnapshot,
    pub reference: TierSnapshot,
    pub content: TierSnapshot,
}

impl CacheStats {
    pub fn tier(&self, tier: Tier) -> TierSnapshot {
        match tier {
            Tier::Catalog => self.catalog,
            Tier::Reference => self.reference,
            Tier::Content => self.content,
        }
    }

    pub fn entries(&self) -> usize {
        self.catalog.entries + self.reference.entries + self.content.entries
    }
}

/// Counters for all three tiers, owned by the cache.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub catalog: TierCounters,
    pub reference: TierCounters,
    pub content: TierCounters,
}

impl Counters {
    pub fn tier(&self, tier: Tier) -> &TierCounters {
        match tier {
            Tier::Catalog => &self.catalog,
            Tier::Reference => &self.reference,
            Tier::Content => &self.content,
        }
    }

    pub fn snapshot(&self, catalog: usize, reference: usize, content: usize) -> CacheStats {
        CacheStats {
            catalog: self.catalog.snapshot(catalog),
            reference: self.reference.snapshot(reference),
            content: self.content.snapshot(content),
        }
    }

    pub fn reset(&self) {
        self.catalog.reset();
        self.reference.reset();
        self.content.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn hit_rate_handles_empty_tiers() {
        assert_eq!(TierSnapshot::default().hit_rate(), 0.0);
        let snap = TierSnapshot {
            hits: 3,
            misses: 1,
            entries: 1,
        };
        assert!((snap.hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn counters_snapshot_and_reset() {
        let counters = Counters::default();
        counters.tier(Tier::Content).miss();
        counters.tier(Tier::Content).hit();
        counters.tier(Tier::Content).hit();
        let stats = counters.snapshot(0, 0, 1);
        assert_eq!(stats.content.hits, 2);
        assert_eq!(stats.content.misses, 1);
        assert_eq!(stats.tier(Tier::Catalog), TierSnapshot::default());
        assert_eq!(stats.entries(), 1);

        counters.reset();
        assert_eq!(counters.snapshot(0, 0, 0), CacheStats::default());
    }

    #[test]
    fn tier_names() {
        assert_eq!(Tier::Reference.to_string(), "reference");
        assert_eq!(Tier::from_str("content").unwrap(), Tier::Content);
    }
}
