// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staleness classification of knowledge and memory by age.
//!
//! [`classify`] is the single authority for freshness buckets. Backends,
//! the relational staleness view and the cache's freshness display all
//! call into this module instead of re-encoding the thresholds.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Last day (inclusive) of the fresh bucket.
const FRESH_MAX_DAYS: i64 = 30;

/// Last day (inclusive) of the aging bucket.
const AGING_MAX_DAYS: i64 = 90;

static TIMESTAMP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<!--\s*Last Updated:\s*(\d{4}-\d{2}-\d{2})\s*-->\s*$")
        .expect("timestamp regex is valid")
});

/// Freshness category of a stored item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Staleness {
    /// 0-30 days old.
    Fresh,
    /// 31-90 days old.
    Aging,
    /// 91+ days old, missing, unparseable or future-dated.
    Stale,
}

/// Classify an age in whole days.
///
/// Negative ages (timestamps in the future) cannot be trusted and are stale.
pub fn classify_age(age_days: i64) -> Staleness {
    match age_days {
        0..=FRESH_MAX_DAYS => Staleness::Fresh,
        d if d > FRESH_MAX_DAYS && d <= AGING_MAX_DAYS => Staleness::Aging,
        _ => Staleness::Stale,
    }
}

/// Classify a last-updated date against `today`.
pub fn classify(updated_at: Option<NaiveDate>, today: NaiveDate) -> Staleness {
    match updated_at {
        Some(date) => classify_age(age_in_days(date, today)),
        None => Staleness::Stale,
    }
}

/// Whole days elapsed from `date` to `today` (negative if `date` is in the future).
pub fn age_in_days(date: NaiveDate, today: NaiveDate) -> i64 {
    (today - date).num_days()
}

/// Parse a `YYYY-MM-DD` calendar date, returning `None` for anything else.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Parse the `<!-- Last Updated: YYYY-MM-DD -->` header line of a memory file.
pub fn parse_timestamp_line(line: &str) -> Option<NaiveDate> {
    TIMESTAMP_LINE
        .captures(line.trim_end_matches('\r'))
        .and_then(|caps| parse_date(&caps[1]))
}

/// Render the header line for a memory file.
pub fn timestamp_line(date: NaiveDate) -> String {
    format!("<!-- Last Updated: {} -->", date.format("%Y-%m-%d"))
}

/// Source of "today" for classification and timestamp refresh.
pub trait Clock: Send + Sync + 'static {
    /// The current calendar date.
    fn today(&self) -> NaiveDate;
}

/// Wall-clock dates in the local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date. Used by tests and migration tooling.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
