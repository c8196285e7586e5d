//! Fetch windows, timeframes and context filters.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date format used for request dates and range timeframes.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A bounded sub-window `[start, end]` (both inclusive, calendar days).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Window {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days between start and end (end - start).
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Shared days of two windows, if any.
    pub fn intersection(&self, other: &Window) -> Option<Window> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Window { start, end })
    }

    pub fn timeframe(&self) -> Timeframe {
        Timeframe::Range {
            start: self.start,
            end: self.end,
        }
    }

    /// Every calendar day in the window, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..=self.span_days().max(-1)).map(move |i| start + Duration::days(i))
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Timeframe understood by a sample source.
///
/// `Range` asks for full-resolution (daily) samples over explicit dates.
/// `Trailing` asks for the most recent N days, which the source only serves
/// at a finer (hourly) resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Timeframe {
    Range { start: NaiveDate, end: NaiveDate },
    Trailing { days: u32 },
}

impl Timeframe {
    /// Resolution the source serves this timeframe at.
    pub fn resolution(&self) -> Resolution {
        match self {
            Timeframe::Range { .. } => Resolution::Daily,
            Timeframe::Trailing { .. } => Resolution::Hourly,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timeframe::Range { start, end } => {
                write!(f, "{} {}", start.format(DATE_FORMAT), end.format(DATE_FORMAT))
            }
            Timeframe::Trailing { days } => write!(f, "now {days}-d"),
        }
    }
}

/// Time granularity of the samples in a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Daily,
    Hourly,
}

impl Resolution {
    pub fn unit(&self) -> Duration {
        match self {
            Resolution::Daily => Duration::days(1),
            Resolution::Hourly => Duration::hours(1),
        }
    }
}

/// Context filters passed through to the source untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filters {
    /// Category id (0 = all categories).
    pub category: i64,
    /// Region code ("" = worldwide).
    pub region: String,
    /// Property ("" = web search).
    pub property: String,
}
