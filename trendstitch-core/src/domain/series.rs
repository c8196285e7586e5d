//! StitchedSeries, the accumulator grown by one merge per fetched chunk.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::sample::Chunk;

/// One point of a collapsed or normalized series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    /// True where two or more chunks contributed and scaling was applied.
    pub overlap: bool,
}

/// Union of all chunks merged so far.
///
/// Each timestamp keeps every contributing (already scaled) value until
/// [`StitchedSeries::collapse`] averages them. The overlap flags are kept in a
/// parallel map and combine by logical OR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StitchedSeries {
    values: BTreeMap<NaiveDateTime, Vec<f64>>,
    overlap: BTreeMap<NaiveDateTime, bool>,
}

impl StitchedSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a series from a single chunk (no scaling, no overlap).
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let mut series = Self::new();
        series.add_chunk(chunk);
        series
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.values.keys().next_back().copied()
    }

    /// Number of values contributed at a timestamp.
    pub fn contributions(&self, timestamp: NaiveDateTime) -> usize {
        self.values.get(&timestamp).map_or(0, Vec::len)
    }

    /// Mean of the contributions at a timestamp.
    pub fn value_at(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.values.get(&timestamp).and_then(|v| mean(v))
    }

    pub fn is_overlap(&self, timestamp: NaiveDateTime) -> bool {
        self.overlap.get(&timestamp).copied().unwrap_or(false)
    }

    /// Timestamps present both here and in `chunk`.
    pub fn intersection(&self, chunk: &Chunk) -> BTreeSet<NaiveDateTime> {
        chunk
            .timestamps()
            .filter(|ts| self.values.contains_key(ts))
            .collect()
    }

    /// Maximum collapsed value over the given timestamps.
    pub fn max_over(&self, timestamps: &BTreeSet<NaiveDateTime>) -> Option<f64> {
        timestamps
            .iter()
            .filter_map(|ts| self.value_at(*ts))
            .reduce(f64::max)
    }

    /// Add every sample of `chunk` as a contribution. Existing contributions
    /// are kept, so shared timestamps end up with several values.
    pub fn add_chunk(&mut self, chunk: &Chunk) {
        for s in &chunk.samples {
            self.values.entry(s.timestamp).or_default().push(s.value);
            self.overlap.entry(s.timestamp).or_insert(false);
        }
    }

    pub fn mark_overlap<I>(&mut self, timestamps: I)
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        for ts in timestamps {
            if self.values.contains_key(&ts) {
                self.overlap.insert(ts, true);
            }
        }
    }

    /// Divide every contribution by `divisor`.
    pub fn divide_all(&mut self, divisor: f64) {
        for values in self.values.values_mut() {
            for v in values.iter_mut() {
                *v /= divisor;
            }
        }
    }

    /// Drop every timestamp at or after `timestamp`.
    pub fn truncate_from(&mut self, timestamp: NaiveDateTime) {
        self.values.retain(|ts, _| *ts < timestamp);
        self.overlap.retain(|ts, _| *ts < timestamp);
    }

    /// True once every timestamp holds a single value.
    pub fn is_collapsed(&self) -> bool {
        self.values.values().all(|v| v.len() <= 1)
    }

    /// Average duplicate contributions per timestamp. Overlap flags were
    /// already OR-combined when marked.
    pub fn collapse(&self) -> Vec<SeriesPoint> {
        self.values
            .iter()
            .filter_map(|(ts, values)| {
                mean(values).map(|value| SeriesPoint {
                    timestamp: *ts,
                    value,
                    overlap: self.is_overlap(*ts),
                })
            })
            .collect()
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
