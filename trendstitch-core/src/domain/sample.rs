//! Sample and Chunk: the raw unit of data returned by one fetch.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::window::{Resolution, Timeframe};

/// One relative-popularity observation.
///
/// Values are scaled by the source to at most 100 within their own fetch
/// window and are never comparable across windows without rescaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Samples for one keyword over one fetched timeframe.
///
/// Timestamps are strictly increasing. Partial trailing units have already
/// been discarded by the fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub keyword: String,
    pub timeframe: Timeframe,
    pub resolution: Resolution,
    pub samples: Vec<Sample>,
}

impl Chunk {
    pub fn new(keyword: impl Into<String>, timeframe: Timeframe, samples: Vec<Sample>) -> Self {
        Self {
            keyword: keyword.into(),
            resolution: timeframe.resolution(),
            timeframe,
            samples,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.samples.iter().map(|s| s.timestamp)
    }

    /// Value at an exact timestamp.
    pub fn value_at(&self, timestamp: NaiveDateTime) -> Option<f64> {
        self.samples
            .binary_search_by_key(&timestamp, |s| s.timestamp)
            .ok()
            .map(|i| self.samples[i].value)
    }

    /// Maximum value over the given timestamps (those absent are ignored).
    pub fn max_over(&self, timestamps: &BTreeSet<NaiveDateTime>) -> Option<f64> {
        self.samples
            .iter()
            .filter(|s| timestamps.contains(&s.timestamp))
            .map(|s| s.value)
            .reduce(f64::max)
    }

    /// Copy of this chunk with every value multiplied by `coef`.
    pub fn scaled(&self, coef: f64) -> Chunk {
        let mut out = self.clone();
        for s in &mut out.samples {
            s.value *= coef;
        }
        out
    }

    /// Check the ordering invariant: strictly increasing, no duplicates.
    pub fn is_strictly_increasing(&self) -> bool {
        self.samples
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp)
    }

    /// Check for gaps: consecutive samples are exactly one resolution unit apart.
    pub fn is_contiguous(&self) -> bool {
        let unit = self.resolution.unit();
        self.samples
            .windows(2)
            .all(|w| w[1].timestamp - w[0].timestamp == unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn chunk(values: &[f64]) -> Chunk {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(ts(i as u32 + 1), v))
            .collect();
        Chunk::new(
            "X",
            Timeframe::Range {
                start: ts(1).date(),
                end: ts(values.len() as u32).date(),
            },
            samples,
        )
    }

    #[test]
    fn value_lookup_by_timestamp() {
        let c = chunk(&[10.0, 20.0, 30.0]);
        assert_eq!(c.value_at(ts(2)), Some(20.0));
        assert_eq!(c.value_at(ts(9)), None);
    }

    #[test]
    fn max_over_ignores_absent_timestamps() {
        let c = chunk(&[10.0, 50.0, 30.0]);
        let set: BTreeSet<_> = [ts(1), ts(3), ts(20)].into_iter().collect();
        assert_eq!(c.max_over(&set), Some(30.0));
        assert_eq!(c.max_over(&BTreeSet::new()), None);
    }

    #[test]
    fn scaled_multiplies_every_value() {
        let c = chunk(&[1.0, 2.0]).scaled(2.5);
        assert_eq!(c.samples[0].value, 2.5);
        assert_eq!(c.samples[1].value, 5.0);
    }

    #[test]
    fn detects_out_of_order_samples() {
        let mut c = chunk(&[1.0, 2.0, 3.0]);
        assert!(c.is_strictly_increasing());
        c.samples.swap(0, 1);
        assert!(!c.is_strictly_increasing());
    }

    #[test]
    fn detects_missing_days() {
        let mut c = chunk(&[1.0, 2.0, 3.0, 4.0]);
        assert!(c.is_contiguous());
        c.samples.remove(2);
        assert!(c.is_strictly_increasing());
        assert!(!c.is_contiguous());
    }

    #[test]
    fn hourly_chunks_step_by_the_hour() {
        let start = ts(1);
        let samples = (0..5)
            .map(|h| Sample::new(start + chrono::Duration::hours(h), 1.0))
            .collect();
        let mut c = Chunk::new("X", Timeframe::Trailing { days: 1 }, samples);
        assert!(c.is_contiguous());
        c.samples[4].timestamp += chrono::Duration::hours(1);
        assert!(!c.is_contiguous());
    }

    #[test]
    fn resolution_follows_timeframe() {
        let c = chunk(&[1.0]);
        assert_eq!(c.resolution, Resolution::Daily);
    }
}
