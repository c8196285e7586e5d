//! Final normalization: collapse, timezone shift, range clip, rescale to 100.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::{SeriesPoint, StitchedSeries};
use crate::error::StitchError;

/// Maximum of every normalized series.
pub const CEILING: f64 = 100.0;

/// Turns a stitched series into the final `[start, end]` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    start: NaiveDate,
    end: NaiveDate,
    tz_offset_minutes: i32,
}

impl Normalizer {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            tz_offset_minutes: 0,
        }
    }

    /// Shift applied to every timestamp, e.g. 480 for UTC+8, -360 for UTC-6.
    pub fn with_tz_offset(mut self, minutes: i32) -> Self {
        self.tz_offset_minutes = minutes;
        self
    }

    /// First instant kept: `start` at midnight.
    pub fn lower_bound(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Last instant kept: `end` at 23:59:59.
    pub fn upper_bound(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1)
    }

    /// Full pipeline. Each step is also available on its own.
    pub fn normalize(&self, series: &StitchedSeries) -> Result<Vec<SeriesPoint>, StitchError> {
        let points = series.collapse();
        let points = self.shift(points);
        let points = self.clip(points);
        if points.is_empty() {
            return Err(StitchError::EmptyRange {
                start: self.start,
                end: self.end,
            });
        }
        rescale(points)
    }

    pub fn shift(&self, mut points: Vec<SeriesPoint>) -> Vec<SeriesPoint> {
        if self.tz_offset_minutes != 0 {
            let offset = Duration::minutes(i64::from(self.tz_offset_minutes));
            for p in &mut points {
                p.timestamp += offset;
            }
        }
        points
    }

    pub fn clip(&self, points: Vec<SeriesPoint>) -> Vec<SeriesPoint> {
        let (lower, upper) = (self.lower_bound(), self.upper_bound());
        points
            .into_iter()
            .filter(|p| lower <= p.timestamp && p.timestamp <= upper)
            .collect()
    }
}

/// `value' = round(100 * value / max)`; a non-empty result peaks at exactly
/// 100. Halves round to even.
pub fn rescale(mut points: Vec<SeriesPoint>) -> Result<Vec<SeriesPoint>, StitchError> {
    let Some(max) = series_max(&points) else {
        return Ok(points);
    };
    if !(max > 0.0 && max.is_finite()) {
        return Err(StitchError::DegenerateMax);
    }
    for p in &mut points {
        p.value = (CEILING * p.value / max).round_ties_even();
    }
    Ok(points)
}

/// Largest value in a series, if any.
pub fn series_max(points: &[SeriesPoint]) -> Option<f64> {
    points.iter().map(|p| p.value).reduce(f64::max)
}
