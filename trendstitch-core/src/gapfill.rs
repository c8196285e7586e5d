//! Gap filling for the trailing days the source withholds at daily
//! resolution.
//!
//! Hourly samples from a short trailing window are summed per calendar day.
//! The first aggregated day is usually cut off by the window start; unless it
//! holds a full day's worth of hours it is dropped. The remaining days are
//! scaled onto the existing series via the days both share, rounded to whole
//! numbers, and merged in.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Chunk, Sample, StitchedSeries, Timeframe};
use crate::error::{scale_coefficient, Stage, StitchError};
use crate::progress::{Progress, SilentProgress};

/// Gap filling settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFillConfig {
    pub enabled: bool,
    /// Length of the trailing hourly window (`now N-d`).
    pub trailing_days: u32,
    /// Sub-units a complete day must contain.
    pub units_per_day: u32,
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            trailing_days: 7,
            units_per_day: 24,
        }
    }
}

impl GapFillConfig {
    pub fn timeframe(&self) -> Timeframe {
        Timeframe::Trailing {
            days: self.trailing_days,
        }
    }
}

/// Hourly samples rolled up to days.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    /// One sample per day at midnight, value = sum of that day's hours.
    pub days: Vec<Sample>,
    /// First day, if it was dropped for being incomplete.
    pub dropped_first_day: Option<NaiveDate>,
}

pub struct GapFiller<'a> {
    config: GapFillConfig,
    progress: &'a dyn Progress,
}

impl<'a> GapFiller<'a> {
    pub fn new(config: GapFillConfig) -> Self {
        Self {
            config,
            progress: &SilentProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    /// True when the series stops short of `end` at daily resolution.
    pub fn needs_fill(&self, series: &StitchedSeries, end: NaiveDate) -> bool {
        self.config.enabled && series.last_timestamp().map_or(true, |ts| ts.date() < end)
    }

    /// Sum hourly samples per calendar day and validate the first day.
    pub fn aggregate_daily(&self, hourly: &Chunk) -> DailyAggregate {
        let mut buckets: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
        for s in &hourly.samples {
            let bucket = buckets.entry(s.timestamp.date()).or_insert((0.0, 0));
            bucket.0 += s.value;
            bucket.1 += 1;
        }

        let mut dropped_first_day = None;
        if let Some((&first, &(_, count))) = buckets.iter().next() {
            if count != self.config.units_per_day {
                buckets.remove(&first);
                dropped_first_day = Some(first);
            }
        }

        let days = buckets
            .into_iter()
            .map(|(day, (sum, _))| Sample::new(midnight(day), sum))
            .collect();

        DailyAggregate {
            days,
            dropped_first_day,
        }
    }

    /// Aggregate `hourly`, scale it onto `series` and merge it in.
    pub fn fill(&self, mut series: StitchedSeries, hourly: &Chunk) -> Result<StitchedSeries, StitchError> {
        let aggregate = self.aggregate_daily(hourly);
        let daily = Chunk::new(hourly.keyword.clone(), hourly.timeframe, aggregate.days);

        let shared = series.intersection(&daily);
        let (from, to) = match (shared.first(), shared.last()) {
            (Some(from), Some(to)) => (*from, *to),
            _ => {
                return Err(StitchError::EmptyIntersection {
                    stage: Stage::GapFill,
                    context: format!(
                        "{} aggregated day(s) from '{}' share no date with the series ending {}",
                        daily.len(),
                        hourly.timeframe,
                        series
                            .last_timestamp()
                            .map_or_else(|| "nowhere".to_string(), |ts| ts.date().to_string())
                    ),
                })
            }
        };

        let coef = scale_coefficient(
            Stage::GapFill,
            series.max_over(&shared).unwrap_or(0.0),
            daily.max_over(&shared).unwrap_or(0.0),
        )?;

        tracing::debug!(
            days = daily.len(),
            dropped_first_day = ?aggregate.dropped_first_day,
            shared_days = shared.len(),
            coef,
            "filling trailing gap from hourly samples"
        );
        self.progress.on_gap_fill(daily.len(), aggregate.dropped_first_day);
        self.progress.on_scale(Stage::GapFill, from, to, coef);

        let mut scaled = daily.scaled(coef);
        for s in &mut scaled.samples {
            s.value = s.value.round_ties_even();
        }

        series.add_chunk(&scaled);
        series.mark_overlap(shared);
        Ok(series)
    }
}

fn midnight(day: NaiveDate) -> NaiveDateTime {
    day.and_time(chrono::NaiveTime::MIN)
}
