//! Progress reporting for verbose runs.
//!
//! The engine reports per-chunk and per-scaling events through [`Progress`].
//! `verbose = true` selects [`ConsoleProgress`]; otherwise the engine stays
//! silent and only terminal failures surface (as returned errors).

use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;

use crate::domain::{Timeframe, DATE_FORMAT};
use crate::error::Stage;
use crate::source::SourceError;

/// Callbacks for one `get_series` run.
pub trait Progress {
    /// Called before each fetch attempt sequence for a timeframe.
    fn on_fetch(&self, keyword: &str, timeframe: &Timeframe);

    /// Called when a transient failure will be retried after `delay`.
    fn on_retry(&self, timeframe: &Timeframe, attempt: u32, delay: Duration, error: &SourceError);

    /// Called when a scale coefficient has been inferred from an overlap.
    fn on_scale(&self, stage: Stage, from: NaiveDateTime, to: NaiveDateTime, coef: f64);

    /// Called when hourly samples were aggregated to daily buckets.
    fn on_gap_fill(&self, days: usize, dropped_first_day: Option<NaiveDate>);

    /// Called once the final series has been rescaled.
    fn on_normalize(&self, keyword: &str, points: usize, overlap_points: usize);
}

/// Prints progress to stdout.
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn on_fetch(&self, keyword: &str, timeframe: &Timeframe) {
        println!("Fetching '{keyword}' for period: {timeframe}");
    }

    fn on_retry(&self, timeframe: &Timeframe, attempt: u32, delay: Duration, error: &SourceError) {
        println!("{error}");
        println!(
            "Trying '{timeframe}' again in {} seconds (retry {}).",
            delay.as_secs(),
            attempt + 1
        );
    }

    fn on_scale(&self, _stage: Stage, from: NaiveDateTime, to: NaiveDateTime, coef: f64) {
        println!(
            "Normalize by overlapping period: {} {} (coef {coef:.4})",
            from.format(DATE_FORMAT),
            to.format(DATE_FORMAT)
        );
    }

    fn on_gap_fill(&self, days: usize, dropped_first_day: Option<NaiveDate>) {
        match dropped_first_day {
            Some(day) => println!(
                "Completing tail with {days} aggregated day(s), dropped incomplete {day}"
            ),
            None => println!("Completing tail with {days} aggregated day(s)"),
        }
    }

    fn on_normalize(&self, keyword: &str, points: usize, overlap_points: usize) {
        println!("Rescaled '{keyword}' to a maximum of 100: {points} points, {overlap_points} overlapping");
    }
}

/// Discards every event.
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn on_fetch(&self, _keyword: &str, _timeframe: &Timeframe) {}

    fn on_retry(
        &self,
        _timeframe: &Timeframe,
        _attempt: u32,
        _delay: Duration,
        _error: &SourceError,
    ) {
    }

    fn on_scale(&self, _stage: Stage, _from: NaiveDateTime, _to: NaiveDateTime, _coef: f64) {}

    fn on_gap_fill(&self, _days: usize, _dropped_first_day: Option<NaiveDate>) {}

    fn on_normalize(&self, _keyword: &str, _points: usize, _overlap_points: usize) {}
}

/// Reporter matching the `verbose` flag.
pub fn for_verbosity(verbose: bool) -> &'static dyn Progress {
    if verbose {
        &ConsoleProgress
    } else {
        &SilentProgress
    }
}
