//! Property tests for planning, stitching and normalization invariants.
//!
//! Uses proptest to verify:
//! 1. Planning coverage — windows span `[start, end]` with no gaps
//! 2. Scale invariance — per-chunk scale factors do not change the result
//! 3. Range clipping — no output outside `[start 00:00, end 23:59:59]`
//! 4. Max normalization — every non-degenerate output peaks at exactly 100

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use proptest::prelude::*;
use trendstitch_core::domain::{Chunk, Sample, SeriesPoint, StitchedSeries, Timeframe, Window};
use trendstitch_core::normalize::{rescale, series_max, Normalizer};
use trendstitch_core::planner::{CursorStep, WindowPlanner, MAX_RESOLUTION_SPAN_DAYS};
use trendstitch_core::stitch::{ChunkStitcher, StitchPolicy};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_start() -> impl Strategy<Value = NaiveDate> {
    (0i64..7000).prop_map(|offset| NaiveDate::from_ymd_opt(2004, 1, 1).unwrap() + Duration::days(offset))
}

/// `(max_span, overlap)` with `overlap < max_span`.
fn arb_span_and_overlap() -> impl Strategy<Value = (u32, u32)> {
    (2u32..=MAX_RESOLUTION_SPAN_DAYS).prop_flat_map(|span| (Just(span), 0..span))
}

fn midnight(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

fn chunk_for(window: Window, truth: &[f64], origin: NaiveDate, factor: f64) -> Chunk {
    let samples = window
        .days()
        .map(|day| {
            let i = (day - origin).num_days() as usize;
            Sample::new(midnight(day), truth[i] * factor)
        })
        .collect();
    Chunk::new("X", window.timeframe(), samples)
}

fn points(origin: NaiveDate, values: &[f64]) -> Vec<SeriesPoint> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| SeriesPoint {
            timestamp: midnight(origin + Duration::days(i as i64)),
            value,
            overlap: false,
        })
        .collect()
}

// ── 1. Planning coverage ─────────────────────────────────────────────

proptest! {
    /// Backward windows start at `end`, reach `start`, and chain with overlap.
    #[test]
    fn backward_plan_covers_the_range(
        start in arb_start(),
        length in 0i64..3000,
        (span, overlap) in arb_span_and_overlap(),
    ) {
        let end = start + Duration::days(length);
        let windows = WindowPlanner::new(start, end, span).unwrap().backward(overlap).unwrap();

        prop_assert!(!windows.is_empty());
        prop_assert_eq!(windows[0].end, end);
        prop_assert_eq!(windows[windows.len() - 1].start, start);
        for w in &windows {
            prop_assert!(w.start <= w.end);
            prop_assert!(w.span_days() <= i64::from(span));
            prop_assert!(start <= w.start && w.end <= end);
        }
        // Fetch order is newest first; each older window reaches into the newer one.
        for pair in windows.windows(2) {
            let (newer, older) = (pair[0], pair[1]);
            prop_assert!(older.start < newer.start);
            prop_assert!(older.end >= newer.start);
        }
    }

    /// Forward windows chain end-to-start and finish exactly at `end`.
    #[test]
    fn forward_preview_covers_the_range(
        start in arb_start(),
        length in 0i64..3000,
        span in 1u32..=MAX_RESOLUTION_SPAN_DAYS,
    ) {
        let end = start + Duration::days(length);
        let windows = WindowPlanner::new(start, end, span).unwrap().forward_preview();

        prop_assert!(!windows.is_empty());
        prop_assert_eq!(windows[0].start, start);
        prop_assert_eq!(windows[windows.len() - 1].end, end);
        for pair in windows.windows(2) {
            prop_assert_eq!(pair[1].start, pair[0].end);
            prop_assert!(pair[1].end > pair[0].end);
        }
    }

    /// A fetch that returns nothing past the cursor stalls instead of looping.
    #[test]
    fn forward_cursor_stalls_on_no_progress(
        start in arb_start(),
        length in 2i64..3000,
        span in 1u32..=MAX_RESOLUTION_SPAN_DAYS,
    ) {
        let end = start + Duration::days(length);
        let mut cursor = WindowPlanner::new(start, end, span).unwrap().forward();
        let step = cursor.advance(start);
        prop_assert_eq!(step, CursorStep::Stalled { at: start });
        prop_assert!(cursor.current().is_none());
    }
}

// ── 2. Scale invariance ──────────────────────────────────────────────

proptest! {
    /// Rescaling each fetched chunk by its own positive factor leaves the
    /// stitched shape unchanged, for both policies.
    #[test]
    fn stitching_is_invariant_to_per_chunk_scale(
        truth in prop::collection::vec(1.0..1000.0_f64, 60..400),
        factors in prop::collection::vec(0.01..100.0_f64, 16),
        span in 20u32..60,
        splice in any::<bool>(),
    ) {
        let origin = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let end = origin + Duration::days(truth.len() as i64 - 1);
        let planner = WindowPlanner::new(origin, end, span).unwrap();

        let (policy, windows) = if splice {
            (StitchPolicy::SpliceDrop, planner.forward_preview())
        } else {
            let overlap = span / 3;
            (
                StitchPolicy::OverlapAverage { overlap_days: overlap },
                planner.backward(overlap).unwrap(),
            )
        };
        let chunks: Vec<Chunk> = windows
            .iter()
            .enumerate()
            .map(|(i, w)| chunk_for(*w, &truth, origin, factors[i % factors.len()]))
            .collect();

        let series = ChunkStitcher::new(policy).stitch_all(chunks).unwrap();
        let collapsed = series.collapse();
        prop_assert_eq!(collapsed.len(), truth.len());

        let max = series_max(&collapsed).unwrap();
        let truth_max = truth.iter().copied().fold(0.0, f64::max);
        for (p, t) in collapsed.iter().zip(&truth) {
            let got = p.value / max;
            let want = t / truth_max;
            prop_assert!((got - want).abs() < 1e-9, "{} vs {} at {}", got, want, p.timestamp);
        }
    }
}

// ── 3. Range clipping ────────────────────────────────────────────────

proptest! {
    /// Whatever the timezone shift, nothing escapes the requested range.
    #[test]
    fn normalized_output_stays_in_range(
        values in prop::collection::vec(0.0..100.0_f64, 6..120),
        tz in -720i32..=720,
        trim_front in 0i64..3,
        trim_back in 0i64..3,
    ) {
        let origin = NaiveDate::from_ymd_opt(2021, 5, 1).unwrap();
        let mut values = values;
        values[0] = 100.0;
        values.push(100.0);
        let last = origin + Duration::days(values.len() as i64 - 1);
        let (start, end) = (origin + Duration::days(trim_front), last - Duration::days(trim_back));

        let chunk = Chunk::new(
            "X",
            Timeframe::Range { start: origin, end: last },
            points(origin, &values)
                .into_iter()
                .map(|p| Sample::new(p.timestamp, p.value))
                .collect(),
        );
        let series = StitchedSeries::from_chunk(&chunk);
        let normalizer = Normalizer::new(start, end).with_tz_offset(tz);

        let out = normalizer.normalize(&series).unwrap();
        for p in &out {
            prop_assert!(normalizer.lower_bound() <= p.timestamp);
            prop_assert!(p.timestamp <= normalizer.upper_bound());
        }
        // At most one day is lost to the shift.
        let full = (end - start).num_days() as usize + 1;
        prop_assert!(out.len() == full || out.len() + 1 == full);
    }
}

// ── 4. Max normalization ─────────────────────────────────────────────

proptest! {
    /// Any series with a positive maximum rescales to exactly 100 at its peak.
    #[test]
    fn rescaled_series_peaks_at_one_hundred(
        values in prop::collection::vec(0.0..1e6_f64, 1..200),
        peak in 1e-3..1e6_f64,
        at in any::<prop::sample::Index>(),
    ) {
        let mut values = values;
        let i = at.index(values.len());
        values[i] = values[i].max(peak);
        let origin = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();

        let out = rescale(points(origin, &values)).unwrap();

        prop_assert_eq!(series_max(&out), Some(100.0));
        for p in &out {
            prop_assert!((0.0..=100.0).contains(&p.value));
            prop_assert_eq!(p.value, p.value.round());
        }
    }
}
