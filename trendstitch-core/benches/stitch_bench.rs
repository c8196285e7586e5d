//! Criterion benchmarks for TrendStitch hot paths.
//!
//! Benchmarks:
//! 1. Chunk stitching (both policies over multi-year ranges)
//! 2. Hourly-to-daily aggregation for gap filling
//! 3. Normalization (collapse, shift, clip, rescale)
//! 4. Full `get_series` pipeline against an in-memory source

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trendstitch_core::domain::{Chunk, Sample, StitchedSeries, Timeframe, Window};
use trendstitch_core::gapfill::{GapFillConfig, GapFiller};
use trendstitch_core::normalize::Normalizer;
use trendstitch_core::planner::WindowPlanner;
use trendstitch_core::progress::SilentProgress;
use trendstitch_core::source::{
    FetchRequest, FrameRow, RecordingClock, SampleFrame, SampleSource, SourceError,
};
use trendstitch_core::stitch::{ChunkStitcher, StitchPolicy};
use trendstitch_core::{get_series_with, EngineConfig, SeriesRequest};

// ── Helpers ──────────────────────────────────────────────────────────

fn origin() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()
}

fn popularity(day: NaiveDate) -> f64 {
    let i = (day - origin()).num_days() as f64;
    50.0 + (i * 0.05).sin() * 30.0 + (i * 0.9).cos() * 5.0
}

fn midnight(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN)
}

/// Chunk for `window`, rescaled so its peak is 100.
fn make_chunk(window: Window) -> Chunk {
    let raw: Vec<f64> = window.days().map(popularity).collect();
    let max = raw.iter().copied().fold(0.0, f64::max);
    let samples = window
        .days()
        .zip(raw)
        .map(|(day, v)| Sample::new(midnight(day), 100.0 * v / max))
        .collect();
    Chunk::new("bench", window.timeframe(), samples)
}

fn make_chunks(years: i64, policy: StitchPolicy) -> Vec<Chunk> {
    let end = origin() + Duration::days(365 * years);
    let planner = WindowPlanner::new(origin(), end, 269).unwrap();
    let windows = match policy {
        StitchPolicy::OverlapAverage { overlap_days } => planner.backward(overlap_days).unwrap(),
        StitchPolicy::SpliceDrop => planner.forward_preview(),
    };
    windows.into_iter().map(make_chunk).collect()
}

fn make_hourly(days: i64) -> Chunk {
    let start = midnight(origin()) + Duration::hours(7);
    let samples = (0..days * 24)
        .map(|h| {
            let ts = start + Duration::hours(h);
            Sample::new(ts, popularity(ts.date()) / 24.0)
        })
        .collect();
    Chunk::new("bench", Timeframe::Trailing { days: days as u32 }, samples)
}

/// Serves every daily window in full and a trailing hourly window ending
/// the day after `available_through`.
struct SyntheticSource {
    available_through: NaiveDate,
}

impl SampleSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<SampleFrame, SourceError> {
        let rows: Vec<(NaiveDateTime, f64)> = match request.timeframe {
            Timeframe::Range { start, end } => Window::new(start, end.min(self.available_through))
                .days()
                .map(|day| (midnight(day), popularity(day)))
                .collect(),
            Timeframe::Trailing { days } => {
                let now = midnight(self.available_through + Duration::days(1));
                (0..=i64::from(days) * 24)
                    .rev()
                    .map(|h| now - Duration::hours(h))
                    .map(|ts| (ts, popularity(ts.date()) / 24.0))
                    .collect()
            }
        };
        let max = rows.iter().map(|r| r.1).fold(0.0, f64::max);
        let last = rows.len().saturating_sub(1);
        Ok(SampleFrame {
            columns: request.keywords.clone(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, (timestamp, v))| FrameRow {
                    timestamp,
                    values: vec![100.0 * v / max],
                    partial: matches!(request.timeframe, Timeframe::Trailing { .. }) && i == last,
                })
                .collect(),
        })
    }
}

// ── 1. Chunk Stitching ───────────────────────────────────────────────

fn bench_stitch(c: &mut Criterion) {
    let mut group = c.benchmark_group("stitch");

    for &years in &[2i64, 10, 20] {
        for policy in [StitchPolicy::default(), StitchPolicy::SpliceDrop] {
            let chunks = make_chunks(years, policy);
            let stitcher = ChunkStitcher::new(policy);
            group.bench_with_input(
                BenchmarkId::new(policy.to_string(), format!("{years}y")),
                &chunks,
                |b, chunks| {
                    b.iter(|| stitcher.stitch_all(black_box(chunks.clone())).unwrap());
                },
            );
        }
    }

    group.finish();
}

// ── 2. Gap-Fill Aggregation ──────────────────────────────────────────

fn bench_aggregate(c: &mut Criterion) {
    let filler = GapFiller::new(GapFillConfig::default());
    let hourly = make_hourly(7);
    c.bench_function("aggregate_daily_7d", |b| {
        b.iter(|| filler.aggregate_daily(black_box(&hourly)));
    });
}

// ── 3. Normalization ─────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let chunks = make_chunks(10, StitchPolicy::default());
    let series: StitchedSeries = ChunkStitcher::new(StitchPolicy::default())
        .stitch_all(chunks)
        .unwrap();
    let normalizer = Normalizer::new(origin() + Duration::days(30), origin() + Duration::days(3000))
        .with_tz_offset(480);

    c.bench_function("normalize_10y", |b| {
        b.iter(|| normalizer.normalize(black_box(&series)).unwrap());
    });
}

// ── 4. Full Pipeline ─────────────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_series");
    let end = origin() + Duration::days(365 * 10);
    let source = SyntheticSource {
        available_through: end - Duration::days(2),
    };
    let request = SeriesRequest::new("bench", origin(), end);

    for (name, config) in [
        ("overlapping_10y", EngineConfig::default()),
        ("spliced_10y", EngineConfig::splice_defaults()),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                get_series_with(
                    &source,
                    black_box(&request),
                    &config,
                    &RecordingClock::new(),
                    &SilentProgress,
                )
                .unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_stitch,
    bench_aggregate,
    bench_normalize,
    bench_pipeline,
);
criterion_main!(benches);
