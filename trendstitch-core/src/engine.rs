//! `get_series`: the full pipeline for one `(keyword, range)` request.
//!
//! ```text
//! WindowPlanner → (Fetcher → ChunkStitcher)* → GapFiller → Normalizer
//! ```
//!
//! Fetches are strictly sequential: the splice policy cannot plan window
//! n+1 before window n's last timestamp is known, and the source is rate
//! limited. Nothing is shared between calls; a failed call returns no
//! partial series.

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::domain::{SeriesPoint, DATE_FORMAT};
use crate::error::{Stage, StitchError};
use crate::gapfill::GapFiller;
use crate::normalize::{series_max, Normalizer};
use crate::planner::{CursorStep, WindowPlanner};
use crate::progress::{self, Progress};
use crate::source::{Clock, Fetcher, SampleSource, ThreadClock};
use crate::stitch::{ChunkStitcher, StitchPolicy, StitchState};

/// One `(keyword, start, end)` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub keyword: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeriesRequest {
    pub fn new(keyword: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            keyword: keyword.into(),
            start,
            end,
        }
    }

    /// Parse `YYYY-MM-DD` dates. Fails before any network activity.
    pub fn parse(keyword: &str, start: &str, end: &str) -> Result<Self, StitchError> {
        let parse = |label: &str, value: &str| {
            NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| {
                StitchError::MalformedInput(format!(
                    "{label} date '{value}' is not YYYY-MM-DD: {e}"
                ))
            })
        };
        Ok(Self::new(keyword, parse("start", start)?, parse("end", end)?))
    }

    fn validate(&self) -> Result<(), StitchError> {
        if self.keyword.trim().is_empty() {
            return Err(StitchError::MalformedInput("keyword is empty".into()));
        }
        Ok(())
    }
}

/// Fetch, stitch, gap-fill and normalize one request with real sleeps and
/// the reporter selected by `config.verbose`.
pub fn get_series(
    source: &dyn SampleSource,
    request: &SeriesRequest,
    config: &EngineConfig,
) -> Result<Vec<SeriesPoint>, StitchError> {
    get_series_with(
        source,
        request,
        config,
        &ThreadClock,
        progress::for_verbosity(config.verbose),
    )
}

/// [`get_series`] with an injected clock and progress reporter.
pub fn get_series_with(
    source: &dyn SampleSource,
    request: &SeriesRequest,
    config: &EngineConfig,
    clock: &dyn Clock,
    progress: &dyn Progress,
) -> Result<Vec<SeriesPoint>, StitchError> {
    config.validate()?;
    request.validate()?;
    let planner = WindowPlanner::new(request.start, request.end, config.max_span_days)?;

    let fetcher = Fetcher::new(source, clock, progress)
        .with_retry(config.retry)
        .with_inter_request_delay(config.inter_request_delay())
        .with_value_offset(config.value_offset);
    let stitcher = ChunkStitcher::new(config.policy).with_progress(progress);

    let state = match config.policy {
        StitchPolicy::OverlapAverage { overlap_days } => {
            stitch_backward(&planner, overlap_days, &fetcher, &stitcher, request, config)?
        }
        StitchPolicy::SpliceDrop => stitch_forward(&planner, &fetcher, &stitcher, request, config)?,
    };
    let mut series = state.into_series();

    let filler = GapFiller::new(config.gap_fill).with_progress(progress);
    if filler.needs_fill(&series, request.end) {
        let hourly = fetcher.fetch_chunk(
            Stage::GapFill,
            &request.keyword,
            config.gap_fill.timeframe(),
            &config.filters,
        )?;
        series = filler.fill(series, &hourly)?;
    }

    let points = Normalizer::new(request.start, request.end)
        .with_tz_offset(config.tz_offset_minutes)
        .normalize(&series)?;

    let overlap_points = points.iter().filter(|p| p.overlap).count();
    tracing::info!(
        keyword = %request.keyword,
        policy = %config.policy,
        points = points.len(),
        overlap_points,
        max = ?series_max(&points),
        "series complete"
    );
    progress.on_normalize(&request.keyword, points.len(), overlap_points);
    Ok(points)
}

/// Newest window first; each older chunk is scaled onto the one before it.
fn stitch_backward(
    planner: &WindowPlanner,
    overlap_days: u32,
    fetcher: &Fetcher<'_>,
    stitcher: &ChunkStitcher<'_>,
    request: &SeriesRequest,
    config: &EngineConfig,
) -> Result<StitchState, StitchError> {
    let windows = planner.backward(overlap_days)?;
    tracing::debug!(keyword = %request.keyword, windows = windows.len(), "planned backward windows");

    windows
        .into_iter()
        .try_fold(StitchState::new(), |state, window| {
            let chunk = fetcher.fetch_chunk(
                Stage::Fetch,
                &request.keyword,
                window.timeframe(),
                &config.filters,
            )?;
            stitcher.merge(state, chunk)
        })
}

/// Oldest window first; each window starts where the last fetch ended.
fn stitch_forward(
    planner: &WindowPlanner,
    fetcher: &Fetcher<'_>,
    stitcher: &ChunkStitcher<'_>,
    request: &SeriesRequest,
    config: &EngineConfig,
) -> Result<StitchState, StitchError> {
    let mut cursor = planner.forward();
    let mut state = StitchState::new();

    while let Some(window) = cursor.current() {
        let chunk = fetcher.fetch_chunk(
            Stage::Fetch,
            &request.keyword,
            window.timeframe(),
            &config.filters,
        )?;
        let last = chunk.last().map_or(window.start, |s| s.timestamp.date());

        if let CursorStep::Stalled { at } = cursor.advance(last) {
            if !state.is_empty() {
                tracing::debug!(
                    keyword = %request.keyword,
                    %at,
                    "source returned nothing past the cursor; leaving the tail to gap filling"
                );
                break;
            }
        }
        state = stitcher.merge(state, chunk)?;
    }
    Ok(state)
}
