//! Chunk stitching.
//!
//! Each fetched chunk is scaled onto the series built so far and merged in.
//! Two policies are supported, picked once per run:
//!
//! - [`StitchPolicy::OverlapAverage`]: the new chunk is scaled by
//!   `max(previous chunk over overlap) / max(new chunk over overlap)`; both
//!   chunks' values are kept on the overlap and averaged at collapse time.
//! - [`StitchPolicy::SpliceDrop`]: the accumulated (older) series is divided by
//!   `older value at boundary / newer first value`, its boundary sample is
//!   dropped, and the newer chunk is appended whole.
//!
//! Stitching is a fold: `StitchState` in, one chunk, `StitchState` out.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::{Chunk, StitchedSeries};
use crate::error::{scale_coefficient, Stage, StitchError};
use crate::progress::{Progress, SilentProgress};

/// Default overlap for the overlap-average policy, in days.
pub const DEFAULT_OVERLAP_DAYS: u32 = 100;

/// Merge policy in effect for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StitchPolicy {
    /// Backward-planned windows, scale by overlap maxima, average duplicates.
    OverlapAverage { overlap_days: u32 },
    /// Forward-planned windows, single-point ratio at the splice boundary.
    SpliceDrop,
}

impl Default for StitchPolicy {
    fn default() -> Self {
        StitchPolicy::OverlapAverage {
            overlap_days: DEFAULT_OVERLAP_DAYS,
        }
    }
}

impl fmt::Display for StitchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StitchPolicy::OverlapAverage { .. } => f.write_str("overlapping"),
            StitchPolicy::SpliceDrop => f.write_str("spliced"),
        }
    }
}

/// Accumulator threaded through the stitching fold.
#[derive(Debug, Clone, Default)]
pub struct StitchState {
    pub series: StitchedSeries,
    /// Most recently merged chunk, as scaled when it was merged.
    pub previous: Option<Chunk>,
}

impl StitchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn into_series(self) -> StitchedSeries {
        self.series
    }
}

/// Applies one [`StitchPolicy`] to successive chunks.
pub struct ChunkStitcher<'a> {
    policy: StitchPolicy,
    progress: &'a dyn Progress,
}

impl<'a> ChunkStitcher<'a> {
    pub fn new(policy: StitchPolicy) -> Self {
        Self {
            policy,
            progress: &SilentProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn policy(&self) -> StitchPolicy {
        self.policy
    }

    /// Merge one chunk into the accumulated state.
    pub fn merge(&self, state: StitchState, chunk: Chunk) -> Result<StitchState, StitchError> {
        if state.is_empty() {
            return Ok(StitchState {
                series: StitchedSeries::from_chunk(&chunk),
                previous: Some(chunk),
            });
        }
        match self.policy {
            StitchPolicy::OverlapAverage { .. } => self.merge_overlap_average(state, chunk),
            StitchPolicy::SpliceDrop => self.merge_splice_drop(state, chunk),
        }
    }

    /// Fold a whole sequence of chunks, in merge order.
    pub fn stitch_all<I>(&self, chunks: I) -> Result<StitchedSeries, StitchError>
    where
        I: IntoIterator<Item = Chunk>,
    {
        chunks
            .into_iter()
            .try_fold(StitchState::new(), |state, chunk| self.merge(state, chunk))
            .map(StitchState::into_series)
    }

    fn merge_overlap_average(
        &self,
        mut state: StitchState,
        chunk: Chunk,
    ) -> Result<StitchState, StitchError> {
        let previous = state.previous.as_ref().ok_or_else(|| StitchError::EmptyIntersection {
            stage: Stage::Stitch,
            context: "no previous chunk to scale against".into(),
        })?;

        let shared: BTreeSet<NaiveDateTime> = previous
            .timestamps()
            .filter(|ts| chunk.value_at(*ts).is_some())
            .collect();
        let (from, to) = bounds(&shared).ok_or_else(|| StitchError::EmptyIntersection {
            stage: Stage::Stitch,
            context: format!("'{}' vs '{}'", previous.timeframe, chunk.timeframe),
        })?;

        // Both maxima exist: `shared` is non-empty and drawn from both chunks.
        let previous_max = previous.max_over(&shared).unwrap_or(0.0);
        let chunk_max = chunk.max_over(&shared).unwrap_or(0.0);
        let coef = scale_coefficient(Stage::Stitch, previous_max, chunk_max)?;

        tracing::debug!(
            timeframe = %chunk.timeframe,
            overlap_days = shared.len(),
            coef,
            "scaled chunk by overlap maxima"
        );
        self.progress.on_scale(Stage::Stitch, from, to, coef);

        let scaled = chunk.scaled(coef);
        state.series.add_chunk(&scaled);
        state.series.mark_overlap(shared);
        state.previous = Some(scaled);
        Ok(state)
    }

    fn merge_splice_drop(
        &self,
        mut state: StitchState,
        chunk: Chunk,
    ) -> Result<StitchState, StitchError> {
        let first = chunk.first().copied().ok_or_else(|| StitchError::EmptyChunk {
            stage: Stage::Stitch,
            timeframe: chunk.timeframe.to_string(),
        })?;
        let boundary = first.timestamp;

        let older = state
            .series
            .value_at(boundary)
            .ok_or_else(|| StitchError::EmptyIntersection {
                stage: Stage::Stitch,
                context: format!(
                    "'{}' starts at {boundary}, which the accumulated series does not cover",
                    chunk.timeframe
                ),
            })?;
        let ratio = scale_coefficient(Stage::Stitch, older, first.value)?;

        tracing::debug!(timeframe = %chunk.timeframe, %boundary, ratio, "spliced chunk at boundary");
        self.progress.on_scale(Stage::Stitch, boundary, boundary, ratio);

        state.series.truncate_from(boundary);
        state.series.divide_all(ratio);
        state.series.add_chunk(&chunk);
        state.series.mark_overlap([boundary]);
        state.previous = Some(chunk);
        Ok(state)
    }
}

fn bounds(set: &BTreeSet<NaiveDateTime>) -> Option<(NaiveDateTime, NaiveDateTime)> {
    Some((*set.first()?, *set.last()?))
}
