//! Engine error taxonomy.
//!
//! Every failure names the pipeline stage it came from so that a terminal
//! failure in non-verbose mode still tells the caller where things broke.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::source::SourceError;

/// Pipeline stage, in data-flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Planning,
    Fetch,
    Stitch,
    GapFill,
    Normalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Planning => "planning",
            Stage::Fetch => "fetch",
            Stage::Stitch => "stitch",
            Stage::GapFill => "gap-fill",
            Stage::Normalize => "normalize",
        };
        f.write_str(name)
    }
}

/// Terminal failure of a `get_series` call. No partial series is returned
/// alongside any of these.
#[derive(Debug, Error)]
pub enum StitchError {
    #[error("planning failed: malformed input: {0}")]
    MalformedInput(String),

    #[error("fetch failed: gave up on '{timeframe}' after {attempts} attempts: {last}")]
    FetchExhausted {
        timeframe: String,
        attempts: u32,
        #[source]
        last: SourceError,
    },

    #[error("{stage} failed: source error for '{timeframe}': {source}")]
    Source {
        stage: Stage,
        timeframe: String,
        #[source]
        source: SourceError,
    },

    #[error("{stage} failed: source returned no samples for '{timeframe}'")]
    EmptyChunk { stage: Stage, timeframe: String },

    #[error("{stage} failed: no overlapping timestamps to infer a scale ({context})")]
    EmptyIntersection { stage: Stage, context: String },

    #[error("{stage} failed: scale coefficient undefined ({numerator} / {denominator})")]
    DegenerateScale {
        stage: Stage,
        numerator: f64,
        denominator: f64,
    },

    #[error("normalize failed: series maximum is zero (source returned an all-zero series)")]
    DegenerateMax,

    #[error("normalize failed: no samples between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

impl StitchError {
    /// Stage the failure occurred in.
    pub fn stage(&self) -> Stage {
        match self {
            StitchError::MalformedInput(_) => Stage::Planning,
            StitchError::FetchExhausted { .. } => Stage::Fetch,
            StitchError::Source { stage, .. }
            | StitchError::EmptyChunk { stage, .. }
            | StitchError::EmptyIntersection { stage, .. }
            | StitchError::DegenerateScale { stage, .. } => *stage,
            StitchError::DegenerateMax | StitchError::EmptyRange { .. } => Stage::Normalize,
        }
    }
}

/// Strictly positive, finite ratio `numerator / denominator`.
///
/// A zero, negative or non-finite result is an error rather than a silent
/// fallback to 1.
pub fn scale_coefficient(stage: Stage, numerator: f64, denominator: f64) -> Result<f64, StitchError> {
    let coef = numerator / denominator;
    if coef.is_finite() && coef > 0.0 {
        Ok(coef)
    } else {
        Err(StitchError::DegenerateScale {
            stage,
            numerator,
            denominator,
        })
    }
}
