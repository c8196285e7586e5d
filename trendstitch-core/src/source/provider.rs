//! Sample source trait and structured error types.
//!
//! The SampleSource trait abstracts over the external data source (HTTP
//! service, recorded fixtures, scripted fakes) so the stitching engine never
//! knows how a window is actually fetched.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Filters, Keyword, Timeframe};

/// Structured error types for a single fetch.
///
/// Transient variants are retried by the fetcher; everything else aborts the
/// request immediately.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("rate limited by source{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("response error: {0}")]
    Response(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("authentication required: {0}")]
    Unauthorized(String),

    #[error("keyword '{keyword}' missing from response")]
    MissingKeyword { keyword: String },

    #[error("source error: {0}")]
    Other(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(" (retry after {secs}s)"),
        None => String::new(),
    }
}

impl SourceError {
    /// Rate-limit and response errors are worth retrying; the rest are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::RateLimited { .. }
                | SourceError::Response(_)
                | SourceError::NetworkUnreachable(_)
        )
    }
}

/// One fetch: keywords, a bounded timeframe, and context filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub keywords: Vec<Keyword>,
    pub timeframe: Timeframe,
    pub filters: Filters,
}

impl FetchRequest {
    pub fn single(keyword: &str, timeframe: Timeframe, filters: &Filters) -> Self {
        Self {
            keywords: vec![keyword.to_string()],
            timeframe,
            filters: filters.clone(),
        }
    }
}

/// A row of the tabular response: one value per keyword column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRow {
    pub timestamp: NaiveDateTime,
    pub values: Vec<f64>,
    /// The source marks the most recent, still-accumulating unit as partial.
    #[serde(default)]
    pub partial: bool,
}

/// Tabular response indexed by time, one column per keyword.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleFrame {
    pub columns: Vec<Keyword>,
    pub rows: Vec<FrameRow>,
}

impl SampleFrame {
    pub fn column_index(&self, keyword: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == keyword)
    }
}

/// Trait for sample sources.
///
/// Implementations issue exactly one request per call. Retries, rate-limit
/// delays and partial-row handling live in the fetcher above this trait.
pub trait SampleSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch one bounded timeframe.
    fn fetch(&self, request: &FetchRequest) -> Result<SampleFrame, SourceError>;
}

impl<S: SampleSource + ?Sized> SampleSource for &S {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch(&self, request: &FetchRequest) -> Result<SampleFrame, SourceError> {
        (**self).fetch(request)
    }
}
