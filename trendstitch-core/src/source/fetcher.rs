//! Fetcher: turns one source request into one validated [`Chunk`].
//!
//! Owns the retry loop, the inter-request rate-limit delay, partial-row
//! discarding and the optional constant value offset. Stitching logic never
//! sees a raw [`SampleFrame`].

use std::time::Duration;

use super::provider::{FetchRequest, SampleFrame, SampleSource, SourceError};
use super::retry::{Clock, RetryPolicy};
use crate::domain::{Chunk, Filters, Sample, Timeframe};
use crate::error::{Stage, StitchError};
use crate::progress::Progress;

/// Single-window fetch helper with retry and rate limiting.
pub struct Fetcher<'a> {
    source: &'a dyn SampleSource,
    clock: &'a dyn Clock,
    progress: &'a dyn Progress,
    retry: RetryPolicy,
    inter_request_delay: Duration,
    value_offset: f64,
}

impl<'a> Fetcher<'a> {
    pub fn new(source: &'a dyn SampleSource, clock: &'a dyn Clock, progress: &'a dyn Progress) -> Self {
        Self {
            source,
            clock,
            progress,
            retry: RetryPolicy::default(),
            inter_request_delay: Duration::ZERO,
            value_offset: 0.0,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_inter_request_delay(mut self, delay: Duration) -> Self {
        self.inter_request_delay = delay;
        self
    }

    /// Constant added to every raw value before it reaches the stitcher.
    pub fn with_value_offset(mut self, offset: f64) -> Self {
        self.value_offset = offset;
        self
    }

    /// Fetch one timeframe for one keyword.
    ///
    /// `stage` is the pipeline stage reported if the source fails fatally or
    /// returns nothing usable.
    pub fn fetch_chunk(
        &self,
        stage: Stage,
        keyword: &str,
        timeframe: Timeframe,
        filters: &Filters,
    ) -> Result<Chunk, StitchError> {
        self.progress.on_fetch(keyword, &timeframe);
        tracing::debug!(source = self.source.name(), keyword, timeframe = %timeframe, "fetching chunk");

        let request = FetchRequest::single(keyword, timeframe, filters);
        let frame = self.fetch_with_retry(stage, &request)?;
        let chunk = self.to_chunk(stage, keyword, timeframe, frame)?;

        self.clock.sleep(self.inter_request_delay);
        Ok(chunk)
    }

    /// Issue the request, retrying transient failures with linear backoff.
    /// A `retry-after` hint longer than the backoff replaces it.
    fn fetch_with_retry(
        &self,
        stage: Stage,
        request: &FetchRequest,
    ) -> Result<SampleFrame, StitchError> {
        let mut attempt = 0;
        loop {
            match self.source.fetch(request) {
                Ok(frame) => return Ok(frame),
                Err(err) if err.is_transient() => {
                    if attempt >= self.retry.max_retries {
                        tracing::warn!(
                            timeframe = %request.timeframe,
                            attempts = attempt + 1,
                            error = %err,
                            "giving up after repeated transient failures"
                        );
                        return Err(StitchError::FetchExhausted {
                            timeframe: request.timeframe.to_string(),
                            attempts: attempt + 1,
                            last: err,
                        });
                    }
                    let mut delay = self.retry.delay(attempt);
                    // A server hint may only lengthen the wait.
                    if let SourceError::RateLimited {
                        retry_after_secs: Some(secs),
                    } = err
                    {
                        delay = delay.max(Duration::from_secs(secs));
                    }
                    tracing::info!(
                        timeframe = %request.timeframe,
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "transient source failure, backing off"
                    );
                    self.progress
                        .on_retry(&request.timeframe, attempt, delay, &err);
                    self.clock.sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(StitchError::Source {
                        stage,
                        timeframe: request.timeframe.to_string(),
                        source: err,
                    })
                }
            }
        }
    }

    /// Extract the keyword column, drop partial rows and apply the offset.
    fn to_chunk(
        &self,
        stage: Stage,
        keyword: &str,
        timeframe: Timeframe,
        frame: SampleFrame,
    ) -> Result<Chunk, StitchError> {
        let source_error = |source: SourceError| StitchError::Source {
            stage,
            timeframe: timeframe.to_string(),
            source,
        };

        let column = frame.column_index(keyword).ok_or_else(|| {
            source_error(SourceError::MissingKeyword {
                keyword: keyword.to_string(),
            })
        })?;

        let mut samples = Vec::with_capacity(frame.rows.len());
        for row in frame.rows.into_iter().filter(|r| !r.partial) {
            let value = row.values.get(column).copied().ok_or_else(|| {
                source_error(SourceError::MalformedResponse(format!(
                    "row at {} has no value for column {column}",
                    row.timestamp
                )))
            })?;
            if !value.is_finite() || value < 0.0 {
                return Err(source_error(SourceError::MalformedResponse(format!(
                    "invalid value {value} at {}",
                    row.timestamp
                ))));
            }
            samples.push(Sample::new(row.timestamp, value + self.value_offset));
        }

        let chunk = Chunk::new(keyword, timeframe, samples);
        if chunk.is_empty() {
            return Err(StitchError::EmptyChunk {
                stage,
                timeframe: timeframe.to_string(),
            });
        }
        if !chunk.is_strictly_increasing() {
            return Err(source_error(SourceError::MalformedResponse(
                "timestamps are not strictly increasing".into(),
            )));
        }
        if !chunk.is_contiguous() {
            return Err(source_error(SourceError::MalformedResponse(format!(
                "samples are not one {:?} unit apart",
                chunk.resolution
            ))));
        }
        Ok(chunk)
    }
}
