//! Engine configuration.
//!
//! Every knob of a `get_series` run lives here so one TOML file can drive a
//! whole batch:
//!
//! ```toml
//! max_span_days = 269
//! tz_offset_minutes = 480
//! inter_request_delay_secs = 5
//!
//! [policy]
//! type = "overlap_average"
//! overlap_days = 100
//!
//! [filters]
//! region = "DE"
//!
//! [retry]
//! max_retries = 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::Filters;
use crate::error::StitchError;
use crate::gapfill::GapFillConfig;
use crate::planner::MAX_RESOLUTION_SPAN_DAYS;
use crate::source::RetryPolicy;
use crate::stitch::StitchPolicy;

/// Configuration for one request (and, by reuse, a batch of them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Days a single full-resolution fetch may span.
    pub max_span_days: u32,
    /// Timezone correction in minutes relative to the source's UTC reporting.
    pub tz_offset_minutes: i32,
    /// Pause after every successful fetch. Zero disables it.
    pub inter_request_delay_secs: f64,
    /// Constant added to every raw sample before scaling.
    pub value_offset: f64,
    pub verbose: bool,
    pub filters: Filters,
    pub policy: StitchPolicy,
    pub retry: RetryPolicy,
    pub gap_fill: GapFillConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_span_days: MAX_RESOLUTION_SPAN_DAYS,
            tz_offset_minutes: 0,
            inter_request_delay_secs: 0.0,
            value_offset: 0.0,
            verbose: false,
            filters: Filters::default(),
            policy: StitchPolicy::default(),
            retry: RetryPolicy::default(),
            gap_fill: GapFillConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults for the forward splice variant: 90-day windows, +1 offset so
    /// zero-valued boundaries keep the splice ratio finite.
    pub fn splice_defaults() -> Self {
        Self {
            policy: StitchPolicy::SpliceDrop,
            max_span_days: 90,
            value_offset: 1.0,
            ..Self::default()
        }
    }

    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, StitchError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StitchError::MalformedInput(format!("read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string; missing keys take their defaults.
    pub fn from_toml(content: &str) -> Result<Self, StitchError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| StitchError::MalformedInput(format!("parse config TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, StitchError> {
        toml::to_string_pretty(self)
            .map_err(|e| StitchError::MalformedInput(format!("serialize config TOML: {e}")))
    }

    /// Reject settings the engine cannot run with. Called before any fetch.
    pub fn validate(&self) -> Result<(), StitchError> {
        if self.max_span_days == 0 || self.max_span_days > MAX_RESOLUTION_SPAN_DAYS {
            return Err(StitchError::MalformedInput(format!(
                "max_span_days must be within 1..={MAX_RESOLUTION_SPAN_DAYS}, got {}",
                self.max_span_days
            )));
        }
        if let StitchPolicy::OverlapAverage { overlap_days } = self.policy {
            if overlap_days >= self.max_span_days {
                return Err(StitchError::MalformedInput(format!(
                    "overlap_days ({overlap_days}) must be shorter than max_span_days ({})",
                    self.max_span_days
                )));
            }
        }
        if !(self.inter_request_delay_secs.is_finite() && self.inter_request_delay_secs >= 0.0) {
            return Err(StitchError::MalformedInput(format!(
                "inter_request_delay_secs must be a non-negative number, got {}",
                self.inter_request_delay_secs
            )));
        }
        if !(self.value_offset.is_finite() && self.value_offset >= 0.0) {
            return Err(StitchError::MalformedInput(format!(
                "value_offset must be a non-negative number, got {}",
                self.value_offset
            )));
        }
        if !self.retry.is_valid() {
            return Err(StitchError::MalformedInput(
                "retry delays must be non-negative numbers".into(),
            ));
        }
        if self.gap_fill.enabled && (self.gap_fill.trailing_days == 0 || self.gap_fill.units_per_day == 0) {
            return Err(StitchError::MalformedInput(
                "gap_fill.trailing_days and gap_fill.units_per_day must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.inter_request_delay_secs)
    }
}
