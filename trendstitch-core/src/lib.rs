//! TrendStitch Core — long-range relative-popularity series from a
//! range-limited source.
//!
//! The source only serves a bounded span per request at daily resolution and
//! rescales every response so its own peak is 100. This crate plans the
//! windows, fetches them with retry, stitches them onto one common scale,
//! fills the trailing days the source withholds, and rescales the result:
//! - Window planning (backward with fixed overlap, or a forward cursor)
//! - Sample source boundary with retry, delay, and an HTTP adapter
//! - Two stitch policies: overlap-averaging and splice-dropping
//! - Gap filling from a trailing hourly window
//! - Timezone shift, range clipping, and max-100 normalization
//! - CSV export

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod export;
pub mod gapfill;
pub mod normalize;
pub mod planner;
pub mod progress;
pub mod source;
pub mod stitch;

pub use config::EngineConfig;
pub use engine::{get_series, get_series_with, SeriesRequest};
pub use error::{Stage, StitchError};
pub use stitch::StitchPolicy;
