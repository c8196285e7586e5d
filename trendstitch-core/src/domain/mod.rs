//! Domain types for trendstitch

pub mod sample;
pub mod series;
pub mod window;

pub use sample::{Chunk, Sample};
pub use series::{SeriesPoint, StitchedSeries};
pub use window::{Filters, Resolution, Timeframe, Window, DATE_FORMAT};

/// Keyword type alias
pub type Keyword = String;
