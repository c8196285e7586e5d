//! Sample source boundary: trait, HTTP adapter, retrying fetcher.

pub mod fetcher;
pub mod http;
pub mod provider;
pub mod retry;

pub use fetcher::Fetcher;
pub use http::HttpSource;
pub use provider::{FetchRequest, FrameRow, SampleFrame, SampleSource, SourceError};
pub use retry::{Clock, RecordingClock, RetryPolicy, ThreadClock};
