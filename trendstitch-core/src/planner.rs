//! Window planning.
//!
//! The source only serves full-resolution samples for spans up to
//! `max_span` days, so a long request is cut into sub-windows:
//!
//! - **Backward-anchored**: windows of `max_span` days ending at `end`, the
//!   cursor stepping back by `max_span - overlap` each time. Fetched newest
//!   first; consecutive windows share `overlap + 1` days.
//! - **Forward-anchored**: windows starting at `start`; each following window
//!   starts at the last timestamp the previous fetch actually returned, so the
//!   plan adapts to what the source delivers. Consecutive windows share
//!   exactly one day.

use chrono::{Duration, NaiveDate};

use crate::domain::Window;
use crate::error::StitchError;

/// Largest span (days) the source serves at daily resolution.
pub const MAX_RESOLUTION_SPAN_DAYS: u32 = 269;

/// Plans sub-windows for one `[start, end]` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPlanner {
    start: NaiveDate,
    end: NaiveDate,
    max_span: i64,
}

impl WindowPlanner {
    pub fn new(start: NaiveDate, end: NaiveDate, max_span_days: u32) -> Result<Self, StitchError> {
        if end < start {
            return Err(StitchError::MalformedInput(format!(
                "end date {end} precedes start date {start}"
            )));
        }
        if max_span_days == 0 || max_span_days > MAX_RESOLUTION_SPAN_DAYS {
            return Err(StitchError::MalformedInput(format!(
                "max span must be within 1..={MAX_RESOLUTION_SPAN_DAYS} days, got {max_span_days}"
            )));
        }
        Ok(Self {
            start,
            end,
            max_span: i64::from(max_span_days),
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// True when one window covers the whole request (no stitching).
    pub fn is_single_window(&self) -> bool {
        (self.end - self.start).num_days() <= self.max_span
    }

    /// Backward-anchored plan, in fetch order (newest window first).
    ///
    /// Stops with the first window reaching `start`; that window is clipped
    /// so no window begins before `start`.
    pub fn backward(&self, overlap_days: u32) -> Result<Vec<Window>, StitchError> {
        let overlap = i64::from(overlap_days);
        if overlap >= self.max_span {
            return Err(StitchError::MalformedInput(format!(
                "overlap ({overlap} days) must be shorter than the window span ({} days)",
                self.max_span
            )));
        }
        let step = Duration::days(self.max_span - overlap);
        let span = Duration::days(self.max_span);

        let mut windows = Vec::new();
        let mut cursor = self.end;
        loop {
            let window_start = cursor - span;
            if window_start <= self.start {
                windows.push(Window::new(self.start, cursor));
                break;
            }
            windows.push(Window::new(window_start, cursor));
            cursor -= step;
        }
        Ok(windows)
    }

    /// Forward-anchored cursor positioned on the first window.
    pub fn forward(&self) -> ForwardCursor {
        ForwardCursor {
            current: Some(self.forward_window(self.start)),
            end: self.end,
            max_span: self.max_span,
        }
    }

    /// Forward plan assuming every fetch returns through its window's end.
    pub fn forward_preview(&self) -> Vec<Window> {
        let mut cursor = self.forward();
        let mut windows = Vec::new();
        while let Some(window) = cursor.current() {
            windows.push(window);
            if !matches!(cursor.advance(window.end), CursorStep::Next(_)) {
                break;
            }
        }
        windows
    }

    fn forward_window(&self, from: NaiveDate) -> Window {
        Window::new(from, (from + Duration::days(self.max_span)).min(self.end))
    }
}

/// Outcome of advancing a forward cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// Fetch this window next.
    Next(Window),
    /// The cursor reached `end`.
    Complete,
    /// The last fetch returned nothing past the cursor; the source has no
    /// more full-resolution data, the remaining tail goes to gap filling.
    Stalled { at: NaiveDate },
}

/// Self-adjusting forward plan: the next window depends on the previous
/// fetch's last returned timestamp.
#[derive(Debug, Clone)]
pub struct ForwardCursor {
    current: Option<Window>,
    end: NaiveDate,
    max_span: i64,
}

impl ForwardCursor {
    /// Window to fetch now, `None` once finished.
    pub fn current(&self) -> Option<Window> {
        self.current
    }

    /// Move past the current window given the last date the fetch returned.
    pub fn advance(&mut self, last_returned: NaiveDate) -> CursorStep {
        let Some(current) = self.current else {
            return CursorStep::Complete;
        };

        let step = if last_returned >= self.end {
            CursorStep::Complete
        } else if last_returned <= current.start {
            CursorStep::Stalled { at: current.start }
        } else {
            let end = (last_returned + Duration::days(self.max_span)).min(self.end);
            CursorStep::Next(Window::new(last_returned, end))
        };

        self.current = match step {
            CursorStep::Next(window) => Some(window),
            _ => None,
        };
        step
    }
}
