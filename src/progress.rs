//! Reading progress records and the throttled capture cadence.
//!
//! A progress record stores both a fine logical offset and a coarse page
//! index. The page index wins on restore: it is re-multiplied by the
//! *current* viewport extent, which survives font-size and window changes
//! that shift every raw offset.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::mode::DisplayMode;
use crate::settings::js_number;

/// Default coalescing window for progress capture.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(250);

/// Saved reading position for one book.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct Progress {
    /// Chapter that was current when the record was captured.
    pub chapter_id: Option<String>,
    /// Logical horizontal offset (paged and scrollx modes).
    pub scroll_left: f64,
    /// Vertical offset (scrolly mode).
    pub scroll_top: f64,
    /// Coarse page position, preferred on restore when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_index: Option<u32>,
}

impl From<Value> for Progress {
    fn from(value: Value) -> Self {
        Progress::from_value(&value)
    }
}

impl Progress {
    /// Coerce an arbitrary JSON value into a progress record. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let chapter_id = match value.get("chapterId") {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        let page_index = match value.get("pageIndex") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(non_negative(js_number(Some(raw))).round() as u32),
        };
        Self {
            chapter_id,
            scroll_left: non_negative(js_number(value.get("scrollLeft"))),
            scroll_top: non_negative(js_number(value.get("scrollTop"))),
            page_index,
        }
    }

    /// Stored offset for the axis `mode` tracks.
    pub fn offset_for(&self, mode: DisplayMode) -> f64 {
        if mode.is_vertical() {
            self.scroll_top
        } else {
            self.scroll_left
        }
    }

    /// Logical offset to restore under the current page size.
    ///
    /// `pageIndex × page_size` when a page index is present, the raw stored
    /// offset otherwise.
    pub fn restore_offset(&self, mode: DisplayMode, page_size: f64) -> f64 {
        match self.page_index {
            Some(index) => f64::from(index) * page_size.max(1.0),
            None => self.offset_for(mode),
        }
    }

    /// Next record after a capture. The axis `mode` does not track keeps its value.
    pub fn captured(&self, mode: DisplayMode, chapter_id: &str, offset: f64, page_size: f64) -> Self {
        let offset = non_negative(Some(offset));
        let mut next = self.clone();
        next.chapter_id = Some(chapter_id.to_string());
        if mode.is_vertical() {
            next.scroll_top = offset;
        } else {
            next.scroll_left = offset;
        }
        next.page_index = Some(page_index_for(offset, page_size));
        next
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Page index of a logical offset: `round(offset / page_size)`.
pub fn page_index_for(offset: f64, page_size: f64) -> u32 {
    let size = if page_size.is_finite() && page_size >= 1.0 {
        page_size
    } else {
        1.0
    };
    let index = (non_negative(Some(offset)) / size).round();
    if index >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        index as u32
    }
}

/// Trailing-edge throttle.
///
/// The first value opens a window; later values inside the window replace
/// the pending one; when the window closes the *latest* value is released
/// exactly once. The next value after that opens a fresh window.
#[derive(Clone, Debug)]
pub struct TrailingThrottle<T> {
    window: Duration,
    deadline: Option<Instant>,
    pending: Option<T>,
}

impl<T> TrailingThrottle<T> {
    /// Throttle with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            pending: None,
        }
    }

    /// Record a value observed at `now`.
    pub fn push(&mut self, now: Instant, value: T) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
        }
        self.pending = Some(value);
    }

    /// Release the pending value if its window has closed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// When the host should poll next, if anything is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a value is waiting for its window to close.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<T> Default for TrailingThrottle<T> {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE)
    }
}
