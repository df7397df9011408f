//! Seams between the engine and its host.
//!
//! [`ScrollSurface`] is the rendering surface that owns the actual scroll
//! container (a DOM element, a GPU text view, a test double). [`ReaderHost`]
//! receives lifecycle callbacks; every method has a no-op default so hosts
//! only implement what they care about.

use crate::coords::ScrollExtent;
use crate::gesture::Axis;
use crate::progress::Progress;
use crate::settings::Settings;

/// Scroll container the book is rendered into.
///
/// Extents are read on every call and must reflect the current layout.
pub trait ScrollSurface {
    /// Horizontal scrollable and visible width.
    fn horizontal_extent(&self) -> ScrollExtent;

    /// Vertical scrollable and visible height.
    fn vertical_extent(&self) -> ScrollExtent;

    /// Current physical horizontal offset.
    fn scroll_left(&self) -> f64;

    /// Jump to a physical horizontal offset.
    fn set_scroll_left(&mut self, physical: f64);

    /// Current vertical offset.
    fn scroll_top(&self) -> f64;

    /// Jump to a vertical offset.
    fn set_scroll_top(&mut self, offset: f64);

    /// Top edge of a chapter element minus the container's top edge.
    ///
    /// `None` when the element is not rendered.
    fn chapter_offset(&self, chapter_id: &str) -> Option<f64>;

    /// Computed `writing-mode` of a representative content node.
    fn probe_writing_mode(&self) -> Option<String> {
        None
    }

    /// Animate to an offset. Surfaces without animation jump.
    fn smooth_scroll_to(&mut self, axis: Axis, offset: f64) {
        match axis {
            Axis::Horizontal => self.set_scroll_left(offset),
            Axis::Vertical => self.set_scroll_top(offset),
        }
    }

    /// Bring a chapter's start into view. Returns false if it is not rendered.
    fn scroll_into_view(&mut self, chapter_id: &str) -> bool {
        let _ = chapter_id;
        false
    }
}

/// Lifecycle callbacks delivered to the hosting application.
pub trait ReaderHost {
    /// Reader asked to go back to the library.
    fn on_back(&mut self) {}

    /// Reader asked to export the current book.
    fn on_export(&mut self) {}

    /// Settings changed live. Not necessarily persisted.
    fn on_update_settings(&mut self, _next: &Settings) {}

    /// Reader explicitly asked to persist settings.
    fn on_save_settings(&mut self, _next: &Settings) {}

    /// Throttled progress capture.
    fn on_update_progress(&mut self, _next: &Progress) {}
}

/// Host that ignores every callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl ReaderHost for NoopHost {}
