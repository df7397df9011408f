//! Physical/logical scroll offset conversion.
//!
//! The rendering surface reports *physical* offsets. Under right-to-left
//! layouts the physical axis runs against reading order, so progress is
//! always stored as a *logical* offset that grows monotonically through
//! the book.
//!
//! Every function here takes a fresh [`ScrollExtent`]. Reflow changes the
//! extent between calls and a cached maximum silently shifts every restored
//! position by the reflow delta.

use crate::direction::ReadingDirection;

/// Scrollable and visible size of a container along one axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollExtent {
    /// Total scrollable size (`scrollWidth` / `scrollHeight`).
    pub scroll: f64,
    /// Visible size (`clientWidth` / `clientHeight`).
    pub client: f64,
}

impl ScrollExtent {
    /// Create an extent from scrollable and visible sizes.
    pub fn new(scroll: f64, client: f64) -> Self {
        Self { scroll, client }
    }

    /// Largest reachable offset. Never negative.
    pub fn max_offset(&self) -> f64 {
        let max = self.scroll - self.client;
        if max.is_finite() && max > 0.0 {
            max
        } else {
            0.0
        }
    }

    /// Clamp an arbitrary value into `[0, max_offset]`. Non-finite input reads as 0.
    pub fn clamp(&self, offset: f64) -> f64 {
        finite_or_zero(offset).clamp(0.0, self.max_offset())
    }

    /// Visible size used as the page step, never below 1.
    pub fn page_size(&self) -> f64 {
        if self.client.is_finite() && self.client >= 1.0 {
            self.client
        } else {
            1.0
        }
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Convert a physical offset into a logical reading offset.
pub fn to_logical(extent: ScrollExtent, physical: f64, direction: ReadingDirection) -> f64 {
    let max = extent.max_offset();
    let physical = finite_or_zero(physical);
    let logical = match direction {
        ReadingDirection::Ltr => physical,
        ReadingDirection::Rtl => max - physical,
    };
    logical.clamp(0.0, max)
}

/// Convert a logical reading offset into a physical offset.
pub fn to_physical(extent: ScrollExtent, logical: f64, direction: ReadingDirection) -> f64 {
    let max = extent.max_offset();
    let logical = finite_or_zero(logical);
    let physical = match direction {
        ReadingDirection::Ltr => logical,
        ReadingDirection::Rtl => max - logical,
    };
    physical.clamp(0.0, max)
}

/// State of the horizontal position slider shown under the content.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SliderState {
    /// Slider maximum; equals the extent's maximum offset.
    pub max: f64,
    /// Thumb position. Mirrored under rtl so the thumb tracks the visual edge.
    pub value: f64,
    /// Nothing to scroll.
    pub disabled: bool,
}

/// Slider state for the current physical offset.
pub fn slider_state(extent: ScrollExtent, physical: f64, direction: ReadingDirection) -> SliderState {
    let max = extent.max_offset();
    let logical = to_logical(extent, physical, direction);
    SliderState {
        max,
        value: mirror(logical, max, direction),
        disabled: max == 0.0,
    }
}

/// Physical offset for a raw slider value.
pub fn slider_to_physical(extent: ScrollExtent, raw: f64, direction: ReadingDirection) -> f64 {
    let max = extent.max_offset();
    let logical = mirror(finite_or_zero(raw), max, direction);
    to_physical(extent, logical, direction)
}

fn mirror(value: f64, max: f64, direction: ReadingDirection) -> f64 {
    match direction {
        ReadingDirection::Ltr => value,
        ReadingDirection::Rtl => max - value,
    }
}
