//! Reading direction resolution.
//!
//! Vertical writing systems lay columns out right-to-left, so the scroll
//! container's horizontal axis runs against reading order. Everything that
//! touches `scrollLeft` needs to know which way "forward" points.

use serde::Serialize;

/// Direction in which the horizontal scroll axis advances through the book.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadingDirection {
    /// Physical offset grows with reading order.
    #[default]
    Ltr,
    /// Physical offset shrinks as reading advances (vertical writing modes).
    Rtl,
}

impl ReadingDirection {
    /// True for right-to-left layouts.
    pub fn is_rtl(self) -> bool {
        matches!(self, ReadingDirection::Rtl)
    }

    /// Flip a logical delta into a physical one.
    pub fn physical_delta(self, logical: f64) -> f64 {
        match self {
            ReadingDirection::Ltr => logical,
            ReadingDirection::Rtl => -logical,
        }
    }
}

/// Reader preference for the writing mode of book content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WritingModePreference {
    /// Follow whatever writing mode the book's own styles produce.
    #[default]
    Auto,
    /// Force vertical (top-to-bottom, right-to-left columns).
    Vertical,
    /// Force horizontal (left-to-right lines).
    Horizontal,
}

impl WritingModePreference {
    /// Normalize free-form input. Unknown or absent values become `Auto`.
    pub fn from_input(input: Option<&str>) -> Self {
        match input.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("vertical") => WritingModePreference::Vertical,
            Some("horizontal") => WritingModePreference::Horizontal,
            _ => WritingModePreference::Auto,
        }
    }

    /// Canonical token as stored and shown in form controls.
    pub fn as_str(self) -> &'static str {
        match self {
            WritingModePreference::Auto => "auto",
            WritingModePreference::Vertical => "vertical",
            WritingModePreference::Horizontal => "horizontal",
        }
    }

    /// Presentation flag forced onto the content root, if any.
    pub fn content_flag(self) -> Option<&'static str> {
        match self {
            WritingModePreference::Auto => None,
            WritingModePreference::Vertical => Some("force-vertical"),
            WritingModePreference::Horizontal => Some("force-horizontal"),
        }
    }
}

/// Resolve the reading direction.
///
/// Explicit preferences win outright. Under `Auto` the computed
/// `writing-mode` of a representative content node decides: any
/// `vertical-*` value means right-to-left paging. A missing probe reads as
/// horizontal.
pub fn resolve_direction(
    preference: WritingModePreference,
    probe_writing_mode: Option<&str>,
) -> ReadingDirection {
    match preference {
        WritingModePreference::Vertical => ReadingDirection::Rtl,
        WritingModePreference::Horizontal => ReadingDirection::Ltr,
        WritingModePreference::Auto => {
            let computed = probe_writing_mode.unwrap_or_default().to_ascii_lowercase();
            if computed.contains("vertical") {
                ReadingDirection::Rtl
            } else {
                ReadingDirection::Ltr
            }
        }
    }
}
