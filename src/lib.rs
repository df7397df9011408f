//! mu-reader -- Reading position engine for HTML e-book viewports
//!
//! Keeps a reader's place in a book rendered into a scrollable viewport
//! across three display modes (paged, horizontal scroll, vertical scroll),
//! both reading directions (left-to-right, and right-to-left for vertical
//! CJK text), font and window changes, and reopening the book later.
//!
//! The engine never touches a DOM or a window. Hosts implement
//! [`ScrollSurface`] for the scroll container and [`ReaderHost`] for
//! lifecycle callbacks, then forward scroll, pointer, wheel, resize and
//! render-settled events to a [`ReaderEngine`].
//!
//! # Features
//!
//! - `async` -- await render-settled signals on a tokio watch channel
//! - `cli` -- `mu-reader` inspection binary
//!
//! # Coordinates
//!
//! Physical offsets are what the scroll container reports. Logical offsets
//! grow in reading order, so 0 is always the start of the book. All
//! persisted positions are logical.

#![warn(missing_docs)]
#![deny(clippy::large_enum_variant, clippy::large_stack_arrays, clippy::redundant_clone)]
#![warn(
    clippy::box_collection,
    clippy::needless_collect,
    clippy::map_clone,
    clippy::implicit_clone,
    clippy::inefficient_to_string
)]

pub mod book;
pub mod chapter;
pub mod coords;
pub mod direction;
pub mod engine;
pub mod error;
pub mod frame;
pub mod gesture;
pub mod layout;
pub mod mode;
pub mod progress;
pub mod settings;
pub mod storage;
pub mod surface;

#[cfg(feature = "async")]
pub mod async_api;

// Re-export key types for convenience
#[cfg(feature = "async")]
pub use async_api::{restore_when_settled, wait_for_layout};
pub use book::{scan_chapter_ids, Book, BookId, TocEntry};
pub use chapter::{locate_chapter, ChapterLocator, FALLBACK_CHAPTER_ID};
pub use coords::{to_logical, to_physical, ScrollExtent, SliderState};
pub use direction::{resolve_direction, ReadingDirection, WritingModePreference};
pub use engine::{ChromeState, EngineOptions, Presentation, ReaderEngine, StyleVars};
pub use error::{ReaderError, StoreError};
pub use gesture::{
    classify_press, GestureAction, GestureDispatcher, PageTurn, Point, PointerKind, PressKind,
    WheelDelta, WheelOutcome,
};
pub use layout::{reflow, LayoutVars, ViewportMetrics};
pub use mode::{normalize_display_mode, ClassList, DisplayMode};
pub use progress::{Progress, TrailingThrottle};
pub use settings::{cascade, Settings, SettingsForm, SettingsPatch, Theme};
pub use storage::{BookStorage, KeyValueStore, MemoryStore, ResumedBook};
pub use surface::{NoopHost, ReaderHost, ScrollSurface};
