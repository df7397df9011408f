//! The reading position engine: one instance per open book view.
//!
//! The engine owns the display mode, reading direction, wrap width and
//! chrome state, and is the only thing that mutates them. The host feeds it
//! events (scroll, layout settled, pointer, wheel, viewport change, settings
//! patches) and renders whatever [`Presentation`] it exposes afterwards.
//!
//! # Cadence
//!
//! - Restores (initial, and after every display-mode switch) wait for two
//!   render-settled signals via [`ReaderEngine::on_layout_settled`].
//! - Scroll events are captured immediately but delivered to the host on a
//!   trailing-edge throttle; call [`ReaderEngine::poll`] at or after
//!   [`ReaderEngine::next_poll_deadline`].
//! - A pending progress delivery is not cancelled by a mode switch, so one
//!   stale record may land just after a transition.

use std::time::{Duration, Instant};

use crate::book::Book;
use crate::chapter::ChapterLocator;
use crate::coords::{self, ScrollExtent, SliderState};
use crate::direction::{resolve_direction, ReadingDirection};
use crate::error::ReaderError;
use crate::frame::FrameBarrier;
use crate::gesture::{
    Axis, EdgeAction, GestureAction, GestureContext, GestureDispatcher, PageTurn, Point,
    PointerKind, ReleaseOutcome, WheelDelta, WheelOutcome,
};
use crate::layout::{reflow, LayoutVars, ViewportMetrics};
use crate::mode::{ClassList, DisplayMode, MODE_FLAGS};
use crate::progress::{Progress, TrailingThrottle};
use crate::settings::{Settings, SettingsForm, SettingsPatch, THEME_FLAGS};
use crate::surface::{ReaderHost, ScrollSurface};

/// Writing-mode flags on the content root. At most one is set.
pub const WRITING_MODE_FLAGS: [&str; 2] = ["force-vertical", "force-horizontal"];

/// Root flag set while the top bar is hidden.
pub const CHROME_HIDDEN_FLAG: &str = "chrome-hidden";

/// Root flag set while the TOC panel is open.
pub const TOC_OPEN_FLAG: &str = "toc-open";

/// Root flag set when the top bar should wrap its controls.
pub const TOPBAR_WRAP_FLAG: &str = "topbar-auto-wrap";

/// Engine tunables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineOptions {
    /// Coalescing window for progress delivery.
    pub progress_throttle: Duration,
    /// Cooldown between wheel-driven page turns.
    pub wheel_cooldown: Duration,
    /// Press/release movement (px) above which input is a drag.
    pub tap_slop_px: f64,
    /// Height (px) of the top-edge band that toggles the top bar.
    pub top_edge_px: f64,
    /// Chapter lookahead (px) below the container top.
    pub chapter_lookahead_px: f64,
    /// Minimum page width (px).
    pub min_page_width_px: f64,
    /// Render-settled signals a restore waits for.
    pub settle_frames: u8,
    /// How long the "saved" acknowledgement stays visible.
    pub saved_label: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            progress_throttle: crate::progress::DEFAULT_THROTTLE,
            wheel_cooldown: crate::gesture::WHEEL_COOLDOWN,
            tap_slop_px: crate::gesture::TAP_SLOP_PX,
            top_edge_px: crate::gesture::TOP_EDGE_PX,
            chapter_lookahead_px: crate::chapter::LOOKAHEAD_PX,
            min_page_width_px: crate::layout::MIN_PAGE_WIDTH_PX,
            settle_frames: crate::frame::DEFAULT_SETTLE_FRAMES,
            saved_label: Duration::from_millis(1200),
        }
    }
}

impl EngineOptions {
    /// Set the progress throttle window.
    pub fn with_progress_throttle(mut self, window: Duration) -> Self {
        self.progress_throttle = window;
        self
    }

    /// Set the wheel cooldown.
    pub fn with_wheel_cooldown(mut self, cooldown: Duration) -> Self {
        self.wheel_cooldown = cooldown;
        self
    }

    /// Set the number of render-settled signals a restore waits for.
    pub fn with_settle_frames(mut self, frames: u8) -> Self {
        self.settle_frames = frames;
        self
    }
}

/// Typography variables.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleVars {
    /// `--font-size`.
    pub font_size: f64,
    /// `--line-height`.
    pub line_height: f64,
    /// `--letter-spacing` in px.
    pub letter_spacing: f64,
}

/// Everything the host renders: flags, style and layout variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Flags on the document root (mode, theme, chrome).
    pub root_flags: ClassList,
    /// Flags on the content root (writing mode).
    pub content_flags: ClassList,
    /// Typography.
    pub style: StyleVars,
    /// Page width and chrome offsets.
    pub layout: LayoutVars,
}

/// Visibility of the reader chrome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChromeState {
    /// Top bar hidden.
    pub topbar_hidden: bool,
    /// TOC panel open.
    pub toc_open: bool,
    /// Settings panel open.
    pub settings_open: bool,
}

impl ChromeState {
    /// The dimming overlay is shown while any panel is open.
    pub fn overlay_open(&self) -> bool {
        self.toc_open || self.settings_open
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Deferred {
    SettleInitial,
    Restore(Progress),
}

/// Reading position engine for one open book.
pub struct ReaderEngine<S: ScrollSurface, H: ReaderHost> {
    options: EngineOptions,
    book: Book,
    chapter_ids: Vec<String>,
    surface: S,
    host: H,
    settings: Settings,
    form: SettingsForm,
    mode: DisplayMode,
    direction: ReadingDirection,
    progress: Progress,
    throttle: TrailingThrottle<Progress>,
    barrier: FrameBarrier<Deferred>,
    gestures: GestureDispatcher,
    locator: ChapterLocator,
    chrome: ChromeState,
    metrics: ViewportMetrics,
    presentation: Presentation,
    saved_label_until: Option<Instant>,
}

impl<S: ScrollSurface, H: ReaderHost> ReaderEngine<S, H> {
    /// Open a book with default options.
    pub fn new(book: Book, settings: Settings, progress: Progress, surface: S, host: H) -> Self {
        Self::with_options(book, settings, progress, surface, host, EngineOptions::default())
    }

    /// Open a book.
    ///
    /// Settings apply immediately; the progress restore is deferred until
    /// layout has settled.
    pub fn with_options(
        book: Book,
        settings: Settings,
        progress: Progress,
        surface: S,
        host: H,
        options: EngineOptions,
    ) -> Self {
        let chapter_ids = book.chapter_ids().unwrap_or_else(|err| {
            log::warn!("[ENGINE] Book markup unreadable, chapter tracking disabled: {}", err);
            Vec::new()
        });
        let metrics = ViewportMetrics::default();
        let preference = settings.writing_mode_preference;
        let mut engine = Self {
            options,
            book,
            chapter_ids,
            surface,
            host,
            settings: settings.clone(),
            form: SettingsForm::default(),
            mode: settings.display_mode,
            direction: resolve_direction(preference, None),
            progress: Progress::default(),
            throttle: TrailingThrottle::new(options.progress_throttle),
            barrier: FrameBarrier::new(options.settle_frames),
            gestures: GestureDispatcher::new(
                options.tap_slop_px,
                options.top_edge_px,
                options.wheel_cooldown,
            ),
            locator: ChapterLocator::new(options.chapter_lookahead_px),
            chrome: ChromeState::default(),
            metrics,
            presentation: Presentation {
                root_flags: ClassList::new(),
                content_flags: ClassList::new(),
                style: StyleVars {
                    font_size: settings.font_size,
                    line_height: settings.line_height,
                    letter_spacing: settings.letter_spacing,
                },
                layout: reflow(
                    &metrics,
                    settings.wrap_width_percent,
                    false,
                    options.min_page_width_px,
                ),
            },
            saved_label_until: None,
        };
        engine.defer(Deferred::SettleInitial);
        engine.apply_settings(&settings);
        engine.progress = progress.clone();
        engine.restore(progress);
        log::debug!(
            "[ENGINE] Opened '{}' ({} chapters, mode {}, {:?})",
            engine.book.display_title(),
            engine.chapter_ids.len(),
            engine.mode.as_str(),
            engine.direction
        );
        engine
    }

    // -- accessors --------------------------------------------------------------

    /// Engine tunables.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// The open book.
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Chapter ids in document order.
    pub fn chapter_ids(&self) -> &[String] {
        &self.chapter_ids
    }

    /// Active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings form controls.
    pub fn form(&self) -> &SettingsForm {
        &self.form
    }

    /// Mutable settings form controls, for hosts that write control values directly.
    pub fn form_mut(&mut self) -> &mut SettingsForm {
        &mut self.form
    }

    /// Active display mode.
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Cached reading direction.
    pub fn direction(&self) -> ReadingDirection {
        self.direction
    }

    /// Last progress delivered to the host (or the initial record).
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Flags and variables for the presentation layer.
    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    /// Chrome visibility.
    pub fn chrome(&self) -> ChromeState {
        self.chrome
    }

    /// Rendering surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable rendering surface (host-driven scrolling, layout updates).
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Host callbacks.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable host callbacks.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Whether work is waiting for layout to settle.
    pub fn restore_pending(&self) -> bool {
        !self.barrier.is_idle()
    }

    // -- lifecycle ----------------------------------------------------------------

    /// Ask the host to go back to the library.
    pub fn back(&mut self) {
        self.host.on_back();
    }

    /// Ask the host to export the book.
    pub fn export(&mut self) {
        self.host.on_export();
    }

    /// Render-settled signal. Runs deferred work whose wait is over.
    pub fn on_layout_settled(&mut self) {
        for task in self.barrier.on_layout_settled() {
            match task {
                Deferred::SettleInitial => self.settle_initial(),
                Deferred::Restore(progress) => self.apply_restore(&progress),
            }
        }
    }

    fn defer(&mut self, task: Deferred) {
        if let Some(dropped) = self.barrier.defer(task) {
            log::warn!("[ENGINE] Dropped deferred task {:?}", dropped);
        }
    }

    fn settle_initial(&mut self) {
        self.apply_writing_mode_flag();
        self.update_direction(false);
        let extent = self.surface.horizontal_extent();
        self.surface
            .set_scroll_left(coords::to_physical(extent, 0.0, self.direction));
    }

    // -- progress -----------------------------------------------------------------

    /// Capture the current position without delivering it.
    pub fn capture(&self) -> Progress {
        let chapter_id = self.current_chapter_id();
        if self.mode.is_vertical() {
            let extent = self.surface.vertical_extent();
            let offset = self.surface.scroll_top();
            self.progress
                .captured(self.mode, &chapter_id, offset, extent.page_size())
        } else {
            let extent = self.surface.horizontal_extent();
            let logical = coords::to_logical(extent, self.surface.scroll_left(), self.direction);
            self.progress
                .captured(self.mode, &chapter_id, logical, extent.page_size())
        }
    }

    /// Queue a restore of `progress` behind the layout barrier.
    pub fn restore(&mut self, progress: Progress) {
        self.defer(Deferred::Restore(progress));
    }

    /// Restore `progress` right now, running any waiting settle work first.
    /// Queued restores are superseded. Callers guarantee layout has settled.
    #[cfg(feature = "async")]
    pub(crate) fn restore_settled(&mut self, progress: &Progress) {
        for task in self.barrier.drain() {
            match task {
                Deferred::SettleInitial => self.settle_initial(),
                Deferred::Restore(superseded) => log::debug!(
                    "[ENGINE] Queued restore of {:?} superseded",
                    superseded.chapter_id
                ),
            }
        }
        self.apply_restore(progress);
    }

    fn apply_restore(&mut self, progress: &Progress) {
        if self.mode.is_vertical() {
            let extent = self.surface.vertical_extent();
            let top = progress.restore_offset(self.mode, extent.page_size());
            self.surface.set_scroll_top(extent.clamp(top));
        } else {
            let extent = self.surface.horizontal_extent();
            let logical = progress.restore_offset(self.mode, extent.page_size());
            self.surface
                .set_scroll_left(coords::to_physical(extent, logical, self.direction));
        }
        log::debug!(
            "[ENGINE] Restored {:?} (page {:?}) in {} mode",
            progress.chapter_id,
            progress.page_index,
            self.mode.as_str()
        );
    }

    /// Scroll event at `now`. Delivery happens through [`ReaderEngine::poll`].
    pub fn on_scroll(&mut self, now: Instant) {
        let captured = self.capture();
        self.throttle.push(now, captured);
    }

    /// Deliver a throttled capture whose window has closed. Returns it, if any.
    pub fn poll(&mut self, now: Instant) -> Option<Progress> {
        let next = self.throttle.poll(now)?;
        log::debug!(
            "[ENGINE] Progress {:?} page {:?}",
            next.chapter_id,
            next.page_index
        );
        self.progress = next.clone();
        self.host.on_update_progress(&next);
        Some(next)
    }

    /// When [`ReaderEngine::poll`] has something to deliver.
    pub fn next_poll_deadline(&self) -> Option<Instant> {
        self.throttle.next_deadline()
    }

    /// Chapter the reader is currently in.
    pub fn current_chapter_id(&self) -> String {
        let surface = &self.surface;
        let chapters = self
            .chapter_ids
            .iter()
            .filter_map(|id| surface.chapter_offset(id).map(|offset| (id.as_str(), offset)));
        self.locator.locate(chapters).to_string()
    }

    // -- settings -----------------------------------------------------------------

    /// Live settings update: read the form, overlay `patch`, re-apply, notify.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Settings {
        let next = self.form.current_settings().patched(patch);
        self.apply_settings(&next);
        self.host.on_update_settings(&next);
        next
    }

    /// Explicit save request for the current form values.
    pub fn save_settings(&mut self, now: Instant) -> Settings {
        let next = self.form.current_settings();
        self.host.on_save_settings(&next);
        self.saved_label_until = Some(now + self.options.saved_label);
        next
    }

    /// Whether the "saved" acknowledgement should still be shown.
    pub fn settings_saved_label(&self, now: Instant) -> bool {
        self.saved_label_until.is_some_and(|until| now < until)
    }

    fn apply_settings(&mut self, next: &Settings) {
        self.presentation.style = StyleVars {
            font_size: next.font_size,
            line_height: next.line_height,
            letter_spacing: next.letter_spacing,
        };
        self.presentation
            .root_flags
            .select(&THEME_FLAGS, next.theme.flag());

        let previous_mode = self.mode;
        let was_applied = MODE_FLAGS
            .iter()
            .any(|flag| self.presentation.root_flags.contains(flag));
        self.settings = next.clone();
        self.apply_writing_mode_flag();
        self.update_direction(true);
        self.relayout();
        self.apply_display_mode(previous_mode, next.display_mode, was_applied);
        self.form.sync(next);
    }

    fn apply_writing_mode_flag(&mut self) {
        let flags = &mut self.presentation.content_flags;
        flags.remove_all(&WRITING_MODE_FLAGS);
        if let Some(flag) = self.settings.writing_mode_preference.content_flag() {
            flags.add(flag);
        }
    }

    fn apply_display_mode(&mut self, previous: DisplayMode, next: DisplayMode, was_applied: bool) {
        if was_applied && previous != next {
            log::debug!(
                "[ENGINE] Mode {} -> {}",
                previous.as_str(),
                next.as_str()
            );
            // A queued restore has not reached the surface yet, so it still
            // holds the position; it waits for the new layout instead.
            let rearmed = self
                .barrier
                .rearm_last(|task| matches!(task, Deferred::Restore(_)));
            if rearmed {
                self.mode = next;
            } else {
                let carried = self.capture();
                self.mode = next;
                self.defer(Deferred::Restore(carried));
            }
        } else {
            self.mode = next;
        }
        self.presentation.root_flags.select(&MODE_FLAGS, next.flag());
    }

    fn update_direction(&mut self, preserve_position: bool) {
        let previous = self.direction;
        let probe = self.surface.probe_writing_mode();
        self.direction = resolve_direction(self.settings.writing_mode_preference, probe.as_deref());
        if previous == self.direction {
            return;
        }
        log::debug!("[ENGINE] Direction {:?} -> {:?}", previous, self.direction);
        if preserve_position {
            let extent = self.surface.horizontal_extent();
            let logical = coords::to_logical(extent, self.surface.scroll_left(), previous);
            self.surface
                .set_scroll_left(coords::to_physical(extent, logical, self.direction));
        }
    }

    // -- layout -------------------------------------------------------------------

    /// Viewport resized, rotated, or the visual viewport changed.
    pub fn on_viewport_change(&mut self, metrics: ViewportMetrics) {
        self.metrics = metrics;
        self.relayout();
    }

    fn relayout(&mut self) {
        let vars = reflow(
            &self.metrics,
            self.settings.wrap_width_percent,
            self.chrome.topbar_hidden,
            self.options.min_page_width_px,
        );
        let previous_height = self.presentation.layout.viewport_height;
        self.presentation.layout = LayoutVars {
            viewport_height: vars.viewport_height.or(previous_height),
            ..vars
        };
        self.presentation
            .root_flags
            .set(TOPBAR_WRAP_FLAG, vars.topbar_wrap);
    }

    /// Position slider state.
    pub fn slider(&self) -> SliderState {
        coords::slider_state(
            self.surface.horizontal_extent(),
            self.surface.scroll_left(),
            self.direction,
        )
    }

    /// Slider dragged to a raw value.
    pub fn on_slider_input(&mut self, raw: f64) {
        let extent = self.surface.horizontal_extent();
        self.surface
            .set_scroll_left(coords::slider_to_physical(extent, raw, self.direction));
    }

    // -- input --------------------------------------------------------------------

    fn gesture_context(&self) -> GestureContext {
        GestureContext {
            mode: self.mode,
            tap_in_scroll: self.settings.tap_in_scroll,
            wheel_paging: self.settings.wheel_paging,
            direction: self.direction,
            topbar_hidden: self.chrome.topbar_hidden,
            zone_width: self.surface.horizontal_extent().client,
        }
    }

    /// Pointer or finger down on the tap zone.
    pub fn pointer_down(&mut self, point: Point, pointer: PointerKind) {
        self.gestures.press(point, pointer);
    }

    /// Pointer or finger up on the tap zone.
    pub fn pointer_up(&mut self, point: Point, on_control: bool) -> ReleaseOutcome {
        let ctx = self.gesture_context();
        let outcome = self.gestures.release(point, on_control, &ctx);
        match outcome.edge {
            Some(EdgeAction::RevealTopbar) => self.set_topbar_hidden(false),
            Some(EdgeAction::HideTopbar) => self.set_topbar_hidden(true),
            None => {}
        }
        match outcome.action {
            GestureAction::ToggleChrome => self.toggle_chrome(),
            GestureAction::Page(turn) => self.turn_page(turn),
            GestureAction::Ignore => {}
        }
        outcome
    }

    /// Gesture cancelled by the platform.
    pub fn pointer_cancel(&mut self) {
        self.gestures.cancel();
    }

    /// Wheel input.
    pub fn wheel(&mut self, delta: WheelDelta, now: Instant) -> WheelOutcome {
        let ctx = self.gesture_context();
        let outcome = self.gestures.wheel(delta, now, &ctx);
        match outcome {
            WheelOutcome::Scroll {
                axis: Axis::Horizontal,
                delta,
            } => {
                let extent = self.surface.horizontal_extent();
                let target = extent.clamp(self.surface.scroll_left() + delta);
                self.surface.set_scroll_left(target);
            }
            WheelOutcome::Scroll {
                axis: Axis::Vertical,
                delta,
            } => {
                let extent = self.surface.vertical_extent();
                let target = extent.clamp(self.surface.scroll_top() + delta);
                self.surface.set_scroll_top(target);
            }
            WheelOutcome::Page(turn) => self.turn_page(turn),
            WheelOutcome::Suppressed | WheelOutcome::Ignored => {}
        }
        outcome
    }

    /// Move one viewport forward or backward in reading order.
    pub fn turn_page(&mut self, turn: PageTurn) {
        let sign = match turn {
            PageTurn::Forward => 1.0,
            PageTurn::Backward => -1.0,
        };
        if self.mode.is_vertical() {
            let extent = self.surface.vertical_extent();
            let target = extent.clamp(self.surface.scroll_top() + sign * extent.page_size());
            self.scroll_axis(Axis::Vertical, target);
        } else {
            let extent: ScrollExtent = self.surface.horizontal_extent();
            let logical = coords::to_logical(extent, self.surface.scroll_left(), self.direction);
            let target = logical + sign * extent.page_size();
            let physical = coords::to_physical(extent, target, self.direction);
            self.scroll_axis(Axis::Horizontal, physical);
        }
    }

    fn scroll_axis(&mut self, axis: Axis, offset: f64) {
        if self.mode == DisplayMode::Paged {
            match axis {
                Axis::Horizontal => self.surface.set_scroll_left(offset),
                Axis::Vertical => self.surface.set_scroll_top(offset),
            }
        } else {
            self.surface.smooth_scroll_to(axis, offset);
        }
    }

    // -- chrome -------------------------------------------------------------------

    /// Centre tap: close open panels, otherwise show/hide the top bar.
    pub fn toggle_chrome(&mut self) {
        if self.chrome.overlay_open() {
            self.close_all_panels();
            return;
        }
        self.set_topbar_hidden(!self.chrome.topbar_hidden);
    }

    fn set_topbar_hidden(&mut self, hidden: bool) {
        self.chrome.topbar_hidden = hidden;
        self.presentation.root_flags.set(CHROME_HIDDEN_FLAG, hidden);
        self.relayout();
    }

    /// Open or close the TOC panel; opening closes the settings panel.
    pub fn toggle_toc(&mut self) {
        if self.chrome.toc_open {
            self.close_toc();
        } else {
            self.chrome.settings_open = false;
            self.chrome.toc_open = true;
            self.presentation.root_flags.add(TOC_OPEN_FLAG);
        }
    }

    /// Close the TOC panel.
    pub fn close_toc(&mut self) {
        self.chrome.toc_open = false;
        self.presentation.root_flags.remove(TOC_OPEN_FLAG);
    }

    /// Open or close the settings panel; opening closes the TOC panel.
    pub fn toggle_settings_panel(&mut self) {
        if self.chrome.settings_open {
            self.chrome.settings_open = false;
        } else {
            self.close_toc();
            self.chrome.settings_open = true;
        }
    }

    /// Close every panel (overlay click, centre tap).
    pub fn close_all_panels(&mut self) {
        self.close_toc();
        self.chrome.settings_open = false;
    }

    /// Jump to a chapter from the TOC and close the panel.
    pub fn jump_to_chapter(&mut self, chapter_id: &str) -> Result<(), ReaderError> {
        let known = self.chapter_ids.iter().any(|id| id == chapter_id)
            || self.book.toc.iter().any(|entry| entry.chapter_id == chapter_id);
        if !known || !self.surface.scroll_into_view(chapter_id) {
            return Err(ReaderError::UnknownChapter {
                id: chapter_id.to_string(),
            });
        }
        self.close_toc();
        Ok(())
    }
}
