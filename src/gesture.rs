//! Pointer, touch and wheel classification.
//!
//! Input is reduced to a handful of reader actions. The classifier is an
//! explicit two-state machine (idle / pressed) plus pure helpers, so it can
//! be driven from tests without any input device.

use std::time::{Duration, Instant};

use crate::direction::ReadingDirection;
use crate::mode::DisplayMode;

/// Movement (px, per axis) above which a press/release pair is a drag.
pub const TAP_SLOP_PX: f64 = 10.0;

/// Taps closer than this to the viewport top toggle the top bar.
pub const TOP_EDGE_PX: f64 = 72.0;

/// Minimum time between two wheel-driven page turns.
pub const WHEEL_COOLDOWN: Duration = Duration::from_millis(160);

const LEFT_ZONE_END: f64 = 0.33;
const RIGHT_ZONE_START: f64 = 0.66;

/// Position in px, relative to the tap zone's top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Device behind a press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    /// Mouse with the pressed button index (0 = primary).
    Mouse {
        /// Button index.
        button: u8,
    },
    /// Finger on a touch screen.
    Touch,
    /// Stylus.
    Pen,
}

/// Result of comparing press and release positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressKind {
    /// Short, stationary press.
    Tap,
    /// The pointer moved; scrolling or selecting, never paging.
    Drag,
}

/// Classify a press/release pair.
pub fn classify_press(press: Point, release: Point, slop: f64) -> PressKind {
    let dx = (release.x - press.x).abs();
    let dy = (release.y - press.y).abs();
    if dx > slop || dy > slop {
        PressKind::Drag
    } else {
        PressKind::Tap
    }
}

/// Horizontal third of the tap zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapZone {
    /// Left third.
    Left,
    /// Middle third.
    Center,
    /// Right third.
    Right,
}

/// Which third of a zone of `width` px the coordinate `x` falls in.
pub fn tap_zone(x: f64, width: f64) -> TapZone {
    let w = if width.is_finite() && width > 0.0 { width } else { 1.0 };
    if x >= w * LEFT_ZONE_END && x <= w * RIGHT_ZONE_START {
        TapZone::Center
    } else if x > w * RIGHT_ZONE_START {
        TapZone::Right
    } else {
        TapZone::Left
    }
}

/// Logical page turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageTurn {
    /// Toward the end of the book.
    Forward,
    /// Toward the start of the book.
    Backward,
}

/// Reader action produced by a tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureAction {
    /// Nothing to do.
    Ignore,
    /// Show or hide the chrome (or close open panels).
    ToggleChrome,
    /// Turn a page.
    Page(PageTurn),
}

/// Top-bar toggle produced by a tap near the viewport top.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeAction {
    /// Hidden top bar comes back; the same release never pages.
    RevealTopbar,
    /// Visible top bar goes away.
    HideTopbar,
}

/// Everything a single release produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// Top-edge toggle, evaluated first.
    pub edge: Option<EdgeAction>,
    /// Tap action, evaluated second.
    pub action: GestureAction,
}

/// Reader state the dispatcher needs to interpret input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureContext {
    /// Active display mode.
    pub mode: DisplayMode,
    /// Continuous modes opted into edge-tap paging.
    pub tap_in_scroll: bool,
    /// Opt-in one-page-per-gesture wheel handling in paged mode.
    pub wheel_paging: bool,
    /// Reading direction.
    pub direction: ReadingDirection,
    /// Top bar currently hidden.
    pub topbar_hidden: bool,
    /// Width of the tap zone in px.
    pub zone_width: f64,
}

impl GestureContext {
    fn paging_taps_enabled(&self) -> bool {
        self.mode == DisplayMode::Paged || self.tap_in_scroll
    }

    /// Zones map to physical movement; right-to-left horizontal layouts
    /// therefore advance on the left.
    fn zone_turn(&self, zone: TapZone) -> Option<PageTurn> {
        let mirrored = self.direction.is_rtl() && !self.mode.is_vertical();
        match (zone, mirrored) {
            (TapZone::Center, _) => None,
            (TapZone::Right, false) | (TapZone::Left, true) => Some(PageTurn::Forward),
            (TapZone::Left, false) | (TapZone::Right, true) => Some(PageTurn::Backward),
        }
    }
}

/// Scroll axis touched by a wheel gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// `scrollLeft`.
    Horizontal,
    /// `scrollTop`.
    Vertical,
}

/// Wheel input delta.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WheelDelta {
    /// Horizontal delta.
    pub dx: f64,
    /// Vertical delta.
    pub dy: f64,
}

impl WheelDelta {
    /// Delta along the axis with the larger magnitude (vertical on ties).
    pub fn dominant(&self) -> f64 {
        if self.dy.abs() >= self.dx.abs() {
            self.dy
        } else {
            self.dx
        }
    }
}

/// What a wheel event resolved to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WheelOutcome {
    /// Add a physical delta to the scroll offset on `axis`.
    Scroll {
        /// Affected axis.
        axis: Axis,
        /// Physical delta in px.
        delta: f64,
    },
    /// Turn exactly one page.
    Page(PageTurn),
    /// Swallowed by the wheel-paging cooldown.
    Suppressed,
    /// Too small to act on.
    Ignored,
}

impl WheelOutcome {
    /// Whether the host should cancel the native wheel behaviour.
    pub fn prevents_default(&self) -> bool {
        !matches!(self, WheelOutcome::Ignored)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PressState {
    Idle,
    Pressed(Point),
}

/// Gesture state machine for one reader view.
#[derive(Clone, Debug)]
pub struct GestureDispatcher {
    state: PressState,
    skip_next_tap: bool,
    wheel_locked_until: Option<Instant>,
    slop: f64,
    top_edge: f64,
    wheel_cooldown: Duration,
}

impl Default for GestureDispatcher {
    fn default() -> Self {
        Self::new(TAP_SLOP_PX, TOP_EDGE_PX, WHEEL_COOLDOWN)
    }
}

impl GestureDispatcher {
    /// Dispatcher with explicit thresholds.
    pub fn new(slop: f64, top_edge: f64, wheel_cooldown: Duration) -> Self {
        Self {
            state: PressState::Idle,
            skip_next_tap: false,
            wheel_locked_until: None,
            slop,
            top_edge,
            wheel_cooldown,
        }
    }

    /// Pointer or finger went down. Secondary mouse buttons are ignored.
    pub fn press(&mut self, point: Point, pointer: PointerKind) {
        if let PointerKind::Mouse { button } = pointer {
            if button != 0 {
                return;
            }
        }
        self.state = PressState::Pressed(point);
    }

    /// Pointer left or the platform cancelled the gesture.
    pub fn cancel(&mut self) {
        self.state = PressState::Idle;
    }

    /// Whether a press is in progress.
    pub fn is_pressed(&self) -> bool {
        matches!(self.state, PressState::Pressed(_))
    }

    /// Pointer or finger went up.
    ///
    /// `on_control` is true when the release landed on an interactive
    /// control (button, input, select, textarea, link); such releases never
    /// page or toggle anything.
    pub fn release(&mut self, point: Point, on_control: bool, ctx: &GestureContext) -> ReleaseOutcome {
        let edge = if on_control {
            None
        } else {
            self.top_edge_action(point, ctx)
        };
        let action = self.tap_action(point, on_control, ctx);
        ReleaseOutcome { edge, action }
    }

    fn top_edge_action(&mut self, point: Point, ctx: &GestureContext) -> Option<EdgeAction> {
        if point.y >= self.top_edge {
            return None;
        }
        if ctx.topbar_hidden {
            self.skip_next_tap = true;
            Some(EdgeAction::RevealTopbar)
        } else {
            Some(EdgeAction::HideTopbar)
        }
    }

    fn tap_action(&mut self, point: Point, on_control: bool, ctx: &GestureContext) -> GestureAction {
        let state = core::mem::replace(&mut self.state, PressState::Idle);
        if self.skip_next_tap {
            self.skip_next_tap = false;
            log::debug!("[GESTURE] Tap consumed by top bar reveal");
            return GestureAction::Ignore;
        }
        let PressState::Pressed(down) = state else {
            return GestureAction::Ignore;
        };
        if classify_press(down, point, self.slop) == PressKind::Drag || on_control {
            return GestureAction::Ignore;
        }
        let zone = tap_zone(point.x, ctx.zone_width);
        if zone == TapZone::Center {
            return GestureAction::ToggleChrome;
        }
        if !ctx.paging_taps_enabled() {
            return GestureAction::Ignore;
        }
        ctx.zone_turn(zone)
            .map_or(GestureAction::Ignore, GestureAction::Page)
    }

    /// Wheel input at `now`.
    pub fn wheel(&mut self, delta: WheelDelta, now: Instant, ctx: &GestureContext) -> WheelOutcome {
        let dominant = delta.dominant();
        if !dominant.is_finite() {
            return WheelOutcome::Ignored;
        }
        match ctx.mode {
            DisplayMode::ScrollY => WheelOutcome::Scroll {
                axis: Axis::Vertical,
                delta: dominant,
            },
            DisplayMode::Paged if ctx.wheel_paging => self.wheel_page(dominant, now),
            _ => WheelOutcome::Scroll {
                axis: Axis::Horizontal,
                delta: ctx.direction.physical_delta(dominant),
            },
        }
    }

    fn wheel_page(&mut self, dominant: f64, now: Instant) -> WheelOutcome {
        if dominant.abs() < 1.0 {
            return WheelOutcome::Ignored;
        }
        if self.wheel_locked_until.is_some_and(|until| now < until) {
            return WheelOutcome::Suppressed;
        }
        self.wheel_locked_until = Some(now + self.wheel_cooldown);
        if dominant > 0.0 {
            WheelOutcome::Page(PageTurn::Forward)
        } else {
            WheelOutcome::Page(PageTurn::Backward)
        }
    }
}
