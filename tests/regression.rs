//! Regression tests for known bugs
//!
//! Each test documents a position-keeping bug seen in hosts and pins the
//! behavior that fixed it.

use std::time::{Duration, Instant};

use mu_reader::{
    Book, DisplayMode, EngineOptions, GestureAction, NoopHost, Point, PointerKind, Progress,
    ReaderEngine, ReaderHost, ScrollExtent, ScrollSurface, Settings, SettingsPatch,
    ViewportMetrics, WritingModePreference, FALLBACK_CHAPTER_ID,
};

struct Strip {
    width: ScrollExtent,
    height: ScrollExtent,
    left: f64,
    top: f64,
    chapters: Vec<(&'static str, f64)>,
}

impl Strip {
    fn new(scroll: f64, client: f64) -> Self {
        Self {
            width: ScrollExtent::new(scroll, client),
            height: ScrollExtent::new(2400.0, 600.0),
            left: 0.0,
            top: 0.0,
            chapters: Vec::new(),
        }
    }
}

impl ScrollSurface for Strip {
    fn horizontal_extent(&self) -> ScrollExtent {
        self.width
    }
    fn vertical_extent(&self) -> ScrollExtent {
        self.height
    }
    fn scroll_left(&self) -> f64 {
        self.left
    }
    fn set_scroll_left(&mut self, physical: f64) {
        self.left = self.width.clamp(physical);
    }
    fn scroll_top(&self) -> f64 {
        self.top
    }
    fn set_scroll_top(&mut self, offset: f64) {
        self.top = self.height.clamp(offset);
    }
    fn chapter_offset(&self, chapter_id: &str) -> Option<f64> {
        self.chapters
            .iter()
            .find(|(id, _)| *id == chapter_id)
            .map(|(_, start)| start - self.left)
    }
}

#[derive(Default)]
struct Deliveries(Vec<Progress>);

impl ReaderHost for Deliveries {
    fn on_update_progress(&mut self, next: &Progress) {
        self.0.push(next.clone());
    }
}

fn book() -> Book {
    Book::new("Plain", "<p>No chapter markers at all.</p>", Vec::new())
}

// =============================================================================
// Stale extents
// =============================================================================

/// Content that was still loading when the restore ran clamped the restore
/// to a stale maximum forever. The maximum is now read on every call.
#[test]
fn restore_uses_extent_at_restore_time() {
    let progress = Progress {
        page_index: Some(5),
        ..Progress::default()
    };
    let mut engine = ReaderEngine::new(
        book(),
        Settings::default(),
        progress.clone(),
        Strip::new(2000.0, 500.0),
        NoopHost,
    );
    engine.on_layout_settled();
    // Images finished loading between the two layout passes.
    engine.surface_mut().width = ScrollExtent::new(6000.0, 500.0);
    engine.on_layout_settled();
    assert_eq!(engine.surface().left, 2500.0);

    // And a shrink clamps instead of overshooting.
    engine.surface_mut().width = ScrollExtent::new(1500.0, 500.0);
    engine.restore(progress);
    engine.on_layout_settled();
    engine.on_layout_settled();
    assert_eq!(engine.surface().left, 1000.0);
}

/// Under rtl the physical offset is `max - logical`, so a restore that kept
/// the maximum from before the content grew landed pages away from the saved
/// one. The restore must use the grown maximum, and a later capture must read
/// back the same logical offset.
#[test]
fn rtl_restore_uses_extent_at_restore_time() {
    let settings = Settings {
        writing_mode_preference: WritingModePreference::Vertical,
        ..Settings::default()
    };
    let progress = Progress {
        page_index: Some(2),
        ..Progress::default()
    };
    let mut engine = ReaderEngine::new(
        book(),
        settings,
        progress,
        Strip::new(2000.0, 500.0),
        NoopHost,
    );
    engine.on_layout_settled();
    engine.surface_mut().width = ScrollExtent::new(6000.0, 500.0);
    engine.on_layout_settled();
    let max = engine.surface().width.max_offset();
    assert_eq!(engine.surface().left, max - 2.0 * 500.0);
    assert_eq!(engine.surface().left, 4500.0);

    // More content loads; the container keeps the reader's place by moving
    // the physical offset along with the new maximum.
    engine.surface_mut().width = ScrollExtent::new(8000.0, 500.0);
    engine.surface_mut().left += 2000.0;
    engine.on_viewport_change(ViewportMetrics::default());
    let captured = engine.capture();
    assert_eq!(captured.scroll_left, 1000.0);
    assert_eq!(captured.page_index, Some(2));
}

// =============================================================================
// Mode switches
// =============================================================================

/// Switching display mode before the saved position had been restored
/// captured the unrestored offset 0 and queued it behind the real restore,
/// which it then overwrote.
#[test]
fn mode_switch_before_first_settle_keeps_saved_page() {
    let progress = Progress {
        page_index: Some(3),
        ..Progress::default()
    };
    let mut engine = ReaderEngine::new(
        book(),
        Settings::default(),
        progress,
        Strip::new(4000.0, 500.0),
        NoopHost,
    );
    engine.update_settings(&SettingsPatch::display_mode("scroll-x"));
    assert_eq!(engine.mode(), DisplayMode::ScrollX);
    engine.on_layout_settled();
    engine.on_layout_settled();
    assert_eq!(engine.surface().left, 1500.0);
    assert!(!engine.restore_pending());
}

/// Rapid mode switches before the first settle each queued another restore
/// and pushed the initial settle out of the bounded queue.
#[test]
fn rapid_mode_switches_keep_one_queued_restore() {
    let progress = Progress {
        page_index: Some(3),
        ..Progress::default()
    };
    let mut engine = ReaderEngine::new(
        book(),
        Settings::default(),
        progress,
        Strip::new(4000.0, 500.0),
        NoopHost,
    );
    for mode in ["scroll-x", "paged", "scroll-x", "paged", "scroll-x"] {
        engine.update_settings(&SettingsPatch::display_mode(mode));
    }
    engine.on_layout_settled();
    engine.on_layout_settled();
    assert_eq!(engine.surface().left, 1500.0);
    assert!(!engine.restore_pending());
}

// =============================================================================
// Progress throttle
// =============================================================================

/// A fast fling used to persist the first position of the burst (leading
/// edge) and lose where the reader actually stopped.
#[test]
fn throttle_delivers_last_position_of_burst() {
    let mut engine = ReaderEngine::new(
        book(),
        Settings::default(),
        Progress::default(),
        Strip::new(8000.0, 800.0),
        Deliveries::default(),
    );
    engine.on_layout_settled();
    engine.on_layout_settled();

    let t0 = Instant::now();
    for i in 0..10u64 {
        engine.surface_mut().left = (i as f64) * 100.0;
        engine.on_scroll(t0 + Duration::from_millis(i * 20));
    }
    for ms in [100, 200, 249] {
        assert_eq!(engine.poll(t0 + Duration::from_millis(ms)), None);
    }
    engine.poll(t0 + Duration::from_millis(250));
    engine.poll(t0 + Duration::from_millis(500));

    let delivered = &engine.host().0;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].scroll_left, 900.0);
    assert_eq!(delivered[0].page_index, Some(1));
    assert_eq!(delivered[0].chapter_id.as_deref(), Some(FALLBACK_CHAPTER_ID));
}

/// A mode switch does not cancel a pending delivery; the record captured in
/// the old mode still lands once.
#[test]
fn pending_delivery_survives_mode_switch() {
    let mut engine = ReaderEngine::new(
        book(),
        Settings::default(),
        Progress::default(),
        Strip::new(8000.0, 800.0),
        Deliveries::default(),
    );
    engine.on_layout_settled();
    engine.on_layout_settled();
    let t0 = Instant::now();
    engine.surface_mut().left = 1600.0;
    engine.on_scroll(t0);
    engine.update_settings(&SettingsPatch::display_mode("scrolly"));
    assert_eq!(engine.mode(), DisplayMode::ScrollY);
    engine.poll(t0 + Duration::from_millis(250));
    assert_eq!(engine.host().0.len(), 1);
    assert_eq!(engine.host().0[0].scroll_left, 1600.0);
}

// =============================================================================
// Top-edge reveal
// =============================================================================

/// Revealing the hidden top bar with a tap near the top also turned the
/// page under the finger.
#[test]
fn top_edge_reveal_does_not_page() {
    let mut engine = ReaderEngine::new(
        book(),
        Settings::default(),
        Progress::default(),
        Strip::new(8000.0, 800.0),
        NoopHost,
    );
    engine.on_layout_settled();
    engine.on_layout_settled();
    engine.toggle_chrome();
    assert!(engine.chrome().topbar_hidden);

    engine.pointer_down(Point::new(750.0, 30.0), PointerKind::Touch);
    let out = engine.pointer_up(Point::new(750.0, 30.0), false);
    assert_eq!(out.action, GestureAction::Ignore);
    assert!(!engine.chrome().topbar_hidden);
    assert_eq!(engine.surface().left, 0.0);

    // The next tap pages normally.
    engine.pointer_down(Point::new(750.0, 400.0), PointerKind::Touch);
    engine.pointer_up(Point::new(750.0, 400.0), false);
    assert_eq!(engine.surface().left, 800.0);
}

// =============================================================================
// Chapter fallback
// =============================================================================

/// Books without chapter markers reported an empty chapter id, which the
/// host then failed to resolve on reopen.
#[test]
fn unmarked_book_reports_fallback_chapter() {
    let engine = ReaderEngine::new(
        book(),
        Settings::default(),
        Progress::default(),
        Strip::new(8000.0, 800.0),
        NoopHost,
    );
    assert!(engine.chapter_ids().is_empty());
    assert_eq!(engine.current_chapter_id(), FALLBACK_CHAPTER_ID);
}

/// A restore queued with a zero settle count ran before the initial settle
/// task and was then overwritten by the scroll to the start.
#[test]
fn restore_runs_after_initial_settle() {
    let progress = Progress {
        scroll_left: 1200.0,
        ..Progress::default()
    };
    let mut engine = ReaderEngine::with_options(
        book(),
        Settings::default(),
        progress,
        Strip::new(8000.0, 800.0),
        NoopHost,
        EngineOptions::default().with_settle_frames(0),
    );
    engine.on_layout_settled();
    assert_eq!(engine.surface().left, 1200.0);
}
