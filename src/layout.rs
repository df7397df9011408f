//! Layout reflow: page width and chrome offsets.
//!
//! Pure recomputation from viewport metrics. Running it twice with the same
//! inputs yields the same variables, so the engine simply calls it after
//! every resize, orientation change and wrap-width change.

/// Page width never drops below this many px.
pub const MIN_PAGE_WIDTH_PX: f64 = 240.0;

/// Top bar height assumed when the host cannot measure it.
pub const DEFAULT_TOPBAR_HEIGHT_PX: f64 = 64.0;

const TASKBAR_ROW_PX: f64 = 48.0;
const WRAP_MIN_USABLE_HEIGHT_PX: f64 = 620.0;
const WRAP_MIN_WINDOW_WIDTH_PX: f64 = 980.0;

/// Viewport measurements supplied by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportMetrics {
    /// Width of the reading viewport (falls back to the window width when 0).
    pub viewport_width: f64,
    /// Window inner width.
    pub window_width: f64,
    /// Window inner height.
    pub window_height: f64,
    /// Visual viewport height (on-screen keyboards shrink it), if known.
    pub visual_height: Option<f64>,
    /// Screen height available to windows, if known.
    pub available_height: Option<f64>,
    /// Measured top bar height, if rendered.
    pub topbar_height: Option<f64>,
    /// Top bar controls overflow their row.
    pub controls_overflow: bool,
    /// Host reserves taskbar rows at the screen edge (desktop Windows).
    pub reserves_taskbar: bool,
}

/// Derived layout variables pushed to the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutVars {
    /// Content page width in px.
    pub page_width: f64,
    /// Usable viewport height in px; `None` when the host reported nothing.
    pub viewport_height: Option<f64>,
    /// Height the content must clear for the top bar (0 when hidden).
    pub topbar_offset: f64,
    /// Top bar should wrap its controls onto multiple rows.
    pub topbar_wrap: bool,
}

/// Page width for a viewport width and wrap percentage.
pub fn page_width(viewport_width: f64, wrap_width_percent: u8, min_width: f64) -> f64 {
    let width = if viewport_width.is_finite() { viewport_width } else { 0.0 };
    let wrapped = (width * f64::from(wrap_width_percent) / 100.0).round();
    wrapped.max(min_width)
}

/// Recompute every layout variable.
pub fn reflow(
    metrics: &ViewportMetrics,
    wrap_width_percent: u8,
    topbar_hidden: bool,
    min_page_width: f64,
) -> LayoutVars {
    let width = if metrics.viewport_width > 0.0 {
        metrics.viewport_width
    } else {
        metrics.window_width
    };
    LayoutVars {
        page_width: page_width(width, wrap_width_percent, min_page_width),
        viewport_height: viewport_height(metrics),
        topbar_offset: topbar_offset(metrics, topbar_hidden),
        topbar_wrap: topbar_wrap(metrics),
    }
}

fn viewport_height(metrics: &ViewportMetrics) -> Option<f64> {
    let height = metrics
        .visual_height
        .filter(|h| h.is_finite() && *h > 0.0)
        .unwrap_or(metrics.window_height);
    (height.is_finite() && height > 0.0).then(|| height.round())
}

fn topbar_offset(metrics: &ViewportMetrics, hidden: bool) -> f64 {
    if hidden {
        return 0.0;
    }
    metrics
        .topbar_height
        .filter(|h| h.is_finite() && *h > 0.0)
        .unwrap_or(DEFAULT_TOPBAR_HEIGHT_PX)
}

fn topbar_wrap(metrics: &ViewportMetrics) -> bool {
    if !metrics.reserves_taskbar {
        return false;
    }
    let available = metrics.available_height.unwrap_or(metrics.window_height);
    let usable = (metrics.window_height.min(available) - TASKBAR_ROW_PX * 2.0).max(0.0);
    metrics.controls_overflow
        || usable < WRAP_MIN_USABLE_HEIGHT_PX
        || metrics.window_width < WRAP_MIN_WINDOW_WIDTH_PX
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desktop() -> ViewportMetrics {
        ViewportMetrics {
            viewport_width: 1000.0,
            window_width: 1280.0,
            window_height: 900.0,
            visual_height: Some(880.4),
            available_height: Some(1040.0),
            topbar_height: Some(56.0),
            controls_overflow: false,
            reserves_taskbar: false,
        }
    }

    #[test]
    fn test_page_width_percentage_and_minimum() {
        assert_eq!(page_width(1000.0, 80, MIN_PAGE_WIDTH_PX), 800.0);
        assert_eq!(page_width(300.0, 75, MIN_PAGE_WIDTH_PX), 240.0);
        assert_eq!(page_width(f64::NAN, 100, MIN_PAGE_WIDTH_PX), 240.0);
    }

    #[test]
    fn test_reflow_is_idempotent() {
        let metrics = desktop();
        let a = reflow(&metrics, 90, false, MIN_PAGE_WIDTH_PX);
        let b = reflow(&metrics, 90, false, MIN_PAGE_WIDTH_PX);
        assert_eq!(a, b);
        assert_eq!(a.page_width, 900.0);
        assert_eq!(a.viewport_height, Some(880.0));
        assert_eq!(a.topbar_offset, 56.0);
        assert!(!a.topbar_wrap);
    }

    #[test]
    fn test_hidden_topbar_has_no_offset() {
        let vars = reflow(&desktop(), 100, true, MIN_PAGE_WIDTH_PX);
        assert_eq!(vars.topbar_offset, 0.0);
    }

    #[test]
    fn test_falls_back_to_window_measurements() {
        let metrics = ViewportMetrics {
            viewport_width: 0.0,
            window_width: 600.0,
            window_height: 700.0,
            ..ViewportMetrics::default()
        };
        let vars = reflow(&metrics, 100, false, MIN_PAGE_WIDTH_PX);
        assert_eq!(vars.page_width, 600.0);
        assert_eq!(vars.viewport_height, Some(700.0));
        assert_eq!(vars.topbar_offset, DEFAULT_TOPBAR_HEIGHT_PX);
        assert_eq!(reflow(&ViewportMetrics::default(), 100, false, 240.0).viewport_height, None);
    }

    #[test]
    fn test_topbar_wraps_on_cramped_taskbar_hosts() {
        let mut metrics = desktop();
        metrics.reserves_taskbar = true;
        assert!(!reflow(&metrics, 100, false, MIN_PAGE_WIDTH_PX).topbar_wrap);
        metrics.window_height = 700.0;
        assert!(reflow(&metrics, 100, false, MIN_PAGE_WIDTH_PX).topbar_wrap);
        metrics.window_height = 900.0;
        metrics.controls_overflow = true;
        assert!(reflow(&metrics, 100, false, MIN_PAGE_WIDTH_PX).topbar_wrap);
    }
}
