//! Reader settings, lenient coercion and the settings cascade.
//!
//! Settings arrive from three places (built-in defaults, the book itself,
//! and whatever was saved for this book last time) and any of them may be
//! stale, hand-edited or written by an older version. Every field therefore
//! goes through a coercion with a total fallback; malformed values degrade
//! to the default instead of failing the whole restore.
//!
//! # Cascade
//!
//! ```rust
//! use mu_reader::settings::{cascade, Settings};
//! use serde_json::json;
//!
//! let book = json!({ "fontSize": 120 });
//! let saved = json!({ "fontSize": 140, "displayMode": "scroll" });
//! let merged = cascade(&Settings::default(), Some(&book), Some(&saved));
//! assert_eq!(merged.font_size, 140.0);
//! assert_eq!(merged.display_mode.as_str(), "scrolly");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::direction::WritingModePreference;
use crate::mode::{normalize_display_mode, DisplayMode};

/// Default font size (percent of the base size).
pub const DEFAULT_FONT_SIZE: f64 = 100.0;
/// Default unitless line height.
pub const DEFAULT_LINE_HEIGHT: f64 = 1.8;
/// Default letter spacing in px.
pub const DEFAULT_LETTER_SPACING: f64 = 0.0;
/// Default wrap width (percent of viewport width).
pub const DEFAULT_WRAP_WIDTH_PERCENT: u8 = 100;
/// Narrowest allowed wrap width.
pub const MIN_WRAP_WIDTH_PERCENT: u8 = 75;

/// Colour theme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark text on a light page.
    #[default]
    Light,
    /// Light text on a dark page.
    Dark,
}

/// Presentation flags owned by the theme. Exactly one is set.
pub const THEME_FLAGS: [&str; 2] = ["theme-light", "theme-dark"];

impl Theme {
    /// Anything other than `dark` is the light theme.
    pub fn from_input(input: Option<&str>) -> Self {
        match input.map(str::trim) {
            Some(raw) if raw.eq_ignore_ascii_case("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    /// Canonical token.
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Presentation flag for this theme.
    pub fn flag(self) -> &'static str {
        match self {
            Theme::Light => THEME_FLAGS[0],
            Theme::Dark => THEME_FLAGS[1],
        }
    }
}

/// Active reader configuration for one open book.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub struct Settings {
    /// Font size, percent of the base size.
    pub font_size: f64,
    /// Unitless line height.
    pub line_height: f64,
    /// Letter spacing in px.
    pub letter_spacing: f64,
    /// Colour theme.
    pub theme: Theme,
    /// Layout mode.
    pub display_mode: DisplayMode,
    /// Let edge taps turn pages in continuous-scroll modes too.
    pub tap_in_scroll: bool,
    /// Turn one page per wheel gesture in paged mode.
    pub wheel_paging: bool,
    /// Page width as a percentage of the viewport, within `[75, 100]`.
    pub wrap_width_percent: u8,
    /// Writing-mode override.
    pub writing_mode_preference: WritingModePreference,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            line_height: DEFAULT_LINE_HEIGHT,
            letter_spacing: DEFAULT_LETTER_SPACING,
            theme: Theme::Light,
            display_mode: DisplayMode::Paged,
            tap_in_scroll: false,
            wheel_paging: false,
            wrap_width_percent: DEFAULT_WRAP_WIDTH_PERCENT,
            writing_mode_preference: WritingModePreference::Auto,
        }
    }
}

impl From<Value> for Settings {
    fn from(value: Value) -> Self {
        Settings::from_value(&value)
    }
}

impl Settings {
    /// Coerce an arbitrary JSON value into settings. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let field = |key: &str| value.get(key);
        Self {
            font_size: number_or(field("fontSize"), DEFAULT_FONT_SIZE),
            line_height: number_or(field("lineHeight"), DEFAULT_LINE_HEIGHT),
            letter_spacing: number_or(field("letterSpacing"), DEFAULT_LETTER_SPACING),
            theme: Theme::from_input(text(field("theme")).as_deref()),
            display_mode: DisplayMode::from_input(text(field("displayMode")).as_deref()),
            tap_in_scroll: truthy(field("tapInScroll")),
            wheel_paging: truthy(field("wheelPaging")),
            wrap_width_percent: normalize_wrap_width_percent(field("wrapWidthPercent")),
            writing_mode_preference: WritingModePreference::from_input(
                text(field("writingModePreference")).as_deref(),
            ),
        }
    }

    /// Encode as a JSON object with camelCase keys.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Apply a patch, returning the next settings.
    pub fn patched(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.font_size {
            next.font_size = nonzero_or(v, DEFAULT_FONT_SIZE);
        }
        if let Some(v) = patch.line_height {
            next.line_height = nonzero_or(v, DEFAULT_LINE_HEIGHT);
        }
        if let Some(v) = patch.letter_spacing {
            next.letter_spacing = nonzero_or(v, DEFAULT_LETTER_SPACING);
        }
        if let Some(v) = patch.theme {
            next.theme = v;
        }
        if let Some(v) = patch.display_mode {
            next.display_mode = v;
        }
        if let Some(v) = patch.tap_in_scroll {
            next.tap_in_scroll = v;
        }
        if let Some(v) = patch.wheel_paging {
            next.wheel_paging = v;
        }
        if let Some(v) = patch.wrap_width_percent {
            next.wrap_width_percent = clamp_wrap_width(v);
        }
        if let Some(v) = patch.writing_mode_preference {
            next.writing_mode_preference = v;
        }
        next
    }
}

/// Partial settings update. `None` fields keep their current value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsPatch {
    /// New font size.
    pub font_size: Option<f64>,
    /// New line height.
    pub line_height: Option<f64>,
    /// New letter spacing.
    pub letter_spacing: Option<f64>,
    /// New theme.
    pub theme: Option<Theme>,
    /// New display mode.
    pub display_mode: Option<DisplayMode>,
    /// New tap-in-scroll flag.
    pub tap_in_scroll: Option<bool>,
    /// New wheel-paging flag.
    pub wheel_paging: Option<bool>,
    /// New wrap width; clamped on apply.
    pub wrap_width_percent: Option<f64>,
    /// New writing-mode preference.
    pub writing_mode_preference: Option<WritingModePreference>,
}

impl SettingsPatch {
    /// Patch that only changes the display mode, normalized from free-form input.
    pub fn display_mode(input: &str) -> Self {
        Self {
            display_mode: Some(normalize_display_mode(input)),
            ..Self::default()
        }
    }
}

/// Merge defaults, book-supplied and saved settings (lowest to highest precedence).
///
/// Layers are merged key by key before coercion, so a corrupt saved value
/// shadows the book's value and then falls back to the built-in default.
/// Non-object layers are ignored.
pub fn cascade(defaults: &Settings, book: Option<&Value>, saved: Option<&Value>) -> Settings {
    let mut merged = match defaults.to_value() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for layer in [book, saved].into_iter().flatten() {
        if let Value::Object(map) = layer {
            for (key, value) in map {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    Settings::from_value(&Value::Object(merged))
}

/// Snapshot of the settings form controls, stored as their raw values.
///
/// Live updates read the controls, overlay the patch and re-apply, so the
/// form is kept in sync after every apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsForm {
    /// Font size range value.
    pub font_size: String,
    /// Line height range value.
    pub line_height: String,
    /// Letter spacing range value.
    pub letter_spacing: String,
    /// Wrap width range value.
    pub wrap_width: String,
    /// Theme select value.
    pub theme: String,
    /// Writing mode select value.
    pub writing_mode: String,
    /// Checked display mode radio.
    pub display_mode: String,
    /// Wheel paging checkbox.
    pub wheel_paging: bool,
    /// Tap-in-scroll checkbox.
    pub tap_in_scroll: bool,
}

impl Default for SettingsForm {
    fn default() -> Self {
        let mut form = Self {
            font_size: String::new(),
            line_height: String::new(),
            letter_spacing: String::new(),
            wrap_width: String::new(),
            theme: String::new(),
            writing_mode: String::new(),
            display_mode: String::new(),
            wheel_paging: false,
            tap_in_scroll: false,
        };
        form.sync(&Settings::default());
        form
    }
}

impl SettingsForm {
    /// Write settings back into the controls.
    pub fn sync(&mut self, settings: &Settings) {
        self.font_size = settings.font_size.to_string();
        self.line_height = settings.line_height.to_string();
        self.letter_spacing = settings.letter_spacing.to_string();
        self.wrap_width = settings.wrap_width_percent.to_string();
        self.theme = settings.theme.as_str().to_string();
        self.writing_mode = settings.writing_mode_preference.as_str().to_string();
        self.display_mode = settings.display_mode.as_str().to_string();
        self.wheel_paging = settings.wheel_paging;
        self.tap_in_scroll = settings.tap_in_scroll;
    }

    /// Read the controls back into settings, coercing as stored values are.
    pub fn current_settings(&self) -> Settings {
        let mut map = Map::new();
        map.insert("fontSize".into(), Value::String(self.font_size.clone()));
        map.insert("lineHeight".into(), Value::String(self.line_height.clone()));
        map.insert("letterSpacing".into(), Value::String(self.letter_spacing.clone()));
        map.insert("wrapWidthPercent".into(), Value::String(self.wrap_width.clone()));
        map.insert("theme".into(), Value::String(self.theme.clone()));
        map.insert("writingModePreference".into(), Value::String(self.writing_mode.clone()));
        map.insert("displayMode".into(), Value::String(self.display_mode.clone()));
        map.insert("wheelPaging".into(), Value::Bool(self.wheel_paging));
        map.insert("tapInScroll".into(), Value::Bool(self.tap_in_scroll));
        Settings::from_value(&Value::Object(map))
    }
}

/// Numeric reading of a loosely-typed value. `None` when it is not a number.
///
/// Numeric strings parse, booleans count as 0/1, and blank strings, `null`,
/// arrays and objects are not numbers.
pub fn js_number(value: Option<&Value>) -> Option<f64> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Number with a fallback for missing, non-numeric or zero input.
pub fn number_or(value: Option<&Value>, default: f64) -> f64 {
    match js_number(value) {
        Some(n) if n != 0.0 => n,
        _ => default,
    }
}

fn nonzero_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value != 0.0 {
        value
    } else {
        default
    }
}

/// Truthiness of a loosely-typed value.
pub fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Wrap width in `[75, 100]`; non-numeric input is 100.
///
/// Null and blank input also read as 100. Plain numeric coercion would turn
/// them into 0 and clamp to 75; a cleared control keeps the full width instead.
pub fn normalize_wrap_width_percent(value: Option<&Value>) -> u8 {
    match js_number(value) {
        Some(n) => clamp_wrap_width(n),
        None => DEFAULT_WRAP_WIDTH_PERCENT,
    }
}

fn clamp_wrap_width(value: f64) -> u8 {
    if !value.is_finite() {
        return DEFAULT_WRAP_WIDTH_PERCENT;
    }
    value.round().clamp(
        f64::from(MIN_WRAP_WIDTH_PERCENT),
        f64::from(DEFAULT_WRAP_WIDTH_PERCENT),
    ) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cascade_precedence() {
        let defaults = Settings::default();
        let book = json!({ "fontSize": 120 });
        let saved = json!({ "fontSize": 140 });
        assert_eq!(cascade(&defaults, Some(&book), Some(&saved)).font_size, 140.0);
        assert_eq!(cascade(&defaults, Some(&book), None).font_size, 120.0);
        assert_eq!(cascade(&defaults, None, None).font_size, 100.0);
    }

    #[test]
    fn test_cascade_corrupt_saved_value_degrades_to_default() {
        let book = json!({ "fontSize": 120, "lineHeight": 2.0 });
        let saved = json!({ "fontSize": "huge", "lineHeight": null });
        let merged = cascade(&Settings::default(), Some(&book), Some(&saved));
        assert_eq!(merged.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(merged.line_height, DEFAULT_LINE_HEIGHT);
    }

    #[test]
    fn test_cascade_ignores_non_object_layers() {
        let saved = json!("not an object");
        let merged = cascade(&Settings::default(), None, Some(&saved));
        assert_eq!(merged, Settings::default());
    }

    #[test]
    fn test_from_value_coerces_loose_types() {
        let raw = json!({
            "fontSize": "130",
            "letterSpacing": true,
            "theme": "DARK",
            "displayMode": "scroll-x",
            "tapInScroll": 1,
            "wheelPaging": "",
            "wrapWidthPercent": "60",
            "writingModePreference": 7
        });
        let settings = Settings::from_value(&raw);
        assert_eq!(settings.font_size, 130.0);
        assert_eq!(settings.letter_spacing, 1.0);
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.display_mode, DisplayMode::ScrollX);
        assert!(settings.tap_in_scroll);
        assert!(!settings.wheel_paging);
        assert_eq!(settings.wrap_width_percent, 75);
        assert_eq!(settings.writing_mode_preference, WritingModePreference::Auto);
    }

    #[test]
    fn test_zero_font_size_falls_back() {
        let settings = Settings::from_value(&json!({ "fontSize": 0 }));
        assert_eq!(settings.font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_wrap_width_rounds_and_clamps() {
        assert_eq!(normalize_wrap_width_percent(Some(&json!(87.6))), 88);
        assert_eq!(normalize_wrap_width_percent(Some(&json!(140))), 100);
        assert_eq!(normalize_wrap_width_percent(Some(&json!("abc"))), 100);
        assert_eq!(normalize_wrap_width_percent(None), 100);
        assert_eq!(normalize_wrap_width_percent(Some(&Value::Null)), 100);
        assert_eq!(normalize_wrap_width_percent(Some(&json!("  "))), 100);
        assert_eq!(normalize_wrap_width_percent(Some(&json!(0))), 75);
    }

    #[test]
    fn test_deserialize_is_lenient() {
        let settings: Settings =
            serde_json::from_str(r#"{"fontSize":"x","theme":42,"displayMode":"vertical"}"#).unwrap();
        assert_eq!(settings.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.display_mode, DisplayMode::ScrollY);
    }

    #[test]
    fn test_serialized_settings_reload_identically() {
        let mut settings = Settings::default();
        settings.font_size = 115.0;
        settings.display_mode = DisplayMode::ScrollY;
        settings.writing_mode_preference = WritingModePreference::Vertical;
        settings.wrap_width_percent = 80;
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"writingModePreference\":\"vertical\""));
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_patch_applies_only_present_fields() {
        let base = Settings::default();
        let patch = SettingsPatch {
            line_height: Some(2.2),
            wrap_width_percent: Some(50.0),
            ..SettingsPatch::default()
        };
        let next = base.patched(&patch);
        assert_eq!(next.line_height, 2.2);
        assert_eq!(next.wrap_width_percent, 75);
        assert_eq!(next.font_size, base.font_size);
    }

    #[test]
    fn test_form_round_trips_settings() {
        let mut settings = Settings::default();
        settings.line_height = 1.5;
        settings.theme = Theme::Dark;
        settings.tap_in_scroll = true;
        let mut form = SettingsForm::default();
        form.sync(&settings);
        assert_eq!(form.line_height, "1.5");
        assert_eq!(form.font_size, "100");
        assert_eq!(form.current_settings(), settings);
    }
}
