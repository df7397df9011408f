//! Display mode state and presentation flags.
//!
//! The reader is always in exactly one of three modes. Free-form input
//! (stored settings, form radios, book metadata) is normalized here so the
//! rest of the engine only ever sees a valid variant.

use serde::Serialize;

/// How the book is laid out and advanced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Discrete page-sized jumps along the horizontal axis.
    #[default]
    Paged,
    /// Continuous horizontal scrolling.
    #[serde(rename = "scrollx")]
    ScrollX,
    /// Continuous vertical scrolling.
    #[serde(rename = "scrolly")]
    ScrollY,
}

/// Presentation flags owned by the display mode. Exactly one is set.
pub const MODE_FLAGS: [&str; 3] = ["mode-paged", "mode-scrollx", "mode-scrolly"];

impl DisplayMode {
    /// Normalize optional input; absent values are `Paged`.
    pub fn from_input(input: Option<&str>) -> Self {
        input.map(normalize_display_mode).unwrap_or_default()
    }

    /// Canonical token.
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::Paged => "paged",
            DisplayMode::ScrollX => "scrollx",
            DisplayMode::ScrollY => "scrolly",
        }
    }

    /// Presentation flag for this mode.
    pub fn flag(self) -> &'static str {
        match self {
            DisplayMode::Paged => MODE_FLAGS[0],
            DisplayMode::ScrollX => MODE_FLAGS[1],
            DisplayMode::ScrollY => MODE_FLAGS[2],
        }
    }

    /// Progress for this mode is tracked on the vertical axis.
    pub fn is_vertical(self) -> bool {
        matches!(self, DisplayMode::ScrollY)
    }

    /// Continuous-scroll modes.
    pub fn is_continuous(self) -> bool {
        !matches!(self, DisplayMode::Paged)
    }
}

/// Normalize any string into a display mode. Total and idempotent.
pub fn normalize_display_mode(input: &str) -> DisplayMode {
    match input.trim().to_ascii_lowercase().as_str() {
        "scrollx" | "scroll-x" => DisplayMode::ScrollX,
        "scrolly" | "scroll-y" | "scroll" | "vertical" => DisplayMode::ScrollY,
        _ => DisplayMode::Paged,
    }
}

/// Small ordered set of presentation flags (CSS classes on the host side).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassList {
    flags: Vec<&'static str>,
}

impl ClassList {
    /// Empty flag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a flag. No-op if already present.
    pub fn add(&mut self, flag: &'static str) {
        if !self.contains(flag) {
            self.flags.push(flag);
        }
    }

    /// Clear a flag. No-op if absent.
    pub fn remove(&mut self, flag: &str) {
        self.flags.retain(|f| *f != flag);
    }

    /// Clear every flag in `flags`.
    pub fn remove_all(&mut self, flags: &[&str]) {
        self.flags.retain(|f| !flags.contains(f));
    }

    /// Set or clear a flag.
    pub fn set(&mut self, flag: &'static str, on: bool) {
        if on {
            self.add(flag);
        } else {
            self.remove(flag);
        }
    }

    /// Whether a flag is set.
    pub fn contains(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| *f == flag)
    }

    /// Iterate set flags in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.flags.iter().copied()
    }

    /// Clear all of `group`, then set `flag`.
    pub fn select(&mut self, group: &[&str], flag: &'static str) {
        self.remove_all(group);
        self.add(flag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_table() {
        assert_eq!(normalize_display_mode("scroll-x"), DisplayMode::ScrollX);
        assert_eq!(normalize_display_mode("ScrollX"), DisplayMode::ScrollX);
        assert_eq!(normalize_display_mode("scroll"), DisplayMode::ScrollY);
        assert_eq!(normalize_display_mode("scroll-y"), DisplayMode::ScrollY);
        assert_eq!(normalize_display_mode("VERTICAL"), DisplayMode::ScrollY);
        assert_eq!(normalize_display_mode("paged"), DisplayMode::Paged);
    }

    #[test]
    fn test_normalize_is_total_and_idempotent() {
        for input in ["", " ", "garbage", "scrolly", "scroll-x", "páginas", "\0", "scrollz"] {
            let once = normalize_display_mode(input);
            let twice = normalize_display_mode(once.as_str());
            assert_eq!(once, twice, "input={:?}", input);
        }
        assert_eq!(DisplayMode::from_input(None), DisplayMode::Paged);
    }

    #[test]
    fn test_select_keeps_exactly_one_mode_flag() {
        let mut classes = ClassList::new();
        classes.add("theme-dark");
        for mode in [DisplayMode::ScrollX, DisplayMode::Paged, DisplayMode::ScrollY] {
            classes.select(&MODE_FLAGS, mode.flag());
            let active = MODE_FLAGS.iter().filter(|f| classes.contains(f)).count();
            assert_eq!(active, 1);
            assert!(classes.contains(mode.flag()));
        }
        assert!(classes.contains("theme-dark"));
    }

    #[test]
    fn test_serializes_canonical_token() {
        let json = serde_json::to_string(&DisplayMode::ScrollX).unwrap();
        assert_eq!(json, "\"scrollx\"");
    }
}
