#![forbid(unsafe_code)]

//! Session configuration.
//!
//! [`RenderConfig::detect`] starts from the detected terminal capabilities
//! and then applies two environment overrides:
//!
//! | Variable | Values | Effect |
//! |---|---|---|
//! | `STRATUM_COLOR_DEPTH` | `none`, `16`, `256`, `truecolor` | forces the output color depth |
//! | `STRATUM_SYNC_OUTPUT` | `0`, `1` | forces synchronized output off or on |
//!
//! Unparseable override values are ignored with a warning.

use std::env;

use stratum_core::terminal_capabilities::{ColorDepth, TerminalCapabilities};
use stratum_render::display::DEFAULT_FULL_REDRAW_RATIO;

pub const COLOR_DEPTH_ENV: &str = "STRATUM_COLOR_DEPTH";
pub const SYNC_OUTPUT_ENV: &str = "STRATUM_SYNC_OUTPUT";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub capabilities: TerminalCapabilities,
    /// Depth the escape generator quantizes colors to.
    pub color_depth: ColorDepth,
    /// Wrap each frame in DEC 2026 begin/end.
    pub sync_output: bool,
    /// Hide the cursor while a frame is written.
    pub hide_cursor: bool,
    /// Where the cursor is left (and shown) after each frame.
    pub final_cursor: Option<(u16, u16)>,
    /// Changed-cell fraction above which a frame is repainted in full.
    pub full_redraw_ratio: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::from_capabilities(TerminalCapabilities::modern())
    }
}

impl RenderConfig {
    /// Settings implied by `capabilities`, with no overrides.
    pub fn from_capabilities(capabilities: TerminalCapabilities) -> Self {
        Self {
            capabilities,
            color_depth: capabilities.color_depth(),
            sync_output: capabilities.use_sync_output(),
            hide_cursor: true,
            final_cursor: None,
            full_redraw_ratio: DEFAULT_FULL_REDRAW_RATIO,
        }
    }

    /// Detect the terminal and apply environment overrides.
    #[must_use]
    pub fn detect() -> Self {
        Self::from_capabilities(TerminalCapabilities::detect())
            .with_overrides(|key| env::var(key).ok())
    }

    /// Apply `STRATUM_*` overrides read through `lookup`.
    #[must_use]
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(COLOR_DEPTH_ENV) {
            match raw.parse::<ColorDepth>() {
                Ok(depth) => self.color_depth = depth,
                Err(_err) => {
                    stratum_core::warn!(error = %_err, "ignoring STRATUM_COLOR_DEPTH");
                }
            }
        }
        if let Some(raw) = lookup(SYNC_OUTPUT_ENV) {
            match parse_flag(&raw) {
                Some(on) => self.sync_output = on,
                None => {
                    stratum_core::warn!(value = %raw, "ignoring STRATUM_SYNC_OUTPUT");
                }
            }
        }
        self
    }

    #[must_use]
    pub fn color_depth(mut self, depth: ColorDepth) -> Self {
        self.color_depth = depth;
        self
    }

    #[must_use]
    pub fn sync_output(mut self, enabled: bool) -> Self {
        self.sync_output = enabled;
        self
    }

    #[must_use]
    pub fn hide_cursor(mut self, hide: bool) -> Self {
        self.hide_cursor = hide;
        self
    }

    #[must_use]
    pub fn final_cursor(mut self, cursor: Option<(u16, u16)>) -> Self {
        self.final_cursor = cursor;
        self
    }

    #[must_use]
    pub fn full_redraw_ratio(mut self, ratio: f32) -> Self {
        self.full_redraw_ratio = ratio;
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_follow_capabilities() {
        let cfg = RenderConfig::from_capabilities(TerminalCapabilities::basic());
        assert_eq!(cfg.color_depth, ColorDepth::NoColor);
        assert!(!cfg.sync_output);
        assert!(cfg.hide_cursor);

        let cfg = RenderConfig::default();
        assert_eq!(cfg.color_depth, ColorDepth::TrueColor);
        assert!(cfg.sync_output);
    }

    #[test]
    fn overrides_win_over_detection() {
        let cfg = RenderConfig::from_capabilities(TerminalCapabilities::modern())
            .with_overrides(lookup(&[(COLOR_DEPTH_ENV, "256"), (SYNC_OUTPUT_ENV, "0")]));
        assert_eq!(cfg.color_depth, ColorDepth::Ansi256);
        assert!(!cfg.sync_output);
    }

    #[test]
    fn bad_overrides_are_ignored() {
        let cfg = RenderConfig::default()
            .with_overrides(lookup(&[(COLOR_DEPTH_ENV, "lots"), (SYNC_OUTPUT_ENV, "maybe")]));
        assert_eq!(cfg, RenderConfig::default());
    }

    #[test]
    fn builders_set_fields() {
        let cfg = RenderConfig::default()
            .color_depth(ColorDepth::Ansi16)
            .sync_output(false)
            .hide_cursor(false)
            .final_cursor(Some((0, 5)))
            .full_redraw_ratio(0.25);
        assert_eq!(cfg.color_depth, ColorDepth::Ansi16);
        assert!(!cfg.sync_output && !cfg.hide_cursor);
        assert_eq!(cfg.final_cursor, Some((0, 5)));
        assert_eq!(cfg.full_redraw_ratio, 0.25);
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag(" ON "), Some(true));
        assert_eq!(parse_flag("no"), Some(false));
        assert_eq!(parse_flag("2"), None);
    }
}
