//! Editor configuration.
//!
//! Every field has a default matching the 1080×1920 story format, so an
//! empty JSON object is a valid config. Hosts override only what they need.

use crate::color::Color;
use crate::error::SceneError;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};

// ─── Config ───────────────────────────────────────────────────────────────

/// Top-level configuration consumed by the scene store, theme adapter,
/// ingestion helpers and export pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub canvas: CanvasConfig,
    pub safe_zone: SafeZoneConfig,
    pub light: ThemePalette,
    pub dark: ThemePalette,

    /// Background forced onto the canvas for the duration of an export.
    pub export_background: Color,

    /// Width ingested images are scaled to on insertion.
    pub asset_width: f64,

    /// Maximum undo depth kept by the command stack.
    pub undo_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Scale the canvas is shown at on screen (540×960 for the default).
    pub display_scale: f64,
}

/// Protected bands at the top and bottom of the story canvas where
/// platform chrome (profile header, reply bar) covers content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeZoneConfig {
    pub enabled: bool,
    pub top: f64,
    pub bottom: f64,
    pub color: Color,
}

/// Static per-theme colors for the canvas and newly created objects.
/// Palettes are replaced whole; there is no per-field merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemePalette {
    pub canvas_background: Color,
    pub text: Color,
    pub shape_fill: Color,
    pub shape_stroke: Color,
    pub selection: Color,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            safe_zone: SafeZoneConfig::default(),
            light: ThemePalette::light(),
            dark: ThemePalette::dark(),
            export_background: Color::WHITE,
            asset_width: 400.0,
            undo_depth: 100,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            display_scale: 0.5,
        }
    }
}

impl Default for SafeZoneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            top: 200.0,
            bottom: 250.0,
            color: Color::rgba(255, 59, 48, 38),
        }
    }
}

impl ThemePalette {
    pub fn light() -> Self {
        Self {
            canvas_background: Color::WHITE,
            text: Color::BLACK,
            shape_fill: Color::rgb(0x3b, 0x82, 0xf6),
            shape_stroke: Color::rgb(0x1e, 0x29, 0x3b),
            selection: Color::rgb(0x25, 0x63, 0xeb),
        }
    }

    pub fn dark() -> Self {
        Self {
            canvas_background: Color::rgb(0x1a, 0x1a, 0x1a),
            text: Color::WHITE,
            shape_fill: Color::rgb(0x60, 0xa5, 0xfa),
            shape_stroke: Color::rgb(0xe2, 0xe8, 0xf0),
            selection: Color::rgb(0x93, 0xc5, 0xfd),
        }
    }
}

impl EditorConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`SceneError::Config`] on malformed JSON or invalid values.
    pub fn from_json(text: &str) -> Result<Self, SceneError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| SceneError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn palette(&self, theme: Theme) -> &ThemePalette {
        match theme {
            Theme::Light => &self.light,
            Theme::Dark => &self.dark,
        }
    }

    fn validate(&self) -> Result<(), SceneError> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(SceneError::Config("canvas dimensions must be non-zero".into()));
        }
        if !(self.canvas.display_scale > 0.0) {
            return Err(SceneError::Config("display_scale must be positive".into()));
        }
        let bands = self.safe_zone.top + self.safe_zone.bottom;
        if self.safe_zone.top < 0.0 || self.safe_zone.bottom < 0.0 || bands >= self.canvas.height as f64
        {
            return Err(SceneError::Config(format!(
                "safe zone bands ({bands}px) do not fit a {}px canvas",
                self.canvas.height
            )));
        }
        if !(self.asset_width >= 1.0) {
            return Err(SceneError::Config("asset_width must be at least 1px".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_is_default() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.safe_zone.top, 200.0);
        assert_eq!(config.safe_zone.bottom, 250.0);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            EditorConfig::from_json(r#"{ "canvas": { "display_scale": 1.0 }, "asset_width": 320 }"#)
                .unwrap();
        assert_eq!(config.canvas.display_scale, 1.0);
        assert_eq!(config.canvas.width, 1080);
        assert_eq!(config.asset_width, 320.0);
        assert_eq!(config.dark, ThemePalette::dark());
    }

    #[test]
    fn palettes_are_replaced_whole() {
        let err = EditorConfig::from_json(r##"{ "dark": { "canvas_background": "#222222" } }"##)
            .unwrap_err();
        assert!(matches!(err, SceneError::Config(_)));
    }

    #[test]
    fn rejects_oversized_safe_zones() {
        let err = EditorConfig::from_json(r#"{ "safe_zone": { "top": 1000, "bottom": 1000 } }"#)
            .unwrap_err();
        assert!(matches!(err, SceneError::Config(_)));
    }

    #[test]
    fn rejects_bad_colors() {
        let err = EditorConfig::from_json(r#"{ "export_background": "nope" }"#).unwrap_err();
        assert!(matches!(err, SceneError::Config(_)));
    }
}
