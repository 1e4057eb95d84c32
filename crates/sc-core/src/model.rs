//! Drawable object model.
//!
//! Every element on the canvas is a `DrawableObject`: common geometry,
//! style and interaction flags wrapped around a closed `ObjectKind`.
//! Position is the top-left corner of the unrotated, scaled box; rotation
//! pivots on the box center. Object order in the scene store is the only
//! stacking information; objects carry no z-index.

use crate::color::Color;
use crate::config::ThemePalette;
use crate::error::{SceneError, SceneResult};
use crate::id::ObjectId;
use image::RgbaImage;
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH_EM: f64 = 0.6;
/// Line box height as a fraction of the font size.
pub const LINE_HEIGHT: f64 = 1.16;

// ─── Variants ────────────────────────────────────────────────────────────

/// A resolved image reference. The bitmap is a decoded handle shared with
/// the asset cache; it is never serialized.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    pub uri: Option<String>,
    #[serde(skip)]
    pub bitmap: Option<Arc<RgbaImage>>,
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("uri", &self.uri)
            .field(
                "bitmap",
                &self.bitmap.as_ref().map(|b| (b.width(), b.height())),
            )
            .finish()
    }
}

/// The closed set of object kinds. Consumers match exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKind {
    Text {
        content: String,
        font_size: f64,
        font_weight: u16, // 100..900
        editable: bool,
    },
    Rectangle {
        width: f64,
        height: f64,
        corner_radius: f64,
    },
    Circle {
        radius: f64,
    },
    Image {
        source: ImageSource,
        natural_width: f64,
        natural_height: f64,
    },
    /// Non-interactive band marking an unsafe placement region.
    ProtectedOverlay {
        width: f64,
        height: f64,
        label: String,
    },
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Text { .. } => "text",
            ObjectKind::Rectangle { .. } => "rect",
            ObjectKind::Circle { .. } => "circle",
            ObjectKind::Image { .. } => "image",
            ObjectKind::ProtectedOverlay { .. } => "safe_zone",
        }
    }
}

// ─── Common attributes ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub left: f64,
    pub top: f64,
    /// Degrees, `[0, 360)`.
    pub rotation: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectStyle {
    pub fill: Color,
    pub stroke: Option<Color>,
    pub stroke_width: f64,
    /// `[0, 1]`. Forced to 0 while the object is hidden.
    pub opacity: f64,
}

/// Pointer and edit permissions. The `lock_*` flags always follow `locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub selectable: bool,
    pub evented: bool,
    pub locked: bool,
    pub lock_movement_x: bool,
    pub lock_movement_y: bool,
    pub lock_scaling: bool,
    pub lock_rotation: bool,
    pub deletable: bool,
    /// Whether the object is drawn into exported bitmaps.
    pub exportable: bool,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            selectable: true,
            evented: true,
            locked: false,
            lock_movement_x: false,
            lock_movement_y: false,
            lock_scaling: false,
            lock_rotation: false,
            deletable: true,
            exportable: true,
        }
    }
}

// ─── Drawable object ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawableObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub geometry: Geometry,
    pub style: ObjectStyle,
    pub interaction: Interaction,
    pub visible: bool,

    /// Opacity to restore when a hidden object is shown again.
    #[serde(default)]
    pub hidden_opacity: Option<f64>,

    /// Fill the theme adapter replaced, kept so a later switch can reverse it.
    #[serde(default)]
    pub theme_original_fill: Option<Color>,
}

impl DrawableObject {
    pub fn new(id: ObjectId, kind: ObjectKind, style: ObjectStyle) -> Self {
        Self {
            id,
            kind,
            geometry: Geometry::default(),
            style,
            interaction: Interaction::default(),
            visible: true,
            hidden_opacity: None,
            theme_original_fill: None,
        }
    }

    /// A text object in the palette's text color.
    pub fn text(content: impl Into<String>, font_size: f64, palette: &ThemePalette) -> Self {
        Self::new(
            ObjectId::fresh("text"),
            ObjectKind::Text {
                content: content.into(),
                font_size,
                font_weight: 400,
                editable: true,
            },
            ObjectStyle {
                fill: palette.text,
                stroke: None,
                stroke_width: 0.0,
                opacity: 1.0,
            },
        )
    }

    pub fn rectangle(width: f64, height: f64, palette: &ThemePalette) -> Self {
        Self::new(
            ObjectId::fresh("rect"),
            ObjectKind::Rectangle {
                width,
                height,
                corner_radius: 0.0,
            },
            shape_style(palette),
        )
    }

    pub fn circle(radius: f64, palette: &ThemePalette) -> Self {
        Self::new(
            ObjectId::fresh("circle"),
            ObjectKind::Circle { radius },
            shape_style(palette),
        )
    }

    pub fn image(source: ImageSource, natural_width: f64, natural_height: f64) -> Self {
        Self::new(
            ObjectId::fresh("image"),
            ObjectKind::Image {
                source,
                natural_width,
                natural_height,
            },
            ObjectStyle {
                fill: Color::TRANSPARENT,
                stroke: None,
                stroke_width: 0.0,
                opacity: 1.0,
            },
        )
    }

    /// A protected band: never selectable, evented, deletable or exported.
    pub fn protected_overlay(
        id: ObjectId,
        label: impl Into<String>,
        top: f64,
        width: f64,
        height: f64,
        color: Color,
    ) -> Self {
        let mut obj = Self::new(
            id,
            ObjectKind::ProtectedOverlay {
                width,
                height,
                label: label.into(),
            },
            ObjectStyle {
                fill: color,
                stroke: None,
                stroke_width: 0.0,
                opacity: 1.0,
            },
        );
        obj.geometry.top = top;
        obj.interaction = Interaction {
            selectable: false,
            evented: false,
            deletable: false,
            exportable: false,
            ..Interaction::default()
        };
        obj.set_locked(true);
        obj
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ObjectKind::Text { .. })
    }

    pub fn is_protected(&self) -> bool {
        matches!(self.kind, ObjectKind::ProtectedOverlay { .. })
    }

    pub fn is_hidden(&self) -> bool {
        !self.visible
    }

    /// Human-readable label for a layers panel.
    pub fn label(&self) -> String {
        match &self.kind {
            ObjectKind::Text { content, .. } => {
                let first = content.lines().next().unwrap_or("");
                if first.chars().count() > 24 {
                    let cut: String = first.chars().take(24).collect();
                    format!("{cut}…")
                } else {
                    first.to_string()
                }
            }
            ObjectKind::ProtectedOverlay { label, .. } => label.clone(),
            ObjectKind::Image { source, .. } => source
                .uri
                .as_deref()
                .and_then(|u| u.rsplit('/').next())
                .filter(|s| !s.is_empty())
                .unwrap_or("image")
                .to_string(),
            other => other.name().to_string(),
        }
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Unscaled size of the object's own box.
    pub fn base_size(&self) -> (f64, f64) {
        match &self.kind {
            ObjectKind::Text {
                content, font_size, ..
            } => text_box(content, *font_size),
            ObjectKind::Rectangle { width, height, .. } => (*width, *height),
            ObjectKind::Circle { radius } => (radius * 2.0, radius * 2.0),
            ObjectKind::Image {
                natural_width,
                natural_height,
                ..
            } => (*natural_width, *natural_height),
            ObjectKind::ProtectedOverlay { width, height, .. } => (*width, *height),
        }
    }

    pub fn scaled_size(&self) -> (f64, f64) {
        let (w, h) = self.base_size();
        (w * self.geometry.scale_x, h * self.geometry.scale_y)
    }

    /// Object-local → canvas transform: scale, place at `left/top`, then
    /// rotate around the scaled box center.
    pub fn transform(&self) -> Affine {
        let g = &self.geometry;
        let (w, h) = self.scaled_size();
        let center = Point::new(g.left + w / 2.0, g.top + h / 2.0);
        Affine::rotate_about(g.rotation.to_radians(), center)
            * Affine::translate((g.left, g.top))
            * Affine::scale_non_uniform(g.scale_x, g.scale_y)
    }

    /// Axis-aligned bounding box in canvas coordinates, rotation included.
    pub fn bounds(&self) -> Rect {
        let (w, h) = self.base_size();
        self.transform()
            .transform_rect_bbox(Rect::new(0.0, 0.0, w, h))
    }

    /// Reject objects whose geometry can't be placed or drawn.
    pub fn validate(&self) -> SceneResult<()> {
        let g = &self.geometry;
        let numbers = [g.left, g.top, g.rotation, g.scale_x, g.scale_y];
        if numbers.iter().any(|n| !n.is_finite()) {
            return Err(SceneError::InvalidObject(format!(
                "{} has non-finite geometry",
                self.id
            )));
        }
        let (w, h) = self.base_size();
        if !(w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            return Err(SceneError::InvalidObject(format!(
                "{} is missing a usable size",
                self.id
            )));
        }
        if !(0.0..360.0).contains(&g.rotation) {
            return Err(SceneError::InvalidObject(format!(
                "{} has rotation {} outside [0, 360)",
                self.id, g.rotation
            )));
        }
        if g.scale_x <= 0.0 || g.scale_y <= 0.0 {
            return Err(SceneError::InvalidObject(format!(
                "{} has a non-positive scale",
                self.id
            )));
        }
        if !(0.0..=1.0).contains(&self.style.opacity) {
            return Err(SceneError::InvalidObject(format!(
                "{} has opacity {} outside [0, 1]",
                self.id, self.style.opacity
            )));
        }
        Ok(())
    }

    // ─── Validated setters ───────────────────────────────────────────────
    //
    // Each setter checks its input first and only then writes, so an error
    // never leaves a half-applied change behind.

    pub fn set_position(&mut self, left: f64, top: f64) -> SceneResult<()> {
        if !(left.is_finite() && top.is_finite()) {
            return Err(SceneError::InvalidGeometry(format!(
                "position ({left}, {top}) is not finite"
            )));
        }
        self.geometry.left = left;
        self.geometry.top = top;
        Ok(())
    }

    pub fn set_rotation(&mut self, degrees: f64) -> SceneResult<()> {
        if !(0.0..360.0).contains(&degrees) {
            return Err(SceneError::InvalidGeometry(format!(
                "rotation {degrees} outside [0, 360)"
            )));
        }
        self.geometry.rotation = degrees;
        Ok(())
    }

    pub fn set_scale(&mut self, scale_x: f64, scale_y: f64) -> SceneResult<()> {
        let (w, h) = self.base_size();
        let valid = scale_x.is_finite() && scale_y.is_finite() && scale_x > 0.0 && scale_y > 0.0;
        if !valid || w * scale_x < 1.0 || h * scale_y < 1.0 {
            return Err(SceneError::InvalidGeometry(format!(
                "scale ({scale_x}, {scale_y}) makes the object smaller than 1px"
            )));
        }
        self.geometry.scale_x = scale_x;
        self.geometry.scale_y = scale_y;
        Ok(())
    }

    /// Set opacity. A hidden object keeps opacity 0 and updates the value
    /// it will restore to.
    pub fn set_opacity(&mut self, opacity: f64) -> SceneResult<()> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(SceneError::InvalidGeometry(format!(
                "opacity {opacity} outside [0, 1]"
            )));
        }
        if self.visible {
            self.style.opacity = opacity;
        } else {
            self.hidden_opacity = Some(opacity);
        }
        Ok(())
    }

    pub fn set_font_size(&mut self, px: f64) -> SceneResult<()> {
        check_size(px)?;
        match &mut self.kind {
            ObjectKind::Text { font_size, .. } => {
                *font_size = px;
                Ok(())
            }
            other => Err(SceneError::InvalidGeometry(format!(
                "{} has no font size",
                other.name()
            ))),
        }
    }

    /// Resize the object's own box (rectangles, circles, overlays).
    pub fn resize(&mut self, width: f64, height: f64) -> SceneResult<()> {
        check_size(width)?;
        check_size(height)?;
        match &mut self.kind {
            ObjectKind::Rectangle {
                width: w,
                height: h,
                ..
            }
            | ObjectKind::ProtectedOverlay {
                width: w,
                height: h,
                ..
            } => {
                *w = width;
                *h = height;
                Ok(())
            }
            ObjectKind::Circle { radius } => {
                *radius = width.min(height) / 2.0;
                Ok(())
            }
            other => Err(SceneError::InvalidGeometry(format!(
                "{} is sized by scale, not by box",
                other.name()
            ))),
        }
    }

    /// Manual recolor. Clears any theme bookkeeping: the user's choice wins.
    pub fn set_fill(&mut self, fill: Color) {
        self.style.fill = fill;
        self.theme_original_fill = None;
    }

    pub fn set_stroke(&mut self, stroke: Option<Color>, width: f64) -> SceneResult<()> {
        if !(width.is_finite() && width >= 0.0) {
            return Err(SceneError::InvalidGeometry(format!(
                "stroke width {width} must be non-negative"
            )));
        }
        self.style.stroke = stroke;
        self.style.stroke_width = width;
        Ok(())
    }

    /// Set `locked` and every dependent lock flag in one step.
    pub fn set_locked(&mut self, locked: bool) {
        let i = &mut self.interaction;
        i.locked = locked;
        i.lock_movement_x = locked;
        i.lock_movement_y = locked;
        i.lock_scaling = locked;
        i.lock_rotation = locked;
    }

    pub fn can_move(&self) -> bool {
        !(self.interaction.lock_movement_x || self.interaction.lock_movement_y)
    }

    pub fn can_scale(&self) -> bool {
        !self.interaction.lock_scaling
    }

    pub fn can_rotate(&self) -> bool {
        !self.interaction.lock_rotation
    }
}

fn shape_style(palette: &ThemePalette) -> ObjectStyle {
    ObjectStyle {
        fill: palette.shape_fill,
        stroke: Some(palette.shape_stroke),
        stroke_width: 2.0,
        opacity: 1.0,
    }
}

fn check_size(px: f64) -> SceneResult<()> {
    if !(px.is_finite() && px >= 1.0) {
        return Err(SceneError::InvalidGeometry(format!(
            "size {px} must be at least 1px"
        )));
    }
    Ok(())
}

/// Estimated text box from character counts. Bounds, alignment and hit
/// testing use this rather than shaped glyph extents.
fn text_box(content: &str, font_size: f64) -> (f64, f64) {
    let lines = content.split('\n').count().max(1);
    let longest = content
        .split('\n')
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(1);
    (
        longest as f64 * font_size * CHAR_WIDTH_EM,
        lines as f64 * font_size * LINE_HEIGHT,
    )
}
