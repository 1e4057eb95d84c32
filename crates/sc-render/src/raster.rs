//! Scene store → tiny-skia pixmaps.
//!
//! Objects are painted bottom-to-top into a content pixmap. Selection
//! chrome goes into a separate transparent interaction pixmap so it can
//! never leak into the content or an export.

use crate::error::RenderError;
use crate::text;
use image::{Rgba, RgbaImage};
use kurbo::{Affine, Circle, PathEl, Rect, RoundedRect, Shape};
use sc_core::model::{DrawableObject, ImageSource, ObjectKind};
use sc_core::{Color, SceneStore};
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Paint, Path, PathBuilder, Pixmap, PixmapPaint, Stroke,
    Transform,
};

/// Width of the selection outline in device pixels.
const SELECTION_WIDTH: f32 = 2.0;
/// Flattening tolerance for kurbo curves.
const TOLERANCE: f64 = 0.1;

/// Which objects a pass draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Everything visible, protected overlays included.
    Screen,
    /// Visible objects flagged exportable.
    Export,
}

/// One on-screen frame: content plus selection chrome.
pub struct ScreenFrame {
    pub content: Pixmap,
    pub interaction: Pixmap,
    /// Store revision the frame was painted from.
    pub revision: u64,
}

/// Paint the store at `scale` (the on-screen display scale) with the
/// active selection outlined in `selection_color`.
pub fn render_screen(
    store: &SceneStore,
    scale: f64,
    selection_color: Color,
) -> Result<ScreenFrame, RenderError> {
    let (width, height) = scaled_dimensions(store, scale);
    let view = Affine::scale(scale);
    Ok(ScreenFrame {
        content: render_content(store, width, height, view, Pass::Screen)?,
        interaction: render_interaction(store, width, height, view, selection_color)?,
        revision: store.revision(),
    })
}

/// Canvas size in device pixels at `scale`, at least 1×1.
pub fn scaled_dimensions(store: &SceneStore, scale: f64) -> (u32, u32) {
    let w = (store.width() as f64 * scale).round().max(1.0) as u32;
    let h = (store.height() as f64 * scale).round().max(1.0) as u32;
    (w, h)
}

/// Fill with the background, then paint every object the pass admits
/// through `view` (canvas → device).
pub fn render_content(
    store: &SceneStore,
    width: u32,
    height: u32,
    view: Affine,
    pass: Pass,
) -> Result<Pixmap, RenderError> {
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;
    pixmap.fill(skia_color(store.background(), 1.0));
    for obj in store.objects() {
        if admits(pass, obj) {
            paint_object(&mut pixmap, obj, view);
        }
    }
    Ok(pixmap)
}

/// Transparent layer carrying only the selection outline.
pub fn render_interaction(
    store: &SceneStore,
    width: u32,
    height: u32,
    view: Affine,
    color: Color,
) -> Result<Pixmap, RenderError> {
    let mut pixmap = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;
    let Some(obj) = store.selected_object() else {
        return Ok(pixmap);
    };
    let (w, h) = obj.base_size();
    let outline = (view * obj.transform()) * Rect::new(0.0, 0.0, w, h).to_path(TOLERANCE);
    if let Some(path) = skia_path(&outline) {
        let paint = solid(color, 1.0);
        let stroke = Stroke {
            width: SELECTION_WIDTH,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
    Ok(pixmap)
}

fn admits(pass: Pass, obj: &DrawableObject) -> bool {
    if !obj.visible || obj.style.opacity <= 0.0 {
        return false;
    }
    match pass {
        Pass::Screen => true,
        Pass::Export => obj.interaction.exportable,
    }
}

// ─── Object painters ────────────────────────────────────────────────────────

fn paint_object(pixmap: &mut Pixmap, obj: &DrawableObject, view: Affine) {
    let transform = view * obj.transform();
    match &obj.kind {
        ObjectKind::Rectangle {
            width,
            height,
            corner_radius,
        } => {
            let shape = RoundedRect::new(0.0, 0.0, *width, *height, *corner_radius);
            paint_shape(pixmap, &shape, obj, transform);
        }
        ObjectKind::Circle { radius } => {
            let shape = Circle::new((*radius, *radius), *radius);
            paint_shape(pixmap, &shape, obj, transform);
        }
        ObjectKind::ProtectedOverlay { width, height, .. } => {
            paint_shape(pixmap, &Rect::new(0.0, 0.0, *width, *height), obj, transform);
        }
        ObjectKind::Image {
            source,
            natural_width,
            natural_height,
        } => paint_image(pixmap, obj, source, (*natural_width, *natural_height), transform),
        ObjectKind::Text { .. } => text::paint_text(pixmap, obj, transform),
    }
}

fn paint_shape(pixmap: &mut Pixmap, shape: &impl Shape, obj: &DrawableObject, transform: Affine) {
    let Some(path) = skia_path(shape) else {
        log::trace!("{} produced an empty path", obj.id);
        return;
    };
    let ts = skia_transform(transform);
    let style = &obj.style;
    if style.fill.a > 0 {
        let paint = solid(style.fill, style.opacity);
        pixmap.fill_path(&path, &paint, FillRule::Winding, ts, None);
    }
    if let Some(stroke_color) = style.stroke
        && style.stroke_width > 0.0
    {
        let paint = solid(stroke_color, style.opacity);
        let stroke = Stroke {
            width: style.stroke_width as f32,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, ts, None);
    }
}

fn paint_image(
    pixmap: &mut Pixmap,
    obj: &DrawableObject,
    source: &ImageSource,
    natural: (f64, f64),
    transform: Affine,
) {
    let Some(bitmap) = &source.bitmap else {
        log::trace!("{} has no decoded bitmap yet", obj.id);
        return;
    };
    let Some(image) = image_to_pixmap(bitmap) else {
        return;
    };
    // Bitmap pixels → natural box, in case they disagree.
    let fit = Affine::scale_non_uniform(
        natural.0 / image.width() as f64,
        natural.1 / image.height() as f64,
    );
    let paint = PixmapPaint {
        opacity: obj.style.opacity as f32,
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(
        0,
        0,
        image.as_ref(),
        &paint,
        skia_transform(transform * fit),
        None,
    );
}

// ─── Conversions ────────────────────────────────────────────────────────────

fn skia_color(color: Color, opacity: f64) -> tiny_skia::Color {
    let alpha = (color.a as f64 * opacity.clamp(0.0, 1.0)).round() as u8;
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, alpha)
}

fn solid(color: Color, opacity: f64) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color, opacity));
    paint.anti_alias = true;
    paint
}

pub(crate) fn skia_transform(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn skia_path(shape: &impl Shape) -> Option<Path> {
    let mut pb = PathBuilder::new();
    for el in shape.path_elements(TOLERANCE) {
        match el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(c, p) => pb.quad_to(c.x as f32, c.y as f32, p.x as f32, p.y as f32),
            PathEl::CurveTo(c1, c2, p) => pb.cubic_to(
                c1.x as f32,
                c1.y as f32,
                c2.x as f32,
                c2.y as f32,
                p.x as f32,
                p.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

/// Straight-alpha RGBA → premultiplied pixmap.
pub fn image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Some(pixmap)
}

/// Premultiplied pixmap → straight-alpha RGBA for encoding.
pub fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let mut image = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    image
}
