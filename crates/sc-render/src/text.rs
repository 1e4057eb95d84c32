//! Text objects → glyphs.
//!
//! Each text object is written out as a small SVG `<text>` document sized
//! to its unscaled box. usvg shapes it against the system font database and
//! resvg paints it into the target pixmap through the object's transform,
//! so rotation, scale and the display view apply exactly as for shapes.

use crate::raster::skia_transform;
use kurbo::Affine;
use sc_core::Color;
use sc_core::model::{DrawableObject, LINE_HEIGHT, ObjectKind};
use std::sync::{Arc, LazyLock};
use tiny_skia::Pixmap;
use usvg::fontdb;

/// Baseline offset inside a line box, as a fraction of the font size.
const ASCENT_EM: f64 = 0.8;

static FONTS: LazyLock<Arc<fontdb::Database>> = LazyLock::new(|| {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    // fontdb maps `sans-serif` to Arial unless told otherwise.
    let sans = db
        .faces()
        .flat_map(|face| face.families.iter())
        .map(|(name, _)| name)
        .find(|name| name.contains("Sans") && !name.contains("Mono"))
        .cloned();
    if let Some(name) = sans {
        log::debug!("sans-serif resolves to {name}");
        db.set_sans_serif_family(name);
    }
    log::debug!("loaded {} font faces", db.len());
    Arc::new(db)
});

/// Number of font faces text can be drawn with.
pub fn font_faces() -> usize {
    FONTS.len()
}

/// Paint a text object through `transform` (object box → device).
/// Other kinds are ignored.
pub(crate) fn paint_text(pixmap: &mut Pixmap, obj: &DrawableObject, transform: Affine) {
    let Some(svg) = text_document(obj) else {
        return;
    };
    let options = usvg::Options {
        fontdb: Arc::clone(&FONTS),
        font_resolver: font_resolver(),
        ..usvg::Options::default()
    };
    let tree = match usvg::Tree::from_str(&svg, &options) {
        Ok(tree) => tree,
        Err(err) => {
            log::warn!("{}: text layout failed: {err}", obj.id);
            return;
        }
    };
    resvg::render(&tree, skia_transform(transform), &mut pixmap.as_mut());
}

/// SVG for one text object, one `<tspan>` per line, left aligned.
fn text_document(obj: &DrawableObject) -> Option<String> {
    let ObjectKind::Text {
        content,
        font_size,
        font_weight,
        ..
    } = &obj.kind
    else {
        return None;
    };
    let (w, h) = obj.base_size();
    let style = &obj.style;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    svg.push_str(&format!(
        r#"<text font-family="sans-serif" font-size="{font_size}" font-weight="{font_weight}" fill="{}" fill-opacity="{}" opacity="{}" xml:space="preserve""#,
        rgb_hex(style.fill),
        alpha(style.fill),
        style.opacity
    ));
    if let Some(stroke) = style.stroke
        && style.stroke_width > 0.0
    {
        svg.push_str(&format!(
            r#" stroke="{}" stroke-opacity="{}" stroke-width="{}""#,
            rgb_hex(stroke),
            alpha(stroke),
            style.stroke_width
        ));
    }
    svg.push('>');

    let line_height = font_size * LINE_HEIGHT;
    for (i, line) in content.split('\n').enumerate() {
        let baseline =
            i as f64 * line_height + (line_height - font_size) / 2.0 + font_size * ASCENT_EM;
        svg.push_str(&format!(
            r#"<tspan x="0" y="{baseline}">{}</tspan>"#,
            escape(line)
        ));
    }
    svg.push_str("</text></svg>");
    Some(svg)
}

/// Requested family first, then the installed sans-serif, then any face.
fn font_resolver() -> usvg::FontResolver<'static> {
    usvg::FontResolver {
        select_font: Box::new(|font, db| {
            let mut families: Vec<fontdb::Family<'_>> = font
                .families()
                .iter()
                .map(|family| match family {
                    usvg::FontFamily::Serif => fontdb::Family::Serif,
                    usvg::FontFamily::SansSerif => fontdb::Family::SansSerif,
                    usvg::FontFamily::Cursive => fontdb::Family::Cursive,
                    usvg::FontFamily::Fantasy => fontdb::Family::Fantasy,
                    usvg::FontFamily::Monospace => fontdb::Family::Monospace,
                    usvg::FontFamily::Named(name) => fontdb::Family::Name(name),
                })
                .collect();
            families.push(fontdb::Family::SansSerif);

            let query = fontdb::Query {
                families: &families,
                weight: fontdb::Weight(font.weight()),
                stretch: fontdb::Stretch::Normal,
                style: fontdb::Style::Normal,
            };
            db.query(&query)
                .or_else(|| db.faces().next().map(|face| face.id))
        }),
        select_fallback: usvg::FontResolver::default_fallback_selector(),
    }
}

fn rgb_hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn alpha(color: Color) -> f64 {
    color.a as f64 / 255.0
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
