//! Turning external input into placed objects.
//!
//! Asset resolution and copy generation happen elsewhere; what arrives here
//! is either a resolved image or plain text, and leaves as a
//! `DrawableObject` positioned on the canvas but not yet inserted.

use crate::config::{EditorConfig, ThemePalette};
use crate::error::{SceneError, SceneResult};
use crate::model::{DrawableObject, ImageSource, ObjectKind};
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

const HEADLINE_SIZE: f64 = 72.0;
const HEADLINE_WEIGHT: u16 = 700;
const BODY_SIZE: f64 = 40.0;
const BODY_WEIGHT: u16 = 400;
/// Gap between the top safe zone and a headline.
const HEADLINE_GAP: f64 = 40.0;

/// An image whose location is known and whose size has been read.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    pub uri: Option<String>,
    pub bitmap: Option<Arc<RgbaImage>>,
    pub natural_width: f64,
    pub natural_height: f64,
}

impl ResolvedAsset {
    /// Decode an in-memory PNG or JPEG.
    pub fn from_bytes(uri: Option<String>, bytes: &[u8]) -> SceneResult<Self> {
        let decoded = image::load_from_memory(bytes).map_err(|e| {
            SceneError::ResourceUnavailable(format!(
                "{}: {e}",
                uri.as_deref().unwrap_or("<memory>")
            ))
        })?;
        Ok(Self::from_bitmap(uri, decoded.into_rgba8()))
    }

    pub fn open(path: impl AsRef<Path>) -> SceneResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|e| {
            SceneError::ResourceUnavailable(format!("{}: {e}", path.display()))
        })?;
        Ok(Self::from_bitmap(
            Some(path.display().to_string()),
            decoded.into_rgba8(),
        ))
    }

    pub fn from_bitmap(uri: Option<String>, bitmap: RgbaImage) -> Self {
        Self {
            uri,
            natural_width: bitmap.width() as f64,
            natural_height: bitmap.height() as f64,
            bitmap: Some(Arc::new(bitmap)),
        }
    }
}

/// Wrap an asset as an image object scaled to the configured width and
/// centred on the canvas.
///
/// # Errors
/// [`SceneError::ResourceUnavailable`] if the asset has no usable size.
pub fn image_object(asset: ResolvedAsset, config: &EditorConfig) -> SceneResult<DrawableObject> {
    let (w, h) = (asset.natural_width, asset.natural_height);
    if !(w.is_finite() && h.is_finite() && w >= 1.0 && h >= 1.0) {
        return Err(SceneError::ResourceUnavailable(format!(
            "{} has no usable size ({w}x{h})",
            asset.uri.as_deref().unwrap_or("asset")
        )));
    }
    let source = ImageSource {
        uri: asset.uri,
        bitmap: asset.bitmap,
    };
    let mut obj = DrawableObject::image(source, w, h);
    let scale = config.asset_width / w;
    obj.set_scale(scale, scale)?;
    let (sw, sh) = obj.scaled_size();
    obj.set_position(
        (config.canvas.width as f64 - sw) / 2.0,
        (config.canvas.height as f64 - sh) / 2.0,
    )?;
    log::debug!("ingest image {} at scale {scale:.3}", obj.id);
    Ok(obj)
}

/// Bold text centred horizontally, just under the top safe zone.
pub fn headline(content: &str, config: &EditorConfig, palette: &ThemePalette) -> SceneResult<DrawableObject> {
    let mut obj = styled_text(content, HEADLINE_SIZE, HEADLINE_WEIGHT, palette)?;
    let (w, _) = obj.scaled_size();
    let top = if config.safe_zone.enabled {
        config.safe_zone.top + HEADLINE_GAP
    } else {
        HEADLINE_GAP
    };
    obj.set_position((config.canvas.width as f64 - w) / 2.0, top)?;
    Ok(obj)
}

/// Regular text centred on the canvas.
pub fn body(content: &str, config: &EditorConfig, palette: &ThemePalette) -> SceneResult<DrawableObject> {
    let mut obj = styled_text(content, BODY_SIZE, BODY_WEIGHT, palette)?;
    let (w, h) = obj.scaled_size();
    obj.set_position(
        (config.canvas.width as f64 - w) / 2.0,
        (config.canvas.height as f64 - h) / 2.0,
    )?;
    Ok(obj)
}

fn styled_text(
    content: &str,
    size: f64,
    weight: u16,
    palette: &ThemePalette,
) -> SceneResult<DrawableObject> {
    if content.trim().is_empty() {
        return Err(SceneError::InvalidObject("text content is empty".into()));
    }
    let mut obj = DrawableObject::text(content, size, palette);
    if let ObjectKind::Text { font_weight, .. } = &mut obj.kind {
        *font_weight = weight;
    }
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn image_is_scaled_to_asset_width_and_centered() {
        let config = EditorConfig::default();
        let asset = ResolvedAsset::from_bytes(Some("logo.png".into()), &png_bytes(800, 400)).unwrap();
        let obj = image_object(asset, &config).unwrap();
        let (w, h) = obj.scaled_size();
        assert!((w - 400.0).abs() < 1e-9);
        assert!((h - 200.0).abs() < 1e-9);
        assert!((obj.geometry.left - 340.0).abs() < 1e-9);
        assert!((obj.geometry.top - 860.0).abs() < 1e-9);
        assert_eq!(obj.label(), "logo.png");
    }

    #[test]
    fn undecodable_bytes_are_unavailable() {
        let err = ResolvedAsset::from_bytes(None, b"not an image").unwrap_err();
        assert!(matches!(err, SceneError::ResourceUnavailable(_)));
    }

    #[test]
    fn sizeless_asset_is_unavailable() {
        let asset = ResolvedAsset {
            uri: Some("https://cdn.example/broken.png".into()),
            bitmap: None,
            natural_width: 0.0,
            natural_height: 0.0,
        };
        let err = image_object(asset, &EditorConfig::default()).unwrap_err();
        assert!(matches!(err, SceneError::ResourceUnavailable(_)));
    }

    #[test]
    fn headline_sits_below_top_safe_zone() {
        let config = EditorConfig::default();
        let obj = headline("Summer Sale", &config, &config.light).unwrap();
        assert!(obj.bounds().y0 >= config.safe_zone.top);
        let center = obj.bounds().center().x;
        assert!((center - 540.0).abs() < 1e-6);
        assert!(matches!(obj.kind, ObjectKind::Text { font_weight: 700, .. }));
    }

    #[test]
    fn body_is_centered() {
        let config = EditorConfig::default();
        let obj = body("Everything 20% off this weekend", &config, &config.dark).unwrap();
        let c = obj.bounds().center();
        assert!((c.x - 540.0).abs() < 1e-6);
        assert!((c.y - 960.0).abs() < 1e-6);
        assert_eq!(obj.style.fill, config.dark.text);
    }

    #[test]
    fn blank_text_is_rejected() {
        let config = EditorConfig::default();
        assert!(headline("  ", &config, &config.light).is_err());
    }
}
