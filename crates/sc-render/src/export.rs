//! Theme-independent export.
//!
//! An export swaps the fixed export background in, rasterises the
//! exportable objects, awaits the encoder and swaps the scene background
//! back. The swap bypasses observers and is undone by a drop guard, so no
//! themed frame is ever announced and a failed encode still restores the
//! scene.

use crate::error::ExportError;
use crate::raster::{Pass, pixmap_to_image, render_content, scaled_dimensions};
use futures::future;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage, RgbaImage};
use kurbo::Affine;
use sc_core::{Color, EditorConfig, SceneStore};
use std::cell::Cell;
use std::fmt;
use std::io::Cursor;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Story exports render at this multiple of the on-screen display scale,
/// but never smaller than the Story preset.
pub const STORY_MULTIPLIER: f64 = 2.0;

const JPEG_START_QUALITY: u8 = 95;
const JPEG_QUALITY_STEP: u8 = 5;
const JPEG_MIN_QUALITY: u8 = 10;

// ─── Request / response ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Jpg,
}

impl ExportFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpg),
            other => Err(format!("unsupported export format `{other}`")),
        }
    }
}

/// Target sizes offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPreset {
    /// 1080×1920, the full story.
    Story,
    /// 1080×1080 feed post.
    Square,
    /// 500×500 preview.
    Thumbnail,
}

impl ExportPreset {
    pub fn size(self) -> (u32, u32) {
        match self {
            ExportPreset::Story => (1080, 1920),
            ExportPreset::Square => (1080, 1080),
            ExportPreset::Thumbnail => (500, 500),
        }
    }
}

impl fmt::Display for ExportPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.size();
        write!(f, "{w}x{h}")
    }
}

impl FromStr for ExportPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "story" | "1080x1920" => Ok(ExportPreset::Story),
            "square" | "1080x1080" => Ok(ExportPreset::Square),
            "thumbnail" | "500x500" => Ok(ExportPreset::Thumbnail),
            other => Err(format!("unknown export preset `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportRequest {
    pub format: ExportFormat,
    pub preset: ExportPreset,
    /// Byte budget. JPEG steps quality down to fit; PNG fails if over.
    pub max_bytes: Option<usize>,
}

impl ExportRequest {
    pub fn new(format: ExportFormat, preset: ExportPreset) -> Self {
        Self {
            format,
            preset,
            max_bytes: None,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    /// `design-<unix millis>.<ext>`
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for ExportedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportedImage")
            .field("bytes", &self.bytes.len())
            .field("mime", &self.mime)
            .field("filename", &self.filename)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

// ─── Encoding ───────────────────────────────────────────────────────────────

/// The asynchronous encode step.
pub trait FrameEncoder {
    fn encode(
        &self,
        frame: RgbaImage,
        format: ExportFormat,
        max_bytes: Option<usize>,
    ) -> impl Future<Output = Result<Vec<u8>, ExportError>>;
}

/// In-process PNG/JPEG encoder backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEncoder;

impl FrameEncoder for ImageEncoder {
    fn encode(
        &self,
        frame: RgbaImage,
        format: ExportFormat,
        max_bytes: Option<usize>,
    ) -> impl Future<Output = Result<Vec<u8>, ExportError>> {
        future::ready(encode_frame(&frame, format, max_bytes))
    }
}

/// Encode synchronously. JPEG with a budget starts at quality 95 and
/// steps down by 5 until the output fits; below quality 10 it gives up.
pub fn encode_frame(
    frame: &RgbaImage,
    format: ExportFormat,
    max_bytes: Option<usize>,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Png => {
            let mut out = Cursor::new(Vec::new());
            frame.write_to(&mut out, ImageFormat::Png)?;
            let bytes = out.into_inner();
            if let Some(limit) = max_bytes
                && bytes.len() > limit
            {
                return Err(ExportError::Encoding(format!(
                    "png is {} bytes, budget is {limit}",
                    bytes.len()
                )));
            }
            Ok(bytes)
        }
        ExportFormat::Jpg => {
            let flat = flatten_onto_white(frame);
            let mut quality = JPEG_START_QUALITY;
            loop {
                let bytes = encode_jpeg(&flat, quality)?;
                match max_bytes {
                    Some(limit) if bytes.len() > limit => {
                        log::debug!("jpeg q{quality}: {} bytes over {limit}", bytes.len());
                    }
                    _ => {
                        log::debug!("jpeg q{quality}: {} bytes", bytes.len());
                        return Ok(bytes);
                    }
                }
                if quality <= JPEG_MIN_QUALITY {
                    return Err(ExportError::Encoding(format!(
                        "jpeg does not fit {} bytes even at quality {JPEG_MIN_QUALITY}",
                        max_bytes.unwrap_or_default()
                    )));
                }
                quality -= JPEG_QUALITY_STEP;
            }
        }
    }
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(image)?;
    Ok(bytes)
}

/// JPEG has no alpha; composite onto white.
fn flatten_onto_white(frame: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(frame.width(), frame.height(), |x, y| {
        let [r, g, b, a] = frame.get_pixel(x, y).0;
        let a = a as u16;
        let over = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([over(r), over(g), over(b)])
    })
}

// ─── Guards ─────────────────────────────────────────────────────────────────

/// Temporarily replaces the scene background without notifying observers.
/// The original is put back on drop.
pub struct BackgroundOverride<'a> {
    store: &'a mut SceneStore,
    saved: Color,
}

impl<'a> BackgroundOverride<'a> {
    pub fn new(store: &'a mut SceneStore, color: Color) -> Self {
        let saved = store.swap_background_silently(color);
        log::debug!("export background {saved} -> {color}");
        Self { store, saved }
    }

    pub fn store(&self) -> &SceneStore {
        self.store
    }
}

impl Drop for BackgroundOverride<'_> {
    fn drop(&mut self) {
        self.store.swap_background_silently(self.saved);
        log::debug!("export background restored to {}", self.saved);
    }
}

/// Marks the pipeline busy for the lifetime of one export.
struct InFlight<'a>(&'a Cell<bool>);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Result<Self, ExportError> {
        if flag.replace(true) {
            return Err(ExportError::InProgress);
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

// ─── Pipeline ───────────────────────────────────────────────────────────────

pub struct ExportPipeline<E = ImageEncoder> {
    encoder: E,
    background: Color,
    display_scale: f64,
    in_flight: Cell<bool>,
}

impl ExportPipeline<ImageEncoder> {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(
            ImageEncoder,
            config.export_background,
            config.canvas.display_scale,
        )
    }
}

impl<E: FrameEncoder> ExportPipeline<E> {
    pub fn new(encoder: E, background: Color, display_scale: f64) -> Self {
        Self {
            encoder,
            background,
            display_scale,
            in_flight: Cell::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    /// Render and encode `store` for `request`.
    ///
    /// The store background reads its original value again once this
    /// returns, whether or not encoding succeeded.
    ///
    /// # Errors
    /// [`ExportError::InProgress`] while another export on this pipeline is
    /// pending, [`ExportError::Encoding`] if rasterising or encoding fails.
    pub async fn export(
        &self,
        store: &mut SceneStore,
        request: ExportRequest,
    ) -> Result<ExportedImage, ExportError> {
        let _busy = InFlight::acquire(&self.in_flight)?;
        let guard = BackgroundOverride::new(store, self.background);

        let frame = self.rasterize(guard.store(), request.preset)?;
        let (width, height) = frame.dimensions();
        let bytes = self
            .encoder
            .encode(frame, request.format, request.max_bytes)
            .await?;
        drop(guard);

        let filename = format!("design-{}.{}", unix_millis(), request.format.extension());
        log::info!(
            "exported {filename} ({width}x{height}, {} bytes)",
            bytes.len()
        );
        Ok(ExportedImage {
            bytes,
            mime: request.format.mime(),
            filename,
            width,
            height,
        })
    }

    /// Story renders the whole canvas at [`story_scale`](Self::story_scale).
    /// Other presets fit the canvas, centred, into the preset size at 1×.
    fn rasterize(&self, store: &SceneStore, preset: ExportPreset) -> Result<RgbaImage, ExportError> {
        let pixmap = match preset {
            ExportPreset::Story => {
                let scale = self.story_scale(store);
                let (w, h) = scaled_dimensions(store, scale);
                render_content(store, w, h, Affine::scale(scale), Pass::Export)?
            }
            ExportPreset::Square | ExportPreset::Thumbnail => {
                let (w, h) = preset.size();
                let view = fit_transform((store.width(), store.height()), (w, h));
                render_content(store, w, h, view, Pass::Export)?
            }
        };
        Ok(pixmap_to_image(&pixmap))
    }

    /// The display scale times [`STORY_MULTIPLIER`], raised if needed so
    /// both output dimensions reach the Story preset.
    pub fn story_scale(&self, store: &SceneStore) -> f64 {
        let (w, h) = ExportPreset::Story.size();
        let floor = (w as f64 / store.width() as f64).max(h as f64 / store.height() as f64);
        (self.display_scale * STORY_MULTIPLIER).max(floor)
    }
}

/// Canvas → target transform that fits the canvas inside the target,
/// preserving aspect ratio and centring the result.
pub fn fit_transform(canvas: (u32, u32), target: (u32, u32)) -> Affine {
    let (cw, ch) = (canvas.0 as f64, canvas.1 as f64);
    let (tw, th) = (target.0 as f64, target.1 as f64);
    let scale = (tw / cw).min(th / ch);
    Affine::translate(((tw - cw * scale) / 2.0, (th - ch * scale) / 2.0)) * Affine::scale(scale)
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_formats_and_presets() {
        assert_eq!("JPEG".parse::<ExportFormat>().unwrap(), ExportFormat::Jpg);
        assert_eq!("1080x1080".parse::<ExportPreset>().unwrap(), ExportPreset::Square);
        assert_eq!(ExportPreset::Thumbnail.to_string(), "500x500");
        assert!("gif".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn fit_centres_tall_canvas_in_square() {
        let t = fit_transform((1080, 1920), (1080, 1080));
        let top_left = t * kurbo::Point::new(0.0, 0.0);
        let bottom_right = t * kurbo::Point::new(1080.0, 1920.0);
        assert!((top_left.y - 0.0).abs() < 1e-9);
        assert!((bottom_right.y - 1080.0).abs() < 1e-9);
        let width = bottom_right.x - top_left.x;
        assert!((top_left.x - (1080.0 - width) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn jpeg_flattens_alpha_onto_white() {
        let clear = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        assert_eq!(flatten_onto_white(&clear).get_pixel(0, 0).0, [255, 255, 255]);
        let half = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        assert_eq!(flatten_onto_white(&half).get_pixel(0, 0).0, [127, 127, 127]);
    }

    #[test]
    fn jpeg_budget_steps_quality_down() {
        let noisy = RgbaImage::from_fn(256, 256, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8, 255])
        });
        let unbounded = encode_frame(&noisy, ExportFormat::Jpg, None).unwrap();
        let budget = unbounded.len() * 2 / 3;
        let fitted = encode_frame(&noisy, ExportFormat::Jpg, Some(budget)).unwrap();
        assert!(fitted.len() <= budget);
        assert!(fitted.len() < unbounded.len());
    }

    #[test]
    fn impossible_budget_is_an_encoding_error() {
        let frame = RgbaImage::from_pixel(64, 64, Rgba([200, 10, 10, 255]));
        let err = encode_frame(&frame, ExportFormat::Jpg, Some(16)).unwrap_err();
        assert!(matches!(err, ExportError::Encoding(_)));
        let err = encode_frame(&frame, ExportFormat::Png, Some(16)).unwrap_err();
        assert!(matches!(err, ExportError::Encoding(_)));
    }

    #[test]
    fn in_flight_flag_is_exclusive() {
        let flag = Cell::new(false);
        let first = InFlight::acquire(&flag).unwrap();
        assert!(matches!(InFlight::acquire(&flag), Err(ExportError::InProgress)));
        drop(first);
        assert!(InFlight::acquire(&flag).is_ok());
    }
}
