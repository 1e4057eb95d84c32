pub mod error;
pub mod export;
pub mod hit;
pub mod raster;
pub mod text;

pub use error::{ExportError, RenderError};
pub use export::{
    ExportFormat, ExportPipeline, ExportPreset, ExportRequest, ExportedImage, FrameEncoder,
    ImageEncoder,
};
pub use hit::{hit_test, hit_test_screen};
pub use raster::{Pass, ScreenFrame, render_screen};
