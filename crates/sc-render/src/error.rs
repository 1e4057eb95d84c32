use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },
}

/// Export failures. Theme state never causes one; everything that goes
/// wrong between rasterising and encoding is reported as `Encoding`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("export encoding failed: {0}")]
    Encoding(String),

    #[error("an export is already in progress")]
    InProgress,
}

impl From<RenderError> for ExportError {
    fn from(err: RenderError) -> Self {
        ExportError::Encoding(err.to_string())
    }
}

impl From<image::ImageError> for ExportError {
    fn from(err: image::ImageError) -> Self {
        ExportError::Encoding(err.to_string())
    }
}
