use sc_core::SceneError;
use sc_render::{ExportError, RenderError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("undo snapshot failed: {0}")]
    Snapshot(String),
}

pub type EditorResult<T> = Result<T, EditorError>;
