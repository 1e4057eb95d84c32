use thiserror::Error;

/// Failures surfaced by scene mutations. Every variant is raised before any
/// state changes, so a failed call leaves the scene as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("invalid object: {0}")]
    InvalidObject(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid color `{0}`")]
    InvalidColor(String),

    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("layout could not be read: {0}")]
    Layout(String),

    #[error("config could not be read: {0}")]
    Config(String),
}

pub type SceneResult<T> = Result<T, SceneError>;
