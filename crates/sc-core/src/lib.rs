pub mod color;
pub mod config;
pub mod error;
pub mod id;
pub mod ingest;
pub mod layers;
pub mod layout;
pub mod model;
pub mod scene;
pub mod theme;

pub use color::Color;
pub use config::{CanvasConfig, EditorConfig, SafeZoneConfig, ThemePalette};
pub use error::{SceneError, SceneResult};
pub use id::ObjectId;
pub use ingest::ResolvedAsset;
pub use layers::{Band, LayerGroup, LayerRow};
pub use layout::{CanvasSize, Layout};
pub use model::*;
pub use scene::{BackgroundOrigin, SAFE_ZONE_BOTTOM_ID, SAFE_ZONE_TOP_ID, SceneEvent, SceneStore};
pub use theme::{Theme, ThemeAdapter, ThemeReport};

// Re-export kurbo geometry so downstream crates share one version
pub use kurbo::{Point, Rect};
