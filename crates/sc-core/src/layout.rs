//! Saved layouts.
//!
//! A `Layout` is the serialisable form of a scene: canvas size, background
//! and the object sequence bottom-to-top. Decoded bitmaps are dropped;
//! image URIs survive so the host can resolve them again.

use crate::color::Color;
use crate::error::{SceneError, SceneResult};
use crate::model::DrawableObject;
use crate::scene::{BackgroundOrigin, SceneStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub canvas: CanvasSize,
    pub background: Color,
    #[serde(default)]
    pub objects: Vec<DrawableObject>,
}

impl Layout {
    pub fn from_json(text: &str) -> SceneResult<Self> {
        serde_json::from_str(text).map_err(|e| SceneError::Layout(e.to_string()))
    }

    pub fn to_json(&self) -> SceneResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SceneError::Layout(e.to_string()))
    }

    /// Every object must validate and ids must be unique.
    fn validate(&self) -> SceneResult<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            return Err(SceneError::Layout("canvas dimensions must be non-zero".into()));
        }
        let mut seen = HashSet::new();
        for obj in &self.objects {
            obj.validate()
                .map_err(|e| SceneError::Layout(e.to_string()))?;
            if !seen.insert(obj.id) {
                return Err(SceneError::Layout(format!("duplicate object id {}", obj.id)));
            }
        }
        Ok(())
    }
}

impl SceneStore {
    pub fn to_layout(&self) -> Layout {
        Layout {
            canvas: CanvasSize {
                width: self.width(),
                height: self.height(),
            },
            background: self.background(),
            objects: self.objects.clone(),
        }
    }

    /// Build a fresh store from a layout. The background counts as
    /// user-chosen.
    pub fn from_layout(layout: Layout) -> SceneResult<Self> {
        layout.validate()?;
        let mut store = SceneStore::new(layout.canvas.width, layout.canvas.height, layout.background);
        store.replace_contents(layout.objects, layout.background, BackgroundOrigin::User);
        Ok(store)
    }

    /// Replace the contents of this store with a layout of the same canvas
    /// size. Observers and selection (if the object survives) are kept.
    pub fn load_layout(&mut self, layout: Layout) -> SceneResult<()> {
        self.restore_layout(layout, BackgroundOrigin::User)
    }

    /// [`load_layout`](Self::load_layout) with an explicit background
    /// origin, for snapshots that recorded it.
    pub fn restore_layout(&mut self, layout: Layout, origin: BackgroundOrigin) -> SceneResult<()> {
        layout.validate()?;
        if layout.canvas.width != self.width() || layout.canvas.height != self.height() {
            return Err(SceneError::Layout(format!(
                "layout is {}x{}, canvas is {}x{}",
                layout.canvas.width,
                layout.canvas.height,
                self.width(),
                self.height()
            )));
        }
        log::debug!("load layout with {} objects", layout.objects.len());
        self.replace_contents(layout.objects, layout.background, origin);
        Ok(())
    }
}
