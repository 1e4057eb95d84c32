//! The editor facade.
//!
//! Owns one scene store and passes it explicitly to the controller, layer
//! operations, theme adapter and export pipeline. Every user edit goes
//! through the command stack so it can be undone.

use crate::commands::{CommandStack, Restored};
use crate::controller::{Align, Controller, Properties};
use crate::error::EditorResult;
use image::RgbaImage;
use sc_core::ingest::{self, ResolvedAsset};
use sc_core::{
    DrawableObject, EditorConfig, LayerRow, Layout, ObjectId, SceneEvent, SceneResult, SceneStore,
    Theme, ThemeAdapter, ThemePalette, ThemeReport,
};
use sc_render::{
    ExportPipeline, ExportRequest, ExportedImage, FrameEncoder, ImageEncoder, ScreenFrame,
};
use std::sync::Arc;

const DEFAULT_TEXT_SIZE: f64 = 48.0;
const DEFAULT_RECT_SIZE: (f64, f64) = (300.0, 200.0);
const DEFAULT_CIRCLE_RADIUS: f64 = 100.0;

pub struct Editor<E = ImageEncoder> {
    store: SceneStore,
    config: EditorConfig,
    theme: ThemeAdapter,
    history: CommandStack,
    exporter: ExportPipeline<E>,
}

impl Editor<ImageEncoder> {
    pub fn new(config: EditorConfig, theme: Theme) -> Self {
        let exporter = ExportPipeline::from_config(&config);
        Self::with_exporter(config, theme, exporter)
    }
}

impl<E: FrameEncoder> Editor<E> {
    /// A fresh canvas with safe zones installed and `theme` applied.
    pub fn with_exporter(config: EditorConfig, theme: Theme, exporter: ExportPipeline<E>) -> Self {
        let mut store = SceneStore::from_config(&config);
        store.install_safe_zones(&config.safe_zone);
        let mut adapter = ThemeAdapter::new(Theme::Light);
        adapter.apply(&mut store, theme, &config);
        let mut history = CommandStack::new(config.undo_depth);
        history.set_theme(theme);
        log::debug!(
            "editor ready: {}x{} {theme}",
            config.canvas.width,
            config.canvas.height
        );
        Self {
            store,
            config,
            theme: adapter,
            history,
            exporter,
        }
    }

    pub fn store(&self) -> &SceneStore {
        &self.store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn theme(&self) -> Theme {
        self.theme.current()
    }

    /// Palette for objects created now.
    pub fn palette(&self) -> &ThemePalette {
        self.config.palette(self.theme.current())
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&SceneEvent) + 'static) {
        self.store.subscribe(observer);
    }

    /// React to the host's theme toggle. Not recorded in undo history.
    pub fn set_theme(&mut self, theme: Theme) -> ThemeReport {
        self.history.set_theme(theme);
        self.theme.apply(&mut self.store, theme, &self.config)
    }

    // ─── Insertion ───────────────────────────────────────────────────────

    pub fn add_object(&mut self, obj: DrawableObject) -> EditorResult<ObjectId> {
        let description = format!("Add {}", obj.kind.name());
        self.history
            .execute(&mut self.store, &description, |s| s.add_object(obj))
    }

    pub fn add_text(&mut self, content: &str) -> EditorResult<ObjectId> {
        let mut obj = DrawableObject::text(content, DEFAULT_TEXT_SIZE, self.palette());
        let (w, h) = obj.scaled_size();
        obj.set_position(
            (self.store.width() as f64 - w) / 2.0,
            (self.store.height() as f64 - h) / 2.0,
        )?;
        self.add_object(obj)
    }

    pub fn add_headline(&mut self, content: &str) -> EditorResult<ObjectId> {
        let obj = ingest::headline(content, &self.config, self.palette())?;
        self.add_object(obj)
    }

    pub fn add_body(&mut self, content: &str) -> EditorResult<ObjectId> {
        let obj = ingest::body(content, &self.config, self.palette())?;
        self.add_object(obj)
    }

    pub fn add_rectangle(&mut self) -> EditorResult<ObjectId> {
        let (w, h) = DEFAULT_RECT_SIZE;
        let mut obj = DrawableObject::rectangle(w, h, self.palette());
        obj.set_position(
            (self.store.width() as f64 - w) / 2.0,
            (self.store.height() as f64 - h) / 2.0,
        )?;
        self.add_object(obj)
    }

    pub fn add_circle(&mut self) -> EditorResult<ObjectId> {
        let r = DEFAULT_CIRCLE_RADIUS;
        let mut obj = DrawableObject::circle(r, self.palette());
        obj.set_position(
            self.store.width() as f64 / 2.0 - r,
            self.store.height() as f64 / 2.0 - r,
        )?;
        self.add_object(obj)
    }

    /// Insert a resolved image. A failed resolution leaves the scene as it
    /// was.
    pub fn add_asset(&mut self, asset: SceneResult<ResolvedAsset>) -> EditorResult<ObjectId> {
        let obj = ingest::image_object(asset?, &self.config)?;
        self.add_object(obj)
    }

    /// Apply a bitmap that finished decoding after its object was placed.
    pub fn complete_image_load(&mut self, id: ObjectId, bitmap: Arc<RgbaImage>) -> bool {
        self.store.complete_image_load(id, bitmap)
    }

    // ─── Selection & properties ──────────────────────────────────────────

    pub fn select(&mut self, id: Option<ObjectId>) -> bool {
        Controller::new(&mut self.store).select(id)
    }

    /// Select whatever is under an on-screen point, or clear the selection.
    pub fn click(&mut self, sx: f64, sy: f64) -> Option<ObjectId> {
        let hit = sc_render::hit_test_screen(&self.store, sx, sy, self.config.canvas.display_scale);
        self.select(hit);
        hit
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.store.selection()
    }

    pub fn properties(&mut self) -> Option<Properties> {
        Controller::new(&mut self.store).properties()
    }

    pub fn set_fill(&mut self, color: &str) -> EditorResult<bool> {
        self.edit("Fill", |c| c.set_fill(color))
    }

    pub fn set_stroke(&mut self, color: Option<&str>, width: f64) -> EditorResult<bool> {
        self.edit("Stroke", |c| c.set_stroke(color, width))
    }

    pub fn set_opacity(&mut self, percent: f64) -> EditorResult<bool> {
        self.edit("Opacity", |c| c.set_opacity(percent))
    }

    pub fn set_size(&mut self, px: f64) -> EditorResult<bool> {
        self.edit("Size", |c| c.set_size(px))
    }

    pub fn align(&mut self, edge: Align) -> EditorResult<bool> {
        self.edit("Align", |c| c.align(edge))
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) -> EditorResult<bool> {
        self.edit("Move", |c| c.move_by(dx, dy))
    }

    pub fn move_to(&mut self, left: f64, top: f64) -> EditorResult<bool> {
        self.edit("Move", |c| c.move_to(left, top))
    }

    pub fn set_rotation(&mut self, degrees: f64) -> EditorResult<bool> {
        self.edit("Rotate", |c| c.set_rotation(degrees))
    }

    pub fn set_text(&mut self, content: &str) -> EditorResult<bool> {
        self.edit("Edit text", |c| c.set_text(content))
    }

    pub fn set_font_weight(&mut self, weight: u16) -> EditorResult<bool> {
        self.edit("Font weight", |c| c.set_font_weight(weight))
    }

    pub fn delete_selected(&mut self) -> EditorResult<Option<DrawableObject>> {
        self.edit("Delete", |c| Ok(c.delete_selected()))
    }

    // ─── Canvas ──────────────────────────────────────────────────────────

    pub fn set_background(&mut self, color: &str) -> EditorResult<()> {
        self.history
            .execute(&mut self.store, "Background", |s| s.set_background(color))
    }

    /// Remove all user content. Safe zones stay. Confirmation is the
    /// caller's job.
    pub fn clear(&mut self) -> EditorResult<usize> {
        self.history
            .execute(&mut self.store, "Clear canvas", |s| Ok(s.clear()))
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    pub fn bring_forward(&mut self, id: ObjectId) -> EditorResult<bool> {
        self.history
            .execute(&mut self.store, "Bring forward", |s| Ok(s.bring_forward(id)))
    }

    pub fn send_backward(&mut self, id: ObjectId) -> EditorResult<bool> {
        self.history
            .execute(&mut self.store, "Send backward", |s| Ok(s.send_backward(id)))
    }

    pub fn bring_to_front(&mut self, id: ObjectId) -> EditorResult<bool> {
        self.history
            .execute(&mut self.store, "Bring to front", |s| Ok(s.bring_to_front(id)))
    }

    pub fn send_to_back(&mut self, id: ObjectId) -> EditorResult<bool> {
        self.history
            .execute(&mut self.store, "Send to back", |s| Ok(s.send_to_back(id)))
    }

    pub fn toggle_visibility(&mut self, id: ObjectId) -> EditorResult<Option<bool>> {
        self.history
            .execute(&mut self.store, "Toggle visibility", |s| Ok(s.toggle_visibility(id)))
    }

    pub fn toggle_lock(&mut self, id: ObjectId) -> EditorResult<Option<bool>> {
        self.history
            .execute(&mut self.store, "Toggle lock", |s| Ok(s.toggle_lock(id)))
    }

    pub fn layer_rows(&self) -> Vec<LayerRow> {
        self.store.layer_rows()
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Start a drag gesture; everything until `end_gesture` undoes as one
    /// step.
    pub fn begin_gesture(&mut self) -> EditorResult<()> {
        self.history.begin_batch(&self.store)
    }

    pub fn end_gesture(&mut self, description: &str) -> EditorResult<()> {
        self.history.end_batch(&self.store, description)
    }

    /// Step back one edit. A snapshot taken under the other theme is
    /// remapped to the current one.
    pub fn undo(&mut self) -> EditorResult<Option<String>> {
        let restored = self.history.undo(&mut self.store)?;
        Ok(self.reconcile(restored))
    }

    pub fn redo(&mut self) -> EditorResult<Option<String>> {
        let restored = self.history.redo(&mut self.store)?;
        Ok(self.reconcile(restored))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── Layouts ─────────────────────────────────────────────────────────

    pub fn save_layout(&self) -> Layout {
        self.store.to_layout()
    }

    /// Replace the canvas with a saved layout. Safe zones are reinstalled
    /// if the layout lacks them.
    pub fn load_layout(&mut self, layout: Layout) -> EditorResult<()> {
        let safe_zone = self.config.safe_zone.clone();
        self.history.execute(&mut self.store, "Load layout", |s| {
            s.load_layout(layout)?;
            s.install_safe_zones(&safe_zone);
            Ok(())
        })
    }

    // ─── Output ──────────────────────────────────────────────────────────

    pub fn render_screen(&self) -> EditorResult<ScreenFrame> {
        let frame = sc_render::render_screen(
            &self.store,
            self.config.canvas.display_scale,
            self.palette().selection,
        )?;
        Ok(frame)
    }

    /// Export the canvas. The scene reads exactly as before once the
    /// returned future completes, success or not.
    pub async fn export(&mut self, request: ExportRequest) -> EditorResult<ExportedImage> {
        let image = self.exporter.export(&mut self.store, request).await?;
        Ok(image)
    }

    fn reconcile(&mut self, restored: Option<Restored>) -> Option<String> {
        let Restored { description, theme } = restored?;
        self.theme.reconcile(&mut self.store, theme, &self.config);
        Some(description)
    }

    fn edit<R>(
        &mut self,
        description: &str,
        f: impl FnOnce(&mut Controller<'_>) -> SceneResult<R>,
    ) -> EditorResult<R> {
        self.history
            .execute(&mut self.store, description, |s| f(&mut Controller::new(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sc_core::{Color, LayerGroup, SceneError};

    fn editor() -> Editor {
        Editor::new(EditorConfig::default(), Theme::Light)
    }

    #[test]
    fn starts_with_safe_zones_only() {
        let ed = editor();
        assert_eq!(ed.store().len(), 2);
        assert!(ed.store().objects().iter().all(|o| o.is_protected()));
        assert!(!ed.can_undo());
    }

    #[test]
    fn dark_start_uses_dark_palette() {
        let mut ed = Editor::new(EditorConfig::default(), Theme::Dark);
        assert_eq!(ed.store().background().to_hex(), "#1a1a1a");
        let id = ed.add_text("Hi").unwrap();
        assert_eq!(ed.store().get(id).unwrap().style.fill, Color::WHITE);
    }

    #[test]
    fn new_objects_land_above_safe_zones() {
        let mut ed = editor();
        let id = ed.add_rectangle().unwrap();
        assert_eq!(ed.store().layer_group(id), Some(LayerGroup::Top));
        assert_eq!(ed.selection(), Some(id));
    }

    #[test]
    fn failed_asset_leaves_scene_unchanged() {
        let mut ed = editor();
        let rev = ed.store().revision();
        let err = ed
            .add_asset(Err(SceneError::ResourceUnavailable("timeout".into())))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::EditorError::Scene(SceneError::ResourceUnavailable(_))
        ));
        assert_eq!(ed.store().revision(), rev);
        assert!(!ed.can_undo());
    }

    #[test]
    fn click_selects_hit_object() {
        let mut ed = editor();
        let id = ed.add_rectangle().unwrap();
        ed.select(None);
        // Canvas centre at display scale 0.5.
        assert_eq!(ed.click(270.0, 480.0), Some(id));
        assert_eq!(ed.selection(), Some(id));
        assert_eq!(ed.click(5.0, 300.0), None);
        assert_eq!(ed.selection(), None);
    }

    #[test]
    fn load_layout_reinstalls_safe_zones() {
        let mut ed = editor();
        let layout = Layout {
            canvas: sc_core::CanvasSize {
                width: 1080,
                height: 1920,
            },
            background: Color::rgb(0x22, 0x22, 0x22),
            objects: vec![],
        };
        ed.load_layout(layout).unwrap();
        assert_eq!(ed.store().len(), 2);
        assert_eq!(ed.store().background().to_hex(), "#222222");
        ed.undo().unwrap();
        assert_eq!(ed.store().background(), Color::WHITE);
    }
}
