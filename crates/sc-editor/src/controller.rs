//! Selection & mutation controller.
//!
//! Translates properties-panel input into object model mutations on the
//! active selection. Every operation is a no-op without a selection.
//! Locked objects ignore geometry and position changes silently but still
//! take fill, stroke and opacity.

use sc_core::model::{DrawableObject, ObjectKind};
use sc_core::{Color, LayerGroup, ObjectId, SceneError, SceneResult, SceneStore};

/// Canvas edge or axis to align the selection to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    CenterH,
    Right,
    Top,
    CenterV,
    Bottom,
}

/// Snapshot of the active object for the properties panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Properties {
    pub id: ObjectId,
    pub kind: &'static str,
    pub fill: String,
    pub stroke: Option<String>,
    pub stroke_width: f64,
    /// 0–100. Reads the remembered value while hidden.
    pub opacity_percent: u8,
    /// Font size for text, scaled width for everything else.
    pub size_px: f64,
    pub rotation: f64,
    pub locked: bool,
    pub visible: bool,
    pub layer: LayerGroup,
}

/// Borrowed view over a scene store that edits its selection.
pub struct Controller<'a> {
    store: &'a mut SceneStore,
}

impl<'a> Controller<'a> {
    pub fn new(store: &'a mut SceneStore) -> Self {
        Self { store }
    }

    /// Set or clear the selection. Returns whether the selection now
    /// matches `id`.
    pub fn select(&mut self, id: Option<ObjectId>) -> bool {
        self.store.set_selection(id);
        self.store.selection() == id
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.store.selection()
    }

    // ─── Style ───────────────────────────────────────────────────────────

    pub fn set_fill(&mut self, color: &str) -> SceneResult<bool> {
        let Some(id) = self.store.selection() else {
            return Ok(false);
        };
        let color = Color::parse(color)?;
        self.apply(id, |obj| {
            obj.set_fill(color);
            Ok(())
        })
    }

    /// `None` removes the stroke.
    pub fn set_stroke(&mut self, color: Option<&str>, width: f64) -> SceneResult<bool> {
        let Some(id) = self.store.selection() else {
            return Ok(false);
        };
        let color = color.map(Color::parse).transpose()?;
        self.apply(id, |obj| obj.set_stroke(color, width))
    }

    pub fn set_opacity(&mut self, percent: f64) -> SceneResult<bool> {
        let Some(id) = self.store.selection() else {
            return Ok(false);
        };
        if !(0.0..=100.0).contains(&percent) {
            return Err(SceneError::InvalidGeometry(format!(
                "opacity {percent}% outside 0-100"
            )));
        }
        self.apply(id, |obj| obj.set_opacity(percent / 100.0))
    }

    // ─── Geometry ────────────────────────────────────────────────────────

    /// Text: font size. Everything else: uniform scale so the scaled width
    /// equals `px`.
    pub fn set_size(&mut self, px: f64) -> SceneResult<bool> {
        let Some(id) = self.unlocked_selection(DrawableObject::can_scale) else {
            return Ok(false);
        };
        self.apply(id, |obj| {
            if obj.is_text() {
                return obj.set_font_size(px);
            }
            let (base_w, _) = obj.base_size();
            if !(px.is_finite() && px >= 1.0) {
                return Err(SceneError::InvalidGeometry(format!(
                    "size {px} must be at least 1px"
                )));
            }
            let scale = px / base_w;
            obj.set_scale(scale, scale)
        })
    }

    /// Move flush to a canvas edge, or centre on an axis, using the
    /// object's rotated and scaled bounds.
    pub fn align(&mut self, edge: Align) -> SceneResult<bool> {
        let Some(id) = self.unlocked_selection(DrawableObject::can_move) else {
            return Ok(false);
        };
        let (cw, ch) = (self.store.width() as f64, self.store.height() as f64);
        self.apply(id, |obj| {
            let b = obj.bounds();
            let (dx, dy) = match edge {
                Align::Left => (-b.x0, 0.0),
                Align::CenterH => ((cw - b.width()) / 2.0 - b.x0, 0.0),
                Align::Right => (cw - b.x1, 0.0),
                Align::Top => (0.0, -b.y0),
                Align::CenterV => (0.0, (ch - b.height()) / 2.0 - b.y0),
                Align::Bottom => (0.0, ch - b.y1),
            };
            let g = obj.geometry;
            obj.set_position(g.left + dx, g.top + dy)
        })
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) -> SceneResult<bool> {
        let Some(id) = self.unlocked_selection(DrawableObject::can_move) else {
            return Ok(false);
        };
        self.apply(id, |obj| {
            let g = obj.geometry;
            obj.set_position(g.left + dx, g.top + dy)
        })
    }

    pub fn move_to(&mut self, left: f64, top: f64) -> SceneResult<bool> {
        let Some(id) = self.unlocked_selection(DrawableObject::can_move) else {
            return Ok(false);
        };
        self.apply(id, |obj| obj.set_position(left, top))
    }

    pub fn set_rotation(&mut self, degrees: f64) -> SceneResult<bool> {
        let Some(id) = self.unlocked_selection(DrawableObject::can_rotate) else {
            return Ok(false);
        };
        self.apply(id, |obj| obj.set_rotation(degrees))
    }

    // ─── Text ────────────────────────────────────────────────────────────

    /// Replace text content. Non-text and non-editable objects are
    /// ignored.
    pub fn set_text(&mut self, content: &str) -> SceneResult<bool> {
        let Some(id) = self.store.selection() else {
            return Ok(false);
        };
        if content.is_empty() {
            return Err(SceneError::InvalidObject("text content is empty".into()));
        }
        self.apply(id, |obj| {
            if let ObjectKind::Text {
                content: current,
                editable: true,
                ..
            } = &mut obj.kind
            {
                *current = content.to_string();
            }
            Ok(())
        })
    }

    /// CSS-style weight, 100–900 in steps of 100.
    pub fn set_font_weight(&mut self, weight: u16) -> SceneResult<bool> {
        let Some(id) = self.store.selection() else {
            return Ok(false);
        };
        if !(100..=900).contains(&weight) || weight % 100 != 0 {
            return Err(SceneError::InvalidObject(format!(
                "font weight {weight} is not one of 100..900"
            )));
        }
        self.apply(id, |obj| {
            if let ObjectKind::Text { font_weight, .. } = &mut obj.kind {
                *font_weight = weight;
            }
            Ok(())
        })
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Delete the active object. Clears the selection.
    pub fn delete_selected(&mut self) -> Option<DrawableObject> {
        let id = self.store.selection()?;
        self.store.remove_object(id)
    }

    pub fn properties(&self) -> Option<Properties> {
        let obj = self.store.selected_object()?;
        let size_px = match &obj.kind {
            ObjectKind::Text { font_size, .. } => *font_size,
            _ => obj.scaled_size().0,
        };
        let opacity = if obj.visible {
            obj.style.opacity
        } else {
            obj.hidden_opacity.unwrap_or(1.0)
        };
        Some(Properties {
            id: obj.id,
            kind: obj.kind.name(),
            fill: obj.style.fill.to_hex(),
            stroke: obj.style.stroke.map(|c| c.to_hex()),
            stroke_width: obj.style.stroke_width,
            opacity_percent: (opacity * 100.0).round() as u8,
            size_px,
            rotation: obj.geometry.rotation,
            locked: obj.interaction.locked,
            visible: obj.visible,
            layer: self.store.layer_group(obj.id).unwrap_or(LayerGroup::Top),
        })
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    /// The selection, unless `allowed` says its locks forbid the change.
    fn unlocked_selection(&self, allowed: fn(&DrawableObject) -> bool) -> Option<ObjectId> {
        let obj = self.store.selected_object()?;
        if !allowed(obj) {
            log::debug!("{} is locked; ignoring geometry change", obj.id);
            return None;
        }
        Some(obj.id)
    }

    fn apply(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut DrawableObject) -> SceneResult<()>,
    ) -> SceneResult<bool> {
        let before = self.store.revision();
        self.store.update(id, f)?;
        Ok(self.store.revision() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sc_core::ThemePalette;

    fn store_with_rect() -> (SceneStore, ObjectId) {
        let mut store = SceneStore::new(1080, 1920, Color::WHITE);
        let mut rect = DrawableObject::rectangle(200.0, 100.0, &ThemePalette::light());
        rect.set_position(100.0, 100.0).unwrap();
        let id = store.add_object(rect).unwrap();
        (store, id)
    }

    #[test]
    fn everything_is_a_noop_without_selection() {
        let (mut store, _) = store_with_rect();
        store.set_selection(None);
        let rev = store.revision();
        let mut c = Controller::new(&mut store);
        assert_eq!(c.set_fill("#ff0000"), Ok(false));
        assert_eq!(c.set_fill("garbage"), Ok(false));
        assert_eq!(c.set_opacity(50.0), Ok(false));
        assert_eq!(c.set_size(10.0), Ok(false));
        assert_eq!(c.align(Align::Left), Ok(false));
        assert_eq!(c.move_by(5.0, 5.0), Ok(false));
        assert!(c.delete_selected().is_none());
        assert!(c.properties().is_none());
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn invalid_fill_is_rejected_before_mutation() {
        let (mut store, id) = store_with_rect();
        let before = store.get(id).unwrap().clone();
        let err = Controller::new(&mut store).set_fill("#12345").unwrap_err();
        assert!(matches!(err, SceneError::InvalidColor(_)));
        assert_eq!(store.get(id).unwrap(), &before);
    }

    #[test]
    fn opacity_is_percent() {
        let (mut store, id) = store_with_rect();
        let mut c = Controller::new(&mut store);
        assert_eq!(c.set_opacity(40.0), Ok(true));
        assert_eq!(c.properties().unwrap().opacity_percent, 40);
        assert!(matches!(c.set_opacity(101.0), Err(SceneError::InvalidGeometry(_))));
        assert_eq!(store.get(id).unwrap().style.opacity, 0.4);
    }

    #[test]
    fn size_scales_shapes_uniformly() {
        let (mut store, id) = store_with_rect();
        Controller::new(&mut store).set_size(400.0).unwrap();
        let obj = store.get(id).unwrap();
        assert_eq!(obj.scaled_size(), (400.0, 200.0));
    }

    #[test]
    fn size_sets_font_size_on_text() {
        let mut store = SceneStore::new(1080, 1920, Color::WHITE);
        let id = store
            .add_object(DrawableObject::text("Hi", 48.0, &ThemePalette::light()))
            .unwrap();
        Controller::new(&mut store).set_size(96.0).unwrap();
        assert!(matches!(
            store.get(id).unwrap().kind,
            ObjectKind::Text { font_size, .. } if font_size == 96.0
        ));
    }

    #[test]
    fn align_uses_scaled_bounds() {
        let (mut store, id) = store_with_rect();
        let mut c = Controller::new(&mut store);
        c.set_size(400.0).unwrap();
        c.align(Align::Right).unwrap();
        c.align(Align::Bottom).unwrap();
        let b = store.get(id).unwrap().bounds();
        assert!((b.x1 - 1080.0).abs() < 1e-9);
        assert!((b.y1 - 1920.0).abs() < 1e-9);

        let mut c = Controller::new(&mut store);
        c.align(Align::CenterH).unwrap();
        c.align(Align::CenterV).unwrap();
        let center = store.get(id).unwrap().bounds().center();
        assert!((center.x - 540.0).abs() < 1e-9);
        assert!((center.y - 960.0).abs() < 1e-9);
    }

    #[test]
    fn align_accounts_for_rotation() {
        let (mut store, id) = store_with_rect();
        let mut c = Controller::new(&mut store);
        c.set_rotation(90.0).unwrap();
        c.align(Align::Left).unwrap();
        c.align(Align::Top).unwrap();
        let b = store.get(id).unwrap().bounds();
        assert!(b.x0.abs() < 1e-9);
        assert!(b.y0.abs() < 1e-9);
    }

    #[test]
    fn locked_objects_keep_position_but_take_color() {
        let (mut store, id) = store_with_rect();
        store.toggle_lock(id);
        let geometry = store.get(id).unwrap().geometry;

        let mut c = Controller::new(&mut store);
        assert_eq!(c.move_by(10.0, 10.0), Ok(false));
        assert_eq!(c.move_to(0.0, 0.0), Ok(false));
        assert_eq!(c.align(Align::Left), Ok(false));
        assert_eq!(c.set_size(500.0), Ok(false));
        assert_eq!(c.set_rotation(45.0), Ok(false));
        assert_eq!(c.set_fill("#ff0000"), Ok(true));
        assert_eq!(c.set_opacity(50.0), Ok(true));

        let obj = store.get(id).unwrap();
        assert_eq!(obj.geometry, geometry);
        assert_eq!(obj.style.fill, Color::rgb(255, 0, 0));
    }

    #[test]
    fn text_edits_respect_kind_and_weight_range() {
        let mut store = SceneStore::new(1080, 1920, Color::WHITE);
        let id = store
            .add_object(DrawableObject::text("Hi", 48.0, &ThemePalette::light()))
            .unwrap();
        let mut c = Controller::new(&mut store);
        assert_eq!(c.set_text("Hello there"), Ok(true));
        assert_eq!(c.set_font_weight(700), Ok(true));
        assert!(c.set_font_weight(650).is_err());
        assert!(c.set_text("").is_err());
        assert!(matches!(
            &store.get(id).unwrap().kind,
            ObjectKind::Text { content, font_weight: 700, .. } if content == "Hello there"
        ));
    }

    #[test]
    fn delete_selected_clears_selection() {
        let (mut store, id) = store_with_rect();
        let removed = Controller::new(&mut store).delete_selected().unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(store.selection(), None);
    }

    #[test]
    fn properties_reflect_selection() {
        let (mut store, id) = store_with_rect();
        let props = Controller::new(&mut store).properties().unwrap();
        assert_eq!(props.id, id);
        assert_eq!(props.kind, "rect");
        assert_eq!(props.fill, "#3b82f6");
        assert_eq!(props.size_px, 200.0);
        assert_eq!(props.opacity_percent, 100);
        assert_eq!(props.layer, LayerGroup::Top);
        assert!(!props.locked);
    }
}
