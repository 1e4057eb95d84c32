//! The scene store: canvas dimensions, background, the ordered object
//! sequence and the active selection.
//!
//! Index 0 of the sequence is the bottom-most object. Every mutation goes
//! through the store so observers see exactly one `SceneEvent` per change
//! and the `revision` counter always moves forward.

use crate::color::Color;
use crate::config::{EditorConfig, SafeZoneConfig};
use crate::error::{SceneError, SceneResult};
use crate::id::ObjectId;
use crate::model::{DrawableObject, ObjectKind};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

pub const SAFE_ZONE_TOP_ID: &str = "safe_zone_top";
pub const SAFE_ZONE_BOTTOM_ID: &str = "safe_zone_bottom";

/// Where the current background came from. The theme adapter only keeps
/// user-chosen backgrounds aside for restoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundOrigin {
    Theme,
    User,
}

/// Change notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    ObjectChanged(ObjectId),
    Reordered,
    Cleared { removed: usize },
    BackgroundChanged(Color),
    SelectionChanged(Option<ObjectId>),
    /// The whole scene was replaced (layout load, undo/redo).
    Replaced,
}

type Observer = Box<dyn FnMut(&SceneEvent)>;

pub struct SceneStore {
    width: u32,
    height: u32,
    background: Color,
    background_origin: BackgroundOrigin,
    pub(crate) objects: Vec<DrawableObject>,
    selection: Option<ObjectId>,
    observers: Vec<Observer>,
    revision: u64,
}

impl fmt::Debug for SceneStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneStore")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("background", &self.background)
            .field("objects", &self.objects.len())
            .field("selection", &self.selection)
            .field("observers", &format!("<{} observers>", self.observers.len()))
            .field("revision", &self.revision)
            .finish()
    }
}

impl SceneStore {
    /// An empty canvas with a theme-default background.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            background,
            background_origin: BackgroundOrigin::Theme,
            objects: Vec::new(),
            selection: None,
            observers: Vec::new(),
            revision: 0,
        }
    }

    /// An empty canvas sized and colored from the config's light palette.
    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(
            config.canvas.width,
            config.canvas.height,
            config.light.canvas_background,
        )
    }

    // ─── Observers ───────────────────────────────────────────────────────

    /// Register a callback invoked after every mutation.
    pub fn subscribe(&mut self, observer: impl FnMut(&SceneEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub(crate) fn notify(&mut self, event: SceneEvent) {
        self.revision += 1;
        log::trace!("scene r{} {:?}", self.revision, event);
        for observer in &mut self.observers {
            observer(&event);
        }
    }

    /// Bumped on every mutation; cheap change detection for renderers.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn background_origin(&self) -> BackgroundOrigin {
        self.background_origin
    }

    /// Objects bottom-to-top.
    pub fn objects(&self) -> &[DrawableObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, id: ObjectId) -> Option<&DrawableObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.objects.iter().position(|o| o.id == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.index_of(id).is_some()
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn selected_object(&self) -> Option<&DrawableObject> {
        self.selection.and_then(|id| self.get(id))
    }

    /// Set or clear the active selection. Unknown ids clear it; objects
    /// that are not selectable leave it unchanged.
    pub fn set_selection(&mut self, id: Option<ObjectId>) {
        let next = match id {
            None => None,
            Some(id) => match self.get(id) {
                Some(obj) if !obj.interaction.selectable => return,
                Some(_) => Some(id),
                None => None,
            },
        };
        if next != self.selection {
            self.selection = next;
            self.notify(SceneEvent::SelectionChanged(next));
        }
    }

    // ─── Structural mutations ────────────────────────────────────────────

    /// Append an object to the top of the stack and select it.
    ///
    /// # Errors
    /// [`SceneError::InvalidObject`] if the geometry is unusable or the id
    /// is already on the canvas.
    pub fn add_object(&mut self, obj: DrawableObject) -> SceneResult<ObjectId> {
        obj.validate()?;
        if self.contains(obj.id) {
            return Err(SceneError::InvalidObject(format!(
                "{} is already on the canvas",
                obj.id
            )));
        }
        let id = obj.id;
        id.reserve();
        let selectable = obj.interaction.selectable;
        log::debug!("add {} ({}) at index {}", id, obj.kind.name(), self.objects.len());
        self.objects.push(obj);
        self.notify(SceneEvent::ObjectAdded(id));
        if selectable {
            self.set_selection(Some(id));
        }
        Ok(id)
    }

    /// Remove by id. Unknown ids and non-deletable objects are ignored.
    /// Returns the removed object.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<DrawableObject> {
        let idx = self.index_of(id)?;
        if !self.objects[idx].interaction.deletable {
            log::warn!("refusing to remove protected object {id}");
            return None;
        }
        let removed = self.objects.remove(idx);
        log::debug!("remove {id} from index {idx}");
        self.notify(SceneEvent::ObjectRemoved(id));
        if self.selection == Some(id) {
            self.selection = None;
            self.notify(SceneEvent::SelectionChanged(None));
        }
        Some(removed)
    }

    /// Remove every deletable object. Protected overlays stay in place.
    /// Returns how many objects were removed.
    pub fn clear(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|o| !o.interaction.deletable);
        let removed = before - self.objects.len();
        if self.selection.is_some_and(|id| !self.contains(id)) {
            self.selection = None;
            self.notify(SceneEvent::SelectionChanged(None));
        }
        log::debug!("clear removed {removed}, kept {}", self.objects.len());
        self.notify(SceneEvent::Cleared { removed });
        removed
    }

    /// Validate and apply a user-chosen background color.
    ///
    /// # Errors
    /// [`SceneError::InvalidColor`] for malformed strings.
    pub fn set_background(&mut self, color: &str) -> SceneResult<()> {
        let parsed = Color::parse(color)?;
        self.set_background_color(parsed, BackgroundOrigin::User);
        Ok(())
    }

    pub fn set_background_color(&mut self, color: Color, origin: BackgroundOrigin) {
        self.background_origin = origin;
        if self.background != color {
            self.background = color;
            self.notify(SceneEvent::BackgroundChanged(color));
        }
    }

    /// Background swap that bypasses observers. Used by the export
    /// pipeline for its temporary override so no themed frame is announced.
    pub fn swap_background_silently(&mut self, color: Color) -> Color {
        std::mem::replace(&mut self.background, color)
    }

    /// Mutate one object in place and announce it if anything changed.
    /// Returns `Ok(None)` for unknown ids. The closure must leave the
    /// object untouched when it fails; the model setters all do.
    pub fn update<R>(
        &mut self,
        id: ObjectId,
        f: impl FnOnce(&mut DrawableObject) -> SceneResult<R>,
    ) -> SceneResult<Option<R>> {
        let Some(idx) = self.index_of(id) else {
            return Ok(None);
        };
        let before = self.objects[idx].clone();
        let result = f(&mut self.objects[idx])?;
        if self.objects[idx] != before {
            self.notify(SceneEvent::ObjectChanged(id));
        }
        Ok(Some(result))
    }

    /// Apply a late-arriving decoded bitmap. If the object was deleted in
    /// the meantime the bitmap is dropped. Returns whether it was applied.
    pub fn complete_image_load(&mut self, id: ObjectId, bitmap: Arc<RgbaImage>) -> bool {
        let Some(idx) = self.index_of(id) else {
            log::debug!("image load for {id} arrived after delete; discarding");
            return false;
        };
        let obj = &mut self.objects[idx];
        let ObjectKind::Image {
            source,
            natural_width,
            natural_height,
        } = &mut obj.kind
        else {
            log::warn!("image load targeted non-image object {id}");
            return false;
        };
        // Keep the on-canvas width stable when the real size differs.
        let shown_width = *natural_width * obj.geometry.scale_x;
        let (w, h) = (bitmap.width() as f64, bitmap.height() as f64);
        *natural_width = w.max(1.0);
        *natural_height = h.max(1.0);
        source.bitmap = Some(bitmap);
        let scale = shown_width / *natural_width;
        obj.geometry.scale_x = scale;
        obj.geometry.scale_y = scale;
        self.notify(SceneEvent::ObjectChanged(id));
        true
    }

    /// Swap the full object list and background in one step.
    pub(crate) fn replace_contents(
        &mut self,
        objects: Vec<DrawableObject>,
        background: Color,
        origin: BackgroundOrigin,
    ) {
        for obj in &objects {
            obj.id.reserve();
        }
        self.objects = objects;
        self.background = background;
        self.background_origin = origin;
        if self.selection.is_some_and(|id| !self.contains(id)) {
            self.selection = None;
        }
        self.notify(SceneEvent::Replaced);
    }

    // ─── Safe zones ──────────────────────────────────────────────────────

    /// Insert the top and bottom protected bands. Idempotent: bands that
    /// already exist are left alone. Returns the ids that were inserted.
    pub fn install_safe_zones(&mut self, config: &SafeZoneConfig) -> SmallVec<[ObjectId; 2]> {
        let mut inserted = SmallVec::new();
        if !config.enabled {
            return inserted;
        }
        let width = self.width as f64;
        let bands = [
            (SAFE_ZONE_TOP_ID, "Top safe zone", 0.0, config.top),
            (
                SAFE_ZONE_BOTTOM_ID,
                "Bottom safe zone",
                self.height as f64 - config.bottom,
                config.bottom,
            ),
        ];
        for (id, label, top, height) in bands {
            let id = ObjectId::intern(id);
            if height < 1.0 || self.contains(id) {
                continue;
            }
            let overlay =
                DrawableObject::protected_overlay(id, label, top, width, height, config.color);
            self.objects.push(overlay);
            self.notify(SceneEvent::ObjectAdded(id));
            inserted.push(id);
        }
        inserted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemePalette;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> SceneStore {
        SceneStore::new(1080, 1920, Color::WHITE)
    }

    #[test]
    fn add_selects_and_appends() {
        let mut s = store();
        let a = s.add_object(DrawableObject::text("Hello", 48.0, &ThemePalette::light())).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s.selection(), Some(a));

        let b = s.add_object(DrawableObject::rectangle(10.0, 10.0, &ThemePalette::light())).unwrap();
        assert_eq!(s.index_of(b), Some(1));
        assert_eq!(s.selection(), Some(b));
    }

    #[test]
    fn add_rejects_duplicate_ids() {
        let mut s = store();
        let obj = DrawableObject::rectangle(10.0, 10.0, &ThemePalette::light());
        s.add_object(obj.clone()).unwrap();
        assert!(matches!(s.add_object(obj), Err(SceneError::InvalidObject(_))));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut s = store();
        let rev = s.revision();
        assert!(s.remove_object(ObjectId::intern("missing")).is_none());
        assert_eq!(s.revision(), rev);
    }

    #[test]
    fn remove_selected_clears_selection() {
        let mut s = store();
        let a = s.add_object(DrawableObject::circle(5.0, &ThemePalette::light())).unwrap();
        s.remove_object(a);
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn clear_keeps_safe_zones() {
        let mut s = store();
        s.install_safe_zones(&SafeZoneConfig::default());
        s.add_object(DrawableObject::circle(5.0, &ThemePalette::light())).unwrap();
        s.add_object(DrawableObject::circle(6.0, &ThemePalette::light())).unwrap();
        assert_eq!(s.clear(), 2);
        assert_eq!(s.len(), 2);
        assert!(s.objects().iter().all(|o| o.is_protected()));
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn safe_zones_install_once() {
        let mut s = store();
        let first = s.install_safe_zones(&SafeZoneConfig::default());
        let second = s.install_safe_zones(&SafeZoneConfig::default());
        assert_eq!(first.len(), 2);
        assert!(second.is_empty());

        let bottom = s.get(ObjectId::intern(SAFE_ZONE_BOTTOM_ID)).unwrap();
        assert_eq!(bottom.geometry.top, 1920.0 - 250.0);
        assert_eq!(bottom.base_size(), (1080.0, 250.0));
        assert!(s.remove_object(bottom.id).is_none());
    }

    #[test]
    fn safe_zones_cannot_be_selected() {
        let mut s = store();
        s.install_safe_zones(&SafeZoneConfig::default());
        s.set_selection(Some(ObjectId::intern(SAFE_ZONE_TOP_ID)));
        assert_eq!(s.selection(), None);
    }

    #[test]
    fn set_background_validates() {
        let mut s = store();
        assert!(matches!(
            s.set_background("#zzzzzz"),
            Err(SceneError::InvalidColor(_))
        ));
        assert_eq!(s.background(), Color::WHITE);
        s.set_background("#222222").unwrap();
        assert_eq!(s.background(), Color::rgb(0x22, 0x22, 0x22));
        assert_eq!(s.background_origin(), BackgroundOrigin::User);
    }

    #[test]
    fn observers_see_every_mutation() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut s = store();
        s.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        let a = s.add_object(DrawableObject::circle(5.0, &ThemePalette::light())).unwrap();
        s.remove_object(a);

        assert_eq!(
            *events.borrow(),
            vec![
                SceneEvent::ObjectAdded(a),
                SceneEvent::SelectionChanged(Some(a)),
                SceneEvent::ObjectRemoved(a),
                SceneEvent::SelectionChanged(None),
            ]
        );
    }

    #[test]
    fn update_failure_is_not_announced() {
        let mut s = store();
        let a = s.add_object(DrawableObject::circle(5.0, &ThemePalette::light())).unwrap();
        let rev = s.revision();
        let err = s.update(a, |o| o.set_rotation(400.0)).unwrap_err();
        assert!(matches!(err, SceneError::InvalidGeometry(_)));
        assert_eq!(s.revision(), rev);
    }

    #[test]
    fn late_image_load_after_delete_is_discarded() {
        let mut s = store();
        let img = DrawableObject::image(Default::default(), 800.0, 600.0);
        let id = s.add_object(img).unwrap();
        s.remove_object(id);
        let bitmap = Arc::new(RgbaImage::new(4, 4));
        assert!(!s.complete_image_load(id, bitmap));
        assert!(s.is_empty());
    }

    #[test]
    fn late_image_load_keeps_shown_width() {
        let mut s = store();
        let mut img = DrawableObject::image(Default::default(), 800.0, 600.0);
        img.set_scale(0.5, 0.5).unwrap();
        let id = s.add_object(img).unwrap();
        assert!(s.complete_image_load(id, Arc::new(RgbaImage::new(200, 100))));
        let obj = s.get(id).unwrap();
        assert_eq!(obj.scaled_size(), (400.0, 200.0));
    }
}
