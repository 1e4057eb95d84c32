//! Z-order and layer management.
//!
//! Stacking is the position in the scene store's object sequence; these
//! operations only permute that sequence, never add or drop entries.
//! Layer groups and bands are derived on demand and never stored.

use crate::id::ObjectId;
use crate::model::DrawableObject;
use crate::scene::{SceneEvent, SceneStore};

/// Position class derived from the object sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerGroup {
    Bottom,
    Middle,
    Top,
}

/// Semantic band shown in the layers panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// User content.
    Workspace,
    /// Protected overlays enforcing platform safe zones.
    Enforcement,
}

impl Band {
    pub fn of(obj: &DrawableObject) -> Self {
        if obj.is_protected() {
            Band::Enforcement
        } else {
            Band::Workspace
        }
    }
}

/// One row of the layers panel.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRow {
    pub id: ObjectId,
    pub label: String,
    pub group: LayerGroup,
    pub band: Band,
    pub visible: bool,
    pub locked: bool,
}

/// Group for `index` in a sequence of `len` objects. The last object is
/// `Top` even when it is also the first.
fn group_at(index: usize, len: usize) -> LayerGroup {
    if index + 1 == len {
        LayerGroup::Top
    } else if index == 0 {
        LayerGroup::Bottom
    } else {
        LayerGroup::Middle
    }
}

impl SceneStore {
    /// Move an object one step toward the top (swap with the next object).
    /// Returns true if the order changed.
    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        match self.movable_index(id) {
            Some(pos) if pos + 1 < self.objects.len() => self.move_layer(pos, pos + 1),
            _ => false,
        }
    }

    /// Move an object one step toward the bottom (swap with the previous
    /// object). Returns true if the order changed.
    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        match self.movable_index(id) {
            Some(pos) if pos > 0 => self.move_layer(pos, pos - 1),
            _ => false,
        }
    }

    /// Move an object to the very top.
    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let last = self.objects.len().saturating_sub(1);
        match self.movable_index(id) {
            Some(pos) if pos < last => self.move_layer(pos, last),
            _ => false,
        }
    }

    /// Move an object to the very bottom.
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        match self.movable_index(id) {
            Some(pos) if pos > 0 => self.move_layer(pos, 0),
            _ => false,
        }
    }

    /// Hide (opacity 0, prior opacity remembered) or show (restore the
    /// remembered opacity, 1.0 if none). Returns the new visibility, or
    /// `None` for unknown ids.
    pub fn toggle_visibility(&mut self, id: ObjectId) -> Option<bool> {
        let idx = self.index_of(id)?;
        let obj = &mut self.objects[idx];
        if obj.visible {
            obj.hidden_opacity = Some(obj.style.opacity);
            obj.style.opacity = 0.0;
            obj.visible = false;
        } else {
            obj.style.opacity = obj.hidden_opacity.take().unwrap_or(1.0);
            obj.visible = true;
        }
        let visible = obj.visible;
        log::debug!("{id} visible={visible}");
        self.notify(SceneEvent::ObjectChanged(id));
        Some(visible)
    }

    /// Flip `locked` and its dependent flags. Protected overlays always stay
    /// locked. Returns the new lock state, or `None` if nothing changed.
    pub fn toggle_lock(&mut self, id: ObjectId) -> Option<bool> {
        let idx = self.index_of(id)?;
        let obj = &mut self.objects[idx];
        if obj.is_protected() {
            return None;
        }
        let locked = !obj.interaction.locked;
        obj.set_locked(locked);
        log::debug!("{id} locked={locked}");
        self.notify(SceneEvent::ObjectChanged(id));
        Some(locked)
    }

    pub fn layer_group(&self, id: ObjectId) -> Option<LayerGroup> {
        self.index_of(id).map(|i| group_at(i, self.objects.len()))
    }

    /// Groups for every object, bottom-to-top. O(n).
    pub fn layer_groups(&self) -> Vec<(ObjectId, LayerGroup)> {
        let len = self.objects.len();
        self.objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.id, group_at(i, len)))
            .collect()
    }

    /// Layers panel rows, top-most first.
    pub fn layer_rows(&self) -> Vec<LayerRow> {
        let len = self.objects.len();
        self.objects
            .iter()
            .enumerate()
            .rev()
            .map(|(i, o)| LayerRow {
                id: o.id,
                label: o.label(),
                group: group_at(i, len),
                band: Band::of(o),
                visible: o.visible,
                locked: o.interaction.locked,
            })
            .collect()
    }

    /// Index of an object that may be restacked. Protected overlays stay put.
    fn movable_index(&self, id: ObjectId) -> Option<usize> {
        let idx = self.index_of(id)?;
        if self.objects[idx].is_protected() {
            log::warn!("refusing to restack protected object {id}");
            return None;
        }
        Some(idx)
    }

    /// Move the object at `from` to position `to`, shifting the rest.
    fn move_layer(&mut self, from: usize, to: usize) -> bool {
        let obj = self.objects.remove(from);
        self.objects.insert(to, obj);
        log::debug!("restack {from} -> {to}");
        self.notify(SceneEvent::Reordered);
        true
    }
}
