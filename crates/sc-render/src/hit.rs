//! Hit testing: point → object lookup.
//!
//! Walks the object sequence top-down (last painted = topmost) and returns
//! the first object that can take pointer input and covers the point.

use kurbo::{Point, Rect};
use sc_core::model::DrawableObject;
use sc_core::{ObjectId, SceneStore};

/// Find the topmost interactive object at canvas position (x, y).
/// Returns `None` if the point only hits background or inert objects.
pub fn hit_test(store: &SceneStore, x: f64, y: f64) -> Option<ObjectId> {
    let point = Point::new(x, y);
    store
        .objects()
        .iter()
        .rev()
        .find(|obj| takes_pointer(obj) && covers(obj, point))
        .map(|obj| obj.id)
}

/// Same as [`hit_test`] for a point in on-screen pixels at `display_scale`.
pub fn hit_test_screen(store: &SceneStore, sx: f64, sy: f64, display_scale: f64) -> Option<ObjectId> {
    if display_scale <= 0.0 {
        return None;
    }
    hit_test(store, sx / display_scale, sy / display_scale)
}

fn takes_pointer(obj: &DrawableObject) -> bool {
    obj.interaction.selectable && obj.interaction.evented && obj.visible
}

/// Tests against the object's own rotated box rather than its axis-aligned
/// bounds, so corners outside a rotated shape don't catch clicks.
fn covers(obj: &DrawableObject, point: Point) -> bool {
    if !obj.bounds().contains(point) {
        return false;
    }
    let (w, h) = obj.base_size();
    let local = obj.transform().inverse() * point;
    Rect::new(0.0, 0.0, w, h).contains(local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sc_core::{Color, SafeZoneConfig, ThemePalette};

    fn rect_at(store: &mut SceneStore, left: f64, top: f64, w: f64, h: f64) -> ObjectId {
        let mut obj = DrawableObject::rectangle(w, h, &ThemePalette::light());
        obj.set_position(left, top).unwrap();
        store.add_object(obj).unwrap()
    }

    #[test]
    fn topmost_object_wins() {
        let mut store = SceneStore::new(1080, 1920, Color::WHITE);
        let a = rect_at(&mut store, 10.0, 10.0, 100.0, 100.0);
        let b = rect_at(&mut store, 50.0, 50.0, 100.0, 100.0);

        assert_eq!(hit_test(&store, 20.0, 20.0), Some(a));
        assert_eq!(hit_test(&store, 75.0, 75.0), Some(b));
        assert_eq!(hit_test(&store, 500.0, 500.0), None);

        store.send_backward(b);
        assert_eq!(hit_test(&store, 75.0, 75.0), Some(a));
    }

    #[test]
    fn hidden_objects_are_not_hit() {
        let mut store = SceneStore::new(1080, 1920, Color::WHITE);
        let a = rect_at(&mut store, 0.0, 0.0, 100.0, 100.0);
        let b = rect_at(&mut store, 0.0, 0.0, 100.0, 100.0);
        store.toggle_visibility(b);
        assert_eq!(hit_test(&store, 50.0, 50.0), Some(a));
    }

    #[test]
    fn safe_zones_pass_clicks_through() {
        let mut store = SceneStore::new(1080, 1920, Color::WHITE);
        let a = rect_at(&mut store, 0.0, 0.0, 300.0, 300.0);
        store.install_safe_zones(&SafeZoneConfig::default());
        assert_eq!(hit_test(&store, 100.0, 100.0), Some(a));
        assert_eq!(hit_test(&store, 900.0, 100.0), None);
    }

    #[test]
    fn rotated_corners_miss() {
        let mut store = SceneStore::new(1080, 1920, Color::WHITE);
        let id = rect_at(&mut store, 100.0, 100.0, 100.0, 100.0);
        store.update(id, |o| o.set_rotation(45.0)).unwrap();
        // Inside the axis-aligned bounds, outside the diamond.
        let b = store.get(id).unwrap().bounds();
        assert_eq!(hit_test(&store, b.x0 + 2.0, b.y0 + 2.0), None);
        assert_eq!(hit_test(&store, 150.0, 150.0), Some(id));
    }

    #[test]
    fn screen_points_are_unscaled() {
        let mut store = SceneStore::new(1080, 1920, Color::WHITE);
        let a = rect_at(&mut store, 200.0, 200.0, 100.0, 100.0);
        assert_eq!(hit_test_screen(&store, 125.0, 125.0, 0.5), Some(a));
    }
}
