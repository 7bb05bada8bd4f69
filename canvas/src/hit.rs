#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Point, Size};
use crate::scene::{ObjectId, Scene};
use crate::selection::SelectionSet;
use crate::transform::TransformState;

/// Topmost object whose glyph box contains `screen_pt`.
///
/// A glyph box is a square with side equal to the rendered size, centered on
/// the rendered position. Later objects are drawn over earlier ones, so the
/// scene is scanned back to front.
#[must_use]
pub fn object_at(
    screen_pt: Point,
    scene: &Scene,
    selection: &SelectionSet,
    transform: &TransformState,
    viewport: Size,
) -> Option<ObjectId> {
    scene.objects().iter().rev().find_map(|obj| {
        let selected = selection.contains(obj.id);
        let center = transform.render_position(obj, selected, viewport);
        let half = transform.render_size(obj, selected) / 2.0;
        let inside = (screen_pt.x - center.x).abs() <= half && (screen_pt.y - center.y).abs() <= half;
        inside.then_some(obj.id)
    })
}
