//! Transform composition: canvas camera plus the selection gesture.
//!
//! Rendering an object takes its scene offset from the canvas center, scales
//! it by total zoom, adds the zoom-adjusted pan, moves it to the viewport
//! center and, for selected objects during a group drag, adds the live drag
//! travel. Sizes are scaled by total zoom and, for selected objects during a
//! group pinch, by the live pinch scale.

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;

use crate::camera::{Camera, Offset, Point, Size};
use crate::gesture::GroupGesture;
use crate::scene::{ObjectId, PlacedObject};

/// An object resolved to viewport coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedObject {
    pub id: ObjectId,
    pub text: String,
    /// Glyph center in viewport pixels.
    pub position: Point,
    /// Font size in viewport pixels.
    pub size: f64,
    pub selected: bool,
}

/// Session-only transform state of one document.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformState {
    pub camera: Camera,
    pub group: GroupGesture,
}

impl TransformState {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn render_position(&self, obj: &PlacedObject, selected: bool, viewport: Size) -> Point {
        let scene = Point::new(obj.x as f64, obj.y as f64);
        let screen = self.camera.scene_to_screen(scene, viewport);
        if selected {
            screen.offset_by(self.group.live_translation())
        } else {
            screen
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn render_size(&self, obj: &PlacedObject, selected: bool) -> f64 {
        let size = obj.size as f64 * self.camera.zoom();
        if selected { size * self.group.live_scale() } else { size }
    }

    #[must_use]
    pub fn render(&self, obj: &PlacedObject, selected: bool, viewport: Size) -> RenderedObject {
        RenderedObject {
            id: obj.id,
            text: obj.text.clone(),
            position: self.render_position(obj, selected, viewport),
            size: self.render_size(obj, selected),
            selected,
        }
    }

    /// Scene-space integer offset of a viewport point, rounded half-to-even.
    #[must_use]
    pub fn scene_point(&self, screen: Point, viewport: Size) -> (i64, i64) {
        let scene = self.camera.screen_to_scene(screen, viewport);
        (round_to_i64(scene.x), round_to_i64(scene.y))
    }

    /// Scene-space integer delta for a screen-space travel at the current zoom.
    #[must_use]
    pub fn scene_translation(&self, travel: Offset) -> (i64, i64) {
        let scene = travel / self.camera.zoom();
        (round_to_i64(scene.dx), round_to_i64(scene.dy))
    }

    /// Whether any live delta (canvas or selection) is active.
    #[must_use]
    pub fn is_gesturing(&self) -> bool {
        self.camera.is_gesturing() || !self.group.is_idle()
    }

    /// Drop all live deltas without committing them.
    pub fn cancel(&mut self) {
        self.camera.cancel();
        self.group.cancel();
    }
}

#[allow(clippy::cast_possible_truncation)]
fn round_to_i64(v: f64) -> i64 {
    if v.is_finite() { v.round_ties_even() as i64 } else { 0 }
}
