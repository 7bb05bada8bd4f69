#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use std::ops::{Add, Div, Mul};

use crate::consts::IDENTITY_ZOOM;

/// A point in either screen or scene space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn offset_by(self, delta: Offset) -> Self {
        Self { x: self.x + delta.dx, y: self.y + delta.dy }
    }
}

/// A translation, e.g. a drag gesture's travel or the canvas pan.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl Offset {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    #[must_use]
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

impl Add for Offset {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self { dx: self.dx + rhs.dx, dy: self.dy + rhs.dy }
    }
}

impl Mul<f64> for Offset {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self { dx: self.dx * rhs, dy: self.dy * rhs }
    }
}

impl Div<f64> for Offset {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self { dx: self.dx / rhs, dy: self.dy / rhs }
    }
}

/// Width and height of a viewport or an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Geometric center, measured from the top-left corner.
    #[must_use]
    pub fn center(&self) -> Point {
        Point { x: self.width / 2.0, y: self.height / 2.0 }
    }

    fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Canvas pan/zoom: a committed steady state plus the live delta of any pan or
/// zoom gesture in progress.
///
/// `steady_pan` is kept in scene units, so panning covers the same scene
/// distance per screen pixel at every zoom level. `steady_zoom` is a scale
/// factor (1.0 = no zoom). Live deltas are identity (zero pan, unit zoom)
/// whenever no gesture is running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub steady_pan: Offset,
    pub steady_zoom: f64,
    live_pan: Offset,
    live_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            steady_pan: Offset::ZERO,
            steady_zoom: IDENTITY_ZOOM,
            live_pan: Offset::ZERO,
            live_zoom: IDENTITY_ZOOM,
        }
    }
}

impl Camera {
    /// A camera with the given committed state and no live gesture.
    #[must_use]
    pub fn with_steady(steady_pan: Offset, steady_zoom: f64) -> Self {
        Self { steady_pan, steady_zoom, ..Self::default() }
    }

    // --- Composition ---

    /// Total zoom: steady-state times live gesture scale.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.steady_zoom * self.live_zoom
    }

    /// Total pan in screen pixels.
    #[must_use]
    pub fn pan(&self) -> Offset {
        (self.steady_pan + self.live_pan) * self.zoom()
    }

    #[must_use]
    pub fn live_pan(&self) -> Offset {
        self.live_pan
    }

    #[must_use]
    pub fn live_zoom(&self) -> f64 {
        self.live_zoom
    }

    /// Whether a pan or zoom gesture currently contributes a live delta.
    #[must_use]
    pub fn is_gesturing(&self) -> bool {
        self.live_pan != Offset::ZERO || self.live_zoom != IDENTITY_ZOOM
    }

    // --- Pan gesture ---

    /// Track a pan gesture's screen-space travel so far.
    pub fn update_pan(&mut self, translation: Offset) {
        self.live_pan = translation / self.zoom();
    }

    /// Fold the final pan travel into steady state and clear the live delta.
    pub fn end_pan(&mut self, translation: Offset) {
        self.steady_pan = self.steady_pan + translation / self.zoom();
        self.live_pan = Offset::ZERO;
    }

    // --- Zoom gesture ---

    /// Track a pinch gesture's scale so far. Non-positive or non-finite scales
    /// are ignored.
    pub fn update_zoom(&mut self, scale: f64) {
        if is_valid_scale(scale) {
            self.live_zoom = scale;
        }
    }

    /// Fold the final pinch scale into steady state and clear the live delta.
    pub fn end_zoom(&mut self, scale: f64) {
        if is_valid_scale(scale) {
            self.steady_zoom *= scale;
        }
        self.live_zoom = IDENTITY_ZOOM;
    }

    /// Drop any live delta without committing it.
    pub fn cancel(&mut self) {
        self.live_pan = Offset::ZERO;
        self.live_zoom = IDENTITY_ZOOM;
    }

    /// Zoom so the whole image fits the viewport and re-center.
    ///
    /// Returns false (and changes nothing) when there is no image or either
    /// size has a zero dimension.
    pub fn zoom_to_fit(&mut self, image: Option<Size>, viewport: Size) -> bool {
        let Some(image) = image else {
            return false;
        };
        if image.is_degenerate() || viewport.is_degenerate() {
            return false;
        }
        let h_zoom = viewport.width / image.width;
        let v_zoom = viewport.height / image.height;
        self.steady_pan = Offset::ZERO;
        self.steady_zoom = h_zoom.min(v_zoom);
        true
    }

    // --- Coordinate conversion ---

    /// Map a scene point (offset from canvas center) to viewport pixels.
    #[must_use]
    pub fn scene_to_screen(&self, scene: Point, viewport: Size) -> Point {
        let zoom = self.zoom();
        let pan = self.pan();
        let center = viewport.center();
        Point {
            x: scene.x * zoom + pan.dx + center.x,
            y: scene.y * zoom + pan.dy + center.y,
        }
    }

    /// Inverse of [`scene_to_screen`](Self::scene_to_screen).
    #[must_use]
    pub fn screen_to_scene(&self, screen: Point, viewport: Size) -> Point {
        let zoom = self.zoom();
        let pan = self.pan();
        let center = viewport.center();
        Point {
            x: (screen.x - center.x - pan.dx) / zoom,
            y: (screen.y - center.y - pan.dy) / zoom,
        }
    }
}

pub(crate) fn is_valid_scale(scale: f64) -> bool {
    scale.is_finite() && scale > 0.0
}
