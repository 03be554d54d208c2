//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Scale change per unit of wheel delta while zooming.
pub const ZOOM_SENSITIVITY: f64 = -0.01;

/// Camera manages the view transform for the surface.
///
/// Zoom is centered on the viewport: scaling grows the scene around the
/// middle of the visible area, then the pan offset is applied in world
/// units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Pan offset in world units
    pub pan: Vec2,
    /// Current scale (1.0 = 100%)
    pub scale: f64,
    /// Minimum allowed scale
    pub min_scale: f64,
    /// Maximum allowed scale
    pub max_scale: f64,
    /// Size of the visible area in screen pixels
    pub viewport: Size,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            scale: 1.0,
            min_scale: 0.1,
            max_scale: 20.0,
            viewport: Size::ZERO,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Screen-space shift that keeps the viewport center fixed while scaling.
    fn scale_offset(&self) -> Vec2 {
        Vec2::new(
            (self.viewport.width * self.scale - self.viewport.width) / 2.0,
            (self.viewport.height * self.scale - self.viewport.height) / 2.0,
        )
    }

    /// World-to-screen transform for rendering.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan * self.scale - self.scale_offset()) * Affine::scale(self.scale)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.transform().inverse() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan by a delta in world units.
    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Pan by a pointer delta in screen pixels.
    pub fn pan_by_screen(&mut self, delta: Vec2) {
        self.pan += delta / self.scale;
    }

    /// Add `delta` to the scale, clamped to the allowed range.
    pub fn zoom_by(&mut self, delta: f64) {
        self.scale = (self.scale + delta).clamp(self.min_scale, self.max_scale);
    }

    /// Apply a wheel delta as a zoom step.
    pub fn zoom_wheel(&mut self, wheel_dy: f64) {
        self.zoom_by(wheel_dy * ZOOM_SENSITIVITY);
    }

    /// Scale as a whole percentage for display.
    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    /// Reset pan and zoom.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.scale = 1.0;
    }
}
