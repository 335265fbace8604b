use kelpie_core::ViewportState;

use crate::geom::{Point, point};

/// Lower clamp for the zoom factor.
pub const MIN_SCALE: f64 = 0.1;
/// Upper clamp for the zoom factor.
pub const MAX_SCALE: f64 = 3.0;

/// Pan/zoom transform from model space to screen space.
///
/// `to_screen` is a pure function of (model point, viewport, screen center):
/// `screen = (model + offset) * scale + center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl From<ViewportState> for Viewport {
    fn from(state: ViewportState) -> Self {
        Self {
            x: state.x,
            y: state.y,
            scale: state.scale.clamp(MIN_SCALE, MAX_SCALE),
        }
    }
}

impl From<Viewport> for ViewportState {
    fn from(viewport: Viewport) -> Self {
        Self {
            x: viewport.x,
            y: viewport.y,
            scale: viewport.scale,
        }
    }
}

impl Viewport {
    pub fn to_screen(&self, model: Point, screen_center: Point) -> Point {
        point(
            (model.x + self.x) * self.scale + screen_center.x,
            (model.y + self.y) * self.scale + screen_center.y,
        )
    }

    pub fn to_model(&self, screen: Point, screen_center: Point) -> Point {
        point(
            (screen.x - screen_center.x) / self.scale - self.x,
            (screen.y - screen_center.y) / self.scale - self.y,
        )
    }

    /// Pans by a screen-space delta. The delta is divided by the scale so the
    /// visual movement is the same number of pixels at any zoom level.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.x += dx / self.scale;
        self.y += dy / self.scale;
    }

    /// Multiplies the scale by `factor` (clamped to `[MIN_SCALE, MAX_SCALE]`)
    /// and compensates the offset so the model point under `anchor` stays
    /// visually fixed.
    pub fn zoom_at(&mut self, factor: f64, anchor: Point, screen_center: Point) {
        let new_scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        if new_scale == self.scale {
            return;
        }
        let fixed = self.to_model(anchor, screen_center);
        self.scale = new_scale;
        self.x = (anchor.x - screen_center.x) / new_scale - fixed.x;
        self.y = (anchor.y - screen_center.y) / new_scale - fixed.y;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
