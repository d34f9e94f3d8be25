//! Pan/zoom transform between screen space and model space.
//!
//! `screen = model * zoom + pan`, so `model = (screen - pan) / zoom`.

use crate::events::ViewChange;
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 3.0;
/// Factor applied by one `zoom_in` / `zoom_out` step.
pub const ZOOM_STEP: f64 = 1.2;
/// Wheel scale factors, per notch.
pub const WHEEL_ZOOM_IN: f64 = 1.1;
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Zoom and pan of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

impl ViewState {
    pub fn is_finite(&self) -> bool {
        self.zoom.is_finite() && self.pan_x.is_finite() && self.pan_y.is_finite()
    }

    pub fn pan(&self) -> Vec2 {
        Vec2::new(self.pan_x, self.pan_y)
    }

    pub fn zoom_in(&mut self) {
        self.zoom = clamp_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = clamp_zoom(self.zoom / ZOOM_STEP);
    }

    /// Scale by `factor`, keeping the model point under `cursor` fixed on
    /// screen. Non-finite or non-positive factors are ignored.
    pub fn zoom_at_point(&mut self, cursor: Point, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let old = self.zoom;
        let new = clamp_zoom(old * factor);
        let ratio = new / old;
        self.pan_x = cursor.x - (cursor.x - self.pan_x) * ratio;
        self.pan_y = cursor.y - (cursor.y - self.pan_y) * ratio;
        self.zoom = new;
    }

    pub fn set_pan(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.pan_x = x;
            self.pan_y = y;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Map a screen point into model space.
    pub fn to_model(&self, screen: Point) -> Point {
        Point::new((screen.x - self.pan_x) / self.zoom, (screen.y - self.pan_y) / self.zoom)
    }

    pub fn to_screen(&self, model: Point) -> Point {
        Point::new(model.x * self.zoom + self.pan_x, model.y * self.zoom + self.pan_y)
    }

    /// Model-to-screen transform for painters.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan()) * Affine::scale(self.zoom)
    }

    /// Clamp zoom into range and zero out non-finite pan.
    pub fn sanitized(self) -> Self {
        let finite_or = |v: f64, d: f64| if v.is_finite() { v } else { d };
        Self {
            zoom: clamp_zoom(finite_or(self.zoom, 1.0)),
            pan_x: finite_or(self.pan_x, 0.0),
            pan_y: finite_or(self.pan_y, 0.0),
        }
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn change(&self) -> ViewChange {
        ViewChange {
            zoom: self.zoom,
            pan_x: self.pan_x,
            pan_y: self.pan_y,
            zoom_percent: self.zoom_percent(),
        }
    }
}
