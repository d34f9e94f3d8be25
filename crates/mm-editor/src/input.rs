//! Input abstraction layer.
//!
//! Normalizes mouse, touch, and wheel events into a unified `InputEvent`
//! consumed by the interaction state machine. Positions are in screen
//! space, relative to the canvas origin.

use mm_core::Point;
use mm_core::viewport::{WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT};

/// A normalized input event from any pointing device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Mouse down or single-finger touch start.
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    /// Mouse up or touch end. Touch end carries no position.
    PointerUp,
    DoubleClick { x: f64, y: f64 },
    /// Wheel scroll; positive `delta_y` scrolls down (zooms out).
    Wheel { x: f64, y: f64, delta_y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    Move,
    End,
    Cancel,
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    /// Map a touch event onto the pointer vocabulary.
    ///
    /// `touches` is the number of fingers still on the surface and
    /// `(x, y)` the position of the first one. Multi-finger starts and
    /// moves are ignored; any end or cancel releases the pointer.
    pub fn from_touch(phase: TouchPhase, touches: usize, x: f64, y: f64) -> Option<Self> {
        match phase {
            TouchPhase::Start if touches == 1 => Some(Self::PointerDown { x, y }),
            TouchPhase::Move if touches == 1 => Some(Self::PointerMove { x, y }),
            TouchPhase::End | TouchPhase::Cancel => Some(Self::PointerUp),
            _ => None,
        }
    }

    /// Screen position, if the event has one.
    pub fn position(&self) -> Option<Point> {
        match *self {
            Self::PointerDown { x, y }
            | Self::PointerMove { x, y }
            | Self::DoubleClick { x, y }
            | Self::Wheel { x, y, .. } => Some(Point::new(x, y)),
            Self::PointerUp => None,
        }
    }
}

/// Zoom factor for one wheel notch.
pub fn wheel_factor(delta_y: f64) -> f64 {
    if delta_y > 0.0 { WHEEL_ZOOM_OUT } else { WHEEL_ZOOM_IN }
}
