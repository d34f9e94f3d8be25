//! Render scene → drawing commands.
//!
//! The drawing surface lives outside this crate. It implements `Painter`,
//! and `paint_scene` walks the scene in z-order: edges, boxes, rubber
//! band, cursors.

use crate::scene::{
    CursorMark, EDGE_COLOR, Edge, NodeBox, RUBBER_BAND_COLOR, RenderScene, SELECTED_COLOR,
};
use kurbo::{Affine, Line, Point, Rect};

pub const CORNER_RADIUS: f64 = 8.0;
pub const EDGE_WIDTH: f64 = 2.0;
pub const SELECTED_EDGE_WIDTH: f64 = 4.0;
pub const BORDER_WIDTH: f64 = 1.0;
pub const SELECTED_BORDER_WIDTH: f64 = 3.0;
pub const CURSOR_RADIUS: f64 = 5.0;
pub const FONT: &str = "14px sans-serif";

/// A 2D drawing surface. Coordinates are in model space; the painter
/// applies the transform passed to `set_transform`.
pub trait Painter {
    /// Clear the whole surface (in screen space).
    fn clear(&mut self);
    fn set_transform(&mut self, transform: Affine);
    fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: &str);
    fn stroke_rounded_rect(&mut self, rect: Rect, radius: f64, color: &str, width: f64);
    fn stroke_line(&mut self, line: Line, color: &str, width: f64, dashed: bool);
    /// Text centered horizontally and vertically on `anchor`.
    fn fill_text(&mut self, text: &str, anchor: Point, color: &str, font: &str);
    fn fill_circle(&mut self, center: Point, radius: f64, color: &str);
}

/// Paint one frame.
pub fn paint_scene(painter: &mut impl Painter, scene: &RenderScene) {
    painter.clear();
    painter.set_transform(scene.transform);

    for edge in &scene.edges {
        paint_edge(painter, edge);
    }
    for node in &scene.boxes {
        paint_box(painter, node);
    }
    if let Some(line) = scene.rubber_band {
        painter.stroke_line(line, RUBBER_BAND_COLOR, EDGE_WIDTH, true);
    }
    for cursor in &scene.cursors {
        paint_cursor(painter, cursor, scene.transform);
    }
}

// ─── Primitives ──────────────────────────────────────────────────────────

fn paint_edge(painter: &mut impl Painter, edge: &Edge) {
    let (color, width) = if edge.selected {
        (SELECTED_COLOR, SELECTED_EDGE_WIDTH)
    } else {
        (EDGE_COLOR, EDGE_WIDTH)
    };
    painter.stroke_line(edge.line, color, width, false);
}

fn paint_box(painter: &mut impl Painter, node: &NodeBox) {
    painter.fill_rounded_rect(node.rect, CORNER_RADIUS, &node.fill);
    let (color, width) = if node.selected {
        (SELECTED_COLOR, SELECTED_BORDER_WIDTH)
    } else {
        (EDGE_COLOR, BORDER_WIDTH)
    };
    painter.stroke_rounded_rect(node.rect, CORNER_RADIUS, color, width);
    for line in &node.lines {
        painter.fill_text(&line.text, line.anchor, node.label_color, FONT);
    }
}

/// Cursors keep a constant on-screen size regardless of zoom.
fn paint_cursor(painter: &mut impl Painter, cursor: &CursorMark, transform: Affine) {
    let scale = transform.as_coeffs()[0];
    let radius = if scale > 0.0 { CURSOR_RADIUS / scale } else { CURSOR_RADIUS };
    painter.fill_circle(cursor.position, radius, cursor.color);
    let label_at = cursor.position + kurbo::Vec2::new(0.0, -3.0 * radius);
    painter.fill_text(cursor.user_id.as_str(), label_at, cursor.color, FONT);
}
