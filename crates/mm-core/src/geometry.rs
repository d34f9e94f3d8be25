//! Pure geometry helpers: box containment, point-to-segment distance, and
//! edge-trimmed connection segments.
//!
//! Nodes are stored by their center; every box here is derived from a
//! center point plus width/height.

use kurbo::{Line, Point, Rect, Size, Vec2};

/// Axis-aligned box of a node centered at `center`.
pub fn node_rect(center: Point, width: f64, height: f64) -> Rect {
    Rect::from_center_size(center, Size::new(width, height))
}

/// Inclusive containment test. Points on the border count as inside, so a
/// click exactly on a node's edge still selects it.
pub fn rect_contains(rect: &Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

/// Shortest distance from `p` to the segment `a`–`b`.
///
/// Degenerate segments (a == b) collapse to point distance.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq == 0.0 {
        return (p - a).hypot();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let closest = a + ab * t;
    (p - closest).hypot()
}

/// Segment between two node boxes, trimmed to the box borders along the
/// line joining the centers.
///
/// Each endpoint is offset from its center by the unit direction scaled
/// component-wise by half the node's width/height. Returns `None` when the
/// centers coincide (no direction exists).
pub fn trimmed_segment(from: Point, from_size: Size, to: Point, to_size: Size) -> Option<Line> {
    let delta = to - from;
    let distance = delta.hypot();
    if distance == 0.0 || !distance.is_finite() {
        return None;
    }
    let unit = delta / distance;
    let start = from + Vec2::new(unit.x * from_size.width / 2.0, unit.y * from_size.height / 2.0);
    let end = to - Vec2::new(unit.x * to_size.width / 2.0, unit.y * to_size.height / 2.0);
    Some(Line::new(start, end))
}
