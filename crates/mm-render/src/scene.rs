//! Mind map → render scene.
//!
//! `build_scene` reads the graph and produces plain drawable primitives in
//! model coordinates plus the view transform. It never mutates the graph;
//! whatever draws the scene (a Canvas2D context, an SVG writer, a test)
//! consumes the result through `paint::Painter`.

use kurbo::{Affine, Line, Point, Rect};
use mm_core::text::{Lines, TextMetrics};
use mm_core::{Color, ConnectionId, MindMap, NodeId, UserId};

/// Stroke color of unselected edges and node borders.
pub const EDGE_COLOR: &str = "#90a4ae";
/// Highlight for the selected node or connection.
pub const SELECTED_COLOR: &str = "#2196f3";
/// Rubber band shown while a connection is being drawn.
pub const RUBBER_BAND_COLOR: &str = "#ff9800";

const LABEL_DARK: &str = "#212121";
const LABEL_LIGHT: &str = "#ffffff";

/// Palette for remote cursors, picked by user id.
const CURSOR_PALETTE: [&str; 6] = ["#e91e63", "#9c27b0", "#3f51b5", "#009688", "#ff5722", "#795548"];

/// A node box with its wrapped label.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBox {
    pub id: NodeId,
    pub rect: Rect,
    /// CSS fill. Unparseable node colors fall back to the default color.
    pub fill: String,
    pub label_color: &'static str,
    pub lines: Vec<TextLine>,
    pub selected: bool,
}

/// One line of a label, centered on `anchor`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub anchor: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub id: ConnectionId,
    pub line: Line,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CursorMark {
    pub user_id: UserId,
    pub position: Point,
    pub color: &'static str,
}

/// Transient state drawn on top of the graph. Not part of the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    /// From the armed node's center to the pointer, in model space.
    pub rubber_band: Option<Line>,
    /// Visible remote cursors in model space.
    pub cursors: Vec<(UserId, Point)>,
}

/// Everything needed to draw one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderScene {
    /// Model → screen.
    pub transform: Affine,
    /// Edges draw below boxes.
    pub edges: Vec<Edge>,
    /// In creation order; later boxes draw on top.
    pub boxes: Vec<NodeBox>,
    pub rubber_band: Option<Line>,
    pub cursors: Vec<CursorMark>,
}

impl RenderScene {
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.edges.is_empty()
    }
}

/// Project the graph and overlay into a render scene.
pub fn build_scene(map: &MindMap, overlay: &Overlay) -> RenderScene {
    build_scene_with(map, overlay, &TextMetrics::default())
}

pub fn build_scene_with(map: &MindMap, overlay: &Overlay, metrics: &TextMetrics) -> RenderScene {
    let selection = map.selection();

    let edges = map
        .connections()
        .filter_map(|conn| {
            let Some(line) = map.connection_segment(conn) else {
                log::trace!("connection {} skipped: no drawable segment", conn.id);
                return None;
            };
            Some(Edge {
                id: conn.id,
                line,
                selected: selection.connection() == Some(conn.id),
            })
        })
        .collect();

    let boxes = map
        .nodes()
        .map(|node| {
            let fill = node.fill();
            NodeBox {
                id: node.id,
                rect: node.rect(),
                fill: fill.to_css(),
                label_color: label_color(fill),
                lines: layout_label(metrics.wrap(&node.text), node.center(), metrics.line_height),
                selected: selection.node() == Some(node.id),
            }
        })
        .collect();

    let cursors = overlay
        .cursors
        .iter()
        .map(|(user_id, position)| CursorMark {
            user_id: *user_id,
            position: *position,
            color: cursor_color(*user_id),
        })
        .collect();

    RenderScene {
        transform: map.view().transform(),
        edges,
        boxes,
        rubber_band: overlay.rubber_band,
        cursors,
    }
}

/// Lines stacked around the box center.
fn layout_label(lines: Lines, center: Point, line_height: f64) -> Vec<TextLine> {
    let first = center.y - (lines.len().saturating_sub(1) as f64) * line_height / 2.0;
    lines
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextLine {
            text,
            anchor: Point::new(center.x, first + i as f64 * line_height),
        })
        .collect()
}

fn label_color(fill: Color) -> &'static str {
    if fill.luminance() > 0.5 { LABEL_DARK } else { LABEL_LIGHT }
}

/// Stable color per user within one process.
pub fn cursor_color(user_id: UserId) -> &'static str {
    let hash = user_id
        .as_str()
        .bytes()
        .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
    CURSOR_PALETTE[hash as usize % CURSOR_PALETTE.len()]
}
