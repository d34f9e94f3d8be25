//! Core data model for mind maps.
//!
//! A mind map is an undirected graph of text boxes (`Node`) joined by
//! `Connection`s. Node positions are box centers in model space; box sizes
//! are derived from the node text by `text::measure`.

use crate::geometry;
use crate::id::{ConnectionId, NodeId};
use crate::text;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Fill of a node created without an explicit color.
pub const DEFAULT_NODE_COLOR: &str = "#e3f2fd";
/// Label of a node created without explicit text.
pub const DEFAULT_NODE_TEXT: &str = "New Node";
/// Label of the root node every empty graph is seeded with.
pub const ROOT_NODE_TEXT: &str = "Central Idea";
pub const ROOT_NODE_COLOR: &str = "#ffeb3b";
/// Default center of the canvas, used for the root node and for new nodes
/// when nothing is selected.
pub const DEFAULT_CENTER: (f64, f64) = (400.0, 300.0);
/// Horizontal offset of a new node placed next to the selected one.
pub const CHILD_OFFSET_X: f64 = 150.0;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a hex color string: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`.
    /// The string may optionally start with `#`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();

        let nibble = |i: usize| hex_val(bytes[i]).map(|v| v * 17);
        let byte = |i: usize| Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?);

        let (r, g, b, a) = match bytes.len() {
            3 => (nibble(0)?, nibble(1)?, nibble(2)?, 255),
            4 => (nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?),
            6 => (byte(0)?, byte(2)?, byte(4)?, 255),
            8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
            _ => return None,
        };
        Some(Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        ))
    }

    /// Emit as `#rrggbb`, or `#rrggbbaa` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    /// CSS `rgba(...)` string for canvas fill styles.
    pub fn to_css(&self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("rgba({r}, {g}, {b}, {})", self.a)
    }

    /// Perceived brightness in [0, 1], used to pick a readable label color.
    pub fn luminance(&self) -> f32 {
        0.299 * self.r + 0.587 * self.g + 0.114 * self.b
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A text box in the mind map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Center x in model space.
    pub x: f64,
    /// Center y in model space.
    pub y: f64,
    #[serde(default)]
    pub text: String,
    /// Hex fill color, e.g. `#e3f2fd`.
    #[serde(default = "default_color")]
    pub color: String,
    /// Missing or non-positive sizes are recomputed from `text` on insert.
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

fn default_color() -> String {
    DEFAULT_NODE_COLOR.to_string()
}

impl Node {
    /// Create a node sized to fit its text.
    pub fn new(id: NodeId, x: f64, y: f64, text: impl Into<String>, color: impl Into<String>) -> Self {
        let text = text.into();
        let (width, height) = text::measure(&text);
        Self {
            id,
            x,
            y,
            text,
            color: color.into(),
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn rect(&self) -> Rect {
        geometry::node_rect(self.center(), self.width, self.height)
    }

    /// Inclusive point-in-box test in model space.
    pub fn contains(&self, p: Point) -> bool {
        geometry::rect_contains(&self.rect(), p)
    }

    pub fn has_valid_size(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Recompute width/height from the current text.
    pub fn fit_to_text(&mut self) {
        let (w, h) = text::measure(&self.text);
        self.width = w;
        self.height = h;
    }

    /// Parsed fill color, falling back to the default node color.
    pub fn fill(&self) -> Color {
        Color::from_hex(&self.color)
            .or_else(|| Color::from_hex(DEFAULT_NODE_COLOR))
            .unwrap_or(Color::rgba(0.89, 0.95, 0.99, 1.0))
    }
}

/// Partial update of a node. `None` fields are left untouched.
///
/// Width and height are not part of the patch: they follow the text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl NodePatch {
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.text.is_none() && self.color.is_none()
    }

    /// Apply onto `node`. Returns `true` if the text changed (size must be
    /// recomputed).
    pub(crate) fn apply_to(&self, node: &mut Node) -> bool {
        if let Some(x) = self.x.filter(|v| v.is_finite()) {
            node.x = x;
        }
        if let Some(y) = self.y.filter(|v| v.is_finite()) {
            node.y = y;
        }
        if let Some(color) = &self.color {
            node.color.clone_from(color);
        }
        match &self.text {
            Some(text) => {
                node.text.clone_from(text);
                true
            }
            None => false,
        }
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// An undirected edge between two nodes. `fromId`/`toId` only record the
/// direction it was drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from_id: NodeId,
    pub to_id: NodeId,
}

impl Connection {
    pub fn new(id: ConnectionId, from_id: NodeId, to_id: NodeId) -> Self {
        Self { id, from_id, to_id }
    }

    /// Whether this connection joins the unordered pair `{a, b}`.
    pub fn joins(&self, a: NodeId, b: NodeId) -> bool {
        (self.from_id == a && self.to_id == b) || (self.from_id == b && self.to_id == a)
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.from_id == node || self.to_id == node
    }
}

// ─── Selection ───────────────────────────────────────────────────────────

/// Current selection. A node and a connection are never selected together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Connection(ConnectionId),
}

impl Selection {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Selection::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn connection(&self) -> Option<ConnectionId> {
        match self {
            Selection::Connection(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6c5ce7");

        let c2 = Color::from_hex("#FF000080").unwrap();
        assert!((c2.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(c2.to_hex().len(), 9);

        let short = Color::from_hex("fff").unwrap();
        assert_eq!(short.to_rgba8(), [255, 255, 255, 255]);
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#gggggg").is_none());
    }

    #[test]
    fn unparseable_color_falls_back_to_default_fill() {
        let node = Node::new(NodeId(1), 0.0, 0.0, "x", "not-a-color");
        assert_eq!(node.fill(), Color::from_hex(DEFAULT_NODE_COLOR).unwrap());
        assert_eq!(node.color, "not-a-color");
    }

    #[test]
    fn node_box_is_centered() {
        let node = Node::new(NodeId(1), 100.0, 50.0, "hi", DEFAULT_NODE_COLOR);
        assert!(node.contains(Point::new(40.0, 20.0)));
        assert!(!node.contains(Point::new(39.0, 20.0)));
    }

    #[test]
    fn patch_reports_text_change() {
        let mut node = Node::new(NodeId(1), 0.0, 0.0, "a", DEFAULT_NODE_COLOR);
        assert!(!NodePatch::position(3.0, 4.0).apply_to(&mut node));
        assert_eq!((node.x, node.y), (3.0, 4.0));
        assert!(NodePatch::text("b").apply_to(&mut node));
        assert_eq!(node.text, "b");
    }

    #[test]
    fn connection_pairs_are_unordered() {
        let c = Connection::new(ConnectionId(1), NodeId(1), NodeId(2));
        assert!(c.joins(NodeId(2), NodeId(1)));
        assert!(!c.joins(NodeId(1), NodeId(3)));
    }

    #[test]
    fn selection_serializes_with_kind_tag() {
        let json = serde_json::to_string(&Selection::Node(NodeId(4))).unwrap();
        assert_eq!(json, r#"{"kind":"node","id":4}"#);
    }
}
