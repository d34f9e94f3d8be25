//! Persisted mind-map file: `<mindmap version="1.0">` XML.
//!
//! ```xml
//! <mindmap version="1.0" created="2025-01-01T00:00:00.000Z">
//!   <view zoom="1" panX="0" panY="0"/>
//!   <nodes>
//!     <node id="1" x="400" y="300" width="120" height="60" color="#ffeb3b">
//!       <text>Central Idea</text>
//!     </node>
//!   </nodes>
//!   <connections>
//!     <connection id="1" fromId="1" toId="2"/>
//!   </connections>
//! </mindmap>
//! ```

use crate::error::GraphError;
use crate::graph::MindMap;
use crate::id::{ConnectionId, NodeId};
use crate::model::{Connection, DEFAULT_CENTER, DEFAULT_NODE_COLOR, Node, ROOT_NODE_COLOR, ROOT_NODE_TEXT};
use crate::snapshot::GraphData;
use crate::viewport::ViewState;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;
use std::fmt::Write;
use thiserror::Error;

pub const FORMAT_VERSION: &str = "1.0";
const ROOT_TAG: &str = "mindmap";

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element must be <mindmap>, found <{0}>")]
    WrongRoot(String),
    #[error("node #{index}: missing or invalid `{attr}`")]
    InvalidNode { index: usize, attr: &'static str },
    #[error("connection #{index}: missing or invalid `{attr}`")]
    InvalidConnection { index: usize, attr: &'static str },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

// ─── Reading ─────────────────────────────────────────────────────────────

/// Parse a mind-map document into a snapshot.
///
/// Missing sizes are measured from the text, a missing color becomes the
/// default node color, and connections whose endpoints are not among the
/// parsed nodes are skipped. A document without nodes gets the root node.
pub fn from_xml(source: &str) -> Result<GraphData, FormatError> {
    let doc = roxmltree::Document::parse(source)?;
    let root = doc.root_element();
    if root.tag_name().name() != ROOT_TAG {
        return Err(FormatError::WrongRoot(root.tag_name().name().to_string()));
    }

    let mut data = GraphData::default();

    if let Some(view) = child(root, "view") {
        let attr = |name: &str, default: f64| {
            view.attribute(name)
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v != 0.0)
                .unwrap_or(default)
        };
        data.view = ViewState {
            zoom: attr("zoom", 1.0),
            pan_x: attr("panX", 0.0),
            pan_y: attr("panY", 0.0),
        };
    }

    if let Some(nodes) = child(root, "nodes") {
        for (index, el) in elements(nodes, "node").enumerate() {
            data.nodes.push(read_node(el, index)?);
        }
    }

    if let Some(conns) = child(root, "connections") {
        let known: HashSet<NodeId> = data.nodes.iter().map(|n| n.id).collect();
        for (index, el) in elements(conns, "connection").enumerate() {
            let conn = read_connection(el, index)?;
            if !known.contains(&conn.from_id) || !known.contains(&conn.to_id) {
                log::warn!("connection {} references missing nodes, skipping", conn.id);
                continue;
            }
            data.connections.push(conn);
        }
    }

    if data.nodes.is_empty() {
        let (x, y) = DEFAULT_CENTER;
        data.nodes.push(Node::new(NodeId(1), x, y, ROOT_NODE_TEXT, ROOT_NODE_COLOR));
    }
    Ok(data)
}

fn read_node(el: roxmltree::Node<'_, '_>, index: usize) -> Result<Node, FormatError> {
    let invalid = |attr| FormatError::InvalidNode { index, attr };
    let id = parse_attr::<u64>(el, "id")
        .map(NodeId)
        .filter(|id| id.next().is_some())
        .ok_or_else(|| invalid("id"))?;
    let x = parse_attr::<f64>(el, "x").filter(|v| v.is_finite()).ok_or_else(|| invalid("x"))?;
    let y = parse_attr::<f64>(el, "y").filter(|v| v.is_finite()).ok_or_else(|| invalid("y"))?;

    let text: String = child(el, "text")
        .map(|t| t.descendants().filter(|n| n.is_text()).filter_map(|n| n.text()).collect())
        .unwrap_or_default();
    let color = el.attribute("color").filter(|c| !c.is_empty()).unwrap_or(DEFAULT_NODE_COLOR);

    let mut node = Node::new(id, x, y, text, color);
    let width = parse_attr::<f64>(el, "width");
    let height = parse_attr::<f64>(el, "height");
    if let (Some(w), Some(h)) = (width, height)
        && w.is_finite()
        && h.is_finite()
        && w > 0.0
        && h > 0.0
    {
        node.width = w;
        node.height = h;
    }
    Ok(node)
}

fn read_connection(el: roxmltree::Node<'_, '_>, index: usize) -> Result<Connection, FormatError> {
    let invalid = |attr| FormatError::InvalidConnection { index, attr };
    let id = parse_attr::<u64>(el, "id")
        .map(ConnectionId)
        .filter(|id| id.next().is_some())
        .ok_or_else(|| invalid("id"))?;
    let from = parse_attr::<u64>(el, "fromId").ok_or_else(|| invalid("fromId"))?;
    let to = parse_attr::<u64>(el, "toId").ok_or_else(|| invalid("toId"))?;
    Ok(Connection::new(id, NodeId(from), NodeId(to)))
}

fn parse_attr<T: std::str::FromStr>(el: roxmltree::Node<'_, '_>, name: &str) -> Option<T> {
    el.attribute(name)?.trim().parse().ok()
}

fn child<'a, 'i>(el: roxmltree::Node<'a, 'i>, name: &str) -> Option<roxmltree::Node<'a, 'i>> {
    el.children().find(|c| c.is_element() && c.tag_name().name() == name)
}

fn elements<'a, 'i: 'a>(
    el: roxmltree::Node<'a, 'i>,
    name: &'a str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'i>> + 'a {
    el.children().filter(move |c| c.is_element() && c.tag_name().name() == name)
}

// ─── Writing ─────────────────────────────────────────────────────────────

/// Serialize a snapshot, stamped with the current time.
#[must_use]
pub fn to_xml(data: &GraphData) -> String {
    to_xml_at(data, Utc::now())
}

/// Serialize a snapshot with an explicit creation time.
#[must_use]
pub fn to_xml_at(data: &GraphData, created: DateTime<Utc>) -> String {
    let mut out = String::with_capacity(256 + data.nodes.len() * 160);
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<{ROOT_TAG} version=\"{FORMAT_VERSION}\" created=\"{}\">",
        created.to_rfc3339_opts(SecondsFormat::Millis, true)
    );

    let v = data.view;
    indent(&mut out, 1);
    let _ = writeln!(out, "<view zoom=\"{}\" panX=\"{}\" panY=\"{}\"/>", v.zoom, v.pan_x, v.pan_y);

    if !data.nodes.is_empty() {
        indent(&mut out, 1);
        out.push_str("<nodes>\n");
        for node in &data.nodes {
            emit_node(&mut out, node);
        }
        indent(&mut out, 1);
        out.push_str("</nodes>\n");
    }

    if !data.connections.is_empty() {
        indent(&mut out, 1);
        out.push_str("<connections>\n");
        for conn in &data.connections {
            indent(&mut out, 2);
            let _ = writeln!(
                out,
                "<connection id=\"{}\" fromId=\"{}\" toId=\"{}\"/>",
                conn.id, conn.from_id, conn.to_id
            );
        }
        indent(&mut out, 1);
        out.push_str("</connections>\n");
    }

    let _ = writeln!(out, "</{ROOT_TAG}>");
    out
}

fn emit_node(out: &mut String, node: &Node) {
    indent(out, 2);
    let _ = writeln!(
        out,
        "<node id=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" color=\"{}\">",
        node.id,
        node.x,
        node.y,
        node.width,
        node.height,
        escape(&node.color, true)
    );
    indent(out, 3);
    let _ = writeln!(out, "<text>{}</text>", escape(&node.text, false));
    indent(out, 2);
    out.push_str("</node>\n");
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

/// Escape markup characters and the whitespace a parser would normalize.
/// Characters XML 1.0 cannot carry at all are dropped. Newlines only need
/// a reference inside attribute values.
fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => out.push_str("&#xD;"),
            '\t' => out.push_str("&#x9;"),
            '\n' if attribute => out.push_str("&#xA;"),
            '\n' => out.push('\n'),
            c if !is_xml_char(c) => log::debug!("dropping U+{:04X}, not representable in XML", c as u32),
            c => out.push(c),
        }
    }
    out
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

// ─── Graph convenience ───────────────────────────────────────────────────

impl MindMap {
    /// Replace the graph with a parsed document. Nothing changes on error.
    pub fn load_xml(&mut self, source: &str) -> Result<(), FormatError> {
        let data = from_xml(source)?;
        self.load_data(&data)?;
        Ok(())
    }

    pub fn to_xml(&self) -> String {
        to_xml(&self.get_data())
    }
}
