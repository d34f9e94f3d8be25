//! Hit testing: model-space point → node or connection.
//!
//! Nodes are checked in insertion order and the first box containing the
//! point wins, so when boxes overlap the earliest-created node is picked.
//! Selection and drawing order play no part.

use crate::geometry;
use crate::id::NodeId;
use crate::model::{Connection, Node};
use indexmap::IndexMap;
use kurbo::{Line, Point};

/// Default pick distance for connections, in model units.
pub const CONNECTION_TOLERANCE: f64 = 5.0;

/// First node (in iteration order) whose box contains `p`.
pub fn node_at<'a>(nodes: impl IntoIterator<Item = &'a Node>, p: Point) -> Option<&'a Node> {
    nodes.into_iter().find(|n| n.contains(p))
}

/// The edge-trimmed segment of a connection, or `None` if an endpoint is
/// missing or both centers coincide.
pub fn connection_segment(nodes: &IndexMap<NodeId, Node>, conn: &Connection) -> Option<Line> {
    let from = nodes.get(&conn.from_id)?;
    let to = nodes.get(&conn.to_id)?;
    geometry::trimmed_segment(from.center(), from.size(), to.center(), to.size())
}

/// First connection whose trimmed segment lies within `tolerance` of `p`.
pub fn connection_at<'a>(
    nodes: &IndexMap<NodeId, Node>,
    connections: impl IntoIterator<Item = &'a Connection>,
    p: Point,
    tolerance: f64,
) -> Option<&'a Connection> {
    connections.into_iter().find(|conn| {
        connection_segment(nodes, conn)
            .is_some_and(|seg| geometry::point_segment_distance(p, seg.p0, seg.p1) <= tolerance)
    })
}
