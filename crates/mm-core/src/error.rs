use crate::id::{ConnectionId, NodeId};
use thiserror::Error;

/// A snapshot that cannot be loaded. `MindMap::load_data` checks every
/// snapshot before touching the current graph, so on error the graph is
/// left exactly as it was.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("node {id} has a non-finite position ({x}, {y})")]
    InvalidPosition { id: NodeId, x: f64, y: f64 },
    #[error("node id {0} is out of range")]
    NodeIdOutOfRange(NodeId),
    #[error("connection id {0} is out of range")]
    ConnectionIdOutOfRange(ConnectionId),
    #[error("view has non-finite values (zoom {zoom}, pan {pan_x}, {pan_y})")]
    InvalidView { zoom: f64, pan_x: f64, pan_y: f64 },
}
