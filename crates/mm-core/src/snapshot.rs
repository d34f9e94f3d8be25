//! Full graph snapshots: JSON for the wire, MessagePack for autosave.

use crate::id::{ConnectionId, NodeId};
use crate::model::{Connection, Node, ROOT_NODE_COLOR, ROOT_NODE_TEXT};
use crate::viewport::ViewState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid JSON snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not encode MessagePack snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("invalid MessagePack snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Everything needed to rebuild a graph. Produced by `MindMap::get_data`,
/// consumed by `MindMap::load_data`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default)]
    pub view: ViewState,
}

impl GraphData {
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Compact binary encoding (named fields, so older readers tolerate
    /// added fields).
    pub fn to_msgpack(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, SnapshotError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Small starter map: a root idea with two branches.
    pub fn sample() -> Self {
        let root = Node::new(NodeId(1), 400.0, 300.0, ROOT_NODE_TEXT, ROOT_NODE_COLOR);
        let left = Node::new(NodeId(2), 200.0, 200.0, "Research", "#c8e6c9");
        let right = Node::new(NodeId(3), 600.0, 200.0, "Ideas\nand notes", "#ffccbc");
        Self {
            nodes: vec![root, left, right],
            connections: vec![
                Connection::new(ConnectionId(1), NodeId(1), NodeId(2)),
                Connection::new(ConnectionId(2), NodeId(1), NodeId(3)),
            ],
            view: ViewState::default(),
        }
    }
}
