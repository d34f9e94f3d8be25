//! Wire protocol: JSON envelopes `{ "type": ..., "data": ... }`.
//!
//! Clients send `ClientMessage`s, the relay answers with `ServerMessage`s.
//! `graph_change`, `cursor_move` and `user_activity` travel both ways with
//! the same payload.

use crate::error::CollabError;
use mm_core::{Connection, ConnectionId, GraphData, GraphEvent, Node, NodeId, NodePatch, UserId};
use serde::{Deserialize, Serialize};

// ─── Shared types ────────────────────────────────────────────────────────

/// Access level of a participant in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Owner,
    Edit,
    View,
}

impl Permission {
    pub fn can_edit(self) -> bool {
        !matches!(self, Permission::View)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Owner => "owner",
            Permission::Edit => "edit",
            Permission::View => "view",
        }
    }
}

impl std::str::FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Permission::Owner),
            "edit" => Ok(Permission::Edit),
            "view" => Ok(Permission::View),
            other => Err(format!("unknown permission `{other}`")),
        }
    }
}

/// Which room to join: a graph id, or a share code resolving to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomTarget {
    Graph(u64),
    ShareCode(String),
}

/// One structural edit, keyed by the ids it touches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ChangeAction {
    NodeAdd { node: Node },
    NodeUpdate { node_id: NodeId, updates: NodePatch },
    NodeDelete { node_id: NodeId },
    ConnectionAdd { connection: Connection },
    ConnectionDelete { connection_id: ConnectionId },
}

impl ChangeAction {
    /// The wire action for a structural graph event, if it has one.
    pub fn from_event(event: &GraphEvent) -> Option<Self> {
        Some(match event {
            GraphEvent::NodeAdded(node) => ChangeAction::NodeAdd { node: node.clone() },
            GraphEvent::NodeUpdated { node, patch } => ChangeAction::NodeUpdate {
                node_id: node.id,
                updates: patch.clone(),
            },
            GraphEvent::NodeDeleted { id } => ChangeAction::NodeDelete { node_id: *id },
            GraphEvent::ConnectionAdded(conn) => ChangeAction::ConnectionAdd { connection: *conn },
            GraphEvent::ConnectionDeleted(conn) => ChangeAction::ConnectionDelete { connection_id: conn.id },
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChangeAction::NodeAdd { .. } => "node_add",
            ChangeAction::NodeUpdate { .. } => "node_update",
            ChangeAction::NodeDelete { .. } => "node_delete",
            ChangeAction::ConnectionAdd { .. } => "connection_add",
            ChangeAction::ConnectionDelete { .. } => "connection_delete",
        }
    }
}

/// `graph_change` payload: `{ action, userId, timestamp, ...payload }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphChange {
    pub user_id: UserId,
    pub timestamp: u64,
    #[serde(flatten)]
    pub action: ChangeAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMove {
    pub user_id: UserId,
    pub x: f64,
    pub y: f64,
    pub timestamp: u64,
}

/// Ephemeral hint such as "editing" or "selecting".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub user_id: UserId,
    pub activity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub user_id: UserId,
    pub permission: Permission,
}

// ─── Client → server ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_code: Option<String>,
    pub user_id: UserId,
}

impl JoinRoom {
    pub fn new(target: &RoomTarget, user_id: UserId) -> Self {
        let (graph_id, share_code) = match target {
            RoomTarget::Graph(id) => (Some(*id), None),
            RoomTarget::ShareCode(code) => (None, Some(code.clone())),
        };
        Self {
            graph_id,
            share_code,
            user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    JoinRoom(JoinRoom),
    LeaveRoom,
    GraphChange(GraphChange),
    CursorMove(CursorMove),
    UserActivity(UserActivity),
}

// ─── Server → client ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveUser {
    pub user_id: UserId,
    pub permission: Permission,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Full snapshot, sent once to a joining client.
    GraphData { graph: GraphData, permission: Permission },
    UserJoined { user_id: UserId, collaborators: Vec<Collaborator> },
    UserLeft { user_id: UserId },
    ActiveUsers(Vec<ActiveUser>),
    GraphChange(GraphChange),
    CursorMove(CursorMove),
    UserActivity(UserActivity),
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

macro_rules! json_codec {
    ($ty:ty) => {
        impl $ty {
            pub fn to_json(&self) -> Result<String, CollabError> {
                serde_json::to_string(self).map_err(CollabError::Encode)
            }

            pub fn from_json(text: &str) -> Result<Self, CollabError> {
                serde_json::from_str(text).map_err(CollabError::Malformed)
            }
        }
    };
}

json_codec!(ClientMessage);
json_codec!(ServerMessage);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn graph_change_is_flat() {
        let msg = ClientMessage::GraphChange(GraphChange {
            user_id: UserId::intern("ana"),
            timestamp: 42,
            action: ChangeAction::NodeUpdate {
                node_id: NodeId(3),
                updates: NodePatch::position(10.0, 20.0),
            },
        });
        let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "graph_change",
                "data": {
                    "action": "node_update",
                    "userId": "ana",
                    "timestamp": 42,
                    "nodeId": 3,
                    "updates": { "x": 10.0, "y": 20.0 }
                }
            })
        );
        assert_eq!(ClientMessage::from_json(&value.to_string()).unwrap(), msg);
    }

    #[test]
    fn join_room_by_share_code() {
        let msg = ClientMessage::from_json(
            r#"{"type":"join_room","data":{"shareCode":"roadmap","userId":"bo"}}"#,
        )
        .unwrap();
        let ClientMessage::JoinRoom(join) = msg else {
            panic!("expected join_room");
        };
        assert_eq!(join.share_code.as_deref(), Some("roadmap"));
        assert_eq!(join.graph_id, None);
        assert_eq!(join.user_id.as_str(), "bo");
    }

    #[test]
    fn leave_room_has_no_payload() {
        assert_eq!(ClientMessage::LeaveRoom.to_json().unwrap(), r#"{"type":"leave_room"}"#);
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"leave_room"}"#).unwrap(),
            ClientMessage::LeaveRoom
        );
    }

    #[test]
    fn server_messages_use_camel_case_fields() {
        let json = ServerMessage::UserLeft {
            user_id: UserId::intern("cy"),
        }
        .to_json()
        .unwrap();
        assert_eq!(json, r#"{"type":"user_left","data":{"userId":"cy"}}"#);
        assert_eq!(
            ServerMessage::error("Access denied").to_json().unwrap(),
            r#"{"type":"error","data":{"message":"Access denied"}}"#
        );
    }

    #[test]
    fn unknown_types_are_malformed() {
        assert!(matches!(
            ServerMessage::from_json(r#"{"type":"teleport","data":{}}"#),
            Err(CollabError::Malformed(_))
        ));
    }

    #[test]
    fn only_structural_events_map_to_actions() {
        let node = Node::new(NodeId(1), 0.0, 0.0, "x", "#fff");
        assert!(ChangeAction::from_event(&GraphEvent::NodeAdded(node.clone())).is_some());
        assert!(ChangeAction::from_event(&GraphEvent::NodeSelected(Some(node))).is_none());
        assert!(ChangeAction::from_event(&GraphEvent::StatusUpdate("hi".into())).is_none());
    }
}
