//! Server-side relay: rooms keyed by graph id.
//!
//! The hub is transport-agnostic. The host assigns each socket a
//! `ClientId`, feeds frames to `handle_frame`, calls `disconnect` when the
//! socket goes away, and delivers the returned `Outbound` messages.
//!
//! Every room keeps an authoritative `MindMap`. Changes are replayed onto
//! it with the same routine clients use, persisted through the store, and
//! relayed to the other members with the sender's id and server time.
//!
//! Frames are decoded into hub-local request types that keep the user id
//! as a plain string: ids are interned only once a join is granted, so
//! untrusted clients cannot grow the interner.

use crate::apply::apply_change;
use crate::protocol::{
    ActiveUser, ChangeAction, CursorMove, GraphChange, Permission, RoomTarget, ServerMessage,
    UserActivity,
};
use crate::store::GraphStore;
use indexmap::IndexMap;
use mm_core::{MindMap, NodeId, UserId};
use serde::Deserialize;
use std::collections::HashMap;

pub type ClientId = u64;

/// A message for one client.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: ClientId,
    pub message: ServerMessage,
}

impl Outbound {
    fn new(to: ClientId, message: ServerMessage) -> Self {
        Self { to, message }
    }
}

/// A client frame as the hub reads it. Same envelope as `ClientMessage`;
/// sender ids inside change and presence payloads are ignored in favour
/// of the id granted at join.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
enum Request {
    JoinRoom(JoinRequest),
    LeaveRoom,
    GraphChange(ChangeRequest),
    CursorMove(CursorRequest),
    UserActivity(ActivityRequest),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRequest {
    #[serde(default)]
    graph_id: Option<u64>,
    #[serde(default)]
    share_code: Option<String>,
    user_id: String,
}

impl JoinRequest {
    /// Graph id wins over share code.
    fn target(&self) -> Option<RoomTarget> {
        match (self.graph_id, &self.share_code) {
            (Some(id), _) => Some(RoomTarget::Graph(id)),
            (None, Some(code)) => Some(RoomTarget::ShareCode(code.clone())),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChangeRequest {
    #[serde(flatten)]
    action: ChangeAction,
}

#[derive(Debug, Deserialize)]
struct CursorRequest {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityRequest {
    activity: String,
    #[serde(default)]
    node_id: Option<NodeId>,
}

#[derive(Debug, Clone, Copy)]
struct Member {
    user_id: UserId,
    graph_id: u64,
    permission: Permission,
}

struct Room {
    graph: MindMap,
    /// Members in join order.
    clients: IndexMap<ClientId, UserId>,
}

impl Room {
    fn others(&self, except: ClientId) -> impl Iterator<Item = ClientId> + '_ {
        self.clients.keys().copied().filter(move |c| *c != except)
    }
}

pub struct Hub<S: GraphStore> {
    store: S,
    rooms: HashMap<u64, Room>,
    members: HashMap<ClientId, Member>,
}

impl<S: GraphStore> Hub<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            rooms: HashMap::new(),
            members: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// The live graph of an open room.
    pub fn graph(&self, graph_id: u64) -> Option<&MindMap> {
        self.rooms.get(&graph_id).map(|r| &r.graph)
    }

    pub fn members(&self, graph_id: u64) -> Vec<UserId> {
        self.rooms
            .get(&graph_id)
            .map(|r| r.clients.values().copied().collect())
            .unwrap_or_default()
    }

    /// Handle one text frame from `client`.
    pub fn handle_frame(&mut self, client: ClientId, text: &str, now_ms: u64) -> Vec<Outbound> {
        let request = match serde_json::from_str::<Request>(text) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("client {client}: malformed frame: {e}");
                return vec![Outbound::new(client, ServerMessage::error("Invalid message format"))];
            }
        };
        match request {
            Request::JoinRoom(join) => self.join(client, join),
            Request::LeaveRoom => self.leave(client),
            Request::GraphChange(change) => self.relay_change(client, change.action, now_ms),
            Request::CursorMove(m) => self.relay(client, |user_id| {
                ServerMessage::CursorMove(CursorMove {
                    user_id,
                    x: m.x,
                    y: m.y,
                    timestamp: now_ms,
                })
            }),
            Request::UserActivity(a) => self.relay(client, |user_id| {
                ServerMessage::UserActivity(UserActivity {
                    user_id,
                    activity: a.activity,
                    node_id: a.node_id,
                    timestamp: now_ms,
                })
            }),
        }
    }

    /// The client's socket closed.
    pub fn disconnect(&mut self, client: ClientId) -> Vec<Outbound> {
        self.leave(client)
    }

    fn join(&mut self, client: ClientId, join: JoinRequest) -> Vec<Outbound> {
        let reply = |m| vec![Outbound::new(client, m)];
        let Some(graph_id) = join.target().and_then(|t| self.store.resolve(&t)) else {
            return reply(ServerMessage::error("Graph not found"));
        };
        let Some(permission) = self.store.access(graph_id, &join.user_id) else {
            log::info!("user {} denied access to graph {graph_id}", join.user_id);
            return reply(ServerMessage::error("Access denied"));
        };

        // Re-joining (or switching rooms) leaves the previous room first.
        let mut out = self.leave(client);

        if !self.rooms.contains_key(&graph_id) {
            let Some(data) = self.store.load(graph_id) else {
                out.push(Outbound::new(client, ServerMessage::error("Graph not found")));
                return out;
            };
            let mut graph = MindMap::new();
            if let Err(e) = graph.load_data(&data) {
                log::warn!("stored graph {graph_id} is invalid: {e}");
                out.push(Outbound::new(client, ServerMessage::error("Failed to join room")));
                return out;
            }
            self.rooms.insert(
                graph_id,
                Room {
                    graph,
                    clients: IndexMap::new(),
                },
            );
        }
        let Some(room) = self.rooms.get_mut(&graph_id) else {
            return out;
        };

        let user_id = UserId::intern(&join.user_id);
        room.clients.insert(client, user_id);
        self.members.insert(
            client,
            Member {
                user_id,
                graph_id,
                permission,
            },
        );

        out.push(Outbound::new(
            client,
            ServerMessage::GraphData {
                graph: room.graph.get_data(),
                permission,
            },
        ));
        let collaborators = self.store.collaborators(graph_id);
        for other in room.others(client) {
            out.push(Outbound::new(
                other,
                ServerMessage::UserJoined {
                    user_id,
                    collaborators: collaborators.clone(),
                },
            ));
        }
        let active = room
            .others(client)
            .filter_map(|c| self.members.get(&c))
            .filter(|m| m.user_id != user_id)
            .map(|m| ActiveUser {
                user_id: m.user_id,
                permission: m.permission,
            })
            .collect();
        out.push(Outbound::new(client, ServerMessage::ActiveUsers(active)));

        log::info!("user {user_id} joined graph {graph_id} as {}", permission.as_str());
        out
    }

    fn leave(&mut self, client: ClientId) -> Vec<Outbound> {
        let Some(member) = self.members.remove(&client) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&member.graph_id) else {
            return Vec::new();
        };
        room.clients.shift_remove(&client);
        log::info!("user {} left graph {}", member.user_id, member.graph_id);

        if room.clients.is_empty() {
            if let Some(room) = self.rooms.remove(&member.graph_id) {
                self.store.save(member.graph_id, room.graph.get_data());
            }
            return Vec::new();
        }
        room.clients
            .keys()
            .map(|c| {
                Outbound::new(
                    *c,
                    ServerMessage::UserLeft {
                        user_id: member.user_id,
                    },
                )
            })
            .collect()
    }

    fn relay_change(&mut self, client: ClientId, action: ChangeAction, now_ms: u64) -> Vec<Outbound> {
        let Some(member) = self.members.get(&client).copied() else {
            log::warn!("client {client} sent a change outside any room");
            return Vec::new();
        };
        if !member.permission.can_edit() {
            return vec![Outbound::new(client, ServerMessage::error("No edit permission"))];
        }
        let Some(room) = self.rooms.get_mut(&member.graph_id) else {
            return Vec::new();
        };

        if !apply_change(&mut room.graph, &action) {
            log::debug!(
                "graph {}: {} by {} had no effect, not relayed",
                member.graph_id,
                action.name(),
                member.user_id
            );
            return Vec::new();
        }
        self.store.save(member.graph_id, room.graph.get_data());
        log::debug!(
            "graph {}: {} by {}",
            member.graph_id,
            action.name(),
            member.user_id
        );

        let relayed = ServerMessage::GraphChange(GraphChange {
            user_id: member.user_id,
            timestamp: now_ms,
            action,
        });
        room.others(client)
            .map(|c| Outbound::new(c, relayed.clone()))
            .collect()
    }

    /// Send a presence message to everyone else in the sender's room.
    fn relay(&self, client: ClientId, build: impl FnOnce(UserId) -> ServerMessage) -> Vec<Outbound> {
        let Some(member) = self.members.get(&client) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get(&member.graph_id) else {
            return Vec::new();
        };
        let message = build(member.user_id);
        room.others(client)
            .map(|c| Outbound::new(c, message.clone()))
            .collect()
    }
}
