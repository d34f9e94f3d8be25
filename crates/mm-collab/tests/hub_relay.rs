//! Integration tests: relay hub rooms, permissions, and persistence.

use mm_collab::{
    ActiveUser, ChangeAction, ClientId, ClientMessage, Collaborator, CursorMove, GraphChange,
    GraphStore, Hub, JoinRoom, MemoryStore, Outbound, Permission, RoomTarget, ServerMessage,
    StoredGraph,
};
use mm_core::{Connection, ConnectionId, GraphData, Node, NodeId, UserId};
use pretty_assertions::assert_eq;

const GRAPH: u64 = 1;

fn user(name: &str) -> UserId {
    UserId::intern(name)
}

fn hub() -> Hub<MemoryStore> {
    let mut store = MemoryStore::new();
    store.insert(
        GRAPH,
        StoredGraph::new("Roadmap", GraphData::sample())
            .owned_by(user("olga"))
            .shared_as("roadmap")
            .grant(user("eddie"), Permission::Edit)
            .grant(user("vic"), Permission::View),
    );
    store.insert(2, StoredGraph::new("Private", GraphData::sample()).owned_by(user("olga")));
    Hub::new(store)
}

fn join(hub: &mut Hub<MemoryStore>, client: ClientId, name: &str, target: RoomTarget) -> Vec<Outbound> {
    let frame = ClientMessage::JoinRoom(JoinRoom::new(&target, user(name)))
        .to_json()
        .unwrap();
    hub.handle_frame(client, &frame, 0)
}

fn change_frame(claimed_user: &str, action: ChangeAction) -> String {
    ClientMessage::GraphChange(GraphChange {
        user_id: user(claimed_user),
        timestamp: 1,
        action,
    })
    .to_json()
    .unwrap()
}

fn to(out: &[Outbound], client: ClientId) -> Vec<ServerMessage> {
    out.iter()
        .filter(|o| o.to == client)
        .map(|o| o.message.clone())
        .collect()
}

fn new_node(id: u64) -> ChangeAction {
    ChangeAction::NodeAdd {
        node: Node::new(NodeId(id), 900.0, 100.0, "relayed", "#e3f2fd"),
    }
}

// ─── Joining ─────────────────────────────────────────────────────────────

#[test]
fn joiner_gets_snapshot_and_others_are_told() {
    let mut hub = hub();
    let out = join(&mut hub, 10, "olga", RoomTarget::Graph(GRAPH));
    assert_eq!(
        to(&out, 10),
        vec![
            ServerMessage::GraphData {
                graph: GraphData::sample(),
                permission: Permission::Owner,
            },
            ServerMessage::ActiveUsers(vec![]),
        ]
    );

    let out = join(&mut hub, 11, "eddie", RoomTarget::ShareCode("roadmap".into()));
    let to_olga = to(&out, 10);
    assert!(matches!(
        &to_olga[..],
        [ServerMessage::UserJoined { user_id, collaborators }]
            if *user_id == user("eddie") && collaborators.len() == 2
    ));
    assert_eq!(
        to(&out, 11).last(),
        Some(&ServerMessage::ActiveUsers(vec![ActiveUser {
            user_id: user("olga"),
            permission: Permission::Owner,
        }]))
    );
    assert_eq!(hub.members(GRAPH), vec![user("olga"), user("eddie")]);
}

#[test]
fn join_failures_are_reported() {
    let mut hub = hub();
    let out = join(&mut hub, 1, "olga", RoomTarget::Graph(99));
    assert_eq!(to(&out, 1), vec![ServerMessage::error("Graph not found")]);

    let out = join(&mut hub, 1, "eddie", RoomTarget::Graph(2));
    assert_eq!(to(&out, 1), vec![ServerMessage::error("Access denied")]);
    assert_eq!(hub.room_count(), 0);
}

#[test]
fn rejected_users_are_never_interned() {
    let mut hub = hub();
    let denied = r#"{"type":"join_room","data":{"graphId":2,"userId":"gate-crasher-1"}}"#;
    assert_eq!(hub.handle_frame(1, denied, 0), vec![Outbound {
        to: 1,
        message: ServerMessage::error("Access denied"),
    }]);
    let missing = r#"{"type":"join_room","data":{"graphId":99,"userId":"gate-crasher-2"}}"#;
    hub.handle_frame(1, missing, 0);
    let stray = r#"{"type":"cursor_move","data":{"userId":"gate-crasher-3","x":1,"y":2,"timestamp":0}}"#;
    assert!(hub.handle_frame(1, stray, 0).is_empty());

    for name in ["gate-crasher-1", "gate-crasher-2", "gate-crasher-3"] {
        assert_eq!(UserId::lookup(name), None, "{name} was interned");
    }

    // A granted join does intern.
    let open = r#"{"type":"join_room","data":{"shareCode":"roadmap","userId":"olga"}}"#;
    hub.handle_frame(2, open, 0);
    assert_eq!(hub.members(GRAPH), vec![user("olga")]);
}

#[test]
fn malformed_frames_get_an_error() {
    let mut hub = hub();
    let out = hub.handle_frame(3, "{\"type\":", 0);
    assert_eq!(out, vec![Outbound {
        to: 3,
        message: ServerMessage::error("Invalid message format"),
    }]);
}

// ─── Changes ─────────────────────────────────────────────────────────────

#[test]
fn changes_are_applied_persisted_and_relayed() {
    let mut hub = hub();
    join(&mut hub, 10, "olga", RoomTarget::Graph(GRAPH));
    join(&mut hub, 11, "eddie", RoomTarget::Graph(GRAPH));

    // The claimed user id is replaced by the sender's.
    let out = hub.handle_frame(11, &change_frame("mallory", new_node(50)), 9_999);
    assert_eq!(
        out,
        vec![Outbound {
            to: 10,
            message: ServerMessage::GraphChange(GraphChange {
                user_id: user("eddie"),
                timestamp: 9_999,
                action: new_node(50),
            }),
        }]
    );

    assert!(hub.graph(GRAPH).unwrap().node(NodeId(50)).is_some());
    let stored = &hub.store().graph(GRAPH).unwrap().data;
    assert!(stored.node(NodeId(50)).is_some());
}

/// Counts saves so tests can tell a skipped save from a no-op one.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    saves: usize,
}

impl GraphStore for CountingStore {
    fn resolve(&self, target: &RoomTarget) -> Option<u64> {
        self.inner.resolve(target)
    }

    fn load(&self, graph_id: u64) -> Option<GraphData> {
        self.inner.load(graph_id)
    }

    fn access(&self, graph_id: u64, user_id: &str) -> Option<Permission> {
        self.inner.access(graph_id, user_id)
    }

    fn save(&mut self, graph_id: u64, data: GraphData) {
        self.saves += 1;
        self.inner.save(graph_id, data);
    }

    fn collaborators(&self, graph_id: u64) -> Vec<Collaborator> {
        self.inner.collaborators(graph_id)
    }
}

#[test]
fn refused_changes_are_neither_saved_nor_relayed() {
    let mut store = CountingStore::default();
    store
        .inner
        .insert(GRAPH, StoredGraph::new("Roadmap", GraphData::sample()).open_to_all(Permission::Edit));
    let mut hub = Hub::new(store);
    for (client, name) in [(10, "olga"), (11, "eddie")] {
        let frame = ClientMessage::JoinRoom(JoinRoom::new(&RoomTarget::Graph(GRAPH), user(name)))
            .to_json()
            .unwrap();
        hub.handle_frame(client, &frame, 0);
    }

    let refused = [
        ChangeAction::NodeDelete { node_id: NodeId(404) },
        ChangeAction::ConnectionDelete {
            connection_id: ConnectionId(404),
        },
        // Nodes 1 and 2 are already connected by connection 1.
        ChangeAction::ConnectionAdd {
            connection: Connection::new(ConnectionId(9), NodeId(2), NodeId(1)),
        },
        ChangeAction::NodeAdd {
            node: Node::new(NodeId(u64::MAX), 0.0, 0.0, "overflow", "#fff"),
        },
    ];
    for action in refused {
        let name = action.name();
        assert!(
            hub.handle_frame(11, &change_frame("eddie", action), 0).is_empty(),
            "{name} was relayed"
        );
    }
    assert_eq!(hub.store().saves, 0);
    assert_eq!(hub.graph(GRAPH).unwrap().get_data(), GraphData::sample());

    assert_eq!(hub.handle_frame(11, &change_frame("eddie", new_node(50)), 0).len(), 1);
    assert_eq!(hub.store().saves, 1);
}

#[test]
fn view_only_members_cannot_change_the_graph() {
    let mut hub = hub();
    join(&mut hub, 10, "olga", RoomTarget::Graph(GRAPH));
    join(&mut hub, 12, "vic", RoomTarget::Graph(GRAPH));

    let out = hub.handle_frame(12, &change_frame("vic", new_node(60)), 0);
    assert_eq!(out, vec![Outbound {
        to: 12,
        message: ServerMessage::error("No edit permission"),
    }]);
    assert!(hub.graph(GRAPH).unwrap().node(NodeId(60)).is_none());
}

#[test]
fn frames_outside_a_room_are_ignored() {
    let mut hub = hub();
    assert!(hub.handle_frame(5, &change_frame("olga", new_node(70)), 0).is_empty());
    assert!(hub.handle_frame(5, r#"{"type":"leave_room"}"#, 0).is_empty());
}

#[test]
fn cursor_moves_are_stamped_and_relayed_to_others() {
    let mut hub = hub();
    join(&mut hub, 10, "olga", RoomTarget::Graph(GRAPH));
    join(&mut hub, 11, "eddie", RoomTarget::Graph(GRAPH));

    let frame = ClientMessage::CursorMove(CursorMove {
        user_id: user("nobody"),
        x: 3.0,
        y: 4.0,
        timestamp: 0,
    })
    .to_json()
    .unwrap();
    let out = hub.handle_frame(10, &frame, 123);
    assert_eq!(
        out,
        vec![Outbound {
            to: 11,
            message: ServerMessage::CursorMove(CursorMove {
                user_id: user("olga"),
                x: 3.0,
                y: 4.0,
                timestamp: 123,
            }),
        }]
    );
}

// ─── Leaving ─────────────────────────────────────────────────────────────

#[test]
fn leaving_notifies_and_last_leave_closes_room() {
    let mut hub = hub();
    join(&mut hub, 10, "olga", RoomTarget::Graph(GRAPH));
    join(&mut hub, 11, "eddie", RoomTarget::Graph(GRAPH));
    hub.handle_frame(11, &change_frame("eddie", new_node(80)), 0);

    let out = hub.disconnect(11);
    assert_eq!(
        to(&out, 10),
        vec![ServerMessage::UserLeft {
            user_id: user("eddie")
        }]
    );

    let out = hub.handle_frame(10, r#"{"type":"leave_room"}"#, 0);
    assert!(out.is_empty());
    assert_eq!(hub.room_count(), 0);

    // Reopening the room starts from the persisted graph.
    let out = join(&mut hub, 20, "olga", RoomTarget::Graph(GRAPH));
    match &to(&out, 20)[0] {
        ServerMessage::GraphData { graph, .. } => assert!(graph.node(NodeId(80)).is_some()),
        other => panic!("expected graph_data, got {other:?}"),
    }
}
