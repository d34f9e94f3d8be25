//! Integration tests: connect gesture, permission gating, and the
//! local-change broadcast bridge.

use mm_collab::{
    ChangeAction, ClientMessage, CollabSession, GraphChange, MemoryConnector, Permission,
    RoomTarget, ServerMessage, SessionConfig,
};
use mm_core::{
    ConnectionId, EventKind, GraphData, GraphEvent, NodeId, NodePatch, Point, UserId,
};
use mm_editor::{Editor, InputEvent, InteractionState};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};

type TestEditor = Editor<MemoryConnector>;

fn sample_editor() -> TestEditor {
    let mut editor = TestEditor::new();
    assert!(editor.load_data(&GraphData::sample()).unwrap());
    editor
}

fn click(editor: &mut TestEditor, x: f64, y: f64) {
    editor.handle_input(InputEvent::pointer_down(x, y), 0);
    editor.handle_input(InputEvent::PointerUp, 0);
}

/// Editor joined to room 1 as `me`, with the sample graph loaded.
fn joined_editor(permission: Permission) -> (TestEditor, MemoryConnector) {
    let link = MemoryConnector::new();
    let mut editor = TestEditor::new();
    editor.attach_session(CollabSession::new(
        SessionConfig::default(),
        link.clone(),
        UserId::intern("me"),
    ));
    editor.connect(RoomTarget::Graph(1), 0);
    let epoch = editor.session().unwrap().epoch();
    editor.handle_open(epoch);
    let snapshot = ServerMessage::GraphData {
        graph: GraphData::sample(),
        permission,
    };
    editor.handle_frame(epoch, &snapshot.to_json().unwrap(), 0);
    link.take_sent();
    (editor, link)
}

fn sent_changes(link: &MemoryConnector) -> Vec<ChangeAction> {
    link.take_sent()
        .iter()
        .filter_map(|frame| match ClientMessage::from_json(frame).ok()? {
            ClientMessage::GraphChange(GraphChange { action, .. }) => Some(action),
            _ => None,
        })
        .collect()
}

fn debug_log(editor: &mut TestEditor) -> Arc<Mutex<Vec<String>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    editor.on(EventKind::DebugInfo, move |event| {
        if let GraphEvent::DebugInfo(text) = event {
            sink.lock().unwrap().push(text.clone());
        }
    });
    log
}

// ─── Connect gesture ─────────────────────────────────────────────────────

#[test]
fn connect_mode_two_clicks_make_a_connection() {
    let mut editor = sample_editor();
    let log = debug_log(&mut editor);
    assert!(editor.toggle_connect_mode());
    assert_eq!(editor.interaction().state(), InteractionState::Connecting);

    click(&mut editor, 200.0, 200.0);
    assert_eq!(editor.interaction().connecting_from(), Some(NodeId(2)));

    // The rubber band follows the pointer while armed.
    editor.handle_input(InputEvent::pointer_move(300.0, 120.0), 0);
    let band = editor.rubber_band().unwrap();
    assert_eq!((band.p0, band.p1), (Point::new(200.0, 200.0), Point::new(300.0, 120.0)));

    click(&mut editor, 600.0, 200.0);
    assert_eq!(editor.interaction().connecting_from(), None);
    assert!(editor.map().has_connection_between(NodeId(2), NodeId(3)));
    assert_eq!(
        log.lock().unwrap().last().map(String::as_str),
        Some("Connected: Node 2 → Node 3")
    );
    assert_eq!(editor.interaction().state(), InteractionState::Connecting);
}

#[test]
fn connecting_an_existing_pair_only_reports_it() {
    let mut editor = sample_editor();
    let log = debug_log(&mut editor);
    editor.toggle_connect_mode();

    click(&mut editor, 200.0, 200.0);
    click(&mut editor, 400.0, 300.0);
    assert_eq!(editor.map().connection_count(), 2);
    assert_eq!(
        log.lock().unwrap().last().map(String::as_str),
        Some("Connection already exists: 2 ↔ 1")
    );
    assert_eq!(editor.interaction().connecting_from(), None);
}

#[test]
fn clicking_the_armed_node_again_cancels() {
    let mut editor = sample_editor();
    editor.toggle_connect_mode();
    click(&mut editor, 400.0, 300.0);
    click(&mut editor, 400.0, 300.0);
    assert_eq!(editor.interaction().connecting_from(), None);
    assert!(editor.rubber_band().is_none());
    assert_eq!(editor.map().connection_count(), 2);
}

#[test]
fn toggling_connect_mode_disarms_and_reports() {
    let mut editor = sample_editor();
    let modes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&modes);
    editor.on(EventKind::ConnectionModeChange, move |event| {
        if let GraphEvent::ConnectionModeChange(on) = event {
            sink.lock().unwrap().push(*on);
        }
    });

    editor.toggle_connect_mode();
    click(&mut editor, 400.0, 300.0);
    editor.toggle_connect_mode();
    assert_eq!(editor.interaction().connecting_from(), None);
    assert_eq!(*modes.lock().unwrap(), vec![true, false]);
}

// ─── Broadcast bridge ────────────────────────────────────────────────────

#[test]
fn local_operations_are_broadcast_in_order() {
    let (mut editor, link) = joined_editor(Permission::Edit);
    editor.select_node(NodeId(1));
    let node = editor.add_node(None, Some("Shared"), None, 10).unwrap();
    assert_eq!(node.id, NodeId(4));

    let changes = sent_changes(&link);
    assert!(matches!(
        &changes[..],
        [ChangeAction::NodeAdd { node }, ChangeAction::ConnectionAdd { connection }]
            if node.id == NodeId(4) && connection.id == ConnectionId(3)
    ));

    editor.update_node(NodeId(4), &NodePatch::text("Renamed"), 11);
    assert_eq!(
        sent_changes(&link),
        vec![ChangeAction::NodeUpdate {
            node_id: NodeId(4),
            updates: NodePatch::text("Renamed"),
        }]
    );
}

#[test]
fn dragging_broadcasts_moves_and_cursors() {
    let (mut editor, link) = joined_editor(Permission::Owner);
    editor.handle_input(InputEvent::pointer_down(400.0, 300.0), 0);
    editor.handle_input(InputEvent::pointer_move(420.0, 310.0), 5);
    editor.handle_input(InputEvent::PointerUp, 6);

    let frames = link.take_sent();
    let messages: Vec<_> = frames
        .iter()
        .map(|f| ClientMessage::from_json(f).unwrap())
        .collect();
    assert!(matches!(&messages[0], ClientMessage::CursorMove(c) if c.x == 420.0 && c.y == 310.0));
    assert!(matches!(
        &messages[1],
        ClientMessage::GraphChange(GraphChange {
            action: ChangeAction::NodeUpdate { node_id: NodeId(1), .. },
            timestamp: 5,
            ..
        })
    ));
    assert_eq!(messages.len(), 2);
}

#[test]
fn remote_changes_are_applied_but_not_rebroadcast() {
    let (mut editor, link) = joined_editor(Permission::Edit);
    let epoch = editor.session().unwrap().epoch();
    let remote = ServerMessage::GraphChange(GraphChange {
        user_id: UserId::intern("ana"),
        timestamp: 3,
        action: ChangeAction::NodeDelete { node_id: NodeId(3) },
    });
    editor.handle_frame(epoch, &remote.to_json().unwrap(), 3);

    assert!(editor.map().node(NodeId(3)).is_none());
    assert!(link.take_sent().is_empty());

    // The next local change carries only its own events.
    editor.delete_node(NodeId(2), 4);
    let changes = sent_changes(&link);
    assert_eq!(
        changes.last(),
        Some(&ChangeAction::NodeDelete { node_id: NodeId(2) })
    );
    assert!(!changes.contains(&ChangeAction::NodeDelete { node_id: NodeId(3) }));
}

// ─── Permission gating ───────────────────────────────────────────────────

#[test]
fn view_only_refuses_mutations_but_allows_navigation() {
    let (mut editor, link) = joined_editor(Permission::View);
    assert!(!editor.can_edit());

    assert_eq!(editor.add_node(None, None, None, 0), None);
    assert!(!editor.update_node(NodeId(1), &NodePatch::text("x"), 0));
    assert!(!editor.delete_node(NodeId(2), 0));
    assert_eq!(editor.add_connection(NodeId(2), NodeId(3), 0), None);
    assert!(!editor.toggle_connect_mode());

    // Dragging a node only selects it.
    editor.handle_input(InputEvent::pointer_down(400.0, 300.0), 0);
    editor.handle_input(InputEvent::pointer_move(0.0, 0.0), 0);
    editor.handle_input(InputEvent::PointerUp, 0);
    assert_eq!(editor.map().node(NodeId(1)).unwrap().center(), Point::new(400.0, 300.0));
    assert_eq!(editor.map().selected_node().map(|n| n.id), Some(NodeId(1)));

    editor.zoom_in();
    assert!(editor.map().view().zoom > 1.0);
    assert!(sent_changes(&link).is_empty());
    assert_eq!(editor.map().node_count(), 3);
}

#[test]
fn shared_maps_cannot_be_replaced_locally() {
    let (mut editor, _link) = joined_editor(Permission::Owner);
    assert!(!editor.new_map());
    assert!(!editor.load_xml("<mindmap/>").unwrap());
    assert_eq!(editor.map().node_count(), 3);

    editor.disconnect();
    assert_eq!(editor.permission(), Permission::Owner);
    assert!(editor.new_map());
    assert_eq!(editor.map().node_count(), 1);
}
