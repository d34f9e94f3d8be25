//! The editor: graph, interaction, permission, and collaboration in one
//! place.
//!
//! Every local entry point follows the same shape: check the permission,
//! call the graph, then `flush`. The graph reports what happened on its
//! bus; the editor listens through an mpsc queue and hands user-attributable
//! events to the session in the same call. Remote input is applied and the
//! queue is drained without broadcasting, so nothing echoes back.

use crate::input::InputEvent;
use crate::interaction::Interaction;
use mm_collab::{
    CollabSession, Connector, Permission, RemoteCursor, RoomTarget, SessionEvent, apply_change,
};
use mm_core::{
    Connection, ConnectionId, EventKind, FormatError, GraphData, GraphError, GraphEvent, Line,
    MindMap, Node, NodeId, NodePatch, Point, Selection, SubscriptionId,
};
use smallvec::SmallVec;
use std::sync::mpsc::{self, Receiver};

pub struct Editor<C: Connector> {
    map: MindMap,
    interaction: Interaction,
    permission: Permission,
    session: Option<CollabSession<C>>,
    outbox: Receiver<GraphEvent>,
}

impl<C: Connector> Default for Editor<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> Editor<C> {
    pub fn new() -> Self {
        Self::with_map(MindMap::new())
    }

    pub fn with_map(mut map: MindMap) -> Self {
        let (tx, outbox) = mpsc::channel();
        map.on_any(move |event| {
            let _ = tx.send(event.clone());
        });
        let editor = Self {
            map,
            interaction: Interaction::new(),
            permission: Permission::Owner,
            session: None,
            outbox,
        };
        editor.discard();
        editor
    }

    pub fn map(&self) -> &MindMap {
        &self.map
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&GraphEvent) + Send + 'static) -> SubscriptionId {
        self.map.on(kind, handler)
    }

    pub fn on_any(&mut self, handler: impl FnMut(&GraphEvent) + Send + 'static) -> SubscriptionId {
        self.map.on_any(handler)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.map.off(id)
    }

    // ─── Permission ──────────────────────────────────────────────────────

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn can_edit(&self) -> bool {
        self.permission.can_edit()
    }

    pub fn set_permission(&mut self, permission: Permission) {
        self.permission = permission;
        self.interaction.set_editable(&mut self.map, permission.can_edit());
        if !permission.can_edit() {
            self.map.status("View-only access - changes cannot be saved");
        }
        self.discard();
    }

    fn refuse(&self, what: &str) -> bool {
        if self.can_edit() {
            return false;
        }
        log::debug!("{what} refused: view-only");
        true
    }

    // ─── Local graph operations ──────────────────────────────────────────

    pub fn add_node(&mut self, at: Option<Point>, text: Option<&str>, color: Option<&str>, now_ms: u64) -> Option<Node> {
        if self.refuse("add node") {
            return None;
        }
        let node = self.map.add_node(at, text, color);
        self.flush(now_ms);
        node
    }

    pub fn update_node(&mut self, id: NodeId, patch: &NodePatch, now_ms: u64) -> bool {
        if self.refuse("update node") {
            return false;
        }
        let ok = self.map.update_node(id, patch);
        self.flush(now_ms);
        ok
    }

    pub fn move_node(&mut self, id: NodeId, x: f64, y: f64, now_ms: u64) -> bool {
        if self.refuse("move node") {
            return false;
        }
        let ok = self.map.move_node(id, x, y);
        self.flush(now_ms);
        ok
    }

    pub fn delete_node(&mut self, id: NodeId, now_ms: u64) -> bool {
        if self.refuse("delete node") {
            return false;
        }
        let ok = self.map.delete_node(id);
        self.flush(now_ms);
        ok
    }

    pub fn add_connection(&mut self, from: NodeId, to: NodeId, now_ms: u64) -> Option<Connection> {
        if self.refuse("add connection") {
            return None;
        }
        let conn = self.map.add_connection(from, to);
        self.flush(now_ms);
        conn
    }

    pub fn delete_connection(&mut self, id: ConnectionId, now_ms: u64) -> bool {
        if self.refuse("delete connection") {
            return false;
        }
        let ok = self.map.delete_connection(id);
        self.flush(now_ms);
        ok
    }

    /// Delete whatever is selected.
    pub fn delete_selected(&mut self, now_ms: u64) -> bool {
        if self.refuse("delete selection") {
            return false;
        }
        let ok = match self.map.selection() {
            Selection::Node(_) => self.map.delete_selected_node(),
            Selection::Connection(_) => self.map.delete_selected_connection(),
            Selection::None => false,
        };
        self.flush(now_ms);
        ok
    }

    pub fn toggle_connect_mode(&mut self) -> bool {
        let ok = self.interaction.toggle_connect_mode(&mut self.map);
        self.discard();
        ok
    }

    /// Whether the whole graph may be replaced locally. Never while a
    /// room is shared: a replacement is not expressible as changes.
    pub fn can_replace(&self) -> bool {
        self.can_edit() && !self.is_collaborating()
    }

    /// Start a new map.
    pub fn new_map(&mut self) -> bool {
        if !self.can_replace() {
            log::warn!("new map refused");
            return false;
        }
        self.map.clear();
        self.discard();
        true
    }

    /// Replace the graph from a file. `Ok(false)` when replacement is not
    /// allowed right now.
    pub fn load_xml(&mut self, xml: &str) -> Result<bool, FormatError> {
        if !self.can_replace() {
            log::warn!("file load refused");
            return Ok(false);
        }
        let result = self.map.load_xml(xml);
        self.discard();
        result.map(|()| true)
    }

    pub fn load_data(&mut self, data: &GraphData) -> Result<bool, GraphError> {
        if !self.can_replace() {
            return Ok(false);
        }
        let result = self.map.load_data(data);
        self.discard();
        result.map(|()| true)
    }

    pub fn to_xml(&self) -> String {
        self.map.to_xml()
    }

    pub fn get_data(&self) -> GraphData {
        self.map.get_data()
    }

    // ─── Selection and view (always allowed) ─────────────────────────────

    pub fn select_node(&mut self, id: NodeId) -> bool {
        let ok = self.map.select_node(id);
        self.discard();
        ok
    }

    pub fn select_connection(&mut self, id: ConnectionId) -> bool {
        let ok = self.map.select_connection(id);
        self.discard();
        ok
    }

    pub fn clear_selection(&mut self) {
        self.map.clear_selection();
        self.discard();
    }

    pub fn zoom_in(&mut self) {
        self.map.zoom_in();
        self.discard();
    }

    pub fn zoom_out(&mut self) {
        self.map.zoom_out();
        self.discard();
    }

    pub fn reset_view(&mut self) {
        self.map.reset_view();
        self.discard();
    }

    /// Feed pointer input. Returns whether a redraw is needed.
    pub fn handle_input(&mut self, event: InputEvent, now_ms: u64) -> bool {
        let redraw = self.interaction.handle(&mut self.map, event);
        if let InputEvent::PointerMove { .. } = event
            && let (Some(session), Some(p)) = (self.session.as_mut(), self.interaction.pointer())
        {
            session.send_cursor(p, now_ms);
        }
        self.flush(now_ms);
        redraw
    }

    pub fn rubber_band(&self) -> Option<Line> {
        self.interaction.rubber_band(&self.map)
    }

    // ─── Collaboration ───────────────────────────────────────────────────

    /// Install a session. Replaces (and disconnects) any previous one.
    pub fn attach_session(&mut self, session: CollabSession<C>) {
        self.disconnect();
        self.session = Some(session);
    }

    pub fn session(&self) -> Option<&CollabSession<C>> {
        self.session.as_ref()
    }

    pub fn is_collaborating(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.is_joined())
    }

    pub fn remote_cursors(&self, now_ms: u64) -> Vec<RemoteCursor> {
        self.session
            .as_ref()
            .map(|s| s.visible_cursors(now_ms))
            .unwrap_or_default()
    }

    pub fn connect(&mut self, target: RoomTarget, now_ms: u64) -> Vec<SessionEvent> {
        let events = match self.session.as_mut() {
            Some(s) => s.connect(target, now_ms),
            None => {
                log::warn!("connect without a session");
                return Vec::new();
            }
        };
        self.process(events)
    }

    /// Leave the room. Local editing is restored.
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.disconnect();
            self.set_permission(Permission::Owner);
        }
    }

    pub fn handle_open(&mut self, epoch: u64) -> Vec<SessionEvent> {
        let events = self.with_session(|s| s.handle_open(epoch));
        self.process(events)
    }

    pub fn handle_frame(&mut self, epoch: u64, text: &str, now_ms: u64) -> Vec<SessionEvent> {
        let events = self.with_session(|s| s.handle_frame(epoch, text, now_ms));
        self.process(events)
    }

    pub fn handle_close(&mut self, epoch: u64, now_ms: u64) -> Vec<SessionEvent> {
        let events = self.with_session(|s| s.handle_close(epoch, now_ms));
        self.process(events)
    }

    pub fn poll(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        let events = self.with_session(|s| s.poll(now_ms));
        self.process(events)
    }

    fn with_session(&mut self, f: impl FnOnce(&mut CollabSession<C>) -> Vec<SessionEvent>) -> Vec<SessionEvent> {
        self.session.as_mut().map(f).unwrap_or_default()
    }

    /// Apply what the session reported. Returns the events for the host.
    fn process(&mut self, events: Vec<SessionEvent>) -> Vec<SessionEvent> {
        for event in &events {
            match event {
                SessionEvent::Opened => self.map.status("Connected to collaboration server"),
                SessionEvent::Snapshot { graph, permission } => {
                    match self.map.load_data(graph) {
                        Ok(()) => self.map.status("Loaded shared mind map"),
                        Err(e) => {
                            log::warn!("shared graph rejected: {e}");
                            self.map.status(format!("Error: {e}"));
                        }
                    }
                    self.set_permission(*permission);
                }
                SessionEvent::RemoteChange(change) => {
                    apply_change(&mut self.map, &change.action);
                }
                SessionEvent::UserJoined { user_id, .. } => {
                    self.map.status(format!("User {user_id} joined collaboration"));
                }
                SessionEvent::UserLeft { user_id } => {
                    self.map.status(format!("User {user_id} left collaboration"));
                }
                SessionEvent::Error(message) => self.map.status(format!("Error: {message}")),
                SessionEvent::Closed { .. } => self.map.status("Disconnected from collaboration server"),
                SessionEvent::GaveUp => self.map.status("Failed to connect to collaboration server"),
                SessionEvent::ActiveUsers(_)
                | SessionEvent::CursorMoved { .. }
                | SessionEvent::Activity(_)
                | SessionEvent::Reconnecting { .. } => {}
            }
        }
        self.discard();
        events
    }

    // ─── Outbox ──────────────────────────────────────────────────────────

    /// Broadcast what the graph reported since the last drain.
    fn flush(&mut self, now_ms: u64) {
        let batch: SmallVec<[GraphEvent; 8]> = self.outbox.try_iter().collect();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !self.permission.can_edit() {
            return;
        }
        for event in &batch {
            session.broadcast(event, now_ms);
        }
    }

    /// Drop queued events without broadcasting.
    fn discard(&self) {
        for _ in self.outbox.try_iter() {}
    }
}
