//! The mind-map graph: nodes, connections, selection, viewport, and the
//! event bus that reports every change.
//!
//! Nodes and connections live in insertion-ordered maps (hit testing relies
//! on creation order). An undirected `petgraph` graph map mirrors the
//! connections for pair de-duplication and cascade deletion.
//!
//! Policy rejections (unknown id, duplicate pair, deleting the last node)
//! return `false` / `None` and emit nothing. Only `load_data` returns an
//! error, and then the graph is untouched.

use crate::error::GraphError;
use crate::events::{EventBus, EventKind, GraphEvent, SubscriptionId};
use crate::hit;
use crate::id::{ConnectionId, NodeId};
use crate::model::{
    CHILD_OFFSET_X, Connection, DEFAULT_CENTER, DEFAULT_NODE_COLOR, DEFAULT_NODE_TEXT, Node,
    NodePatch, ROOT_NODE_COLOR, ROOT_NODE_TEXT, Selection,
};
use crate::snapshot::GraphData;
use crate::viewport::ViewState;
use indexmap::IndexMap;
use kurbo::Point;
use petgraph::graphmap::UnGraphMap;
use std::collections::HashSet;

pub struct MindMap {
    nodes: IndexMap<NodeId, Node>,
    connections: IndexMap<ConnectionId, Connection>,
    /// Undirected adjacency; edge weight is the connection id.
    adjacency: UnGraphMap<NodeId, ConnectionId>,
    selection: Selection,
    view: ViewState,
    next_node_id: u64,
    next_connection_id: u64,
    bus: EventBus,
}

impl MindMap {
    /// A graph holding only the root node, which is selected.
    pub fn new() -> Self {
        let mut map = Self {
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            adjacency: UnGraphMap::new(),
            selection: Selection::None,
            view: ViewState::default(),
            next_node_id: 1,
            next_connection_id: 1,
            bus: EventBus::new(),
        };
        map.seed_root();
        map
    }

    // ─── Events ──────────────────────────────────────────────────────────

    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&GraphEvent) + Send + 'static) -> SubscriptionId {
        self.bus.on(kind, handler)
    }

    pub fn on_any(&mut self, handler: impl FnMut(&GraphEvent) + Send + 'static) -> SubscriptionId {
        self.bus.on_any(handler)
    }

    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.bus.off(id)
    }

    /// Dispatch an event to every matching subscriber.
    pub fn emit(&mut self, event: GraphEvent) {
        self.bus.emit(&event);
    }

    pub fn status(&mut self, message: impl Into<String>) {
        self.emit(GraphEvent::StatusUpdate(message.into()));
    }

    pub fn debug_info(&mut self, message: impl Into<String>) {
        self.emit(GraphEvent::DebugInfo(message.into()));
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Nodes joined to `id` by a connection.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        if !self.adjacency.contains_node(id) {
            return Vec::new();
        }
        self.adjacency.neighbors(id).collect()
    }

    pub fn has_connection_between(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency.contains_edge(a, b)
    }

    /// The id the next locally created node will get.
    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.next_node_id)
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_connection_id)
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.selection.node().and_then(|id| self.nodes.get(&id))
    }

    pub fn selected_connection(&self) -> Option<&Connection> {
        self.selection.connection().and_then(|id| self.connections.get(&id))
    }

    /// Earliest-created node whose box contains the model point.
    pub fn node_at(&self, p: Point) -> Option<&Node> {
        hit::node_at(self.nodes.values(), p)
    }

    /// First connection within `tolerance` model units of `p`.
    pub fn connection_at(&self, p: Point, tolerance: f64) -> Option<&Connection> {
        hit::connection_at(&self.nodes, self.connections.values(), p, tolerance)
    }

    /// The edge-trimmed segment of a connection, or `None` when an
    /// endpoint is missing or the two centers coincide.
    pub fn connection_segment(&self, conn: &Connection) -> Option<kurbo::Line> {
        hit::connection_segment(&self.nodes, conn)
    }

    // ─── Node operations ─────────────────────────────────────────────────

    /// Create a node with a fresh id.
    ///
    /// Without a position the node goes to the right of the selected node,
    /// or to the default center. If a node is selected it is connected to
    /// the new one. The new node becomes the selection. `None` once the id
    /// space is exhausted; existing nodes are never overwritten.
    pub fn add_node(&mut self, at: Option<Point>, text: Option<&str>, color: Option<&str>) -> Option<Node> {
        let id = NodeId(self.next_node_id);
        if id.next().is_none() || self.nodes.contains_key(&id) {
            log::warn!("no free node id at {id:?}");
            return None;
        }

        let parent = self.selected_node().map(|n| (n.id, n.center()));
        let pos = match (at, parent) {
            (Some(p), _) if p.x.is_finite() && p.y.is_finite() => p,
            (_, Some((_, c))) => Point::new(c.x + CHILD_OFFSET_X, c.y),
            _ => Point::new(DEFAULT_CENTER.0, DEFAULT_CENTER.1),
        };

        let node = Node::new(
            id,
            pos.x,
            pos.y,
            text.unwrap_or(DEFAULT_NODE_TEXT),
            color.unwrap_or(DEFAULT_NODE_COLOR),
        );
        if !self.insert_node(node.clone()) {
            return None;
        }

        if let Some((parent_id, _)) = parent {
            self.add_connection(parent_id, id);
        }
        self.select_node(id);
        self.status("Node added");
        Some(node)
    }

    /// Store a node under its own id. An existing node with that id is
    /// overwritten. Invalid sizes are recomputed from the text. Returns
    /// `false` for non-finite coordinates or the id `u64::MAX`.
    pub fn insert_node(&mut self, mut node: Node) -> bool {
        if !node.x.is_finite() || !node.y.is_finite() {
            log::warn!("rejecting {:?} with non-finite position", node.id);
            return false;
        }
        let Some(next) = node.id.next() else {
            log::warn!("rejecting {:?}: id out of range", node.id);
            return false;
        };
        if !node.has_valid_size() {
            node.fit_to_text();
        }
        self.next_node_id = self.next_node_id.max(next.get());
        self.adjacency.add_node(node.id);

        let id = node.id;
        match self.nodes.insert(id, node.clone()) {
            None => {
                log::debug!("node added: {id:?}");
                self.emit(GraphEvent::NodeAdded(node));
            }
            Some(_) => {
                log::debug!("node replaced: {id:?}");
                let patch = NodePatch {
                    x: Some(node.x),
                    y: Some(node.y),
                    text: Some(node.text.clone()),
                    color: Some(node.color.clone()),
                };
                self.emit(GraphEvent::NodeUpdated { node, patch });
            }
        }
        true
    }

    /// Apply a partial update. Changing the text resizes the node.
    pub fn update_node(&mut self, id: NodeId, patch: &NodePatch) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        if patch.apply_to(node) {
            node.fit_to_text();
        }
        let node = node.clone();
        log::debug!("node updated: {id:?}");
        self.emit(GraphEvent::NodeUpdated {
            node,
            patch: patch.clone(),
        });
        true
    }

    pub fn move_node(&mut self, id: NodeId, x: f64, y: f64) -> bool {
        if !x.is_finite() || !y.is_finite() {
            return false;
        }
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.x = x;
        node.y = y;
        let node = node.clone();
        log::trace!("node moved: {id:?} -> ({x}, {y})");
        self.emit(GraphEvent::NodeUpdated {
            node,
            patch: NodePatch::position(x, y),
        });
        true
    }

    /// Remove a node and every connection touching it. The last remaining
    /// node cannot be deleted.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains_key(&id) || self.nodes.len() <= 1 {
            return false;
        }

        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.touches(id))
            .map(|c| c.id)
            .collect();
        let selected_here = match self.selection {
            Selection::Node(sel) => sel == id,
            Selection::Connection(sel) => touching.contains(&sel),
            Selection::None => false,
        };
        if selected_here {
            self.clear_selection();
        }

        for conn_id in touching {
            self.delete_connection(conn_id);
        }
        self.adjacency.remove_node(id);
        self.nodes.shift_remove(&id);
        log::debug!("node deleted: {id:?}");
        self.emit(GraphEvent::NodeDeleted { id });
        true
    }

    /// Delete the selected node, reporting a refusal on the status line.
    pub fn delete_selected_node(&mut self) -> bool {
        let Some(id) = self.selection.node() else {
            return false;
        };
        if self.delete_node(id) {
            return true;
        }
        if self.nodes.len() <= 1 {
            self.status("Cannot delete the last node");
        }
        false
    }

    /// Report a double click on a node to subscribers.
    pub fn node_double_clicked(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id).cloned() else {
            return false;
        };
        self.emit(GraphEvent::NodeDoubleClick(node));
        true
    }

    // ─── Connection operations ───────────────────────────────────────────

    /// Connect two nodes with a fresh id. `None` if either node is missing,
    /// the pair is already connected (in either direction), or both ends
    /// are the same node, or when no connection id is left.
    pub fn add_connection(&mut self, from: NodeId, to: NodeId) -> Option<Connection> {
        let id = ConnectionId(self.next_connection_id);
        if self.connections.contains_key(&id) {
            log::warn!("no free connection id at {id:?}");
            return None;
        }
        let conn = Connection::new(id, from, to);
        self.insert_connection(conn)
    }

    /// Store a connection under its own id. An existing connection with the
    /// same id is replaced.
    pub fn insert_connection(&mut self, conn: Connection) -> Option<Connection> {
        if conn.from_id == conn.to_id {
            return None;
        }
        let Some(next) = conn.id.next() else {
            log::warn!("dropping {:?}: id out of range", conn.id);
            return None;
        };
        if !self.nodes.contains_key(&conn.from_id) || !self.nodes.contains_key(&conn.to_id) {
            log::warn!("dropping {:?}: endpoint missing", conn.id);
            return None;
        }
        if let Some(existing) = self.adjacency.edge_weight(conn.from_id, conn.to_id)
            && *existing != conn.id
        {
            return None;
        }
        if let Some(old) = self.connections.get(&conn.id).copied() {
            self.adjacency.remove_edge(old.from_id, old.to_id);
        }

        self.next_connection_id = self.next_connection_id.max(next.get());
        self.adjacency.add_edge(conn.from_id, conn.to_id, conn.id);
        self.connections.insert(conn.id, conn);
        log::debug!("connection added: {:?} {:?} -> {:?}", conn.id, conn.from_id, conn.to_id);
        self.emit(GraphEvent::ConnectionAdded(conn));
        Some(conn)
    }

    pub fn delete_connection(&mut self, id: ConnectionId) -> bool {
        if !self.connections.contains_key(&id) {
            return false;
        }
        if self.selection == Selection::Connection(id) {
            self.clear_selection();
        }
        let Some(conn) = self.connections.shift_remove(&id) else {
            return false;
        };
        self.adjacency.remove_edge(conn.from_id, conn.to_id);
        log::debug!("connection deleted: {id:?}");
        self.emit(GraphEvent::ConnectionDeleted(conn));
        true
    }

    pub fn delete_selected_connection(&mut self) -> bool {
        match self.selection.connection() {
            Some(id) => self.delete_connection(id),
            None => false,
        }
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id).cloned() else {
            return false;
        };
        self.selection = Selection::Node(id);
        self.emit(GraphEvent::SelectionChanged(self.selection));
        self.emit(GraphEvent::NodeSelected(Some(node)));
        true
    }

    pub fn select_connection(&mut self, id: ConnectionId) -> bool {
        let Some(conn) = self.connections.get(&id).copied() else {
            return false;
        };
        self.selection = Selection::Connection(id);
        self.emit(GraphEvent::SelectionChanged(self.selection));
        self.emit(GraphEvent::ConnectionSelected(Some(conn)));
        true
    }

    pub fn clear_selection(&mut self) {
        let previous = std::mem::take(&mut self.selection);
        self.emit(GraphEvent::SelectionChanged(Selection::None));
        match previous {
            Selection::Node(_) => self.emit(GraphEvent::NodeSelected(None)),
            Selection::Connection(_) => self.emit(GraphEvent::ConnectionSelected(None)),
            Selection::None => {}
        }
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.view.zoom_in();
        self.view_changed();
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom_out();
        self.view_changed();
    }

    /// Scale around a screen point, keeping the model point under it fixed.
    pub fn zoom_at_point(&mut self, screen: Point, factor: f64) {
        self.view.zoom_at_point(screen, factor);
        self.view_changed();
    }

    pub fn set_pan(&mut self, x: f64, y: f64) {
        self.view.set_pan(x, y);
        self.view_changed();
    }

    pub fn reset_view(&mut self) {
        self.view.reset();
        self.view_changed();
        self.status("View reset");
    }

    pub fn to_model_coords(&self, screen: Point) -> Point {
        self.view.to_model(screen)
    }

    fn view_changed(&mut self) {
        self.emit(GraphEvent::ViewChanged(self.view.change()));
    }

    // ─── Whole-graph operations ──────────────────────────────────────────

    /// Start a new map: only the root node remains and it is selected.
    pub fn clear(&mut self) {
        let (old_nodes, old_conns) = (self.nodes.len(), self.connections.len());
        self.nodes.clear();
        self.connections.clear();
        self.adjacency.clear();
        self.next_node_id = 1;
        self.next_connection_id = 1;
        self.view.reset();
        let root = self.seed_root();

        self.emit(GraphEvent::Reset {
            nodes: 1,
            connections: 0,
        });
        self.view_changed();
        self.select_node(root);
        self.debug_info(format!("Cleared: {old_nodes} nodes, {old_conns} connections"));
    }

    pub fn get_data(&self) -> GraphData {
        GraphData {
            nodes: self.nodes.values().cloned().collect(),
            connections: self.connections.values().copied().collect(),
            view: self.view,
        }
    }

    /// Replace the whole graph with a snapshot.
    ///
    /// The snapshot is validated first; on error nothing changes.
    /// Connections with missing endpoints, self-loops, and repeated pairs
    /// are dropped. Id counters move past the largest ids present. An empty
    /// snapshot yields the root node. Nothing is selected afterwards.
    pub fn load_data(&mut self, data: &GraphData) -> Result<(), GraphError> {
        validate(data)?;

        let mut nodes = IndexMap::with_capacity(data.nodes.len());
        let mut adjacency = UnGraphMap::new();
        for node in &data.nodes {
            let mut node = node.clone();
            if !node.has_valid_size() {
                node.fit_to_text();
            }
            adjacency.add_node(node.id);
            nodes.insert(node.id, node);
        }

        let mut connections = IndexMap::with_capacity(data.connections.len());
        for conn in &data.connections {
            let dropped = if !nodes.contains_key(&conn.from_id) || !nodes.contains_key(&conn.to_id) {
                Some("endpoint missing")
            } else if conn.from_id == conn.to_id {
                Some("self-loop")
            } else if adjacency.contains_edge(conn.from_id, conn.to_id) {
                Some("duplicate pair")
            } else if connections.contains_key(&conn.id) {
                Some("duplicate id")
            } else {
                None
            };
            if let Some(reason) = dropped {
                log::warn!("dropping {:?} from snapshot: {reason}", conn.id);
                continue;
            }
            adjacency.add_edge(conn.from_id, conn.to_id, conn.id);
            connections.insert(conn.id, *conn);
        }

        let next_node = data.nodes.iter().filter_map(|n| n.id.next()).map(NodeId::get).max();
        let next_conn = data.connections.iter().filter_map(|c| c.id.next()).map(ConnectionId::get).max();

        self.nodes = nodes;
        self.connections = connections;
        self.adjacency = adjacency;
        self.next_node_id = next_node.unwrap_or(1);
        self.next_connection_id = next_conn.unwrap_or(1);
        self.selection = Selection::None;
        self.view = data.view.sanitized();
        if self.nodes.is_empty() {
            self.seed_root();
        }

        log::debug!(
            "loaded {} nodes, {} connections",
            self.nodes.len(),
            self.connections.len()
        );
        self.emit(GraphEvent::Reset {
            nodes: self.nodes.len(),
            connections: self.connections.len(),
        });
        self.emit(GraphEvent::SelectionChanged(Selection::None));
        self.view_changed();
        self.status("Mind map loaded successfully");
        Ok(())
    }

    /// Insert the root node without emitting; selects it.
    fn seed_root(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        let (x, y) = DEFAULT_CENTER;
        let root = Node::new(id, x, y, ROOT_NODE_TEXT, ROOT_NODE_COLOR);
        self.next_node_id = id.get().saturating_add(1);
        self.adjacency.add_node(id);
        self.nodes.insert(id, root);
        self.selection = Selection::Node(id);
        id
    }
}

impl Default for MindMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MindMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MindMap")
            .field("nodes", &self.nodes.len())
            .field("connections", &self.connections.len())
            .field("selection", &self.selection)
            .field("view", &self.view)
            .finish()
    }
}

fn validate(data: &GraphData) -> Result<(), GraphError> {
    let v = data.view;
    if !v.is_finite() {
        return Err(GraphError::InvalidView {
            zoom: v.zoom,
            pan_x: v.pan_x,
            pan_y: v.pan_y,
        });
    }
    let mut seen = HashSet::with_capacity(data.nodes.len());
    for node in &data.nodes {
        if node.id.next().is_none() {
            return Err(GraphError::NodeIdOutOfRange(node.id));
        }
        if !seen.insert(node.id) {
            return Err(GraphError::DuplicateNode(node.id));
        }
        if !node.x.is_finite() || !node.y.is_finite() {
            return Err(GraphError::InvalidPosition {
                id: node.id,
                x: node.x,
                y: node.y,
            });
        }
    }
    if let Some(conn) = data.connections.iter().find(|c| c.id.next().is_none()) {
        return Err(GraphError::ConnectionIdOutOfRange(conn.id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(map: &mut MindMap) -> Arc<Mutex<Vec<GraphEvent>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        map.on_any(move |e| sink.lock().unwrap().push(e.clone()));
        log
    }

    #[test]
    fn new_graph_has_selected_root() {
        let map = MindMap::new();
        assert_eq!(map.node_count(), 1);
        let root = map.selected_node().unwrap();
        assert_eq!(root.text, ROOT_NODE_TEXT);
        assert_eq!(root.center(), Point::new(400.0, 300.0));
        assert_eq!(map.next_node_id(), NodeId(2));
    }

    #[test]
    fn add_node_branches_from_selection() {
        let mut map = MindMap::new();
        let child = map.add_node(None, None, None).unwrap();
        assert_eq!(child.center(), Point::new(550.0, 300.0));
        assert_eq!(child.text, DEFAULT_NODE_TEXT);
        assert_eq!(child.color, DEFAULT_NODE_COLOR);
        assert!(map.has_connection_between(NodeId(1), child.id));
        assert_eq!(map.selection(), Selection::Node(child.id));
    }

    #[test]
    fn add_node_without_selection_goes_to_center() {
        let mut map = MindMap::new();
        map.clear_selection();
        let n = map.add_node(None, Some("Loose"), Some("#ffffff")).unwrap();
        assert_eq!(n.center(), Point::new(400.0, 300.0));
        assert_eq!(map.connection_count(), 0);
    }

    #[test]
    fn add_node_emits_added_before_connection() {
        let mut map = MindMap::new();
        let events = recorder(&mut map);
        map.add_node(None, None, None);
        let kinds: Vec<EventKind> = events.lock().unwrap().iter().map(GraphEvent::kind).collect();
        let added = kinds.iter().position(|k| *k == EventKind::NodeAdded).unwrap();
        let linked = kinds.iter().position(|k| *k == EventKind::ConnectionAdded).unwrap();
        assert!(added < linked);
        assert_eq!(kinds.last(), Some(&EventKind::StatusUpdate));
    }

    #[test]
    fn editing_text_resizes_node() {
        let mut map = MindMap::new();
        let id = NodeId(1);
        let before = map.node(id).unwrap().height;
        assert!(map.update_node(id, &NodePatch::text("one\ntwo\nthree")));
        assert!(map.node(id).unwrap().height > before);
        assert!(!map.update_node(NodeId(99), &NodePatch::text("x")));
    }

    #[test]
    fn move_rejects_unknown_and_non_finite() {
        let mut map = MindMap::new();
        assert!(map.move_node(NodeId(1), 10.0, 20.0));
        assert!(!map.move_node(NodeId(1), f64::NAN, 0.0));
        assert!(!map.move_node(NodeId(42), 0.0, 0.0));
        assert_eq!(map.node(NodeId(1)).unwrap().center(), Point::new(10.0, 20.0));
    }

    #[test]
    fn self_loops_are_rejected() {
        let mut map = MindMap::new();
        assert!(map.add_connection(NodeId(1), NodeId(1)).is_none());
        assert!(map.add_connection(NodeId(1), NodeId(77)).is_none());
    }

    #[test]
    fn deleting_selected_connection_clears_selection() {
        let mut map = MindMap::new();
        let b = map.add_node(None, None, None).unwrap();
        let conn = map.connections().next().copied().unwrap();
        assert!(map.select_connection(conn.id));
        assert_eq!(map.selected_node(), None);
        assert!(map.delete_selected_connection());
        assert!(map.selection().is_none());
        assert!(!map.has_connection_between(NodeId(1), b.id));
    }

    #[test]
    fn delete_last_node_reports_status() {
        let mut map = MindMap::new();
        let events = recorder(&mut map);
        assert!(!map.delete_selected_node());
        assert_eq!(
            *events.lock().unwrap(),
            vec![GraphEvent::StatusUpdate("Cannot delete the last node".into())]
        );
    }

    #[test]
    fn insert_node_overwrites_and_advances_counter() {
        let mut map = MindMap::new();
        assert!(map.insert_node(Node::new(NodeId(10), 0.0, 0.0, "remote", "#fff")));
        assert_eq!(map.next_node_id(), NodeId(11));
        assert!(map.insert_node(Node::new(NodeId(10), 5.0, 5.0, "newer", "#000")));
        assert_eq!(map.node_count(), 2);
        assert_eq!(map.node(NodeId(10)).unwrap().text, "newer");
    }

    #[test]
    fn insert_connection_with_taken_pair_is_refused() {
        let mut map = MindMap::new();
        map.insert_node(Node::new(NodeId(2), 0.0, 0.0, "b", "#fff"));
        map.insert_connection(Connection::new(ConnectionId(4), NodeId(1), NodeId(2))).unwrap();
        assert!(map.insert_connection(Connection::new(ConnectionId(9), NodeId(2), NodeId(1))).is_none());
        // Same id again is a replacement, not a duplicate.
        assert!(map.insert_connection(Connection::new(ConnectionId(4), NodeId(2), NodeId(1))).is_some());
        assert_eq!(map.connection_count(), 1);
        assert_eq!(map.next_connection_id(), ConnectionId(5));
    }

    #[test]
    fn max_ids_are_refused_without_touching_counters() {
        let mut map = MindMap::new();
        assert!(!map.insert_node(Node::new(NodeId(u64::MAX), 0.0, 0.0, "edge", "#fff")));
        assert_eq!(map.node_count(), 1);
        assert_eq!(map.next_node_id(), NodeId(2));

        map.insert_node(Node::new(NodeId(2), 0.0, 0.0, "b", "#fff"));
        let conn = Connection::new(ConnectionId(u64::MAX), NodeId(1), NodeId(2));
        assert!(map.insert_connection(conn).is_none());
        assert_eq!(map.connection_count(), 0);
        assert_eq!(map.next_connection_id(), ConnectionId(1));
    }

    #[test]
    fn exhausted_node_ids_stop_add_node() {
        let mut map = MindMap::new();
        assert!(map.insert_node(Node::new(NodeId(u64::MAX - 1), 0.0, 0.0, "last", "#fff")));
        assert_eq!(map.next_node_id(), NodeId(u64::MAX));
        assert_eq!(map.add_node(None, Some("one too many"), None), None);
        assert_eq!(map.node_count(), 2);
        assert_eq!(map.node(NodeId(u64::MAX - 1)).unwrap().text, "last");
    }

    #[test]
    fn add_refuses_ids_already_taken() {
        let mut map = MindMap::new();
        let child = map.add_node(None, Some("child"), None).unwrap();
        let conn = map.connections().next().copied().unwrap();

        map.next_node_id = child.id.get();
        assert_eq!(map.add_node(None, Some("clobber"), None), None);
        assert_eq!(map.node(child.id).unwrap().text, "child");

        map.insert_node(Node::new(NodeId(9), 0.0, 0.0, "c", "#fff"));
        map.next_connection_id = conn.id.get();
        assert_eq!(map.add_connection(NodeId(1), NodeId(9)), None);
        assert_eq!(map.connection(conn.id), Some(&conn));
    }

    #[test]
    fn clear_resets_everything() {
        let mut map = MindMap::new();
        map.add_node(None, None, None);
        map.add_node(None, None, None);
        map.zoom_in();
        let events = recorder(&mut map);
        map.clear();

        assert_eq!(map.node_count(), 1);
        assert_eq!(map.connection_count(), 0);
        assert_eq!(map.view(), ViewState::default());
        assert_eq!(map.selection(), Selection::Node(NodeId(1)));
        assert_eq!(map.next_node_id(), NodeId(2));
        assert_eq!(map.next_connection_id(), ConnectionId(1));
        assert!(
            events
                .lock()
                .unwrap()
                .contains(&GraphEvent::DebugInfo("Cleared: 3 nodes, 2 connections".into()))
        );
    }

    #[test]
    fn failed_load_leaves_graph_untouched() {
        let mut map = MindMap::new();
        map.add_node(None, Some("keep me"), None);
        let before = map.get_data();

        let mut bad = GraphData::sample();
        bad.nodes.push(bad.nodes[0].clone());
        assert_eq!(map.load_data(&bad), Err(GraphError::DuplicateNode(NodeId(1))));

        let mut bad = GraphData::sample();
        bad.nodes[1].y = f64::INFINITY;
        assert!(matches!(map.load_data(&bad), Err(GraphError::InvalidPosition { .. })));

        let mut bad = GraphData::sample();
        bad.nodes[2].id = NodeId(u64::MAX);
        assert_eq!(map.load_data(&bad), Err(GraphError::NodeIdOutOfRange(NodeId(u64::MAX))));

        let mut bad = GraphData::sample();
        bad.connections[0].id = ConnectionId(u64::MAX);
        assert_eq!(
            map.load_data(&bad),
            Err(GraphError::ConnectionIdOutOfRange(ConnectionId(u64::MAX)))
        );

        assert_eq!(map.get_data(), before);
    }

    #[test]
    fn zoom_emits_view_changed_with_percent() {
        let mut map = MindMap::new();
        let events = recorder(&mut map);
        map.zoom_in();
        let last = events.lock().unwrap().last().cloned().unwrap();
        match last {
            GraphEvent::ViewChanged(change) => assert_eq!(change.zoom_percent, 120),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
