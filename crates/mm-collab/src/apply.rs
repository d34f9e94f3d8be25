//! Replaying wire changes onto a graph.
//!
//! Adds carry their ids, so they go through the explicit-id insert paths
//! instead of the allocating `add_*` operations. A replayed add therefore
//! never depends on the receiver's selection or counters, and every replica
//! fed the same change sequence ends up with the same nodes and connections.

use crate::protocol::ChangeAction;
use mm_core::MindMap;

/// Apply one change. Returns `false` when the graph refused it (unknown
/// id, duplicate pair, last node).
pub fn apply_change(map: &mut MindMap, action: &ChangeAction) -> bool {
    let applied = match action {
        ChangeAction::NodeAdd { node } => map.insert_node(node.clone()),
        ChangeAction::NodeUpdate { node_id, updates } => map.update_node(*node_id, updates),
        ChangeAction::NodeDelete { node_id } => map.delete_node(*node_id),
        ChangeAction::ConnectionAdd { connection } => map.insert_connection(*connection).is_some(),
        ChangeAction::ConnectionDelete { connection_id } => map.delete_connection(*connection_id),
    };
    if !applied {
        log::debug!("remote {} not applied", action.name());
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::{Connection, ConnectionId, Node, NodeId, NodePatch, Selection};

    #[test]
    fn remote_add_ignores_local_selection() {
        let mut map = MindMap::new();
        assert_eq!(map.selection(), Selection::Node(NodeId(1)));
        let node = Node::new(NodeId(8), 10.0, 10.0, "remote", "#fff");
        assert!(apply_change(&mut map, &ChangeAction::NodeAdd { node }));
        assert_eq!(map.connection_count(), 0);
        assert_eq!(map.selection(), Selection::Node(NodeId(1)));
        assert_eq!(map.next_node_id(), NodeId(9));
    }

    #[test]
    fn each_action_reaches_the_graph() {
        let mut map = MindMap::new();
        let node = Node::new(NodeId(2), 300.0, 0.0, "b", "#fff");
        assert!(apply_change(&mut map, &ChangeAction::NodeAdd { node }));
        let connection = Connection::new(ConnectionId(5), NodeId(1), NodeId(2));
        assert!(apply_change(&mut map, &ChangeAction::ConnectionAdd { connection }));
        assert!(apply_change(
            &mut map,
            &ChangeAction::NodeUpdate {
                node_id: NodeId(2),
                updates: NodePatch::text("renamed"),
            }
        ));
        assert_eq!(map.node(NodeId(2)).unwrap().text, "renamed");
        assert!(apply_change(
            &mut map,
            &ChangeAction::ConnectionDelete {
                connection_id: ConnectionId(5)
            }
        ));
        assert!(apply_change(&mut map, &ChangeAction::NodeDelete { node_id: NodeId(2) }));
        assert!(!apply_change(&mut map, &ChangeAction::NodeDelete { node_id: NodeId(1) }));
        assert_eq!(map.node_count(), 1);
    }
}
