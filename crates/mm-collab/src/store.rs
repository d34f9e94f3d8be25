//! Where the relay hub reads and persists graphs.

use crate::protocol::{Collaborator, Permission, RoomTarget};
use indexmap::IndexMap;
use mm_core::{GraphData, UserId};

/// Storage behind the relay hub.
pub trait GraphStore {
    /// Resolve a join target to a graph id.
    fn resolve(&self, target: &RoomTarget) -> Option<u64>;

    fn load(&self, graph_id: u64) -> Option<GraphData>;

    /// The user's access level, or `None` if access is denied. Takes the raw
    /// id from the client so that rejected users are never interned.
    fn access(&self, graph_id: u64, user_id: &str) -> Option<Permission>;

    fn save(&mut self, graph_id: u64, data: GraphData);

    fn collaborators(&self, graph_id: u64) -> Vec<Collaborator>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredGraph {
    pub title: String,
    pub owner: Option<UserId>,
    pub share_code: Option<String>,
    pub data: GraphData,
    /// Explicit per-user grants.
    pub grants: IndexMap<UserId, Permission>,
    /// Granted to everyone else. `None` keeps the graph private.
    pub default_permission: Option<Permission>,
}

impl StoredGraph {
    pub fn new(title: impl Into<String>, data: GraphData) -> Self {
        Self {
            title: title.into(),
            owner: None,
            share_code: None,
            data,
            grants: IndexMap::new(),
            default_permission: None,
        }
    }

    pub fn owned_by(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn shared_as(mut self, code: impl Into<String>) -> Self {
        self.share_code = Some(code.into());
        self
    }

    pub fn grant(mut self, user_id: UserId, permission: Permission) -> Self {
        self.grants.insert(user_id, permission);
        self
    }

    pub fn open_to_all(mut self, permission: Permission) -> Self {
        self.default_permission = Some(permission);
        self
    }

    /// Owner first, then explicit grants, then the default. An id that was
    /// never interned can only match the default.
    pub fn access(&self, user_id: &str) -> Option<Permission> {
        let Some(known) = UserId::lookup(user_id) else {
            return self.default_permission;
        };
        if self.owner == Some(known) {
            return Some(Permission::Owner);
        }
        self.grants.get(&known).copied().or(self.default_permission)
    }
}

/// Process-local store. Contents are lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    graphs: IndexMap<u64, StoredGraph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, graph_id: u64, graph: StoredGraph) {
        self.graphs.insert(graph_id, graph);
    }

    pub fn graph(&self, graph_id: u64) -> Option<&StoredGraph> {
        self.graphs.get(&graph_id)
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

impl GraphStore for MemoryStore {
    fn resolve(&self, target: &RoomTarget) -> Option<u64> {
        match target {
            RoomTarget::Graph(id) => self.graphs.contains_key(id).then_some(*id),
            RoomTarget::ShareCode(code) => self
                .graphs
                .iter()
                .find(|(_, g)| g.share_code.as_deref() == Some(code.as_str()))
                .map(|(id, _)| *id),
        }
    }

    fn load(&self, graph_id: u64) -> Option<GraphData> {
        self.graphs.get(&graph_id).map(|g| g.data.clone())
    }

    fn access(&self, graph_id: u64, user_id: &str) -> Option<Permission> {
        self.graphs.get(&graph_id)?.access(user_id)
    }

    fn save(&mut self, graph_id: u64, data: GraphData) {
        match self.graphs.get_mut(&graph_id) {
            Some(g) => g.data = data,
            None => log::warn!("save for unknown graph {graph_id}"),
        }
    }

    fn collaborators(&self, graph_id: u64) -> Vec<Collaborator> {
        let Some(graph) = self.graphs.get(&graph_id) else {
            return Vec::new();
        };
        graph
            .grants
            .iter()
            .map(|(user_id, permission)| Collaborator {
                user_id: *user_id,
                permission: *permission,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_prefers_owner_then_grant_then_default() {
        let owner = UserId::intern("owner");
        let editor = UserId::intern("editor");
        UserId::intern("stranger");
        let graph = StoredGraph::new("Plan", GraphData::sample())
            .owned_by(owner)
            .grant(editor, Permission::Edit);

        assert_eq!(graph.access("owner"), Some(Permission::Owner));
        assert_eq!(graph.access("editor"), Some(Permission::Edit));
        assert_eq!(graph.access("stranger"), None);

        let public = graph.open_to_all(Permission::View);
        assert_eq!(public.access("stranger"), Some(Permission::View));
    }

    #[test]
    fn checking_an_unknown_user_does_not_intern_it() {
        let graph = StoredGraph::new("Plan", GraphData::sample()).owned_by(UserId::intern("owner"));
        assert_eq!(graph.access("never-seen-before"), None);
        assert_eq!(UserId::lookup("never-seen-before"), None);

        let public = graph.open_to_all(Permission::Edit);
        assert_eq!(public.access("never-seen-before"), Some(Permission::Edit));
        assert_eq!(UserId::lookup("never-seen-before"), None);
    }

    #[test]
    fn share_codes_resolve() {
        let mut store = MemoryStore::new();
        store.insert(7, StoredGraph::new("Roadmap", GraphData::sample()).shared_as("roadmap"));
        assert_eq!(store.resolve(&RoomTarget::ShareCode("roadmap".into())), Some(7));
        assert_eq!(store.resolve(&RoomTarget::ShareCode("nope".into())), None);
        assert_eq!(store.resolve(&RoomTarget::Graph(7)), Some(7));
        assert_eq!(store.resolve(&RoomTarget::Graph(8)), None);
    }
}
