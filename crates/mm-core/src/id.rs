use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Integer id of a node. Allocated monotonically by the graph, never reused
/// within a session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Integer id of a connection.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl NodeId {
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id after this one. `None` for `u64::MAX`, which therefore can
    /// never be stored: the graph must always have a next id to hand out.
    pub const fn next(self) -> Option<NodeId> {
        match self.0.checked_add(1) {
            Some(n) => Some(NodeId(n)),
            None => None,
        }
    }
}

impl ConnectionId {
    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn next(self) -> Option<ConnectionId> {
        match self.0.checked_add(1) {
            Some(n) => Some(ConnectionId(n)),
            None => None,
        }
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global string interner for user ids.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Interned identifier of a collaboration participant. Internally a 4-byte
/// `Spur` index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(Spur);

impl UserId {
    /// Intern a user id, or return the existing handle if already interned.
    pub fn intern(s: &str) -> Self {
        UserId(INTERNER.get_or_intern(s))
    }

    /// The handle of an already interned id. Never interns.
    pub fn lookup(s: &str) -> Option<Self> {
        INTERNER.get(s).map(UserId)
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user:{}", self.as_str())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(UserId::intern(&s))
    }
}
