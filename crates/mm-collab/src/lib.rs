pub mod apply;
pub mod error;
pub mod hub;
pub mod memory;
pub mod presence;
pub mod protocol;
pub mod session;
pub mod store;

pub use apply::apply_change;
pub use error::CollabError;
pub use hub::{ClientId, Hub, Outbound};
pub use memory::{MemoryChannel, MemoryConnector};
pub use presence::{Presence, RemoteCursor};
pub use protocol::{
    ActiveUser, ChangeAction, ClientMessage, Collaborator, CursorMove, GraphChange, JoinRoom,
    Permission, RoomTarget, ServerMessage, UserActivity,
};
pub use session::{Channel, CollabSession, Connector, SessionConfig, SessionEvent, SessionState};
pub use store::{GraphStore, MemoryStore, StoredGraph};
