pub mod error;
pub mod events;
pub mod geometry;
pub mod graph;
pub mod hit;
pub mod id;
pub mod model;
pub mod snapshot;
pub mod text;
pub mod viewport;
pub mod xml;

pub use error::GraphError;
pub use events::{EventBus, EventKind, GraphEvent, SubscriptionId, ViewChange};
pub use graph::MindMap;
pub use id::{ConnectionId, NodeId, UserId};
pub use model::*;
pub use snapshot::{GraphData, SnapshotError};
pub use viewport::ViewState;
pub use xml::FormatError;

// Re-export kurbo geometry types so downstream crates share one version.
pub use kurbo::{Affine, Line, Point, Rect, Size};
