//! Synchronous multi-subscriber event registry.
//!
//! The graph never reaches outward: the UI shell, the render adapter, and
//! the collaboration bridge subscribe here and react to what the model
//! reports. Dispatch runs in registration order, inside the mutation call
//! that produced the event.

use crate::id::NodeId;
use crate::model::{Connection, Node, NodePatch, Selection};
use serde::Serialize;

/// Viewport state reported to subscribers after every zoom/pan change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewChange {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    /// Zoom rounded to a whole percentage, for on-screen display.
    pub zoom_percent: u32,
}

/// Everything the graph model can report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum GraphEvent {
    NodeAdded(Node),
    /// `node` is the state after the update; `patch` is what changed.
    NodeUpdated { node: Node, patch: NodePatch },
    NodeDeleted { id: NodeId },
    ConnectionAdded(Connection),
    ConnectionDeleted(Connection),
    SelectionChanged(Selection),
    NodeSelected(Option<Node>),
    ConnectionSelected(Option<Connection>),
    NodeDoubleClick(Node),
    ConnectionModeChange(bool),
    ViewChanged(ViewChange),
    /// The whole graph was replaced (`clear` or `load_data`).
    Reset { nodes: usize, connections: usize },
    StatusUpdate(String),
    DebugInfo(String),
}

/// Discriminant of `GraphEvent`, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NodeAdded,
    NodeUpdated,
    NodeDeleted,
    ConnectionAdded,
    ConnectionDeleted,
    SelectionChanged,
    NodeSelected,
    ConnectionSelected,
    NodeDoubleClick,
    ConnectionModeChange,
    ViewChanged,
    Reset,
    StatusUpdate,
    DebugInfo,
}

impl EventKind {
    pub const ALL: [EventKind; 14] = [
        EventKind::NodeAdded,
        EventKind::NodeUpdated,
        EventKind::NodeDeleted,
        EventKind::ConnectionAdded,
        EventKind::ConnectionDeleted,
        EventKind::SelectionChanged,
        EventKind::NodeSelected,
        EventKind::ConnectionSelected,
        EventKind::NodeDoubleClick,
        EventKind::ConnectionModeChange,
        EventKind::ViewChanged,
        EventKind::Reset,
        EventKind::StatusUpdate,
        EventKind::DebugInfo,
    ];

    /// camelCase name used by the UI shell.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::NodeAdded => "nodeAdded",
            EventKind::NodeUpdated => "nodeUpdated",
            EventKind::NodeDeleted => "nodeDeleted",
            EventKind::ConnectionAdded => "connectionAdded",
            EventKind::ConnectionDeleted => "connectionDeleted",
            EventKind::SelectionChanged => "selectionChanged",
            EventKind::NodeSelected => "nodeSelected",
            EventKind::ConnectionSelected => "connectionSelected",
            EventKind::NodeDoubleClick => "nodeDoubleClick",
            EventKind::ConnectionModeChange => "connectionModeChange",
            EventKind::ViewChanged => "viewChanged",
            EventKind::Reset => "reset",
            EventKind::StatusUpdate => "statusUpdate",
            EventKind::DebugInfo => "debugInfo",
        }
    }

    /// Parse a camelCase event name. `zoomChange` is accepted as an alias
    /// of `viewChanged`.
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "zoomChange" {
            return Some(EventKind::ViewChanged);
        }
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl GraphEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GraphEvent::NodeAdded(_) => EventKind::NodeAdded,
            GraphEvent::NodeUpdated { .. } => EventKind::NodeUpdated,
            GraphEvent::NodeDeleted { .. } => EventKind::NodeDeleted,
            GraphEvent::ConnectionAdded(_) => EventKind::ConnectionAdded,
            GraphEvent::ConnectionDeleted(_) => EventKind::ConnectionDeleted,
            GraphEvent::SelectionChanged(_) => EventKind::SelectionChanged,
            GraphEvent::NodeSelected(_) => EventKind::NodeSelected,
            GraphEvent::ConnectionSelected(_) => EventKind::ConnectionSelected,
            GraphEvent::NodeDoubleClick(_) => EventKind::NodeDoubleClick,
            GraphEvent::ConnectionModeChange(_) => EventKind::ConnectionModeChange,
            GraphEvent::ViewChanged(_) => EventKind::ViewChanged,
            GraphEvent::Reset { .. } => EventKind::Reset,
            GraphEvent::StatusUpdate(_) => EventKind::StatusUpdate,
            GraphEvent::DebugInfo(_) => EventKind::DebugInfo,
        }
    }

    /// Structural graph changes a user can be credited with. These are the
    /// events the collaboration layer relays.
    pub fn is_structural_change(&self) -> bool {
        matches!(
            self,
            GraphEvent::NodeAdded(_)
                | GraphEvent::NodeUpdated { .. }
                | GraphEvent::NodeDeleted { .. }
                | GraphEvent::ConnectionAdded(_)
                | GraphEvent::ConnectionDeleted(_)
        )
    }
}

pub type Handler = Box<dyn FnMut(&GraphEvent) + Send>;

/// Handle returned by `EventBus::on`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    kind: Option<EventKind>,
    handler: Handler,
}

/// The observer registry.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event.
    pub fn on(&mut self, kind: EventKind, handler: impl FnMut(&GraphEvent) + Send + 'static) -> SubscriptionId {
        self.subscribe(Some(kind), Box::new(handler))
    }

    /// Subscribe to every event.
    pub fn on_any(&mut self, handler: impl FnMut(&GraphEvent) + Send + 'static) -> SubscriptionId {
        self.subscribe(None, Box::new(handler))
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: &GraphEvent) {
        let kind = event.kind();
        for sub in &mut self.subscribers {
            if sub.kind.is_none_or(|k| k == kind) {
                (sub.handler)(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    fn subscribe(&mut self, kind: Option<EventKind>, handler: Handler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers.push(Subscriber { id, kind, handler });
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
