//! Redraw tracking driven by graph events.

use mm_core::events::Handler;
use mm_core::{EventKind, GraphEvent, MindMap, SubscriptionId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set whenever the graph emits an event that changes what is drawn.
///
/// The flag starts dirty so the first frame is always painted.
#[derive(Debug, Clone)]
pub struct DirtyFlag {
    dirty: Arc<AtomicBool>,
    subscription: SubscriptionId,
}

impl DirtyFlag {
    /// Subscribe to `map`.
    pub fn attach(map: &mut MindMap) -> Self {
        Self::attach_with(|handler| map.on_any(handler))
    }

    /// Subscribe through any `on_any`-style registration, e.g. an editor
    /// that owns the map.
    pub fn attach_with(subscribe: impl FnOnce(Handler) -> SubscriptionId) -> Self {
        let dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&dirty);
        let subscription = subscribe(Box::new(move |event| {
            if affects_drawing(event) {
                flag.store(true, Ordering::Relaxed);
            }
        }));
        Self { dirty, subscription }
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }

    /// Unsubscribe from `map`.
    pub fn detach(&self, map: &mut MindMap) -> bool {
        map.off(self.subscription)
    }

    /// Force a redraw, e.g. when overlay state changed.
    pub fn mark(&self) {
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// Whether a redraw is due; clears the flag.
    pub fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::Relaxed)
    }
}

/// UI-only events leave the picture unchanged.
pub fn affects_drawing(event: &GraphEvent) -> bool {
    !matches!(
        event.kind(),
        EventKind::StatusUpdate
            | EventKind::DebugInfo
            | EventKind::NodeDoubleClick
            | EventKind::ConnectionModeChange
    )
}
