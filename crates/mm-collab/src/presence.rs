//! Remote cursor bookkeeping.
//!
//! Entries are only ever replaced or removed explicitly. Staleness is a
//! read-time filter: `visible` skips cursors idle longer than the window,
//! and they come back as soon as a fresh position arrives.

use indexmap::IndexMap;
use mm_core::{Point, UserId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorEntry {
    pub position: Point,
    pub last_seen_ms: u64,
}

/// A cursor that should currently be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteCursor {
    pub user_id: UserId,
    /// Model-space position.
    pub position: Point,
}

#[derive(Debug, Clone, Default)]
pub struct Presence {
    cursors: IndexMap<UserId, CursorEntry>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, user_id: UserId, position: Point, now_ms: u64) {
        self.cursors.insert(
            user_id,
            CursorEntry {
                position,
                last_seen_ms: now_ms,
            },
        );
    }

    pub fn remove(&mut self, user_id: UserId) -> bool {
        self.cursors.shift_remove(&user_id).is_some()
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }

    pub fn get(&self, user_id: UserId) -> Option<&CursorEntry> {
        self.cursors.get(&user_id)
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Cursors updated within `idle_ms` of `now_ms`, in first-seen order.
    pub fn visible(&self, now_ms: u64, idle_ms: u64) -> Vec<RemoteCursor> {
        self.cursors
            .iter()
            .filter(|(_, e)| now_ms.saturating_sub(e.last_seen_ms) <= idle_ms)
            .map(|(user_id, e)| RemoteCursor {
                user_id: *user_id,
                position: e.position,
            })
            .collect()
    }
}
