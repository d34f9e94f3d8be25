//! Client-side collaboration session.
//!
//! The session owns no sockets and no timers. The host hands it a
//! `Connector`, forwards channel callbacks (`handle_open`, `handle_frame`,
//! `handle_close`), and calls `poll` when `next_deadline` comes due. Every
//! entry point returns the `SessionEvent`s the host should act on.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──graph_data──▶ Joined
//!      ▲                        │                        │
//!      └──────── close (retry up to N times, N×base ms) ─┘
//! ```
//!
//! Each opened channel gets a new epoch. Callbacks carrying an older epoch
//! belong to a channel that was already replaced or torn down and are
//! ignored.

use crate::error::CollabError;
use crate::presence::{Presence, RemoteCursor};
use crate::protocol::{
    ActiveUser, ChangeAction, ClientMessage, Collaborator, CursorMove, GraphChange, JoinRoom,
    Permission, RoomTarget, ServerMessage, UserActivity,
};
use mm_core::{GraphData, GraphEvent, NodeId, Point, UserId};

/// A bidirectional text channel, e.g. a WebSocket.
pub trait Channel {
    fn send(&mut self, text: &str) -> Result<(), CollabError>;
    fn close(&mut self);
}

/// Opens channels. `epoch` must be passed back with every callback of the
/// returned channel.
pub trait Connector {
    type Channel: Channel;

    fn connect(&mut self, url: &str, epoch: u64) -> Result<Self::Channel, CollabError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub url: String,
    pub max_reconnect_attempts: u32,
    /// Retry `n` waits `n * reconnect_base_delay_ms`.
    pub reconnect_base_delay_ms: u64,
    /// Remote cursors idle longer than this are hidden.
    pub cursor_idle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:3000/ws".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay_ms: 1000,
            cursor_idle_ms: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Channel requested or open, snapshot not yet received.
    Connecting,
    Joined,
}

/// What the host should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Channel open, `join_room` sent.
    Opened,
    /// Room snapshot: load it and apply the permission.
    Snapshot { graph: GraphData, permission: Permission },
    /// A change made by someone else. Own echoes never surface here.
    RemoteChange(GraphChange),
    UserJoined { user_id: UserId, collaborators: Vec<Collaborator> },
    UserLeft { user_id: UserId },
    ActiveUsers(Vec<ActiveUser>),
    CursorMoved { user_id: UserId, position: Point },
    Activity(UserActivity),
    /// Server-reported or protocol error. Never retried.
    Error(String),
    /// The channel closed; `retry_in_ms` is set when a reconnect is scheduled.
    Closed { retry_in_ms: Option<u64> },
    Reconnecting { attempt: u32 },
    /// Retries exhausted; only an explicit `connect` starts over.
    GaveUp,
}

pub struct CollabSession<C: Connector> {
    config: SessionConfig,
    connector: C,
    user_id: UserId,
    target: Option<RoomTarget>,
    channel: Option<C::Channel>,
    channel_open: bool,
    epoch: u64,
    state: SessionState,
    permission: Option<Permission>,
    reconnect_attempts: u32,
    reconnect_at: Option<u64>,
    presence: Presence,
}

impl<C: Connector> CollabSession<C> {
    pub fn new(config: SessionConfig, connector: C, user_id: UserId) -> Self {
        Self {
            config,
            connector,
            user_id,
            target: None,
            channel: None,
            channel_open: false,
            epoch: 0,
            state: SessionState::Disconnected,
            permission: None,
            reconnect_attempts: 0,
            reconnect_at: None,
            presence: Presence::new(),
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_joined(&self) -> bool {
        self.state == SessionState::Joined
    }

    /// Permission granted by the last snapshot.
    pub fn permission(&self) -> Option<Permission> {
        self.permission
    }

    pub fn target(&self) -> Option<&RoomTarget> {
        self.target.as_ref()
    }

    /// Epoch of the current (or most recent) channel.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// When `poll` next has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        self.reconnect_at
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    pub fn visible_cursors(&self, now_ms: u64) -> Vec<RemoteCursor> {
        self.presence.visible(now_ms, self.config.cursor_idle_ms)
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Open a channel to the room. Any existing or pending channel is
    /// force-closed first and a scheduled reconnect is cancelled.
    pub fn connect(&mut self, target: RoomTarget, now_ms: u64) -> Vec<SessionEvent> {
        self.drop_channel();
        self.reconnect_at = None;
        self.reconnect_attempts = 0;
        self.permission = None;
        self.target = Some(target);
        self.open_channel(now_ms)
    }

    /// Leave the room and close the channel. No reconnect follows.
    pub fn disconnect(&mut self) {
        if self.channel_open {
            self.send(&ClientMessage::LeaveRoom);
        }
        self.drop_channel();
        self.reconnect_at = None;
        self.reconnect_attempts = 0;
        self.target = None;
        self.permission = None;
        self.presence.clear();
        self.state = SessionState::Disconnected;
        log::debug!("collaboration session disconnected");
    }

    pub fn handle_open(&mut self, epoch: u64) -> Vec<SessionEvent> {
        if !self.is_current(epoch, "open") {
            return Vec::new();
        }
        self.channel_open = true;
        self.reconnect_attempts = 0;
        let Some(target) = &self.target else {
            return Vec::new();
        };
        let join = ClientMessage::JoinRoom(JoinRoom::new(target, self.user_id));
        self.send(&join);
        vec![SessionEvent::Opened]
    }

    pub fn handle_frame(&mut self, epoch: u64, text: &str, now_ms: u64) -> Vec<SessionEvent> {
        if !self.is_current(epoch, "frame") {
            return Vec::new();
        }
        let message = match ServerMessage::from_json(text) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("ignoring malformed frame: {e}");
                return vec![SessionEvent::Error(e.to_string())];
            }
        };

        let event = match message {
            ServerMessage::GraphChange(change) => {
                if change.user_id == self.user_id {
                    log::trace!("dropping own echo of {}", change.action.name());
                    return Vec::new();
                }
                SessionEvent::RemoteChange(change)
            }
            ServerMessage::GraphData { graph, permission } => {
                self.state = SessionState::Joined;
                self.permission = Some(permission);
                log::debug!("joined room as {}", permission.as_str());
                SessionEvent::Snapshot { graph, permission }
            }
            ServerMessage::UserJoined { user_id, collaborators } => {
                SessionEvent::UserJoined { user_id, collaborators }
            }
            ServerMessage::UserLeft { user_id } => {
                self.presence.remove(user_id);
                SessionEvent::UserLeft { user_id }
            }
            ServerMessage::ActiveUsers(users) => SessionEvent::ActiveUsers(
                users.into_iter().filter(|u| u.user_id != self.user_id).collect(),
            ),
            ServerMessage::CursorMove(m) => {
                if m.user_id == self.user_id {
                    return Vec::new();
                }
                let position = Point::new(m.x, m.y);
                self.presence.update(m.user_id, position, now_ms);
                SessionEvent::CursorMoved {
                    user_id: m.user_id,
                    position,
                }
            }
            ServerMessage::UserActivity(activity) => {
                if activity.user_id == self.user_id {
                    return Vec::new();
                }
                SessionEvent::Activity(activity)
            }
            ServerMessage::Error { message } => {
                log::warn!("server error: {message}");
                SessionEvent::Error(message)
            }
        };
        vec![event]
    }

    /// The channel closed (or failed). Schedules a bounded retry.
    pub fn handle_close(&mut self, epoch: u64, now_ms: u64) -> Vec<SessionEvent> {
        if !self.is_current(epoch, "close") {
            return Vec::new();
        }
        self.channel = None;
        self.channel_open = false;
        self.state = SessionState::Disconnected;
        self.transport_lost(now_ms)
    }

    /// Fire a due reconnect.
    pub fn poll(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        match self.reconnect_at {
            Some(at) if at <= now_ms => {
                self.reconnect_at = None;
                log::debug!("reconnect attempt {}", self.reconnect_attempts);
                let mut events = vec![SessionEvent::Reconnecting {
                    attempt: self.reconnect_attempts,
                }];
                events.extend(self.open_channel(now_ms));
                events
            }
            _ => Vec::new(),
        }
    }

    // ─── Outbound ────────────────────────────────────────────────────────

    /// Broadcast a local graph event. Returns `true` if a `graph_change`
    /// was sent.
    pub fn broadcast(&mut self, event: &GraphEvent, now_ms: u64) -> bool {
        match ChangeAction::from_event(event) {
            Some(action) => self.send_change(action, now_ms),
            None => false,
        }
    }

    pub fn send_change(&mut self, action: ChangeAction, now_ms: u64) -> bool {
        if !self.is_joined() {
            return false;
        }
        self.send(&ClientMessage::GraphChange(GraphChange {
            user_id: self.user_id,
            timestamp: now_ms,
            action,
        }))
    }

    /// Share the local pointer position (model space).
    pub fn send_cursor(&mut self, position: Point, now_ms: u64) -> bool {
        if !self.is_joined() {
            return false;
        }
        self.send(&ClientMessage::CursorMove(CursorMove {
            user_id: self.user_id,
            x: position.x,
            y: position.y,
            timestamp: now_ms,
        }))
    }

    pub fn send_activity(&mut self, activity: &str, node_id: Option<NodeId>, now_ms: u64) -> bool {
        if !self.is_joined() {
            return false;
        }
        self.send(&ClientMessage::UserActivity(UserActivity {
            user_id: self.user_id,
            activity: activity.to_string(),
            node_id,
            timestamp: now_ms,
        }))
    }

    // ─── Internals ───────────────────────────────────────────────────────

    fn open_channel(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        self.epoch += 1;
        self.channel_open = false;
        self.state = SessionState::Connecting;
        match self.connector.connect(&self.config.url, self.epoch) {
            Ok(channel) => {
                self.channel = Some(channel);
                Vec::new()
            }
            Err(e) => {
                log::warn!("could not open channel: {e}");
                self.state = SessionState::Disconnected;
                self.transport_lost(now_ms)
            }
        }
    }

    fn transport_lost(&mut self, now_ms: u64) -> Vec<SessionEvent> {
        if self.target.is_none() {
            return vec![SessionEvent::Closed { retry_in_ms: None }];
        }
        if self.reconnect_attempts >= self.config.max_reconnect_attempts {
            log::warn!(
                "giving up after {} reconnect attempts",
                self.reconnect_attempts
            );
            return vec![SessionEvent::Closed { retry_in_ms: None }, SessionEvent::GaveUp];
        }
        self.reconnect_attempts += 1;
        let delay = u64::from(self.reconnect_attempts) * self.config.reconnect_base_delay_ms;
        self.reconnect_at = Some(now_ms.saturating_add(delay));
        vec![SessionEvent::Closed {
            retry_in_ms: Some(delay),
        }]
    }

    fn drop_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.channel_open = false;
        // Orphan any callbacks still in flight for the old channel.
        self.epoch += 1;
    }

    fn is_current(&self, epoch: u64, what: &str) -> bool {
        let current = epoch == self.epoch && self.channel.is_some();
        if !current {
            log::warn!("ignoring stale {what} for channel epoch {epoch} (current {})", self.epoch);
        }
        current
    }

    fn send(&mut self, message: &ClientMessage) -> bool {
        if !self.channel_open {
            return false;
        }
        let Some(channel) = self.channel.as_mut() else {
            return false;
        };
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                log::warn!("{e}");
                return false;
            }
        };
        match channel.send(&text) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("send failed: {e}");
                false
            }
        }
    }
}

impl<C: Connector> std::fmt::Debug for CollabSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollabSession")
            .field("user_id", &self.user_id)
            .field("state", &self.state)
            .field("epoch", &self.epoch)
            .field("target", &self.target)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .field("reconnect_at", &self.reconnect_at)
            .finish()
    }
}
