//! WebSocket glue around the collaboration hub.
//!
//! One task owns the `Hub`. Socket tasks never touch room state; they send
//! `Command`s over an unbounded channel and receive outgoing frames on a
//! per-socket channel registered at connect time.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use mm_collab::{ClientId, GraphStore, Hub, Outbound};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug)]
pub enum Command {
    Connect {
        client: ClientId,
        outgoing: UnboundedSender<String>,
    },
    Frame {
        client: ClientId,
        text: String,
    },
    Disconnect {
        client: ClientId,
    },
}

/// Cheap handle shared by all socket tasks.
#[derive(Clone)]
pub struct Relay {
    commands: UnboundedSender<Command>,
    next_client: Arc<AtomicU64>,
}

impl Relay {
    /// Spawn the hub task.
    pub fn spawn<S>(hub: Hub<S>) -> Self
    where
        S: GraphStore + Send + 'static,
    {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(hub, rx));
        Self {
            commands,
            next_client: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn next_client_id(&self) -> ClientId {
        self.next_client.fetch_add(1, Ordering::Relaxed)
    }

    pub fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            log::error!("hub task is gone");
        }
    }
}

/// The hub loop. Ends when every `Relay` handle is dropped.
pub async fn run<S: GraphStore>(mut hub: Hub<S>, mut commands: UnboundedReceiver<Command>) {
    let mut sockets: HashMap<ClientId, UnboundedSender<String>> = HashMap::new();
    while let Some(command) = commands.recv().await {
        let out = match command {
            Command::Connect { client, outgoing } => {
                log::debug!("client {client} connected");
                sockets.insert(client, outgoing);
                continue;
            }
            Command::Frame { client, text } => hub.handle_frame(client, &text, now_ms()),
            Command::Disconnect { client } => {
                log::debug!("client {client} disconnected");
                sockets.remove(&client);
                hub.disconnect(client)
            }
        };
        deliver(&sockets, out);
    }
    log::info!("hub stopped with {} open rooms", hub.room_count());
}

fn deliver(sockets: &HashMap<ClientId, UnboundedSender<String>>, out: Vec<Outbound>) {
    for Outbound { to, message } in out {
        let Some(socket) = sockets.get(&to) else {
            continue;
        };
        match message.to_json() {
            Ok(text) => {
                let _ = socket.send(text);
            }
            Err(e) => log::error!("failed to encode message for client {to}: {e}"),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ─── HTTP ────────────────────────────────────────────────────────────────

pub async fn ws_handler(ws: WebSocketUpgrade, State(relay): State<Relay>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, relay))
}

async fn serve_socket(socket: WebSocket, relay: Relay) {
    let client = relay.next_client_id();
    let (mut sink, mut stream) = socket.split();
    let (outgoing, mut frames) = mpsc::unbounded_channel::<String>();
    relay.send(Command::Connect { client, outgoing });

    let mut writer = tokio::spawn(async move {
        while let Some(text) = frames.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let inbound = relay.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => inbound.send(Command::Frame {
                    client,
                    text: text.as_str().to_owned(),
                }),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }
    relay.send(Command::Disconnect { client });
}
