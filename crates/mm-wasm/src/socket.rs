//! Browser `WebSocket` channel for the collaboration session.
//!
//! Socket callbacks fire from the JS event loop, outside any call into the
//! canvas. They only push `(epoch, event)` onto a shared queue; the canvas
//! drains it in `pump` and feeds the session.

use mm_collab::{Channel, CollabError, Connector};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Open,
    Message(String),
    Close,
}

type Inbox = Rc<RefCell<VecDeque<(u64, SocketEvent)>>>;

/// Opens browser sockets. Clones share one inbox.
#[derive(Clone, Default)]
pub struct WebSocketConnector {
    inbox: Inbox,
}

impl WebSocketConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every queued callback, oldest first.
    pub fn drain(&self) -> Vec<(u64, SocketEvent)> {
        self.inbox.borrow_mut().drain(..).collect()
    }
}

impl Connector for WebSocketConnector {
    type Channel = WebSocketChannel;

    fn connect(&mut self, url: &str, epoch: u64) -> Result<WebSocketChannel, CollabError> {
        let socket = WebSocket::new(url).map_err(|e| CollabError::Transport(describe(&e)))?;

        let inbox = Rc::clone(&self.inbox);
        let on_open = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            inbox.borrow_mut().push_back((epoch, SocketEvent::Open));
        });

        let inbox = Rc::clone(&self.inbox);
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            match event.data().as_string() {
                Some(text) => inbox.borrow_mut().push_back((epoch, SocketEvent::Message(text))),
                None => log::warn!("ignoring binary frame on channel {epoch}"),
            }
        });

        let inbox = Rc::clone(&self.inbox);
        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            log::debug!("channel {epoch} closed with code {}", event.code());
            inbox.borrow_mut().push_back((epoch, SocketEvent::Close));
        });

        // Browsers follow every error with a close event.
        let on_error = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            log::warn!("channel {epoch} reported an error");
        });

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        Ok(WebSocketChannel {
            socket,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        })
    }
}

/// An open socket plus the callbacks registered on it. The callbacks live
/// exactly as long as the channel.
pub struct WebSocketChannel {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl WebSocketChannel {
    fn detach(&self) {
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        self.socket.set_onerror(None);
    }
}

impl Channel for WebSocketChannel {
    fn send(&mut self, text: &str) -> Result<(), CollabError> {
        self.socket
            .send_with_str(text)
            .map_err(|e| CollabError::Transport(describe(&e)))
    }

    fn close(&mut self) {
        self.detach();
        let _ = self.socket.close();
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
