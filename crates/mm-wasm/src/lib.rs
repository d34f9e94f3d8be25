//! WASM bridge for Mindweave: exposes the mind-map editor to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The page owns the DOM: it
//! forwards canvas input here, calls `render` on animation frames, and
//! calls `pump` on a timer so queued socket callbacks and reconnects run.

mod render2d;
mod socket;

use mm_collab::{CollabSession, RoomTarget, SessionConfig};
use mm_core::{EventKind, GraphData, GraphEvent, NodeId, NodePatch, Point, UserId};
use mm_editor::{Editor, InputEvent, TouchPhase};
use mm_render::{DirtyFlag, Overlay, build_scene, paint_scene};
use render2d::CanvasPainter;
use socket::{SocketEvent, WebSocketConnector};
use std::sync::mpsc::{self, Receiver};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The canvas controller handed to JavaScript.
#[wasm_bindgen]
pub struct MindMapCanvas {
    editor: Editor<WebSocketConnector>,
    sockets: WebSocketConnector,
    dirty: DirtyFlag,
    /// Graph events waiting to be handed to JS listeners.
    events: Receiver<GraphEvent>,
    listeners: Vec<(EventKind, js_sys::Function)>,
    width: f64,
    height: f64,
}

#[wasm_bindgen]
impl MindMapCanvas {
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        console_error_panic_hook_setup();

        let mut editor = Editor::new();
        let dirty = DirtyFlag::attach_with(|handler| editor.on_any(handler));
        let (tx, events) = mpsc::channel();
        editor.on_any(move |event| {
            let _ = tx.send(event.clone());
        });

        Self {
            editor,
            sockets: WebSocketConnector::new(),
            dirty,
            events,
            listeners: Vec::new(),
            width,
            height,
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
        self.dirty.mark();
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Whether `render` would draw something new.
    pub fn needs_redraw(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn render(&mut self, ctx: &CanvasRenderingContext2d) {
        self.dirty.take();
        let overlay = Overlay {
            rubber_band: self.editor.rubber_band(),
            cursors: self
                .editor
                .remote_cursors(now_ms())
                .into_iter()
                .map(|c| (c.user_id, c.position))
                .collect(),
        };
        let scene = build_scene(self.editor.map(), &overlay);
        paint_scene(&mut CanvasPainter::new(ctx, self.width, self.height), &scene);
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle_pointer_down(&mut self, x: f64, y: f64) -> bool {
        self.input(InputEvent::pointer_down(x, y))
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.input(InputEvent::pointer_move(x, y))
    }

    pub fn handle_pointer_up(&mut self) -> bool {
        self.input(InputEvent::PointerUp)
    }

    pub fn handle_double_click(&mut self, x: f64, y: f64) -> bool {
        self.input(InputEvent::DoubleClick { x, y })
    }

    pub fn handle_wheel(&mut self, x: f64, y: f64, delta_y: f64) -> bool {
        self.input(InputEvent::Wheel { x, y, delta_y })
    }

    /// `phase` is `"start"`, `"move"`, `"end"`, or `"cancel"`; `(x, y)` is
    /// the first touch point.
    pub fn handle_touch(&mut self, phase: &str, touches: u32, x: f64, y: f64) -> bool {
        let Some(phase) = parse_touch_phase(phase) else {
            return false;
        };
        match InputEvent::from_touch(phase, touches as usize, x, y) {
            Some(event) => self.input(event),
            None => false,
        }
    }

    // ─── Commands ────────────────────────────────────────────────────────

    /// Add a node next to the selection. Returns its id, or `undefined`
    /// when editing is not allowed.
    pub fn add_node(&mut self, text: Option<String>, color: Option<String>) -> Option<u32> {
        let node = self
            .editor
            .add_node(None, text.as_deref(), color.as_deref(), now_ms());
        self.dispatch();
        node.and_then(|n| u32::try_from(n.id.0).ok())
    }

    pub fn add_node_at(&mut self, x: f64, y: f64, text: Option<String>) -> Option<u32> {
        let at = self.editor.map().to_model_coords(Point::new(x, y));
        let node = self.editor.add_node(Some(at), text.as_deref(), None, now_ms());
        self.dispatch();
        node.and_then(|n| u32::try_from(n.id.0).ok())
    }

    pub fn set_node_text(&mut self, id: u32, text: &str) -> bool {
        self.update(id, NodePatch::text(text))
    }

    pub fn set_node_color(&mut self, id: u32, color: &str) -> bool {
        self.update(id, NodePatch::default().color(color))
    }

    pub fn delete_selected(&mut self) -> bool {
        let ok = self.editor.delete_selected(now_ms());
        self.dispatch();
        ok
    }

    pub fn toggle_connect_mode(&mut self) -> bool {
        let ok = self.editor.toggle_connect_mode();
        self.dispatch();
        ok
    }

    pub fn is_connect_mode(&self) -> bool {
        self.editor.interaction().connect_mode()
    }

    pub fn zoom_in(&mut self) {
        self.editor.zoom_in();
        self.dispatch();
    }

    pub fn zoom_out(&mut self) {
        self.editor.zoom_out();
        self.dispatch();
    }

    pub fn reset_view(&mut self) {
        self.editor.reset_view();
        self.dispatch();
    }

    pub fn new_map(&mut self) -> bool {
        let ok = self.editor.new_map();
        self.dispatch();
        ok
    }

    pub fn can_edit(&self) -> bool {
        self.editor.can_edit()
    }

    pub fn permission(&self) -> String {
        self.editor.permission().as_str().to_string()
    }

    /// Selected node id, if any.
    pub fn selected_node(&self) -> Option<u32> {
        self.editor
            .map()
            .selected_node()
            .and_then(|n| u32::try_from(n.id.0).ok())
    }

    // ─── Files ───────────────────────────────────────────────────────────

    pub fn to_xml(&self) -> String {
        self.editor.to_xml()
    }

    /// Replace the graph from file contents. `false` when replacement is
    /// not allowed right now; throws on malformed input.
    pub fn load_xml(&mut self, xml: &str) -> Result<bool, JsValue> {
        let result = self.editor.load_xml(xml);
        self.dispatch();
        result.map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, JsValue> {
        self.editor
            .get_data()
            .to_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Compact MessagePack snapshot for local autosave.
    pub fn autosave(&self) -> Result<Vec<u8>, JsValue> {
        self.editor
            .get_data()
            .to_msgpack()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn restore(&mut self, bytes: &[u8]) -> Result<bool, JsValue> {
        let data = GraphData::from_msgpack(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let result = self.editor.load_data(&data);
        self.dispatch();
        result.map_err(|e| JsValue::from_str(&e.to_string()))
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Call `callback` with a JSON string for every `event_name` event.
    /// Returns `false` for unknown names.
    pub fn on(&mut self, event_name: &str, callback: js_sys::Function) -> bool {
        let Some(kind) = EventKind::from_name(event_name) else {
            log::warn!("unknown event name `{event_name}`");
            return false;
        };
        self.listeners.push((kind, callback));
        true
    }

    /// Drop every listener registered for `event_name`.
    pub fn off(&mut self, event_name: &str) {
        if let Some(kind) = EventKind::from_name(event_name) {
            self.listeners.retain(|(k, _)| *k != kind);
        }
    }

    // ─── Collaboration ───────────────────────────────────────────────────

    /// Join a room over `url`. Pass `share_code` to join by link, or
    /// `graph_id` to join a known graph.
    pub fn connect(
        &mut self,
        url: &str,
        user_id: &str,
        graph_id: Option<u32>,
        share_code: Option<String>,
    ) -> bool {
        let target = match (share_code, graph_id) {
            (Some(code), _) => RoomTarget::ShareCode(code),
            (None, Some(id)) => RoomTarget::Graph(u64::from(id)),
            (None, None) => return false,
        };
        let config = SessionConfig {
            url: url.to_string(),
            ..SessionConfig::default()
        };
        let session = CollabSession::new(config, self.sockets.clone(), UserId::intern(user_id));
        self.editor.attach_session(session);
        self.editor.connect(target, now_ms());
        self.dispatch();
        true
    }

    pub fn disconnect(&mut self) {
        self.editor.disconnect();
        self.dirty.mark();
        self.dispatch();
    }

    pub fn is_collaborating(&self) -> bool {
        self.editor.is_collaborating()
    }

    /// Feed queued socket callbacks to the session and fire due reconnects.
    /// Returns whether a redraw is needed.
    pub fn pump(&mut self, now_ms: f64) -> bool {
        let now = now_ms as u64;
        let mut reported = 0;
        for (epoch, event) in self.sockets.drain() {
            let events = match event {
                SocketEvent::Open => self.editor.handle_open(epoch),
                SocketEvent::Message(text) => self.editor.handle_frame(epoch, &text, now),
                SocketEvent::Close => self.editor.handle_close(epoch, now),
            };
            reported += events.len();
        }
        reported += self.editor.poll(now).len();
        if reported > 0 {
            // Presence changes draw without a graph event.
            self.dirty.mark();
        }
        self.dispatch();
        self.dirty.is_dirty()
    }
}

impl MindMapCanvas {
    fn input(&mut self, event: InputEvent) -> bool {
        let redraw = self.editor.handle_input(event, now_ms());
        self.dispatch();
        redraw || self.dirty.is_dirty()
    }

    fn update(&mut self, id: u32, patch: NodePatch) -> bool {
        let ok = self
            .editor
            .update_node(NodeId(u64::from(id)), &patch, now_ms());
        self.dispatch();
        ok
    }

    /// Hand queued graph events to JS listeners.
    fn dispatch(&self) {
        for event in self.events.try_iter() {
            let kind = event.kind();
            if !self.listeners.iter().any(|(k, _)| *k == kind) {
                continue;
            }
            let json = match serde_json::to_string(&event) {
                Ok(json) => JsValue::from_str(&json),
                Err(e) => {
                    log::error!("failed to encode {} event: {e}", kind.name());
                    continue;
                }
            };
            for (_, callback) in self.listeners.iter().filter(|(k, _)| *k == kind) {
                if let Err(e) = callback.call1(&JsValue::NULL, &json) {
                    log::warn!("{} listener threw: {e:?}", kind.name());
                }
            }
        }
    }
}

fn parse_touch_phase(phase: &str) -> Option<TouchPhase> {
    match phase {
        "start" => Some(TouchPhase::Start),
        "move" => Some(TouchPhase::Move),
        "end" => Some(TouchPhase::End),
        "cancel" => Some(TouchPhase::Cancel),
        _ => None,
    }
}

fn now_ms() -> u64 {
    js_sys::Date::now() as u64
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Mindweave WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone helpers (no canvas needed) ───────────────────────────────

/// Validate mind-map XML. Returns JSON: `{"ok":true,"nodes":N}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate_xml(source: &str) -> String {
    let report = match mm_core::xml::from_xml(source) {
        Ok(data) => serde_json::json!({ "ok": true, "nodes": data.nodes.len() }),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }),
    };
    report.to_string()
}
