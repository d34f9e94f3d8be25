//! Pointer interaction state machine.
//!
//! Translates normalized input into graph operations: selecting, dragging
//! nodes, panning, wheel zoom, and the two-click connect gesture. The
//! machine owns only transient gesture state. Everything persistent lives
//! in the `MindMap`, which reports changes through its event bus.
//!
//! ## Connect mode
//!
//! | Armed node | Click on      | Result                                   |
//! |------------|---------------|------------------------------------------|
//! | none       | node `a`      | arm `a`, select it                       |
//! | `a`        | `a`           | disarm                                   |
//! | `a`        | node `b`      | `add_connection(a, b)`, disarm either way |
//! | any        | empty space   | disarm, clear selection, pan             |

use crate::input::{InputEvent, wheel_factor};
use kurbo::Vec2;
use mm_core::hit::CONNECTION_TOLERANCE;
use mm_core::{GraphEvent, Line, MindMap, NodeId, Point};

/// Observable state, as described to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    DraggingNode,
    Panning,
    /// Connect mode is on and no drag or pan is in progress.
    Connecting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    /// `offset` is pointer minus node center at grab time, in model space.
    DraggingNode { id: NodeId, offset: Vec2 },
    /// `anchor` is the screen pointer minus the pan at grab time.
    Panning { anchor: Vec2 },
}

#[derive(Debug, Clone)]
pub struct Interaction {
    gesture: Gesture,
    connect_mode: bool,
    connecting_from: Option<NodeId>,
    /// Last pointer position in model space.
    pointer: Option<Point>,
    editable: bool,
}

impl Default for Interaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Interaction {
    pub fn new() -> Self {
        Self {
            gesture: Gesture::Idle,
            connect_mode: false,
            connecting_from: None,
            pointer: None,
            editable: true,
        }
    }

    pub fn state(&self) -> InteractionState {
        match self.gesture {
            Gesture::DraggingNode { .. } => InteractionState::DraggingNode,
            Gesture::Panning { .. } => InteractionState::Panning,
            Gesture::Idle if self.connect_mode => InteractionState::Connecting,
            Gesture::Idle => InteractionState::Idle,
        }
    }

    pub fn connect_mode(&self) -> bool {
        self.connect_mode
    }

    pub fn connecting_from(&self) -> Option<NodeId> {
        self.connecting_from
    }

    pub fn pointer(&self) -> Option<Point> {
        self.pointer
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Switch between editing and view-only. Leaving edit mode drops any
    /// drag in progress and turns connect mode off.
    pub fn set_editable(&mut self, map: &mut MindMap, editable: bool) {
        self.editable = editable;
        if editable {
            return;
        }
        if matches!(self.gesture, Gesture::DraggingNode { .. }) {
            self.gesture = Gesture::Idle;
        }
        if self.connect_mode {
            self.set_connect_mode(map, false);
        }
    }

    /// Flip connect mode. Refused in view-only mode.
    pub fn toggle_connect_mode(&mut self, map: &mut MindMap) -> bool {
        if !self.editable {
            return false;
        }
        self.set_connect_mode(map, !self.connect_mode);
        true
    }

    fn set_connect_mode(&mut self, map: &mut MindMap, on: bool) {
        self.connect_mode = on;
        self.connecting_from = None;
        map.emit(GraphEvent::ConnectionModeChange(on));
    }

    /// Line from the armed node to the pointer, in model space.
    pub fn rubber_band(&self, map: &MindMap) -> Option<Line> {
        let from = map.node(self.connecting_from?)?;
        Some(Line::new(from.center(), self.pointer?))
    }

    /// Feed one input event. Returns whether the picture may have changed.
    pub fn handle(&mut self, map: &mut MindMap, event: InputEvent) -> bool {
        match event {
            InputEvent::PointerDown { x, y } => self.pointer_down(map, Point::new(x, y)),
            InputEvent::PointerMove { x, y } => self.pointer_move(map, Point::new(x, y)),
            InputEvent::PointerUp => self.pointer_up(map),
            InputEvent::DoubleClick { x, y } => {
                let p = map.to_model_coords(Point::new(x, y));
                if let Some(id) = map.node_at(p).map(|n| n.id) {
                    map.node_double_clicked(id);
                }
                false
            }
            InputEvent::Wheel { x, y, delta_y } => {
                let before = map.view().zoom;
                map.zoom_at_point(Point::new(x, y), wheel_factor(delta_y));
                let zoom = map.view().zoom;
                if zoom == before {
                    return false;
                }
                map.debug_info(format!(
                    "Zoom: {}% at ({}, {})",
                    (zoom * 100.0).round(),
                    x.round(),
                    y.round()
                ));
                true
            }
        }
    }

    // ─── Pointer handlers ────────────────────────────────────────────────

    fn pointer_down(&mut self, map: &mut MindMap, screen: Point) -> bool {
        let p = map.to_model_coords(screen);
        self.pointer = Some(p);

        if let Some((id, center)) = map.node_at(p).map(|n| (n.id, n.center())) {
            if self.connect_mode {
                self.connect_click(map, id);
            } else {
                map.select_node(id);
                if self.editable {
                    self.gesture = Gesture::DraggingNode { id, offset: p - center };
                    map.debug_info(format!("Dragging: Node {id}"));
                }
            }
            return true;
        }

        if let Some(conn) = map.connection_at(p, CONNECTION_TOLERANCE).map(|c| c.id) {
            map.select_connection(conn);
            return true;
        }

        self.connecting_from = None;
        map.clear_selection();
        self.gesture = Gesture::Panning {
            anchor: screen.to_vec2() - map.view().pan(),
        };
        map.debug_info("Panning canvas");
        true
    }

    fn connect_click(&mut self, map: &mut MindMap, id: NodeId) {
        match self.connecting_from {
            None => {
                self.connecting_from = Some(id);
                map.select_node(id);
                map.debug_info(format!("Connecting from Node {id}"));
            }
            Some(from) if from == id => {
                self.connecting_from = None;
                map.debug_info("Connection cancelled");
            }
            Some(from) => {
                self.connecting_from = None;
                if map.add_connection(from, id).is_some() {
                    map.debug_info(format!("Connected: Node {from} → Node {id}"));
                } else if map.has_connection_between(from, id) {
                    map.debug_info(format!("Connection already exists: {from} ↔ {id}"));
                }
            }
        }
    }

    fn pointer_move(&mut self, map: &mut MindMap, screen: Point) -> bool {
        let p = map.to_model_coords(screen);
        self.pointer = Some(p);

        match self.gesture {
            Gesture::DraggingNode { id, offset } => {
                let target = p - offset;
                if !map.move_node(id, target.x, target.y) {
                    // Deleted underneath us, e.g. by a collaborator.
                    self.gesture = Gesture::Idle;
                    return false;
                }
                log::trace!("drag node {id} to ({}, {})", target.x, target.y);
                map.debug_info(format!(
                    "Moving: Node {id} to ({}, {})",
                    target.x.round(),
                    target.y.round()
                ));
                true
            }
            Gesture::Panning { anchor } => {
                let pan = screen.to_vec2() - anchor;
                map.set_pan(pan.x, pan.y);
                map.debug_info(format!("Pan: ({}, {})", pan.x.round(), pan.y.round()));
                true
            }
            Gesture::Idle => {
                let hover = map
                    .node_at(p)
                    .map(|n| format!("Hover: Node {} - \"{}\"", n.id, n.text));
                map.debug_info(hover.unwrap_or_else(|| {
                    format!("Mouse: ({}, {})", p.x.round(), p.y.round())
                }));
                self.connecting_from.is_some()
            }
        }
    }

    fn pointer_up(&mut self, map: &mut MindMap) -> bool {
        let was = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match was {
            Gesture::DraggingNode { id, .. } => {
                if let Some(node) = map.node(id) {
                    let msg = format!("Drop: Node {id} at ({}, {})", node.x.round(), node.y.round());
                    map.debug_info(msg);
                }
                true
            }
            Gesture::Panning { .. } => {
                let view = map.view();
                map.debug_info(format!(
                    "Pan complete: ({}, {})",
                    view.pan_x.round(),
                    view.pan_y.round()
                ));
                false
            }
            Gesture::Idle => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::{ConnectionId, GraphData};
    use pretty_assertions::assert_eq;

    fn sample() -> MindMap {
        let mut map = MindMap::new();
        map.load_data(&GraphData::sample()).unwrap();
        map
    }

    #[test]
    fn drag_keeps_grab_offset() {
        let mut map = sample();
        let mut ix = Interaction::new();
        // Grab the root 10 units right of its center.
        ix.handle(&mut map, InputEvent::pointer_down(410.0, 300.0));
        assert_eq!(ix.state(), InteractionState::DraggingNode);
        ix.handle(&mut map, InputEvent::pointer_move(510.0, 350.0));
        assert_eq!(map.node(NodeId(1)).unwrap().center(), Point::new(500.0, 350.0));
        ix.handle(&mut map, InputEvent::PointerUp);
        assert_eq!(ix.state(), InteractionState::Idle);
    }

    #[test]
    fn empty_space_pans() {
        let mut map = sample();
        let mut ix = Interaction::new();
        map.select_node(NodeId(2));
        ix.handle(&mut map, InputEvent::pointer_down(20.0, 20.0));
        assert_eq!(ix.state(), InteractionState::Panning);
        assert!(map.selection().is_none());
        ix.handle(&mut map, InputEvent::pointer_move(50.0, 10.0));
        assert_eq!((map.view().pan_x, map.view().pan_y), (30.0, -10.0));
    }

    #[test]
    fn clicking_a_connection_selects_it() {
        let mut map = sample();
        let mut ix = Interaction::new();
        let seg = map.connection_segment(map.connection(ConnectionId(1)).unwrap()).unwrap();
        let mid = seg.p0.midpoint(seg.p1);
        ix.handle(&mut map, InputEvent::pointer_down(mid.x, mid.y));
        assert_eq!(map.selected_connection().map(|c| c.id), Some(ConnectionId(1)));
        assert_eq!(ix.state(), InteractionState::Idle);
    }

    #[test]
    fn view_only_selects_but_does_not_drag() {
        let mut map = sample();
        let mut ix = Interaction::new();
        ix.set_editable(&mut map, false);
        ix.handle(&mut map, InputEvent::pointer_down(400.0, 300.0));
        assert_eq!(map.selected_node().map(|n| n.id), Some(NodeId(1)));
        assert_eq!(ix.state(), InteractionState::Idle);
        ix.handle(&mut map, InputEvent::pointer_move(0.0, 0.0));
        assert_eq!(map.node(NodeId(1)).unwrap().center(), Point::new(400.0, 300.0));
        assert!(!ix.toggle_connect_mode(&mut map));
    }

    #[test]
    fn wheel_zoom_at_limit_reports_nothing() {
        let mut map = sample();
        let mut ix = Interaction::new();
        for _ in 0..40 {
            ix.handle(&mut map, InputEvent::Wheel { x: 0.0, y: 0.0, delta_y: -1.0 });
        }
        assert_eq!(map.view().zoom, mm_core::viewport::MAX_ZOOM);
        assert!(!ix.handle(&mut map, InputEvent::Wheel { x: 0.0, y: 0.0, delta_y: -1.0 }));
    }
}
