//! Editing layer of the mind map: input normalization, the pointer
//! interaction state machine, and the `Editor` that ties the graph to an
//! optional collaboration session.

pub mod editor;
pub mod input;
pub mod interaction;

pub use editor::Editor;
pub use input::{InputEvent, TouchPhase, wheel_factor};
pub use interaction::{Interaction, InteractionState};
