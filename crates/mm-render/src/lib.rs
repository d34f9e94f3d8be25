//! Render adapter for the mind map.
//!
//! The graph model knows nothing about drawing. This crate projects its
//! state into a `RenderScene` and paints that scene through the
//! `Painter` trait, which the host drawing surface implements.

pub mod dirty;
pub mod paint;
pub mod scene;

pub use dirty::DirtyFlag;
pub use paint::{Painter, paint_scene};
pub use scene::{CursorMark, Edge, NodeBox, Overlay, RenderScene, TextLine, build_scene};
