//! Client-side consumer of the A2UI message stream.
//!
//! A [`Session`] holds the active surface and its data model and applies
//! messages in arrival order; [`render`] resolves the surface into a
//! renderer-agnostic [`RenderNode`] tree.

pub mod render;
pub mod session;

pub use render::{RenderNode, render, render_component, render_outline};
pub use session::{Applied, RuntimeError, Session};
