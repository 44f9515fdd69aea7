//! GPU buffer optimization for terratin meshes
//!
//! Reorders vertex buffers so that vertices are laid out in the order the
//! index buffer first references them, and drops vertices no triangle uses.

pub mod vertex_fetch;

pub use vertex_fetch::*;
