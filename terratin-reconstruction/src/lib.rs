//! # terratin reconstruction
//!
//! Turns tile point sets into GPU-ready triangle meshes.
//!
//! This crate provides the height-field Delaunay triangulation of tile point
//! sets, the TOML tile configuration and the per-zoom tile building pipeline
//! that chains simplification, triangulation and vertex-fetch optimization.

pub mod triangulation;
pub mod config;
pub mod pipeline;

// Re-export commonly used items
pub use triangulation::*;
pub use config::*;
pub use pipeline::*;
