//! Core data structures and traits for terratin
//! 
//! This crate provides the fundamental types shared by the tile building
//! pipeline: points, point clouds, triangle meshes, bounding boxes, the
//! per-zoom threshold series and the common error type.

pub mod point;
pub mod point_cloud;
pub mod mesh;
pub mod traits;
pub mod zoom;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use mesh::*;
pub use traits::*;
pub use zoom::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3};

/// Smallest point count a triangulation can be built from
pub const MIN_TRIANGULATION_POINTS: usize = 3;

// Type aliases for easier imports
pub type Point = Point3f;
pub type Mesh = TriangleMesh;
