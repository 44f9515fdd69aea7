//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use bytemuck::{Pod, Zeroable};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A position-only vertex record as uploaded to the GPU
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct PositionVertex {
    pub position: [f32; 3],
}

impl From<Point3f> for PositionVertex {
    fn from(p: Point3f) -> Self {
        Self {
            position: [p.x, p.y, p.z],
        }
    }
}

impl From<PositionVertex> for Point3f {
    fn from(v: PositionVertex) -> Self {
        Point3f::new(v.position[0], v.position[1], v.position[2])
    }
}

/// Widen a single precision point for accumulation
pub fn to_f64(p: &Point3f) -> Point3d {
    Point3d::new(p.x as f64, p.y as f64, p.z as f64)
}

/// Narrow an accumulated point back to storage precision
pub fn to_f32(p: &Point3d) -> Point3f {
    Point3f::new(p.x as f32, p.y as f32, p.z as f32)
}
