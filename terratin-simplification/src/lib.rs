//! Point set simplification for terrain tiles
//! 
//! This crate reduces the point count of a tile per zoom level while
//! keeping the tile borders and tagged sharp features intact:
//! - Border and sharp-feature polyline preservation
//! - Hierarchical clustering simplification
//! - Weighted locally optimal projection (WLOP)
//! - A zoom-aware strategy that swaps parameter snapshots per zoom level

pub mod params;
pub mod border;
pub mod hierarchy;
pub mod wlop;
pub mod strategy;

pub use params::*;
pub use border::*;
pub use hierarchy::*;
pub use wlop::*;
pub use strategy::*;

use terratin_core::{PointCloud3f, Result};

/// Reduce the number of points of a point set
pub trait PointSetSimplifier {
    /// Simplify the point cloud. Inputs at or below
    /// [`terratin_core::MIN_TRIANGULATION_POINTS`] points are returned unchanged.
    fn simplify(&self, cloud: &PointCloud3f) -> Result<PointCloud3f>;
}
