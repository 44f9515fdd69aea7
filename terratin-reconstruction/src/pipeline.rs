//! Tile building pipeline
//!
//! Chains the per-zoom steps for one tile:
//! simplification, height-field triangulation and vertex-fetch
//! optimization of the resulting GPU buffers. Recoverable failures are
//! handled according to the configured [`FallbackPolicy`].

use crate::config::{FallbackPolicy, TinConfig};
use crate::triangulation::{triangulate_height_field, TriangulatedSurface};
use rayon::prelude::*;
use terratin_core::{Error, PointCloud3f, PositionVertex, Result, ZoomLevel};
use terratin_meshopt::optimize_vertex_fetch_typed;
use terratin_simplification::TinSimplifier;
use tracing::{info, warn};

/// GPU-ready mesh of one tile at one zoom level
#[derive(Debug, Clone, PartialEq)]
pub struct TileMesh {
    pub zoom: ZoomLevel,
    /// Vertices in first-use order of `indices`
    pub vertices: Vec<PositionVertex>,
    /// Triangle list
    pub indices: Vec<u32>,
    /// Number of points the tile was built from
    pub source_point_count: usize,
    /// Whether simplification was skipped after a recoverable failure
    pub unsimplified: bool,
}

impl TileMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer as raw bytes for upload
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// Builds tile meshes for one or more zoom levels
#[derive(Debug, Clone)]
pub struct TileBuilder {
    simplifier: TinSimplifier,
    fallback: FallbackPolicy,
}

impl TileBuilder {
    pub fn new(simplifier: TinSimplifier, fallback: FallbackPolicy) -> Self {
        Self { simplifier, fallback }
    }

    /// Create a builder from a parsed configuration
    pub fn from_config(config: &TinConfig) -> Result<Self> {
        config.validate()?;
        let simplifier = TinSimplifier::new(config.schedule())?;
        Ok(Self::new(simplifier, config.fallback))
    }

    /// Tagged sharp-feature polylines, as indices into the tile points
    pub fn with_feature_polylines(mut self, polylines: Vec<Vec<usize>>) -> Self {
        self.simplifier = self.simplifier.with_feature_polylines(polylines);
        self
    }

    pub fn simplifier(&self) -> &TinSimplifier {
        &self.simplifier
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    fn simplify_and_triangulate(&self, points: &PointCloud3f, zoom: ZoomLevel) -> Result<TriangulatedSurface> {
        let simplified = self.simplifier.simplify_for_zoom(zoom, points)?;
        triangulate_height_field(&simplified)
    }

    /// Build the mesh of one zoom level.
    ///
    /// Returns `Ok(None)` when the level failed recoverably and the policy is
    /// [`FallbackPolicy::Skip`].
    pub fn build_zoom(&self, points: &PointCloud3f, zoom: ZoomLevel) -> Result<Option<TileMesh>> {
        let point_count = points.len();
        let in_tile = |e: Error| e.in_tile(zoom, point_count);

        let (surface, unsimplified) = match self.simplify_and_triangulate(points, zoom) {
            Ok(surface) => (surface, false),
            Err(e) if e.is_recoverable() => match self.fallback {
                FallbackPolicy::Fail => return Err(in_tile(e)),
                FallbackPolicy::Unsimplified => {
                    warn!(zoom, points = point_count, error = %e, "falling back to the unsimplified point set");
                    (triangulate_height_field(points).map_err(in_tile)?, true)
                }
                FallbackPolicy::Skip => {
                    warn!(zoom, points = point_count, error = %e, "skipping zoom level");
                    return Ok(None);
                }
            },
            Err(e) => return Err(in_tile(e)),
        };

        let mut indices = surface.index_buffer().map_err(in_tile)?;
        let mut vertices: Vec<PositionVertex> = surface.vertices().map(|&p| p.into()).collect();
        let remap = optimize_vertex_fetch_typed(&mut vertices, &mut indices).map_err(in_tile)?;

        info!(
            zoom,
            points = point_count,
            vertices = remap.vertex_count,
            triangles = indices.len() / 3,
            unsimplified,
            "built tile mesh"
        );

        Ok(Some(TileMesh {
            zoom,
            vertices,
            indices,
            source_point_count: point_count,
            unsimplified,
        }))
    }

    /// Build several zoom levels in parallel.
    ///
    /// Meshes are returned in the order of `zooms`; skipped levels are left
    /// out. The first error aborts the whole build.
    pub fn build_levels(&self, points: &PointCloud3f, zooms: &[ZoomLevel]) -> Result<Vec<TileMesh>> {
        let levels = zooms
            .par_iter()
            .map(|&zoom| self.build_zoom(points, zoom))
            .collect::<Result<Vec<_>>>()?;
        Ok(levels.into_iter().flatten().collect())
    }
}
