//! Zoom-aware tile simplification strategy
//!
//! [`TinSimplifier`] ties the pieces together: border preservation, the
//! interior reducer selected by the configured method, and per-zoom
//! parameter snapshots.

use crate::border::{side_tolerance, BorderFeaturePreserver};
use crate::params::{StrategyParameters, ZoomParameterSchedule};
use crate::PointSetSimplifier;
use std::collections::HashSet;
use terratin_core::{Aabb, Point3f, PointCloud, PointCloud3f, Result, ZoomLevel, MIN_TRIANGULATION_POINTS};
use tracing::{debug, info};

/// Simplifies tile point sets with zoom-dependent parameters while keeping
/// tile borders and tagged sharp features.
#[derive(Debug, Clone)]
pub struct TinSimplifier {
    schedule: ZoomParameterSchedule,
    params: StrategyParameters,
    feature_polylines: Vec<Vec<usize>>,
}

impl TinSimplifier {
    /// Create a simplifier with the parameters of zoom level 0 in effect
    pub fn new(schedule: ZoomParameterSchedule) -> Result<Self> {
        let params = schedule.resolve(0)?;
        Ok(Self {
            schedule,
            params,
            feature_polylines: Vec::new(),
        })
    }

    /// Attach sharp-feature polylines, as ordered indices into the point sets
    /// that will be simplified
    pub fn with_feature_polylines(mut self, polylines: Vec<Vec<usize>>) -> Self {
        self.feature_polylines = polylines;
        self
    }

    pub fn schedule(&self) -> &ZoomParameterSchedule {
        &self.schedule
    }

    /// Parameters currently in effect
    pub fn params(&self) -> &StrategyParameters {
        &self.params
    }

    /// Switch to the parameters of `zoom`.
    ///
    /// All knobs are resolved into a new snapshot first; the current
    /// snapshot is only replaced when every knob resolved and validated.
    pub fn set_params_for_zoom(&mut self, zoom: ZoomLevel) -> Result<()> {
        let params = self.schedule.resolve(zoom)?;
        info!(zoom, method = params.method.name(), "switching simplification parameters");
        self.params = params;
        Ok(())
    }

    /// Simplify with the parameters of `zoom`, leaving the current snapshot
    /// untouched. Safe to call from several threads at once.
    pub fn simplify_for_zoom(&self, zoom: ZoomLevel, cloud: &PointCloud3f) -> Result<PointCloud3f> {
        let params = self.schedule.resolve(zoom)?;
        self.simplify_with(&params, cloud)
    }

    /// Simplify with an explicit parameter snapshot
    pub fn simplify_with(&self, params: &StrategyParameters, cloud: &PointCloud3f) -> Result<PointCloud3f> {
        if cloud.len() <= MIN_TRIANGULATION_POINTS {
            return Ok(cloud.clone());
        }

        let split = BorderFeaturePreserver::new(params.border)
            .split(cloud.as_slice(), &self.feature_polylines)?;

        let interior = PointCloud::from_points(split.interior);
        let reduced = params.method.simplifier().simplify(&interior)?;

        let (mut points, clamped, dropped) = match Aabb::from_points(cloud.as_slice()) {
            Some(bbox) => keep_inside_footprint(reduced.points, &bbox, &split.border),
            None => (reduced.points, 0, 0),
        };
        points.extend(split.border);

        debug!(
            zoom = params.zoom,
            input = cloud.len(),
            interior = interior.len(),
            clamped,
            dropped,
            output = points.len(),
            "simplified tile"
        );

        Ok(PointCloud::from_points(points))
    }
}

/// Pull reduced interior points back strictly inside the tile footprint.
///
/// Points that leave the XY bounding box, or come within the side tolerance
/// of a side, are clamped to the inset footprint. A clamped point is dropped
/// when it still lands on a side or on the XY location of another output
/// point. Returns the kept points with the clamped and dropped counts.
fn keep_inside_footprint(
    reduced: Vec<Point3f>,
    bbox: &Aabb,
    protected: &[Point3f],
) -> (Vec<Point3f>, usize, usize) {
    let eps = side_tolerance(bbox);
    let inside = |p: &Point3f| {
        let within = |v: f32, lo: f32, hi: f32| (v as f64) - (lo as f64) > eps && (hi as f64) - (v as f64) > eps;
        within(p.x, bbox.min.x, bbox.max.x) && within(p.y, bbox.min.y, bbox.max.y)
    };
    // The inset range can be empty for a sliver footprint, so no f64::clamp
    let pull = |v: f32, lo: f32, hi: f32| ((v as f64).max(lo as f64 + 2.0 * eps).min(hi as f64 - 2.0 * eps)) as f32;
    let xy = |p: &Point3f| ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits());

    let total = reduced.len();
    let (mut kept, outside): (Vec<Point3f>, Vec<Point3f>) = reduced.into_iter().partition(|p| inside(p));
    let clamped = outside.len();

    let mut occupied: HashSet<(u32, u32)> = protected.iter().chain(kept.iter()).map(xy).collect();
    for mut p in outside {
        p.x = pull(p.x, bbox.min.x, bbox.max.x);
        p.y = pull(p.y, bbox.min.y, bbox.max.y);
        if inside(&p) && occupied.insert(xy(&p)) {
            kept.push(p);
        }
    }

    let dropped = total - kept.len();
    (kept, clamped, dropped)
}

impl PointSetSimplifier for TinSimplifier {
    fn simplify(&self, cloud: &PointCloud3f) -> Result<PointCloud3f> {
        self.simplify_with(&self.params, cloud)
    }
}
