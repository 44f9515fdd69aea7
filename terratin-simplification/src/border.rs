//! Border and sharp-feature polyline preservation
//!
//! Bulk simplification must not erode the edges of a tile, otherwise
//! neighbouring tiles no longer stitch. The points lying on the four sides of
//! the tile's XY bounding box form one polyline per side; upstream stages may
//! add tagged sharp-feature polylines. Each polyline is simplified on its own
//! with a Douglas-Peucker pass bounded by a distance tolerance and a maximum
//! edge length, and the surviving vertices are protected from the interior
//! reduction.

use crate::params::BorderParameters;
use terratin_core::{Aabb, Error, Point3d, Point3f, Result, to_f64};
use tracing::debug;

/// Relative tolerance, against the XY diagonal, for a point to lie on a side
const SIDE_EPSILON: f64 = 1e-6;

/// Absolute distance within which a point counts as lying on a tile side
pub(crate) fn side_tolerance(bbox: &Aabb) -> f64 {
    SIDE_EPSILON * bbox.xy_diagonal() as f64
}

/// Result of splitting a point set into protected border points and the
/// interior points left for bulk simplification
#[derive(Debug, Clone, Default)]
pub struct BorderSplit {
    /// Simplified border and feature vertices, unmodified input points
    pub border: Vec<Point3f>,
    /// Points that are on no preserved polyline
    pub interior: Vec<Point3f>,
    /// Number of polylines that were simplified and protected
    pub polylines: usize,
}

/// Detects and simplifies the polylines that must survive simplification
#[derive(Debug, Clone, Copy)]
pub struct BorderFeaturePreserver {
    params: BorderParameters,
}

impl BorderFeaturePreserver {
    pub fn new(params: BorderParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BorderParameters {
        &self.params
    }

    /// Split `points` into simplified border points and interior points.
    ///
    /// `features` are tagged sharp-feature polylines given as ordered indices
    /// into `points`.
    pub fn split(&self, points: &[Point3f], features: &[Vec<usize>]) -> Result<BorderSplit> {
        if let Some((i, p)) = points
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(Error::InvalidData(format!("Non-finite point {:?} at index {}", p, i)));
        }

        let Some(bbox) = Aabb::from_points(points) else {
            return Ok(BorderSplit::default());
        };

        if !(bbox.width() > 0.0 && bbox.height() > 0.0) {
            return Err(Error::DegenerateGeometry(format!(
                "Tile footprint of {} points has no area ({} x {}), no border can be detected",
                points.len(),
                bbox.width(),
                bbox.height()
            )));
        }

        let reference_length = bbox.xy_diagonal() as f64;
        let max_length = if self.params.max_length_percent > 0.0 {
            Some(self.params.max_length_percent / 100.0 * reference_length)
        } else {
            None
        };

        let mut polylines = tile_border_polylines(points, &bbox);

        for feature in features {
            if let Some(&bad) = feature.iter().find(|&&i| i >= points.len()) {
                return Err(Error::InvalidData(format!(
                    "Feature polyline references point {} of {}",
                    bad,
                    points.len()
                )));
            }
            let edges = feature.len().saturating_sub(1);
            if edges < self.params.min_feature_polyline_size {
                continue;
            }
            polylines.push(feature.clone());
        }

        let mut on_polyline = vec![false; points.len()];
        let mut kept = vec![false; points.len()];

        for polyline in &polylines {
            for &i in polyline {
                on_polyline[i] = true;
            }
            for i in simplify_polyline(points, polyline, self.params.max_distance, max_length) {
                kept[i] = true;
            }
        }

        let mut border = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut interior = Vec::new();
        for (i, p) in points.iter().enumerate() {
            if kept[i] {
                if seen.insert([p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]) {
                    border.push(*p);
                }
            } else if !on_polyline[i] {
                interior.push(*p);
            }
        }

        if border.is_empty() {
            return Err(Error::DegenerateGeometry(format!(
                "Border detection kept no points out of {}",
                points.len()
            )));
        }

        debug!(
            input = points.len(),
            polylines = polylines.len(),
            border = border.len(),
            interior = interior.len(),
            "split tile border"
        );

        Ok(BorderSplit {
            border,
            interior,
            polylines: polylines.len(),
        })
    }
}

/// One polyline per side of the XY bounding box, ordered along the side.
/// Corner points belong to both adjacent sides.
fn tile_border_polylines(points: &[Point3f], bbox: &Aabb) -> Vec<Vec<usize>> {
    let eps = side_tolerance(bbox);
    let near = |a: f32, b: f32| ((a as f64) - (b as f64)).abs() <= eps;

    let mut west = Vec::new();
    let mut east = Vec::new();
    let mut south = Vec::new();
    let mut north = Vec::new();

    for (i, p) in points.iter().enumerate() {
        if near(p.x, bbox.min.x) {
            west.push(i);
        }
        if near(p.x, bbox.max.x) {
            east.push(i);
        }
        if near(p.y, bbox.min.y) {
            south.push(i);
        }
        if near(p.y, bbox.max.y) {
            north.push(i);
        }
    }

    let along_y = |a: &usize, b: &usize| points[*a].y.total_cmp(&points[*b].y).then(a.cmp(b));
    let along_x = |a: &usize, b: &usize| points[*a].x.total_cmp(&points[*b].x).then(a.cmp(b));
    west.sort_by(along_y);
    east.sort_by(along_y);
    south.sort_by(along_x);
    north.sort_by(along_x);

    vec![west, east, south, north]
}

/// Douglas-Peucker over `chain`, returning the kept indices in chain order.
///
/// A span is accepted when every skipped vertex is within `max_distance` of
/// the span and the span's XY length is at most `max_length`. Endpoints are
/// always kept.
pub fn simplify_polyline(
    points: &[Point3f],
    chain: &[usize],
    max_distance: f64,
    max_length: Option<f64>,
) -> Vec<usize> {
    if chain.len() <= 2 {
        return chain.to_vec();
    }

    let last = chain.len() - 1;
    let mut keep = vec![false; chain.len()];
    keep[0] = true;
    keep[last] = true;

    let mut spans = vec![(0usize, last)];
    while let Some((start, end)) = spans.pop() {
        if end <= start + 1 {
            continue;
        }

        let a = to_f64(&points[chain[start]]);
        let b = to_f64(&points[chain[end]]);

        let mut farthest = start + 1;
        let mut farthest_distance = -1.0;
        for k in (start + 1)..end {
            let d = distance_to_segment(&to_f64(&points[chain[k]]), &a, &b);
            if d > farthest_distance {
                farthest_distance = d;
                farthest = k;
            }
        }

        let too_far = farthest_distance > max_distance;
        let too_long = max_length.is_some_and(|limit| (b.x - a.x).hypot(b.y - a.y) > limit);
        if !too_far && !too_long {
            continue;
        }

        // Collinear spans split on length alone have no distinguished vertex.
        let split = if too_far || farthest_distance > 0.0 {
            farthest
        } else {
            (start + end) / 2
        };
        keep[split] = true;
        spans.push((split, end));
        spans.push((start, split));
    }

    chain
        .iter()
        .zip(keep)
        .filter_map(|(&i, k)| k.then_some(i))
        .collect()
}

fn distance_to_segment(p: &Point3d, a: &Point3d, b: &Point3d) -> f64 {
    let ab = b - a;
    let len2 = ab.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn params(max_distance: f64, max_length_percent: f64, min_feature: usize) -> BorderParameters {
        BorderParameters {
            max_distance,
            max_length_percent,
            min_feature_polyline_size: min_feature,
        }
    }

    /// Regular `size` x `size` grid on a flat plane
    fn flat_grid(size: usize) -> Vec<Point3f> {
        let mut points = Vec::new();
        for y in 0..size {
            for x in 0..size {
                points.push(Point3f::new(x as f32, y as f32, 0.0));
            }
        }
        points
    }

    fn key(p: &Point3f) -> [u32; 3] {
        [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
    }

    #[test]
    fn test_empty_input() {
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 2));
        let split = preserver.split(&[], &[]).unwrap();
        assert!(split.border.is_empty());
        assert!(split.interior.is_empty());
    }

    #[test]
    fn test_flat_borders_collapse_to_corners_without_length_guard() {
        let points = flat_grid(11);
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 2));
        let split = preserver.split(&points, &[]).unwrap();

        assert_eq!(split.border.len(), 4);
        assert_eq!(split.interior.len(), 9 * 9);
        assert_eq!(split.polylines, 4);
    }

    #[test]
    fn test_length_guard_prevents_oversimplification() {
        let points = flat_grid(11);
        // Diagonal is 10 * sqrt(2) ~ 14.1; 25% caps edges at ~3.5 units.
        let preserver = BorderFeaturePreserver::new(params(0.5, 25.0, 2));
        let split = preserver.split(&points, &[]).unwrap();

        assert!(split.border.len() > 4);
        let limit = 0.25 * 200f32.sqrt();
        for side in [0.0f32, 10.0] {
            let mut ys: Vec<f32> = split
                .border
                .iter()
                .filter(|p| p.x == side)
                .map(|p| p.y)
                .collect();
            ys.sort_by(f32::total_cmp);
            for pair in ys.windows(2) {
                assert!(pair[1] - pair[0] <= limit + 1e-4);
            }
        }
    }

    #[test]
    fn test_distance_tolerance_keeps_bumps() {
        let mut points = flat_grid(5);
        // Raise the middle of the south side.
        points[2].z = 1.0;
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 2));
        let split = preserver.split(&points, &[]).unwrap();

        assert!(split.border.contains(&Point3f::new(2.0, 0.0, 1.0)));
        assert_eq!(split.border.len(), 5);
    }

    #[test]
    fn test_dropped_border_points_leave_both_sets() {
        let points = flat_grid(5);
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 2));
        let split = preserver.split(&points, &[]).unwrap();

        let all: HashSet<[u32; 3]> = split.border.iter().chain(&split.interior).map(key).collect();
        assert!(!all.contains(&key(&Point3f::new(2.0, 0.0, 0.0))));
        assert_eq!(split.border.len() + split.interior.len(), 4 + 9);
    }

    #[test]
    fn test_short_feature_polyline_is_ignored() {
        let mut points = flat_grid(5);
        points[12].z = 5.0; // centre
        points[13].z = 5.0;
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 3));

        let split = preserver.split(&points, &[vec![12, 13]]).unwrap();
        assert_eq!(split.polylines, 4);
        assert!(split.interior.contains(&points[12]));
        assert!(split.interior.contains(&points[13]));
    }

    #[test]
    fn test_long_feature_polyline_is_protected() {
        let mut points = flat_grid(5);
        let ridge = vec![6, 7, 8, 13, 18];
        for &i in &ridge {
            points[i].z = 2.0;
        }
        let preserver = BorderFeaturePreserver::new(params(0.01, 0.0, 3));

        let split = preserver.split(&points, &[ridge.clone()]).unwrap();
        assert_eq!(split.polylines, 5);
        // 8 is the corner of the ridge, both ends are always kept
        for i in [6, 8, 18] {
            assert!(split.border.contains(&points[i]));
            assert!(!split.interior.contains(&points[i]));
        }
    }

    #[test]
    fn test_out_of_range_feature_index() {
        let points = flat_grid(3);
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 1));
        let result = preserver.split(&points, &[vec![0, 99]]);
        assert!(matches!(result, Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_degenerate_footprint() {
        let points: Vec<Point3f> = (0..10).map(|i| Point3f::new(i as f32, 0.0, 1.0)).collect();
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 2));
        assert!(matches!(
            preserver.split(&points, &[]),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_non_finite_points_are_rejected() {
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 2));
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut points = flat_grid(5);
            points[7].z = bad;
            assert!(matches!(preserver.split(&points, &[]), Err(Error::InvalidData(_))));

            let mut points = flat_grid(5);
            points[12].x = bad;
            let err = preserver.split(&points, &[]).unwrap_err();
            assert!(err.to_string().contains("index 12"), "{}", err);
            assert!(!err.is_recoverable());
        }
    }

    #[test]
    fn test_duplicates_do_not_crash() {
        let mut points = flat_grid(4);
        points.extend(flat_grid(4));
        let preserver = BorderFeaturePreserver::new(params(0.5, 0.0, 2));
        let split = preserver.split(&points, &[]).unwrap();
        assert_eq!(split.border.len(), 4);
        assert_eq!(split.interior.len(), 8);
    }

    #[test]
    fn test_simplify_polyline_keeps_endpoints() {
        let points: Vec<Point3f> = (0..6).map(|i| Point3f::new(i as f32, 0.0, 0.0)).collect();
        let chain: Vec<usize> = (0..6).collect();
        assert_eq!(simplify_polyline(&points, &chain, 0.1, None), vec![0, 5]);
        assert_eq!(simplify_polyline(&points, &chain[..2], 0.1, None), vec![0, 1]);
        let capped = simplify_polyline(&points, &chain, 0.1, Some(2.0));
        assert_eq!(capped.first(), Some(&0));
        assert_eq!(capped.last(), Some(&5));
        for pair in capped.windows(2) {
            assert!(points[pair[1]].x - points[pair[0]].x <= 2.0);
        }
    }
}
