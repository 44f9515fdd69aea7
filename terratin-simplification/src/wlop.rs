//! Weighted locally optimal projection (WLOP)
//!
//! Simplifies and regularizes a point set following Huang et al. (2009),
//! "Consolidation of unorganized point clouds for surface reconstruction".
//! A subset of the input is iteratively pulled towards the local weighted
//! median of the input (attraction) while being pushed away from the other
//! samples (repulsion), which spreads the retained points evenly over the
//! surface.

use crate::PointSetSimplifier;
use nalgebra::Vector3;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use terratin_core::{Point3f, PointCloud3f, Result, MIN_TRIANGULATION_POINTS};
use tracing::{debug, warn};

type IndexedPosition = GeomWithData<[f64; 3], usize>;

/// Multiple of the mean nearest-neighbour spacing used as automatic radius
const AUTO_RADIUS_SPACING_FACTOR: f64 = 8.0;

/// Distances below this are clamped to avoid dividing by zero
const MIN_DISTANCE: f64 = 1e-10;

/// WLOP simplifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WlopSimplifier {
    /// Percentage of input points kept, in (0, 100]
    pub retain_percent: f64,
    /// Support radius of the weights; non-positive estimates it from density
    pub neighbor_radius: f64,
    /// Number of projection iterations
    pub iterations: usize,
    /// Balance between attraction and repulsion, in [0, 0.5)
    pub repulsion_mu: f64,
}

impl Default for WlopSimplifier {
    fn default() -> Self {
        Self {
            retain_percent: 5.0,
            neighbor_radius: -1.0,
            iterations: 35,
            repulsion_mu: 0.45,
        }
    }
}

impl WlopSimplifier {
    pub fn new(retain_percent: f64, neighbor_radius: f64) -> Self {
        Self {
            retain_percent,
            neighbor_radius,
            ..Default::default()
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Number of samples kept out of `n` input points
    fn sample_count(&self, n: usize) -> usize {
        let count = (n as f64 * self.retain_percent / 100.0).ceil() as usize;
        count.clamp(1, n)
    }
}

fn coords(p: &Point3f) -> [f64; 3] {
    [p.x as f64, p.y as f64, p.z as f64]
}

fn build_tree(points: &[[f64; 3]]) -> RTree<IndexedPosition> {
    RTree::bulk_load(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPosition::new(*p, i))
            .collect(),
    )
}

/// Support radius estimated from the mean nearest-neighbour spacing
pub fn estimate_neighbor_radius(points: &[Point3f]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let positions: Vec<[f64; 3]> = points.iter().map(coords).collect();
    let tree = build_tree(&positions);

    let spacing: f64 = positions
        .par_iter()
        .enumerate()
        .map(|(i, p)| {
            tree.nearest_neighbor_iter(p)
                .find(|candidate| candidate.data != i)
                .map(|candidate| distance(p, candidate.geom()))
                .unwrap_or(0.0)
        })
        .collect::<Vec<f64>>()
        .iter()
        .sum();

    AUTO_RADIUS_SPACING_FACTOR * spacing / positions.len() as f64
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    Vector3::new(a[0] - b[0], a[1] - b[1], a[2] - b[2]).norm()
}

/// Rapidly decaying weight `θ(r) = exp(-16 r² / h²)`
fn theta(r: f64, h: f64) -> f64 {
    (-16.0 * r * r / (h * h)).exp()
}

impl WlopSimplifier {
    fn project(&self, input: &RTree<IndexedPosition>, samples: &[[f64; 3]], h: f64) -> Vec<[f64; 3]> {
        let sample_tree = build_tree(samples);
        let h2 = h * h;

        samples
            .par_iter()
            .enumerate()
            .map(|(i, x)| {
                let xi = Vector3::from(*x);

                let mut attract = Vector3::zeros();
                let mut attract_weight = 0.0;
                for q in input.locate_within_distance(*x, h2) {
                    let r = distance(x, q.geom()).max(MIN_DISTANCE);
                    let w = theta(r, h) / r;
                    attract += Vector3::from(*q.geom()) * w;
                    attract_weight += w;
                }

                let mut repulse = Vector3::zeros();
                let mut repulse_weight = 0.0;
                for other in sample_tree.locate_within_distance(*x, h2) {
                    if other.data == i {
                        continue;
                    }
                    let r = distance(x, other.geom()).max(MIN_DISTANCE);
                    let w = theta(r, h) / r;
                    repulse += (xi - Vector3::from(*other.geom())) * w;
                    repulse_weight += w;
                }

                let mut next = if attract_weight > 0.0 {
                    attract / attract_weight
                } else {
                    xi
                };
                if repulse_weight > 0.0 {
                    next += repulse * (self.repulsion_mu / repulse_weight);
                }
                [next.x, next.y, next.z]
            })
            .collect()
    }
}

impl PointSetSimplifier for WlopSimplifier {
    fn simplify(&self, cloud: &PointCloud3f) -> Result<PointCloud3f> {
        if cloud.len() <= MIN_TRIANGULATION_POINTS {
            return Ok(cloud.clone());
        }

        let n = cloud.len();
        let m = self.sample_count(n);

        // Deterministic stride sample instead of a random subset
        let mut samples: Vec<[f64; 3]> = (0..m).map(|k| coords(&cloud[k * n / m])).collect();

        let h = if self.neighbor_radius > 0.0 {
            self.neighbor_radius
        } else {
            estimate_neighbor_radius(cloud.as_slice())
        };

        if h > 0.0 {
            let positions: Vec<[f64; 3]> = cloud.iter().map(coords).collect();
            let input = build_tree(&positions);
            for _ in 0..self.iterations {
                samples = self.project(&input, &samples, h);
            }
        } else {
            warn!(points = n, "WLOP radius collapsed to zero, keeping the initial sample");
        }

        debug!(input = n, output = m, radius = h, iterations = self.iterations, "wlop simplification");

        Ok(samples
            .iter()
            .map(|p| Point3f::new(p[0] as f32, p[1] as f32, p[2] as f32))
            .collect())
    }
}
