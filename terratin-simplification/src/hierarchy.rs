//! Hierarchical clustering point set simplification
//!
//! Implements the hierarchical clustering of Pauly, Gross & Kobbelt (2002),
//! "Efficient simplification of point-sampled surfaces". The point set is
//! recursively split in two along the plane through the cluster centroid
//! orthogonal to its principal axis until every cluster is small enough and
//! flat enough; each remaining cluster is replaced by the input sample
//! closest to its centroid.

use crate::PointSetSimplifier;
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use terratin_core::{Point3d, Point3f, PointCloud3f, Result, MIN_TRIANGULATION_POINTS, to_f64};
use tracing::debug;

/// Levels of top-down splitting done before subtrees are handed to rayon
const PARALLEL_SPLIT_DEPTH: usize = 6;

// ============================================================
// Cluster statistics
// ============================================================

#[derive(Debug, Clone, Copy)]
struct ClusterStats {
    centroid: Point3d,
    principal_axis: Vector3<f64>,
    /// Surface variation: smallest eigenvalue over the eigenvalue sum
    variation: f64,
}

impl ClusterStats {
    fn compute(points: &[Point3f], indices: &[usize]) -> Self {
        let n = indices.len() as f64;
        let mut sum = Vector3::zeros();
        for &i in indices {
            sum += to_f64(&points[i]).coords;
        }
        let centroid = Point3d::from(sum / n);

        let mut covariance = Matrix3::zeros();
        for &i in indices {
            let d = to_f64(&points[i]) - centroid;
            covariance += d * d.transpose();
        }
        covariance /= n;

        let eigen = covariance.symmetric_eigen();
        let mut largest = 0;
        let mut smallest = 0;
        for k in 1..3 {
            if eigen.eigenvalues[k] > eigen.eigenvalues[largest] {
                largest = k;
            }
            if eigen.eigenvalues[k] < eigen.eigenvalues[smallest] {
                smallest = k;
            }
        }

        let total: f64 = eigen.eigenvalues.iter().map(|l| l.max(0.0)).sum();
        let variation = if total > f64::EPSILON {
            eigen.eigenvalues[smallest].max(0.0) / total
        } else {
            0.0
        };

        Self {
            centroid,
            principal_axis: eigen.eigenvectors.column(largest).into_owned(),
            variation,
        }
    }
}

/// Outcome of visiting one cluster
enum Step {
    Keep(Point3f),
    Split(Vec<usize>, Vec<usize>),
}

enum Node {
    Done(Point3f),
    Pending(Vec<usize>),
}

// ============================================================
// Simplifier
// ============================================================

/// Hierarchical clustering simplifier.
///
/// A cluster is kept as a single representative, the member closest to its
/// centroid with ties going to the lowest input index, unless it
/// holds more than `max_cluster_size` points or its surface variation
/// exceeds `max_surface_variance`, in which case it is split in two and both
/// halves are processed again. Every split strictly shrinks the cluster, so
/// the recursion ends at single points at the latest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSetHierarchySimplifier {
    pub max_cluster_size: usize,
    pub max_surface_variance: f64,
}

impl Default for PointSetHierarchySimplifier {
    fn default() -> Self {
        Self {
            max_cluster_size: 10,
            max_surface_variance: 1.0 / 3.0,
        }
    }
}

impl PointSetHierarchySimplifier {
    pub fn new(max_cluster_size: usize, max_surface_variance: f64) -> Self {
        Self {
            max_cluster_size: max_cluster_size.max(1),
            max_surface_variance,
        }
    }

    /// Process one cluster: either emit its representative or split it
    fn step(&self, points: &[Point3f], indices: Vec<usize>) -> Step {
        if indices.len() == 1 {
            return Step::Keep(points[indices[0]]);
        }

        let stats = ClusterStats::compute(points, &indices);
        if indices.len() <= self.max_cluster_size && stats.variation <= self.max_surface_variance {
            return Step::Keep(points[nearest_to_centroid(points, &indices, &stats)]);
        }

        let (left, right) = split_cluster(points, indices, &stats);
        Step::Split(left, right)
    }

    /// Depth-first reduction of one subtree, left half before right half
    fn reduce_subtree(&self, points: &[Point3f], root: Vec<usize>) -> Vec<Point3f> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(cluster) = stack.pop() {
            match self.step(points, cluster) {
                Step::Keep(representative) => out.push(representative),
                Step::Split(left, right) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        out
    }
}

/// Input index of the cluster member closest to the centroid
fn nearest_to_centroid(points: &[Point3f], indices: &[usize], stats: &ClusterStats) -> usize {
    let mut best = indices[0];
    let mut best_distance = f64::INFINITY;
    for &i in indices {
        let distance = (to_f64(&points[i]) - stats.centroid).norm_squared();
        if distance < best_distance || (distance == best_distance && i < best) {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Split along the plane through the centroid orthogonal to the principal
/// axis. Falls back to a median split when the plane leaves one side empty,
/// so both halves are always non-empty and strictly smaller.
fn split_cluster(points: &[Point3f], indices: Vec<usize>, stats: &ClusterStats) -> (Vec<usize>, Vec<usize>) {
    let offset = |i: usize| (to_f64(&points[i]) - stats.centroid).dot(&stats.principal_axis);

    let (left, right): (Vec<usize>, Vec<usize>) = indices.iter().partition(|&&i| offset(i) < 0.0);
    if !left.is_empty() && !right.is_empty() {
        return (left, right);
    }

    let mut sorted = indices;
    sorted.sort_by(|&a, &b| offset(a).total_cmp(&offset(b)).then(a.cmp(&b)));
    let right = sorted.split_off(sorted.len() / 2);
    (sorted, right)
}

impl PointSetSimplifier for PointSetHierarchySimplifier {
    fn simplify(&self, cloud: &PointCloud3f) -> Result<PointCloud3f> {
        if cloud.len() <= MIN_TRIANGULATION_POINTS {
            return Ok(cloud.clone());
        }
        let points = cloud.as_slice();

        // Split the top of the hierarchy sequentially so the subtrees are
        // disjoint and ordered, then reduce them in parallel.
        let mut frontier = vec![Node::Pending((0..points.len()).collect())];
        for _ in 0..PARALLEL_SPLIT_DEPTH {
            let mut next = Vec::with_capacity(frontier.len() * 2);
            let mut expanded = false;
            for node in frontier {
                match node {
                    Node::Pending(cluster) => {
                        expanded = true;
                        match self.step(points, cluster) {
                            Step::Keep(representative) => next.push(Node::Done(representative)),
                            Step::Split(left, right) => {
                                next.push(Node::Pending(left));
                                next.push(Node::Pending(right));
                            }
                        }
                    }
                    done => next.push(done),
                }
            }
            frontier = next;
            if !expanded {
                break;
            }
        }

        let parts: Vec<Vec<Point3f>> = frontier
            .into_par_iter()
            .map(|node| match node {
                Node::Done(p) => vec![p],
                Node::Pending(cluster) => self.reduce_subtree(points, cluster),
            })
            .collect();

        let simplified: PointCloud3f = parts.into_iter().flatten().collect();
        debug!(
            input = cloud.len(),
            output = simplified.len(),
            max_cluster_size = self.max_cluster_size,
            max_surface_variance = self.max_surface_variance,
            "hierarchy simplification"
        );
        Ok(simplified)
    }
}
