//! Height-field triangulation of tile point sets
//!
//! Terrain tiles are 2.5D: every (x, y) location carries a single height.
//! The points are projected onto the XY plane and triangulated with a 2D
//! Delaunay triangulation; the heights are carried through unchanged.

use spade::{DelaunayTriangulation, Point2, Triangulation};
use std::collections::hash_map::{Entry, HashMap};
use terratin_core::{
    Error, Point3f, PointCloud3f, Result, TriangleMesh, MIN_TRIANGULATION_POINTS,
};
use tracing::debug;

/// A triangulated tile surface
#[derive(Debug, Clone, Default)]
pub struct TriangulatedSurface {
    pub mesh: TriangleMesh,
}

impl TriangulatedSurface {
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Point3f> {
        self.mesh.vertices.iter()
    }

    /// Faces as vertex index triples, counter-clockwise seen from +z
    pub fn faces(&self) -> impl Iterator<Item = &[usize; 3]> {
        self.mesh.faces.iter()
    }

    /// Faces flattened into a triangle-list index buffer
    pub fn index_buffer(&self) -> Result<Vec<u32>> {
        self.mesh.index_buffer()
    }

    pub fn into_mesh(self) -> TriangleMesh {
        self.mesh
    }
}

/// Hashable XY key; `-0.0` and `0.0` map to the same key
fn xy_key(p: &Point3f) -> (u32, u32) {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

/// Merge samples sharing an XY location. Duplicates must agree on height.
fn distinct_samples(points: &[Point3f]) -> Result<Vec<Point3f>> {
    let mut seen: HashMap<(u32, u32), f32> = HashMap::with_capacity(points.len());
    let mut distinct = Vec::with_capacity(points.len());

    for p in points {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return Err(Error::InvalidData(format!("Non-finite point {:?}", p)));
        }
        match seen.entry(xy_key(p)) {
            Entry::Vacant(entry) => {
                entry.insert(p.z);
                distinct.push(*p);
            }
            Entry::Occupied(entry) => {
                if *entry.get() != p.z {
                    return Err(Error::DegenerateGeometry(format!(
                        "Two heights ({} and {}) at ({}, {}), the point set is not a height field",
                        entry.get(),
                        p.z,
                        p.x,
                        p.y
                    )));
                }
            }
        }
    }

    Ok(distinct)
}

/// Triangulate a tile point set as a height field over the XY plane.
///
/// Vertices of the returned mesh are the distinct input points, in
/// first-occurrence order.
pub fn triangulate_height_field(cloud: &PointCloud3f) -> Result<TriangulatedSurface> {
    let vertices = distinct_samples(cloud.as_slice())?;
    if vertices.len() < MIN_TRIANGULATION_POINTS {
        return Err(Error::DegenerateGeometry(format!(
            "Need at least {} distinct points for triangulation, got {}",
            MIN_TRIANGULATION_POINTS,
            vertices.len()
        )));
    }

    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    let mut handle_to_vertex = vec![usize::MAX; vertices.len()];

    for (i, p) in vertices.iter().enumerate() {
        let handle = triangulation
            .insert(Point2::new(p.x as f64, p.y as f64))
            .map_err(|e| Error::DegenerateGeometry(format!("Failed to insert point {:?}: {:?}", p, e)))?;
        let slot = handle.index();
        if slot >= handle_to_vertex.len() {
            handle_to_vertex.resize(slot + 1, usize::MAX);
        }
        handle_to_vertex[slot] = i;
    }

    let mut faces = Vec::with_capacity(triangulation.num_inner_faces());
    for face in triangulation.inner_faces() {
        let [a, b, c] = face.vertices().map(|v| handle_to_vertex[v.fix().index()]);
        if a == usize::MAX || b == usize::MAX || c == usize::MAX {
            return Err(Error::Algorithm(
                "Triangulation produced a vertex that was never inserted".to_string(),
            ));
        }
        faces.push([a, b, c]);
    }

    if faces.is_empty() {
        return Err(Error::DegenerateGeometry(format!(
            "All {} points are collinear in XY, no triangle can be formed",
            vertices.len()
        )));
    }

    debug!(
        input = cloud.len(),
        vertices = vertices.len(),
        faces = faces.len(),
        "triangulated height field"
    );

    Ok(TriangulatedSurface {
        mesh: TriangleMesh::from_vertices_and_faces(vertices, faces),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(mesh: &TriangleMesh, face: &[usize; 3]) -> f32 {
        let a = mesh.vertices[face[0]];
        let b = mesh.vertices[face[1]];
        let c = mesh.vertices[face[2]];
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }

    #[test]
    fn test_single_triangle() {
        let cloud = PointCloud3f::from_points(vec![
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 2.0),
            Point3f::new(0.5, 1.0, 3.0),
        ]);
        let surface = triangulate_height_field(&cloud).unwrap();
        assert_eq!(surface.vertex_count(), 3);
        assert_eq!(surface.face_count(), 1);
        let mut face = surface.mesh.faces[0];
        face.sort();
        assert_eq!(face, [0, 1, 2]);
    }

    #[test]
    fn test_grid_faces_are_counter_clockwise() {
        let mut points = Vec::new();
        for y in 0..5 {
            for x in 0..5 {
                points.push(Point3f::new(x as f32, y as f32 * 1.1, (x * y) as f32 * 0.1));
            }
        }
        let surface = triangulate_height_field(&PointCloud3f::from_points(points)).unwrap();

        // A convex 5x5 grid triangulates into 2 * 4 * 4 triangles.
        assert_eq!(surface.face_count(), 32);
        for face in surface.faces() {
            assert!(signed_area(&surface.mesh, face) > 0.0);
        }
        assert!(surface.mesh.face_normals().iter().all(|n| n.z > 0.0));
        assert_eq!(surface.index_buffer().unwrap().len(), 96);
    }

    #[test]
    fn test_heights_are_preserved() {
        let points = vec![
            Point3f::new(0.0, 0.0, 5.0),
            Point3f::new(2.0, 0.0, 6.0),
            Point3f::new(2.0, 2.0, 7.0),
            Point3f::new(0.0, 2.0, 8.0),
            Point3f::new(1.0, 1.0, 9.0),
        ];
        let surface = triangulate_height_field(&PointCloud3f::from_points(points.clone())).unwrap();
        assert_eq!(surface.mesh.vertices, points);
        assert_eq!(surface.face_count(), 4);
    }

    #[test]
    fn test_identical_duplicates_are_merged() {
        let cloud = PointCloud3f::from_points(vec![
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(-0.0, 0.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
        ]);
        let surface = triangulate_height_field(&cloud).unwrap();
        assert_eq!(surface.vertex_count(), 3);
        assert_eq!(surface.face_count(), 1);
    }

    #[test]
    fn test_conflicting_heights_are_degenerate() {
        let cloud = PointCloud3f::from_points(vec![
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
            Point3f::new(0.0, 0.0, 2.0),
        ]);
        assert!(matches!(
            triangulate_height_field(&cloud),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_too_few_points() {
        let cloud = PointCloud3f::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
        ]);
        assert!(matches!(
            triangulate_height_field(&cloud),
            Err(Error::DegenerateGeometry(_))
        ));
        assert!(triangulate_height_field(&PointCloud3f::new()).is_err());
    }

    #[test]
    fn test_collinear_points() {
        let cloud: PointCloud3f = (0..6).map(|i| Point3f::new(i as f32, i as f32 * 2.0, 0.0)).collect();
        let err = triangulate_height_field(&cloud).unwrap_err();
        assert!(matches!(err, Error::DegenerateGeometry(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_non_finite_input() {
        let cloud = PointCloud3f::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, f32::NAN),
            Point3f::new(0.0, 1.0, 0.0),
        ]);
        assert!(matches!(triangulate_height_field(&cloud), Err(Error::InvalidData(_))));
    }
}
