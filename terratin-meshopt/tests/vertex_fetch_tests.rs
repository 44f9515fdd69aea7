//! Vertex fetch optimization on meshes built from core types

use terratin_core::{Point3f, PositionVertex, TriangleMesh};
use terratin_meshopt::{optimize_vertex_fetch_in_place, optimize_vertex_fetch_typed, UNASSIGNED};

fn mesh_with_unused_vertices() -> TriangleMesh {
    let vertices = vec![
        Point3f::new(0.0, 0.0, 0.0),
        Point3f::new(9.0, 9.0, 9.0), // unused
        Point3f::new(1.0, 0.0, 0.0),
        Point3f::new(1.0, 1.0, 0.0),
        Point3f::new(0.0, 1.0, 0.0),
    ];
    TriangleMesh::from_vertices_and_faces(vertices, vec![[3, 4, 0], [0, 2, 3]])
}

#[test]
fn test_mesh_buffers_are_compacted() {
    let mesh = mesh_with_unused_vertices();
    let mut vertices: Vec<PositionVertex> = mesh.vertices.iter().map(|&p| p.into()).collect();
    let mut indices = mesh.index_buffer().unwrap();

    let result = optimize_vertex_fetch_typed(&mut vertices, &mut indices).unwrap();

    assert_eq!(result.vertex_count, 4);
    assert_eq!(result.remap, vec![2, UNASSIGNED, 3, 0, 1]);
    assert_eq!(indices, vec![0, 1, 2, 2, 3, 0]);
    assert_eq!(vertices.len(), 4);
    assert_eq!(Point3f::from(vertices[0]), Point3f::new(1.0, 1.0, 0.0));
    assert_eq!(Point3f::from(vertices[3]), Point3f::new(1.0, 0.0, 0.0));

    // Every triangle still refers to the same positions.
    for (face, chunk) in mesh.faces.iter().zip(indices.chunks(3)) {
        for (&old, &new) in face.iter().zip(chunk) {
            assert_eq!(mesh.vertices[old], Point3f::from(vertices[new as usize]));
        }
    }
}

#[test]
fn test_optimizing_twice_is_stable() {
    let mesh = mesh_with_unused_vertices();
    let mut vertices: Vec<PositionVertex> = mesh.vertices.iter().map(|&p| p.into()).collect();
    let mut indices = mesh.index_buffer().unwrap();
    optimize_vertex_fetch_typed(&mut vertices, &mut indices).unwrap();

    let once = (vertices.clone(), indices.clone());
    let second = optimize_vertex_fetch_typed(&mut vertices, &mut indices).unwrap();

    assert_eq!(second.remap, vec![0, 1, 2, 3]);
    assert_eq!((vertices, indices), once);
}

#[test]
fn test_in_place_with_mismatched_remap_fails_cleanly() {
    let mut buffer: Vec<u8> = (0u8..24).collect();
    let mut indices = vec![1, 0, 1];
    let mut remap = vec![UNASSIGNED; 3];

    assert!(optimize_vertex_fetch_in_place(&mut buffer, &mut indices, 8, &mut remap[..2]).is_err());
    assert_eq!(buffer, (0u8..24).collect::<Vec<u8>>());
    assert_eq!(indices, vec![1, 0, 1]);
}
