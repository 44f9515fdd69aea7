//! Triangle meshes produced by tile triangulation

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Indexed triangle mesh; faces refer to positions in `vertices`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// A mesh without vertices or without faces has no surface
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Append a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        self.vertices.push(vertex);
        self.vertices.len() - 1
    }

    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Unit normal per face, following the right-hand rule on the vertex order
    pub fn face_normals(&self) -> Vec<Vector3f> {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let origin = self.vertices[a];
                (self.vertices[b] - origin).cross(&(self.vertices[c] - origin)).normalize()
            })
            .collect()
    }

    /// Flatten the faces into a triangle-list index buffer
    pub fn index_buffer(&self) -> Result<Vec<u32>> {
        let mut indices = Vec::with_capacity(self.faces.len() * 3);
        for face in &self.faces {
            for &vi in face {
                let index = u32::try_from(vi).map_err(|_| {
                    Error::InvalidData(format!("Vertex index {} does not fit a 32-bit index buffer", vi))
                })?;
                indices.push(index);
            }
        }
        Ok(indices)
    }
}
