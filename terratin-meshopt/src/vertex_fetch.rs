//! Vertex fetch optimization
//!
//! Rewrites a vertex buffer so that vertices appear in the order in which
//! the index buffer first references them. Vertices that no index refers to
//! are dropped, which both compacts the buffer and improves the locality of
//! vertex fetches on the GPU.
//!
//! All entry points check every precondition before touching any buffer:
//! on error, nothing has been written.

use bytemuck::Pod;
use terratin_core::{Error, Result};
use tracing::debug;

/// Remap entry of a vertex that has not been referenced (yet)
pub const UNASSIGNED: u32 = u32::MAX;

/// Largest supported vertex record, in bytes
pub const MAX_VERTEX_SIZE: usize = 256;

/// Result of [`optimize_vertex_fetch_typed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexFetchRemap {
    /// Number of vertices left in the buffer
    pub vertex_count: usize,
    /// Old vertex index to new vertex index, [`UNASSIGNED`] for dropped vertices
    pub remap: Vec<u32>,
}

fn precondition(message: impl Into<String>) -> Error {
    Error::PreconditionViolation(message.into())
}

/// Check buffer shapes and index ranges, returning the source vertex count
fn validate(indices: &[u32], vertex_bytes: usize, vertex_size: usize, remap: &[u32]) -> Result<usize> {
    if indices.len() % 3 != 0 {
        return Err(precondition(format!(
            "Index count {} is not a multiple of 3",
            indices.len()
        )));
    }
    if vertex_size == 0 || vertex_size > MAX_VERTEX_SIZE {
        return Err(precondition(format!(
            "Vertex size must lie in [1, {}], got {}",
            MAX_VERTEX_SIZE, vertex_size
        )));
    }
    if vertex_bytes % vertex_size != 0 {
        return Err(precondition(format!(
            "Vertex buffer of {} bytes is not a whole number of {}-byte vertices",
            vertex_bytes, vertex_size
        )));
    }

    let vertex_count = vertex_bytes / vertex_size;
    if vertex_count > UNASSIGNED as usize {
        return Err(precondition(format!(
            "{} vertices cannot be addressed by 32-bit indices",
            vertex_count
        )));
    }
    if remap.len() != vertex_count {
        return Err(precondition(format!(
            "Remap table has {} entries for {} vertices",
            remap.len(),
            vertex_count
        )));
    }
    if remap.iter().any(|&r| r != UNASSIGNED) {
        return Err(precondition("Remap table must be initialized to UNASSIGNED"));
    }
    if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(precondition(format!(
            "Index {} out of range for {} vertices",
            index, vertex_count
        )));
    }

    Ok(vertex_count)
}

/// Single left-to-right pass over `indices`.
///
/// The first time a vertex is seen it gets the next free slot and `copy` is
/// called with `(source, destination)` vertex positions. Every index is
/// rewritten to its slot. Returns the number of slots handed out.
fn remap_scan(indices: &mut [u32], remap: &mut [u32], mut copy: impl FnMut(usize, usize)) -> usize {
    let mut next = 0u32;

    for index in indices.iter_mut() {
        let source = *index as usize;
        if remap[source] == UNASSIGNED {
            copy(source, next as usize);
            remap[source] = next;
            next += 1;
        }
        *index = remap[source];
    }

    next as usize
}

fn copy_record(destination: &mut [u8], source: &[u8], vertex_size: usize, from: usize, to: usize) {
    let src = &source[from * vertex_size..(from + 1) * vertex_size];
    destination[to * vertex_size..(to + 1) * vertex_size].copy_from_slice(src);
}

/// Reorder `vertices` into `destination` in first-use order and rewrite
/// `indices` accordingly.
///
/// `remap` must hold one [`UNASSIGNED`] entry per source vertex; on return it
/// maps every referenced source vertex to its new position. Returns the
/// number of vertices written to `destination`. Bytes of `destination` past
/// that count are left as they were.
pub fn optimize_vertex_fetch(
    destination: &mut [u8],
    indices: &mut [u32],
    vertices: &[u8],
    vertex_size: usize,
    remap: &mut [u32],
) -> Result<usize> {
    let vertex_count = validate(indices, vertices.len(), vertex_size, remap)?;
    if destination.len() < vertices.len() {
        return Err(precondition(format!(
            "Destination of {} bytes cannot hold {} bytes of vertices",
            destination.len(),
            vertices.len()
        )));
    }

    let count = remap_scan(indices, remap, |from, to| {
        copy_record(destination, vertices, vertex_size, from, to)
    });

    debug!(vertex_count, referenced = count, vertex_size, "optimized vertex fetch");
    Ok(count)
}

/// Same as [`optimize_vertex_fetch`] with one buffer acting as both source
/// and destination. The source records are snapshotted before any write.
pub fn optimize_vertex_fetch_in_place(
    buffer: &mut [u8],
    indices: &mut [u32],
    vertex_size: usize,
    remap: &mut [u32],
) -> Result<usize> {
    let vertex_count = validate(indices, buffer.len(), vertex_size, remap)?;

    let source = buffer.to_vec();
    let count = remap_scan(indices, remap, |from, to| {
        copy_record(buffer, &source, vertex_size, from, to)
    });

    debug!(vertex_count, referenced = count, vertex_size, "optimized vertex fetch in place");
    Ok(count)
}

/// Typed in-place variant: reorders `vertices`, truncates it to the
/// referenced vertices and rewrites `indices`.
pub fn optimize_vertex_fetch_typed<V: Pod>(
    vertices: &mut Vec<V>,
    indices: &mut [u32],
) -> Result<VertexFetchRemap> {
    let vertex_size = std::mem::size_of::<V>();
    if vertex_size == 0 {
        return Err(precondition("Vertex type must not be zero-sized"));
    }

    let mut remap = vec![UNASSIGNED; vertices.len()];
    let bytes: &mut [u8] = bytemuck::cast_slice_mut(vertices.as_mut_slice());
    let vertex_count = optimize_vertex_fetch_in_place(bytes, indices, vertex_size, &mut remap)?;
    vertices.truncate(vertex_count);

    Ok(VertexFetchRemap { vertex_count, remap })
}
