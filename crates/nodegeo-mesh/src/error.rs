//! Error types for nodegeo-mesh.

use thiserror::Error;

/// Structural problems found by [`VertexData::validate`](crate::VertexData::validate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    /// The position buffer does not hold whole vertices.
    #[error("position buffer length {0} is not a multiple of 3")]
    PositionStride(usize),

    /// An optional attribute does not match the vertex count.
    #[error("{attribute} buffer has length {got}, expected {expected}")]
    AttributeLength {
        /// Attribute name.
        attribute: &'static str,
        /// Expected length (vertex count times stride).
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// The index buffer does not hold whole triangles.
    #[error("index buffer length {0} is not a multiple of 3")]
    IndexStride(usize),

    /// An index points past the last vertex.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index value.
        index: u32,
        /// Number of vertices in the buffer.
        vertex_count: usize,
    },
}
