//! Vertex-data buffers for nodegeo.
//!
//! This crate holds the flat geometry representation that flows through
//! node-geometry graphs:
//!
//! - [`VertexData`] - attribute-per-array buffer (positions, normals, uvs,
//!   colors, tangents, indices)
//! - [`AttributeKind`] - named per-vertex attributes and their strides
//! - Merge / extract utilities with correct index offsetting
//! - Primitive builders ([`Cuboid`], [`UvSphere`], [`Plane`], [`Cylinder`])
//!
//! # Example
//!
//! ```
//! use nodegeo_mesh::{Cuboid, VertexData};
//!
//! let a = Cuboid::unit().apply();
//! let b = Cuboid::cube(2.0).apply();
//!
//! let merged = VertexData::merge_all(vec![a, b]).unwrap();
//! assert_eq!(merged.vertex_count(), 48);
//! assert_eq!(merged.face_count(), 24);
//! ```

mod error;
mod merge;
mod primitives;
mod vertex_data;

pub use error::MeshError;
pub use glam;
pub use primitives::{Cuboid, Cylinder, Plane, UvSphere};
pub use vertex_data::{AttributeKind, MeshTarget, VertexData, VertexDataBuilder};
