//! Standard block library for nodegeo graphs.
//!
//! Block families:
//!
//! - **Sources** - [`BoxBlock`], [`SphereBlock`], [`PlaneBlock`],
//!   [`CylinderBlock`], [`PointListBlock`], [`MeshBlock`]
//! - **Input / output** - [`GeometryInputBlock`], [`GeometryOutputBlock`]
//! - **Math** - [`MathBlock`], [`RandomBlock`], [`VectorConverterBlock`]
//! - **Matrices** - [`TranslationBlock`], [`ScalingBlock`], [`RotationBlock`],
//!   [`MatrixComposeBlock`]
//! - **Attributes** - [`SetPositionsBlock`], [`SetNormalsBlock`],
//!   [`SetColorsBlock`], [`SetTangentsBlock`], [`SetUvsBlock`]
//! - **Geometry** - [`ComputeNormalsBlock`], [`GeometryTransformBlock`],
//!   [`MergeGeometryBlock`], [`GeometryInfoBlock`]
//! - **Instancing** - [`InstantiateBlock`], [`InstantiateOnFacesBlock`],
//!   [`InstantiateOnVerticesBlock`], [`InstantiateOnVolumeBlock`]
//!
//! # Example
//!
//! ```
//! use nodegeo_blocks::{BoxBlock, GeometryOutputBlock, InstantiateBlock};
//! use nodegeo_core::{Graph, PortId};
//!
//! let mut graph = Graph::new();
//! let cube = graph.add_block("cube", BoxBlock::default());
//! let repeat = graph.add_block("repeat", InstantiateBlock::default());
//! let output = graph.add_block("output", GeometryOutputBlock);
//!
//! graph.connect(PortId::output(cube, 0), PortId::input(repeat, 0)).unwrap();
//! graph.set_input_default(PortId::input(repeat, 1), 4).unwrap();
//! graph.connect(PortId::output(repeat, 0), PortId::input(output, 0)).unwrap();
//! graph.set_output_block(output).unwrap();
//!
//! let outcome = graph.build().unwrap();
//! assert!(outcome.is_clean());
//! assert_eq!(outcome.geometry.unwrap().vertex_count(), 4 * 24);
//! ```

#[macro_use]
mod macros;

mod attributes;
mod geometry;
mod instancing;
mod io;
mod math;
mod matrices;
mod sources;

pub use attributes::{
    Attribute, Colors, Normals, Positions, SetAttributeBlock, SetColorsBlock, SetNormalsBlock,
    SetPositionsBlock, SetTangentsBlock, SetUvsBlock, Tangents, Uvs,
};
pub use geometry::{
    ComputeNormalsBlock, GeometryInfoBlock, GeometryTransformBlock, MergeGeometryBlock,
};
pub use instancing::{
    InstantiateBlock, InstantiateOnFacesBlock, InstantiateOnVerticesBlock,
    InstantiateOnVolumeBlock, contains_point, sample_triangle,
};
pub use io::{GeometryInputBlock, GeometryOutputBlock};
pub use math::{MathBlock, MathOperation, RandomBlock, RandomLock, VectorConverterBlock};
pub use matrices::{Axis, MatrixComposeBlock, RotationBlock, ScalingBlock, TranslationBlock};
pub use sources::{BoxBlock, CylinderBlock, MeshBlock, PlaneBlock, PointListBlock, SphereBlock};
