//! Execution contexts and contextual sources.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::ValueKind;
use crate::BlockId;

/// Ambient per-iteration state exposed by a contextual block.
///
/// Set-attribute blocks iterate vertices, instancing blocks iterate loop
/// steps or faces. While they evaluate their inputs they publish the current
/// step here so that [`ContextualSource`] reads resolve against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionContext {
    /// Block providing the context.
    pub block: BlockId,
    /// Current vertex index.
    pub index: usize,
    /// Current loop iteration.
    pub loop_index: usize,
    /// Current face.
    pub face_index: usize,
    /// Overrides the position read from the geometry context.
    pub position: Option<Vec3>,
    /// Overrides the normal read from the geometry context.
    pub normal: Option<Vec3>,
}

impl ExecutionContext {
    /// A context at index 0 with no overrides.
    pub fn new(block: BlockId) -> Self {
        Self {
            block,
            index: 0,
            loop_index: 0,
            face_index: 0,
            position: None,
            normal: None,
        }
    }

    /// Sets both the index and the loop index.
    pub fn at(mut self, index: usize) -> Self {
        self.index = index;
        self.loop_index = index;
        self
    }

    /// Current vertex index.
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// Current loop iteration.
    pub fn current_loop_index(&self) -> usize {
        self.loop_index
    }

    /// Current face.
    pub fn current_face_index(&self) -> usize {
        self.face_index
    }

    /// Position override, if the block samples points itself.
    pub fn override_position(&self) -> Option<Vec3> {
        self.position
    }

    /// Normal override, if the block samples points itself.
    pub fn override_normal(&self) -> Option<Vec3> {
        self.normal
    }
}

/// The instancing block currently emitting clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstancingContext {
    /// Block emitting instances.
    pub block: BlockId,
    /// Index of the instance being produced.
    pub instance_index: usize,
}

/// Named ambient values resolved by
/// [`BuildState::contextual_value`](crate::BuildState::contextual_value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextualSource {
    /// Position of the current vertex (or the sampled point).
    Positions,
    /// Normal of the current vertex (or the sampled face).
    Normals,
    /// Color of the current vertex.
    Colors,
    /// Tangent of the current vertex.
    Tangents,
    /// Texture coordinate of the current vertex.
    Uv,
    /// Current vertex index.
    VertexId,
    /// Current face index.
    FaceId,
    /// Current loop iteration.
    LoopId,
    /// Current instance index.
    InstanceId,
    /// ID of the geometry in context.
    GeometryId,
    /// Vertex count of the geometry in context.
    VertexCount,
    /// Face count of the geometry in context.
    FaceCount,
}

impl ContextualSource {
    /// Kind of the value this source produces.
    pub fn kind(self) -> ValueKind {
        match self {
            ContextualSource::Positions | ContextualSource::Normals => ValueKind::Vector3,
            ContextualSource::Colors | ContextualSource::Tangents => ValueKind::Vector4,
            ContextualSource::Uv => ValueKind::Vector2,
            _ => ValueKind::Int,
        }
    }
}

impl fmt::Display for ContextualSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
