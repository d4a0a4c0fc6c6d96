//! Core vertex-data types.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::MeshError;

/// A per-vertex attribute stored as a flat float array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKind {
    /// Vertex position (xyz).
    Position,
    /// Vertex normal (xyz).
    Normal,
    /// Texture coordinate (uv).
    Uv,
    /// Vertex color (rgba).
    Color,
    /// Tangent (xyz + handedness).
    Tangent,
}

impl AttributeKind {
    /// All attribute kinds, in buffer order.
    pub const ALL: [AttributeKind; 5] = [
        AttributeKind::Position,
        AttributeKind::Normal,
        AttributeKind::Uv,
        AttributeKind::Color,
        AttributeKind::Tangent,
    ];

    /// Number of floats per vertex.
    pub fn stride(self) -> usize {
        match self {
            AttributeKind::Position | AttributeKind::Normal => 3,
            AttributeKind::Uv => 2,
            AttributeKind::Color | AttributeKind::Tangent => 4,
        }
    }

    /// Attribute name as used by mesh consumers.
    pub fn name(self) -> &'static str {
        match self {
            AttributeKind::Position => "position",
            AttributeKind::Normal => "normal",
            AttributeKind::Uv => "uv",
            AttributeKind::Color => "color",
            AttributeKind::Tangent => "tangent",
        }
    }

    /// Value used to fill vertices that never had this attribute.
    pub fn fill_value(self) -> f32 {
        match self {
            AttributeKind::Color => 1.0,
            _ => 0.0,
        }
    }
}

/// Flat geometry buffer.
///
/// Every attribute is a flat `f32` array with a fixed stride per vertex
/// (see [`AttributeKind::stride`]). Positions are mandatory for a buffer to
/// be useful; all other attributes are optional. `indices` groups vertex
/// offsets in threes (triangles); a buffer without indices is a point cloud.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexData {
    /// Vertex positions, three floats per vertex.
    #[serde(default)]
    pub positions: Vec<f32>,
    /// Vertex normals, three floats per vertex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Vec<f32>>,
    /// Texture coordinates, two floats per vertex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uvs: Option<Vec<f32>>,
    /// Vertex colors, four floats per vertex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<f32>>,
    /// Tangents, four floats per vertex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tangents: Option<Vec<f32>>,
    /// Triangle indices (every 3 form a triangle).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
    /// Identifier of the geometry this buffer was produced from.
    #[serde(default)]
    pub id: u32,
}

impl VertexData {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a point cloud from a flat position array.
    pub fn from_positions(positions: Vec<f32>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    /// Creates a point cloud from a list of points.
    pub fn from_points(points: &[Vec3]) -> Self {
        Self::from_positions(points.iter().flat_map(|p| p.to_array()).collect())
    }

    /// Returns the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Returns the number of triangles.
    pub fn face_count(&self) -> usize {
        self.indices.as_ref().map_or(0, |i| i.len() / 3)
    }

    /// Returns true if the buffer holds at least one position.
    pub fn has_positions(&self) -> bool {
        !self.positions.is_empty()
    }

    /// Returns true if the buffer holds at least one index.
    pub fn has_indices(&self) -> bool {
        self.indices.as_ref().is_some_and(|i| !i.is_empty())
    }

    /// Returns the flat array for an attribute, if present.
    pub fn attribute(&self, kind: AttributeKind) -> Option<&[f32]> {
        match kind {
            AttributeKind::Position => Some(self.positions.as_slice()),
            AttributeKind::Normal => self.normals.as_deref(),
            AttributeKind::Uv => self.uvs.as_deref(),
            AttributeKind::Color => self.colors.as_deref(),
            AttributeKind::Tangent => self.tangents.as_deref(),
        }
    }

    /// Returns the array for an attribute, creating it when missing.
    ///
    /// A created array is sized for the current vertex count and filled with
    /// [`AttributeKind::fill_value`]. An existing array shorter than the
    /// vertex count is padded the same way.
    pub fn attribute_mut(&mut self, kind: AttributeKind) -> &mut Vec<f32> {
        let len = self.vertex_count() * kind.stride();
        let slot = match kind {
            AttributeKind::Position => return &mut self.positions,
            AttributeKind::Normal => &mut self.normals,
            AttributeKind::Uv => &mut self.uvs,
            AttributeKind::Color => &mut self.colors,
            AttributeKind::Tangent => &mut self.tangents,
        };
        let array = slot.get_or_insert_with(Vec::new);
        if array.len() < len {
            array.resize(len, kind.fill_value());
        }
        array
    }

    /// Writes one vertex worth of components into an attribute.
    ///
    /// Extra components are ignored, missing ones keep their previous value.
    pub fn write_attribute(&mut self, kind: AttributeKind, index: usize, values: &[f32]) {
        let stride = kind.stride();
        let array = self.attribute_mut(kind);
        let start = index * stride;
        if array.len() < start + stride {
            array.resize(start + stride, kind.fill_value());
        }
        for (slot, value) in array[start..start + stride].iter_mut().zip(values) {
            *slot = *value;
        }
    }

    fn read<const N: usize>(array: Option<&[f32]>, index: usize) -> Option<[f32; N]> {
        let start = index * N;
        array?.get(start..start + N)?.try_into().ok()
    }

    /// Gets a single vertex position.
    pub fn position(&self, index: usize) -> Option<Vec3> {
        Self::read::<3>(Some(self.positions.as_slice()), index).map(Vec3::from_array)
    }

    /// Gets a single vertex normal.
    pub fn normal(&self, index: usize) -> Option<Vec3> {
        Self::read::<3>(self.normals.as_deref(), index).map(Vec3::from_array)
    }

    /// Gets a single texture coordinate.
    pub fn uv(&self, index: usize) -> Option<Vec2> {
        Self::read::<2>(self.uvs.as_deref(), index).map(Vec2::from_array)
    }

    /// Gets a single vertex color.
    pub fn color(&self, index: usize) -> Option<Vec4> {
        Self::read::<4>(self.colors.as_deref(), index).map(Vec4::from_array)
    }

    /// Gets a single tangent.
    pub fn tangent(&self, index: usize) -> Option<Vec4> {
        Self::read::<4>(self.tangents.as_deref(), index).map(Vec4::from_array)
    }

    /// Returns the vertex indices of a triangle.
    pub fn triangle(&self, face: usize) -> Option<[u32; 3]> {
        let indices = self.indices.as_ref()?;
        let start = face * 3;
        indices.get(start..start + 3)?.try_into().ok()
    }

    /// Returns the axis-aligned bounds of all positions.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.positions.chunks_exact(3).map(Vec3::from_slice);
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Transforms positions, normals and tangents by a matrix.
    pub fn transform(&mut self, matrix: &Mat4) {
        for chunk in self.positions.chunks_exact_mut(3) {
            let p = matrix.transform_point3(Vec3::from_slice(chunk));
            chunk.copy_from_slice(&p.to_array());
        }

        let normal_matrix = matrix.inverse().transpose();
        if let Some(normals) = &mut self.normals {
            for chunk in normals.chunks_exact_mut(3) {
                let n = normal_matrix
                    .transform_vector3(Vec3::from_slice(chunk))
                    .normalize_or_zero();
                chunk.copy_from_slice(&n.to_array());
            }
        }

        if let Some(tangents) = &mut self.tangents {
            for chunk in tangents.chunks_exact_mut(4) {
                let t = matrix
                    .transform_vector3(Vec3::from_slice(&chunk[..3]))
                    .normalize_or_zero();
                chunk[..3].copy_from_slice(&t.to_array());
            }
        }
    }

    /// Computes smooth normals by averaging adjacent face normals.
    ///
    /// Does nothing for point clouds.
    pub fn compute_normals(&mut self) {
        let Some(indices) = &self.indices else {
            return;
        };
        let mut normals = vec![Vec3::ZERO; self.vertex_count()];

        for tri in indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(v0), Some(v1), Some(v2)) =
                (self.position(i0), self.position(i1), self.position(i2))
            else {
                continue;
            };

            let normal = (v1 - v0).cross(v2 - v0); // unnormalized = area-weighted

            normals[i0] += normal;
            normals[i1] += normal;
            normals[i2] += normal;
        }

        self.normals = Some(
            normals
                .into_iter()
                .flat_map(|n| n.normalize_or_zero().to_array())
                .collect(),
        );
    }

    /// Checks the stride and index invariants.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.positions.len() % 3 != 0 {
            return Err(MeshError::PositionStride(self.positions.len()));
        }
        let vertex_count = self.vertex_count();

        for kind in AttributeKind::ALL.into_iter().skip(1) {
            if let Some(array) = self.attribute(kind) {
                let expected = vertex_count * kind.stride();
                if array.len() != expected {
                    return Err(MeshError::AttributeLength {
                        attribute: kind.name(),
                        expected,
                        got: array.len(),
                    });
                }
            }
        }

        if let Some(indices) = &self.indices {
            if indices.len() % 3 != 0 {
                return Err(MeshError::IndexStride(indices.len()));
            }
            if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }

        Ok(())
    }

    /// Hands the buffer to a mesh consumer.
    pub fn apply_to<T: MeshTarget + ?Sized>(&self, target: &mut T, updatable: bool) {
        target.set_vertex_data(self, updatable);
    }
}

/// Consumer of finished vertex data (a renderer mesh, an exporter, ...).
pub trait MeshTarget {
    /// Replaces the target's geometry with `data`.
    ///
    /// `updatable` hints that the buffers will be rewritten later.
    fn set_vertex_data(&mut self, data: &VertexData, updatable: bool);
}

/// Builder for constructing vertex data vertex by vertex.
#[derive(Debug, Clone, Default)]
pub struct VertexDataBuilder {
    data: VertexData,
}

impl VertexDataBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex with position only.
    pub fn vertex(&mut self, position: Vec3) -> u32 {
        let index = self.data.vertex_count() as u32;
        self.data.positions.extend_from_slice(&position.to_array());
        index
    }

    /// Adds a vertex with position, normal, and UV.
    pub fn vertex_with_normal_uv(&mut self, position: Vec3, normal: Vec3, uv: Vec2) -> u32 {
        let index = self.vertex(position);
        self.data
            .normals
            .get_or_insert_with(Vec::new)
            .extend_from_slice(&normal.to_array());
        self.data
            .uvs
            .get_or_insert_with(Vec::new)
            .extend_from_slice(&uv.to_array());
        index
    }

    /// Adds a triangle from three vertex indices.
    pub fn triangle(&mut self, i0: u32, i1: u32, i2: u32) {
        self.data
            .indices
            .get_or_insert_with(Vec::new)
            .extend_from_slice(&[i0, i1, i2]);
    }

    /// Adds a quad from four vertex indices (converted to two triangles).
    pub fn quad(&mut self, i0: u32, i1: u32, i2: u32, i3: u32) {
        self.triangle(i0, i1, i2);
        self.triangle(i0, i2, i3);
    }

    /// Builds the final buffer.
    pub fn build(self) -> VertexData {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> VertexData {
        let mut builder = VertexDataBuilder::new();
        let v0 = builder.vertex(Vec3::new(0.0, 0.0, 0.0));
        let v1 = builder.vertex(Vec3::new(1.0, 0.0, 0.0));
        let v2 = builder.vertex(Vec3::new(0.0, 1.0, 0.0));
        builder.triangle(v0, v1, v2);
        builder.build()
    }

    #[test]
    fn test_builder_counts() {
        let data = triangle();
        assert_eq!(data.vertex_count(), 3);
        assert_eq!(data.face_count(), 1);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn test_point_cloud_has_no_faces() {
        let data = VertexData::from_points(&[Vec3::ZERO, Vec3::ONE]);
        assert_eq!(data.vertex_count(), 2);
        assert_eq!(data.face_count(), 0);
        assert!(!data.has_indices());
    }

    #[test]
    fn test_accessors() {
        let data = triangle();
        assert_eq!(data.position(1), Some(Vec3::X));
        assert_eq!(data.position(3), None);
        assert_eq!(data.normal(0), None);
        assert_eq!(data.triangle(0), Some([0, 1, 2]));
        assert_eq!(data.triangle(1), None);
    }

    #[test]
    fn test_write_attribute_creates_missing_array() {
        let mut data = triangle();
        data.write_attribute(AttributeKind::Color, 1, &[0.5, 0.25, 0.0, 1.0]);

        let colors = data.colors.as_ref().unwrap();
        assert_eq!(colors.len(), 12);
        // Untouched vertices keep the fill value.
        assert_eq!(data.color(0), Some(Vec4::ONE));
        assert_eq!(data.color(1), Some(Vec4::new(0.5, 0.25, 0.0, 1.0)));
    }

    #[test]
    fn test_compute_normals() {
        let mut data = triangle();
        data.compute_normals();
        for i in 0..3 {
            let n = data.normal(i).unwrap();
            assert!((n - Vec3::Z).length() < 1e-5);
        }
    }

    #[test]
    fn test_transform_moves_positions_and_keeps_normals_unit() {
        let mut data = triangle();
        data.compute_normals();
        data.transform(&Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::IDENTITY,
            Vec3::new(1.0, 0.0, 0.0),
        ));

        assert_eq!(data.position(0), Some(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(data.position(1), Some(Vec3::new(3.0, 0.0, 0.0)));
        assert!((data.normal(0).unwrap().length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_bounds() {
        let data = triangle();
        let (min, max) = data.bounds().unwrap();
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::new(1.0, 1.0, 0.0));
        assert!(VertexData::new().bounds().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_buffers() {
        let mut data = triangle();
        data.indices = Some(vec![0, 1, 7]);
        assert!(matches!(
            data.validate(),
            Err(MeshError::IndexOutOfRange { index: 7, .. })
        ));

        let mut data = triangle();
        data.colors = Some(vec![1.0; 5]);
        assert!(matches!(
            data.validate(),
            Err(MeshError::AttributeLength { attribute: "color", .. })
        ));

        let data = VertexData::from_positions(vec![0.0; 4]);
        assert_eq!(data.validate(), Err(MeshError::PositionStride(4)));
    }

    #[test]
    fn test_apply_to_target() {
        #[derive(Default)]
        struct Recorder {
            vertices: usize,
            updatable: bool,
        }

        impl MeshTarget for Recorder {
            fn set_vertex_data(&mut self, data: &VertexData, updatable: bool) {
                self.vertices = data.vertex_count();
                self.updatable = updatable;
            }
        }

        let mut target = Recorder::default();
        triangle().apply_to(&mut target, true);
        assert_eq!(target.vertices, 3);
        assert!(target.updatable);
    }

    #[test]
    fn test_json_omits_missing_attributes() {
        let json = serde_json::to_value(triangle()).unwrap();
        assert!(json.get("normals").is_none());
        assert_eq!(json["indices"], serde_json::json!([0, 1, 2]));

        let back: VertexData = serde_json::from_value(json).unwrap();
        assert_eq!(back, triangle());
    }
}
