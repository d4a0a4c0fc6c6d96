//! Whole-geometry operations.

use glam::{EulerRot, Mat4, Quat, Vec3};
use nodegeo_core::{
    Block, BlockContext, BuildState, Evaluator, PortSpec, Value, ValueKind, VertexData,
    impl_as_any,
};
use serde::{Deserialize, Serialize};

fn evaluate_context_default() -> bool {
    true
}

// ============================================================================
// Compute normals
// ============================================================================

/// Replaces normals with smooth, area-weighted ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComputeNormalsBlock {
    pub evaluate_context: bool,
}

impl Default for ComputeNormalsBlock {
    fn default() -> Self {
        Self {
            evaluate_context: evaluate_context_default(),
        }
    }
}

impl Block for ComputeNormalsBlock {
    fn class_name(&self) -> &'static str {
        "ComputeNormalsBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("geometry", ValueKind::Geometry),
            PortSpec::output("output", ValueKind::Geometry),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let geometry = ctx.input(0);
        let evaluator = Evaluator::new(move |state| {
            let Some(geometry) = state.geometry(geometry) else {
                return Value::Null;
            };
            let mut data = (*geometry).clone();
            data.compute_normals();
            Value::from(data)
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Transform
// ============================================================================

/// Transforms geometry by a matrix, or by translation, rotation and scaling
/// around a pivot when no matrix is connected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeometryTransformBlock {
    pub evaluate_context: bool,
}

impl Default for GeometryTransformBlock {
    fn default() -> Self {
        Self {
            evaluate_context: evaluate_context_default(),
        }
    }
}

impl GeometryTransformBlock {
    const GEOMETRY: usize = 0;
    const MATRIX: usize = 1;
    const TRANSLATION: usize = 2;
    const ROTATION: usize = 3;
    const SCALING: usize = 4;
    const PIVOT: usize = 5;

    /// `T(translation) * T(pivot) * R * S * T(-pivot)`. Rotation is Euler
    /// radians, applied yaw (y), pitch (x), roll (z).
    pub fn compose(translation: Vec3, rotation: Vec3, scaling: Vec3, pivot: Vec3) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::YXZ, rotation.y, rotation.x, rotation.z);
        Mat4::from_translation(translation + pivot)
            * Mat4::from_scale_rotation_translation(scaling, rotation, Vec3::ZERO)
            * Mat4::from_translation(-pivot)
    }
}

impl Block for GeometryTransformBlock {
    fn class_name(&self) -> &'static str {
        "GeometryTransformBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("geometry", ValueKind::Geometry),
            PortSpec::input("matrix", ValueKind::Matrix).optional(),
            PortSpec::input("translation", ValueKind::Vector3).with_default(Vec3::ZERO),
            PortSpec::input("rotation", ValueKind::Vector3).with_default(Vec3::ZERO),
            PortSpec::input("scaling", ValueKind::Vector3).with_default(Vec3::ONE),
            PortSpec::input("pivot", ValueKind::Vector3).with_default(Vec3::ZERO),
            PortSpec::output("output", ValueKind::Geometry),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let geometry = ctx.input(Self::GEOMETRY);
        let matrix = ctx.input(Self::MATRIX);
        let [translation, rotation, scaling, pivot] = [
            Self::TRANSLATION,
            Self::ROTATION,
            Self::SCALING,
            Self::PIVOT,
        ]
        .map(|i| ctx.input(i));

        let evaluator = Evaluator::new(move |state| {
            let Some(geometry) = state.geometry(geometry) else {
                return Value::Null;
            };
            let transform = if state.is_connected(matrix) {
                state.matrix(matrix).unwrap_or(Mat4::IDENTITY)
            } else {
                Self::compose(
                    state.vec3(translation, Vec3::ZERO),
                    state.vec3(rotation, Vec3::ZERO),
                    state.vec3(scaling, Vec3::ONE),
                    state.vec3(pivot, Vec3::ZERO),
                )
            };
            let mut data = (*geometry).clone();
            data.transform(&transform);
            Value::from(data)
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Merge
// ============================================================================

/// Merges up to five geometries. Only `geometry0` is required; null inputs
/// are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeGeometryBlock {
    pub evaluate_context: bool,
}

impl Default for MergeGeometryBlock {
    fn default() -> Self {
        Self {
            evaluate_context: evaluate_context_default(),
        }
    }
}

impl MergeGeometryBlock {
    pub const INPUTS: usize = 5;
}

impl Block for MergeGeometryBlock {
    fn class_name(&self) -> &'static str {
        "MergeGeometryBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        const NAMES: [&str; MergeGeometryBlock::INPUTS] =
            ["geometry0", "geometry1", "geometry2", "geometry3", "geometry4"];
        let mut ports: Vec<PortSpec> = NAMES
            .iter()
            .enumerate()
            .map(|(i, &name)| {
                let port = PortSpec::input(name, ValueKind::Geometry);
                if i == 0 { port } else { port.optional() }
            })
            .collect();
        ports.push(PortSpec::output("output", ValueKind::Geometry));
        ports
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let inputs: [_; Self::INPUTS] = std::array::from_fn(|i| ctx.input(i));
        let evaluator = Evaluator::new(move |state| {
            let buffers: Vec<VertexData> = inputs
                .iter()
                .filter_map(|&input| state.geometry(input))
                .filter(|g| g.has_positions())
                .map(|g| (*g).clone())
                .collect();
            VertexData::merge_all(buffers).into()
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Info
// ============================================================================

/// Passes geometry through and reports its ID, vertex count and face count.
#[derive(Debug, Clone, Default)]
pub struct GeometryInfoBlock;

impl Block for GeometryInfoBlock {
    fn class_name(&self) -> &'static str {
        "GeometryInfoBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("geometry", ValueKind::Geometry),
            PortSpec::output("output", ValueKind::Geometry),
            PortSpec::output("id", ValueKind::Int),
            PortSpec::output("vertexCount", ValueKind::Int),
            PortSpec::output("faceCount", ValueKind::Int),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let geometry = ctx.input(0);
        let readers: [fn(&VertexData) -> i32; 3] = [
            |g| g.id as i32,
            |g| g.vertex_count() as i32,
            |g| g.face_count() as i32,
        ];

        let passthrough =
            Evaluator::new(move |state| state.geometry(geometry).map_or(Value::Null, Value::from));
        state.store(ctx.output(0), passthrough, true);

        for (output, read) in readers.into_iter().enumerate() {
            let evaluator = Evaluator::new(move |state| {
                state
                    .geometry(geometry)
                    .map_or(Value::Null, |g| Value::Int(read(&g)))
            });
            state.store(ctx.output(output + 1), evaluator, true);
        }
    }

    impl_as_any!();
}
