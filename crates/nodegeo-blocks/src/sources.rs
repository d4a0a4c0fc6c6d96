//! Geometry-producing leaf blocks.

use glam::Vec3;
use nodegeo_core::{
    Block, BlockContext, BuildState, Evaluator, PortSpec, Value, ValueKind, VertexData,
    impl_as_any,
};
use nodegeo_mesh::{Cuboid, Cylinder, Plane, UvSphere};
use serde::{Deserialize, Serialize};

/// Stamps the producing block's ID on the geometry.
fn stamped(mut data: VertexData, id: u32) -> Value {
    data.id = id;
    Value::from(data)
}

/// Picks `specific` when positive, `size` otherwise.
fn dimension(specific: f32, size: f32) -> f32 {
    if specific > 0.0 { specific } else { size }
}

// ============================================================================
// Box
// ============================================================================

/// Generates a box. `width`, `height` and `depth` override `size` when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoxBlock {
    /// Re-evaluate per read instead of once per build.
    pub evaluate_context: bool,
}

impl BoxBlock {
    const SIZE: usize = 0;
    const WIDTH: usize = 1;
    const HEIGHT: usize = 2;
    const DEPTH: usize = 3;
}

impl Block for BoxBlock {
    fn class_name(&self) -> &'static str {
        "BoxBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("size", ValueKind::Float).with_default(1.0),
            PortSpec::input("width", ValueKind::Float).with_default(0.0),
            PortSpec::input("height", ValueKind::Float).with_default(0.0),
            PortSpec::input("depth", ValueKind::Float).with_default(0.0),
            PortSpec::output("geometry", ValueKind::Geometry),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let (size, width, height, depth) = (
            ctx.input(Self::SIZE),
            ctx.input(Self::WIDTH),
            ctx.input(Self::HEIGHT),
            ctx.input(Self::DEPTH),
        );
        let evaluator = Evaluator::new(move |state| {
            let size = state.float(size, 1.0);
            let cuboid = Cuboid::new(
                dimension(state.float(width, 0.0), size),
                dimension(state.float(height, 0.0), size),
                dimension(state.float(depth, 0.0), size),
            );
            stamped(cuboid.apply(), id)
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Sphere
// ============================================================================

/// Generates a UV sphere.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SphereBlock {
    /// Re-evaluate per read instead of once per build.
    pub evaluate_context: bool,
}

impl Block for SphereBlock {
    fn class_name(&self) -> &'static str {
        "SphereBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("segments", ValueKind::Int).with_default(32),
            PortSpec::input("diameter", ValueKind::Float).with_default(1.0),
            PortSpec::output("geometry", ValueKind::Geometry),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let (segments, diameter) = (ctx.input(0), ctx.input(1));
        let evaluator = Evaluator::new(move |state| {
            let segments = state.int(segments, 32).max(2) as u32;
            let diameter = state.float(diameter, 1.0);
            stamped(UvSphere::new(diameter / 2.0, segments * 2, segments).apply(), id)
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Plane
// ============================================================================

/// Generates a plane in XZ. `width` and `height` override `size` when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaneBlock {
    /// Re-evaluate per read instead of once per build.
    pub evaluate_context: bool,
}

impl Block for PlaneBlock {
    fn class_name(&self) -> &'static str {
        "PlaneBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("size", ValueKind::Float).with_default(1.0),
            PortSpec::input("width", ValueKind::Float).with_default(0.0),
            PortSpec::input("height", ValueKind::Float).with_default(0.0),
            PortSpec::input("subdivisions", ValueKind::Int).with_default(1),
            PortSpec::output("geometry", ValueKind::Geometry),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let (size, width, height, subdivisions) =
            (ctx.input(0), ctx.input(1), ctx.input(2), ctx.input(3));
        let evaluator = Evaluator::new(move |state| {
            let size = state.float(size, 1.0);
            let subdivisions = state.int(subdivisions, 1).max(1) as u32;
            let plane = Plane::new(
                dimension(state.float(width, 0.0), size),
                dimension(state.float(height, 0.0), size),
                subdivisions,
                subdivisions,
            );
            stamped(plane.apply(), id)
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Cylinder
// ============================================================================

/// Generates a capped cylinder along Y.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CylinderBlock {
    /// Re-evaluate per read instead of once per build.
    pub evaluate_context: bool,
}

impl Block for CylinderBlock {
    fn class_name(&self) -> &'static str {
        "CylinderBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("height", ValueKind::Float).with_default(2.0),
            PortSpec::input("diameter", ValueKind::Float).with_default(1.0),
            PortSpec::input("tessellation", ValueKind::Int).with_default(24),
            PortSpec::output("geometry", ValueKind::Geometry),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let (height, diameter, tessellation) = (ctx.input(0), ctx.input(1), ctx.input(2));
        let evaluator = Evaluator::new(move |state| {
            let height = state.float(height, 2.0);
            let diameter = state.float(diameter, 1.0);
            let tessellation = state.int(tessellation, 24).max(3) as u32;
            stamped(Cylinder::new(diameter / 2.0, height, tessellation).apply(), id)
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Point list
// ============================================================================

/// Outputs a fixed point cloud (positions only, no indices).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PointListBlock {
    /// Points, in order.
    pub points: Vec<Vec3>,
}

impl PointListBlock {
    /// Creates a block emitting `points`.
    pub fn new(points: Vec<Vec3>) -> Self {
        Self { points }
    }
}

impl Block for PointListBlock {
    fn class_name(&self) -> &'static str {
        "PointListBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("geometry", ValueKind::Geometry)]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        if self.points.is_empty() {
            state.store_value(ctx.output(0), Value::Null);
            return;
        }
        state.store_value(
            ctx.output(0),
            stamped(VertexData::from_points(&self.points), ctx.id()),
        );
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Mesh
// ============================================================================

/// Outputs externally supplied vertex data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MeshBlock {
    /// The geometry to emit. `None` outputs null.
    pub vertex_data: Option<VertexData>,
    /// Flip triangle winding.
    pub reverse_winding_order: bool,
}

impl MeshBlock {
    /// Creates a block emitting `data`.
    pub fn new(data: VertexData) -> Self {
        Self {
            vertex_data: Some(data),
            reverse_winding_order: false,
        }
    }
}

impl Block for MeshBlock {
    fn class_name(&self) -> &'static str {
        "MeshBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("geometry", ValueKind::Geometry)]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let Some(data) = &self.vertex_data else {
            state.store_value(ctx.output(0), Value::Null);
            return;
        };
        let mut data = data.clone();
        if self.reverse_winding_order {
            if let Some(indices) = &mut data.indices {
                for triangle in indices.chunks_exact_mut(3) {
                    triangle.swap(1, 2);
                }
            }
        }
        state.store_value(ctx.output(0), data);
    }

    serde_properties!();
    impl_as_any!();
}
