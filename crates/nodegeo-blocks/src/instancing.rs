//! Instancing blocks.
//!
//! Every block here follows the same skeleton: choose placements over some
//! domain (a loop, the faces of a mesh, its vertices, its volume), publish
//! an [`ExecutionContext`] for each one, pull a fresh `instance`, deep-clone
//! it, transform the clone and finally merge all clones into one buffer.
//!
//! The transform is the `matrix` input when connected. Otherwise it is
//! composed from `position`/`offset`, `rotation` (Euler radians) and
//! `scaling`, pulled per placement so they can vary with the context.

use std::collections::HashSet;

use glam::{Mat4, Vec3};
use nodegeo_core::{
    Block, BlockContext, BlockId, BuildState, Diagnostic, Evaluator, ExecutionContext,
    InstancingContext, PortId, PortSpec, Value, ValueKind, VertexData, impl_as_any,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

// ============================================================================
// Shared skeleton
// ============================================================================

/// Ports every instancing block reads per placement.
#[derive(Debug, Clone, Copy)]
struct TransformInputs {
    instance: PortId,
    matrix: PortId,
    position: PortId,
    rotation: PortId,
    scaling: PortId,
}

/// The trailing transform ports, shared by all instancing blocks.
fn transform_ports(position: &'static str) -> [PortSpec; 4] {
    [
        PortSpec::input("matrix", ValueKind::Matrix).optional(),
        PortSpec::input(position, ValueKind::Vector3).with_default(Vec3::ZERO),
        PortSpec::input("rotation", ValueKind::Vector3).with_default(Vec3::ZERO),
        PortSpec::input("scaling", ValueKind::Vector3).with_default(Vec3::ONE),
    ]
}

/// Publishes both contexts for one placement.
fn enter(state: &mut BuildState<'_>, context: ExecutionContext) {
    state.instancing_context = Some(InstancingContext {
        block: context.block,
        instance_index: context.loop_index,
    });
    state.execution_context = Some(context);
}

/// Pulls one instance and appends its transformed clone to `clones`.
///
/// `placement` is the sampled point for surface and volume instancing; it is
/// added to the composed translation, or applied after the matrix. Returns
/// false when the pulled instance is null or has no positions.
fn emit(
    state: &mut BuildState<'_>,
    inputs: &TransformInputs,
    placement: Option<Vec3>,
    clones: &mut Vec<VertexData>,
) -> bool {
    let Some(instance) = state.geometry(inputs.instance) else {
        return false;
    };
    if !instance.has_positions() {
        return false;
    }
    let mut clone = (*instance).clone();

    if state.is_connected(inputs.matrix) {
        let matrix = state.matrix(inputs.matrix).unwrap_or(Mat4::IDENTITY);
        match placement {
            Some(position) => state.instantiate_position_and_matrix(&mut clone, position, matrix),
            None => state.instantiate_matrix(&mut clone, matrix),
        }
    } else {
        let position = state.vec3(inputs.position, Vec3::ZERO) + placement.unwrap_or(Vec3::ZERO);
        let rotation = state.vec3(inputs.rotation, Vec3::ZERO);
        let scaling = state.vec3(inputs.scaling, Vec3::ONE);
        state.instantiate_trs(&mut clone, position, rotation, scaling);
    }
    clones.push(clone);
    true
}

/// True when every pull of `instance` would be skipped: its upstream is a
/// fixed value with no positions.
fn instance_is_empty(state: &mut BuildState<'_>, instance: PortId) -> bool {
    !state.is_varying(instance) && state.geometry(instance).is_none_or(|g| !g.has_positions())
}

/// Reads the base geometry of a surface or volume instancer.
///
/// Records [`Diagnostic::InvalidGeometry`] and returns `None` when the
/// geometry lacks positions, or indices where `needs_faces` is set.
fn base_geometry(
    state: &mut BuildState<'_>,
    block: BlockId,
    input: PortId,
    needs_faces: bool,
) -> Option<std::rc::Rc<VertexData>> {
    let base = state.geometry(input)?;
    let reason = if !base.has_positions() {
        Some("geometry has no positions")
    } else if needs_faces && base.face_count() == 0 {
        Some("geometry has no faces")
    } else {
        None
    };
    match reason {
        Some(reason) => {
            state.record(Diagnostic::InvalidGeometry {
                block,
                reason: reason.to_string(),
            });
            None
        }
        None => Some(base),
    }
}

fn evaluate_context_default() -> bool {
    true
}

// ============================================================================
// Loop
// ============================================================================

/// Instantiates `instance` `count` times.
///
/// Each iteration publishes `LoopId` = `InstanceId` = the iteration index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstantiateBlock {
    pub evaluate_context: bool,
}

impl Default for InstantiateBlock {
    fn default() -> Self {
        Self {
            evaluate_context: evaluate_context_default(),
        }
    }
}

impl InstantiateBlock {
    fn evaluate(
        state: &mut BuildState<'_>,
        id: BlockId,
        count: PortId,
        inputs: TransformInputs,
    ) -> Value {
        let mut scope = state.scope();
        let count = scope.int(count, 1).max(0) as usize;
        if count == 0 || instance_is_empty(&mut scope, inputs.instance) {
            return Value::Null;
        }

        let mut clones = Vec::new();

        for i in 0..count {
            enter(&mut scope, ExecutionContext::new(id).at(i));
            emit(&mut scope, &inputs, None, &mut clones);
        }
        VertexData::merge_all(clones).into()
    }
}

impl Block for InstantiateBlock {
    fn class_name(&self) -> &'static str {
        "InstantiateBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![
            PortSpec::input("instance", ValueKind::Geometry),
            PortSpec::input("count", ValueKind::Int).with_default(1),
        ];
        ports.extend(transform_ports("position"));
        ports.push(PortSpec::output("output", ValueKind::Geometry));
        ports
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let count = ctx.input(1);
        let inputs = TransformInputs {
            instance: ctx.input(0),
            matrix: ctx.input(2),
            position: ctx.input(3),
            rotation: ctx.input(4),
            scaling: ctx.input(5),
        };
        let evaluator = Evaluator::new(move |state| Self::evaluate(state, id, count, inputs));
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Faces
// ============================================================================

/// Scatters `count` instances over the faces of `geometry`.
///
/// Faces receive `count / faces` instances each through a running
/// accumulator: a face emits `floor(accumulated) - done`, so the remainder
/// is carried forward and the total is exactly `count`. Early faces may
/// emit none. Points are uniform within each triangle. Faces indexing past
/// the positions are recorded as [`Diagnostic::InvalidGeometry`] and left
/// out of the split.
///
/// While an instance is pulled, `Positions` and `Normals` resolve to the
/// sampled point and the face normal, `FaceId` to the face and `LoopId` to
/// the running instance index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstantiateOnFacesBlock {
    pub evaluate_context: bool,
}

impl Default for InstantiateOnFacesBlock {
    fn default() -> Self {
        Self {
            evaluate_context: evaluate_context_default(),
        }
    }
}

/// Uniform point within a triangle, from two uniform draws in `[0, 1)`.
pub fn sample_triangle(v0: Vec3, v1: Vec3, v2: Vec3, x: f32, y: f32) -> Vec3 {
    let (x, y) = if x > y { (y, x) } else { (x, y) };
    let (s, t) = (x, y - x);
    let u = 1.0 - s - t;
    v0 * s + v1 * t + v2 * u
}

/// Normal of a triangle from its normalized edges.
fn face_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    (v1 - v0)
        .normalize_or_zero()
        .cross((v2 - v1).normalize_or_zero())
}

impl InstantiateOnFacesBlock {
    fn evaluate(
        state: &mut BuildState<'_>,
        id: BlockId,
        geometry: PortId,
        count: PortId,
        inputs: TransformInputs,
    ) -> Value {
        let mut scope = state.scope();
        let Some(base) = base_geometry(&mut scope, id, geometry, true) else {
            return Value::Null;
        };
        let count = scope.int(count, 256).max(0) as usize;
        if count == 0 || instance_is_empty(&mut scope, inputs.instance) {
            return Value::Null;
        }
        let triangles: Vec<(usize, [Vec3; 3])> = (0..base.face_count())
            .filter_map(|face| {
                let [a, b, c] = base.triangle(face)?;
                Some((
                    face,
                    [
                        base.position(a as usize)?,
                        base.position(b as usize)?,
                        base.position(c as usize)?,
                    ],
                ))
            })
            .collect();
        let skipped = base.face_count() - triangles.len();
        if skipped > 0 {
            scope.record(Diagnostic::InvalidGeometry {
                block: id,
                reason: format!("{skipped} faces reference missing vertices"),
            });
        }
        if triangles.is_empty() {
            return Value::Null;
        }
        scope.geometry_context = Some(base.clone());

        let per_face = count as f32 / triangles.len() as f32;
        let mut accumulated = 0.0_f32;
        let mut done = 0;
        let mut clones = Vec::new();

        for (slot, &(face, [v0, v1, v2])) in triangles.iter().enumerate() {
            if done >= count {
                break;
            }
            accumulated += per_face;
            let target = if slot + 1 == triangles.len() {
                count
            } else {
                (accumulated.floor() as usize).min(count)
            };
            if target <= done {
                continue;
            }
            let normal = face_normal(v0, v1, v2);

            while done < target {
                let (x, y) = (scope.rng().random::<f32>(), scope.rng().random::<f32>());
                let point = sample_triangle(v0, v1, v2, x, y);
                let mut context = ExecutionContext::new(id).at(done);
                context.face_index = face;
                context.position = Some(point);
                context.normal = Some(normal);
                enter(&mut scope, context);

                trace!(block = id, face, instance = done, "instantiating on face");
                emit(&mut scope, &inputs, Some(point), &mut clones);
                done += 1;
            }
        }
        VertexData::merge_all(clones).into()
    }
}

impl Block for InstantiateOnFacesBlock {
    fn class_name(&self) -> &'static str {
        "InstantiateOnFacesBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![
            PortSpec::input("geometry", ValueKind::Geometry),
            PortSpec::input("instance", ValueKind::Geometry),
            PortSpec::input("count", ValueKind::Int).with_default(256),
        ];
        ports.extend(transform_ports("offset"));
        ports.push(PortSpec::output("output", ValueKind::Geometry));
        ports
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let (geometry, count) = (ctx.input(0), ctx.input(2));
        let inputs = TransformInputs {
            instance: ctx.input(1),
            matrix: ctx.input(3),
            position: ctx.input(4),
            rotation: ctx.input(5),
            scaling: ctx.input(6),
        };
        let evaluator =
            Evaluator::new(move |state| Self::evaluate(state, id, geometry, count, inputs));
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Vertices
// ============================================================================

/// Places an instance on the vertices of `geometry`.
///
/// `density` in `[0, 1]` is the chance a vertex receives one. With
/// `remove_duplicated_positions`, vertices sharing a position (the split
/// corners of a box) receive at most one instance between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstantiateOnVerticesBlock {
    pub evaluate_context: bool,
    pub remove_duplicated_positions: bool,
}

impl Default for InstantiateOnVerticesBlock {
    fn default() -> Self {
        Self {
            evaluate_context: evaluate_context_default(),
            remove_duplicated_positions: true,
        }
    }
}

impl InstantiateOnVerticesBlock {
    fn evaluate(
        state: &mut BuildState<'_>,
        id: BlockId,
        dedupe: bool,
        geometry: PortId,
        density: PortId,
        inputs: TransformInputs,
    ) -> Value {
        let mut scope = state.scope();
        let Some(base) = base_geometry(&mut scope, id, geometry, false) else {
            return Value::Null;
        };
        let density = scope.float(density, 1.0);
        scope.geometry_context = Some(base.clone());

        let mut seen = HashSet::new();
        let mut emitted = 0;
        let mut clones = Vec::new();

        for index in 0..base.vertex_count() {
            let Some(position) = base.position(index) else {
                continue;
            };
            if dedupe && !seen.insert(position.to_array().map(f32::to_bits)) {
                continue;
            }
            if density < 1.0 && scope.rng().random::<f32>() >= density {
                continue;
            }

            let mut context = ExecutionContext::new(id).at(index);
            context.loop_index = emitted;
            context.position = Some(position);
            context.normal = base.normal(index);
            enter(&mut scope, context);

            emit(&mut scope, &inputs, Some(position), &mut clones);
            emitted += 1;
        }
        VertexData::merge_all(clones).into()
    }
}

impl Block for InstantiateOnVerticesBlock {
    fn class_name(&self) -> &'static str {
        "InstantiateOnVerticesBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![
            PortSpec::input("geometry", ValueKind::Geometry),
            PortSpec::input("instance", ValueKind::Geometry),
            PortSpec::input("density", ValueKind::Float).with_default(1.0),
        ];
        ports.extend(transform_ports("offset"));
        ports.push(PortSpec::output("output", ValueKind::Geometry));
        ports
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let dedupe = self.remove_duplicated_positions;
        let (geometry, density) = (ctx.input(0), ctx.input(2));
        let inputs = TransformInputs {
            instance: ctx.input(1),
            matrix: ctx.input(3),
            position: ctx.input(4),
            rotation: ctx.input(5),
            scaling: ctx.input(6),
        };
        let evaluator = Evaluator::new(move |state| {
            Self::evaluate(state, id, dedupe, geometry, density, inputs)
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Volume
// ============================================================================

/// Scatters `count` instances inside the closed surface of `geometry`.
///
/// Candidates are drawn uniformly in the bounding box and kept when a ray
/// towards +X crosses the surface an odd number of times. Each instance
/// gets at most `max_attempts` candidates; the block stops short of
/// `count` when the volume is too thin to hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstantiateOnVolumeBlock {
    pub evaluate_context: bool,
    pub max_attempts: u32,
}

impl Default for InstantiateOnVolumeBlock {
    fn default() -> Self {
        Self {
            evaluate_context: evaluate_context_default(),
            max_attempts: 100,
        }
    }
}

/// Distance along `direction` at which the ray hits the triangle.
///
/// Möller–Trumbore; hits behind the origin and edge-on rays are misses.
fn ray_triangle(origin: Vec3, direction: Vec3, [v0, v1, v2]: [Vec3; 3]) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let (e1, e2) = (v1 - v0, v2 - v0);
    let p = direction.cross(e2);
    let det = e1.dot(p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - v0;
    let u = s.dot(p) * inv;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(e1);
    let v = direction.dot(q) * inv;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(q) * inv;
    (t > EPSILON).then_some(t)
}

/// True when `point` lies inside the closed surface of `data`.
pub fn contains_point(data: &VertexData, point: Vec3) -> bool {
    let crossings = (0..data.face_count())
        .filter_map(|face| {
            let [a, b, c] = data.triangle(face)?;
            Some([
                data.position(a as usize)?,
                data.position(b as usize)?,
                data.position(c as usize)?,
            ])
        })
        .filter(|&triangle| ray_triangle(point, Vec3::X, triangle).is_some())
        .count();
    crossings % 2 == 1
}

impl InstantiateOnVolumeBlock {
    fn evaluate(
        state: &mut BuildState<'_>,
        id: BlockId,
        max_attempts: u32,
        geometry: PortId,
        count: PortId,
        inputs: TransformInputs,
    ) -> Value {
        let mut scope = state.scope();
        let Some(base) = base_geometry(&mut scope, id, geometry, true) else {
            return Value::Null;
        };
        let Some((min, max)) = base.bounds() else {
            return Value::Null;
        };
        let count = scope.int(count, 256).max(0) as usize;
        if count == 0 || instance_is_empty(&mut scope, inputs.instance) {
            return Value::Null;
        }
        scope.geometry_context = Some(base.clone());

        let mut clones = Vec::new();
        for index in 0..count {
            let point = (0..max_attempts).find_map(|_| {
                let rng = scope.rng();
                let t = Vec3::new(rng.random(), rng.random(), rng.random());
                let candidate = min + (max - min) * t;
                contains_point(&base, candidate).then_some(candidate)
            });
            let Some(point) = point else {
                trace!(block = id, index, "no point found inside volume");
                break;
            };

            let mut context = ExecutionContext::new(id).at(index);
            context.position = Some(point);
            enter(&mut scope, context);
            emit(&mut scope, &inputs, Some(point), &mut clones);
        }
        VertexData::merge_all(clones).into()
    }
}

impl Block for InstantiateOnVolumeBlock {
    fn class_name(&self) -> &'static str {
        "InstantiateOnVolumeBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![
            PortSpec::input("geometry", ValueKind::Geometry),
            PortSpec::input("instance", ValueKind::Geometry),
            PortSpec::input("count", ValueKind::Int).with_default(256),
        ];
        ports.extend(transform_ports("offset"));
        ports.push(PortSpec::output("output", ValueKind::Geometry));
        ports
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let max_attempts = self.max_attempts;
        let (geometry, count) = (ctx.input(0), ctx.input(2));
        let inputs = TransformInputs {
            instance: ctx.input(1),
            matrix: ctx.input(3),
            position: ctx.input(4),
            rotation: ctx.input(5),
            scaling: ctx.input(6),
        };
        let evaluator = Evaluator::new(move |state| {
            Self::evaluate(state, id, max_attempts, geometry, count, inputs)
        });
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}
