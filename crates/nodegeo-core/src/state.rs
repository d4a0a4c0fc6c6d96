//! Per-pass build state.

use glam::{EulerRot, Mat4, Quat, Vec3};
use nodegeo_mesh::VertexData;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use tracing::{debug, trace, warn};

use crate::block::{Evaluator, OutputValue};
use crate::config::BuildConfig;
use crate::context::{ContextualSource, ExecutionContext, InstancingContext};
use crate::diagnostic::Diagnostic;
use crate::graph::Graph;
use crate::port::PortId;
use crate::value::{Value, ValueKind};
use crate::BlockId;

/// State threaded through every block build and evaluator call of one pass.
///
/// Holds the stored output values, the contexts that contextual sources
/// resolve against, the random generator and the diagnostics.
pub struct BuildState<'g> {
    graph: &'g Graph,
    config: BuildConfig,
    outputs: HashMap<PortId, OutputValue>,
    built: HashSet<BlockId>,
    diagnostics: Vec<Diagnostic>,
    result: Option<Value>,
    rng: StdRng,
    scratch: Mat4,
    /// Block currently providing index / loop / face values.
    pub execution_context: Option<ExecutionContext>,
    /// Instancing block currently emitting clones.
    pub instancing_context: Option<InstancingContext>,
    /// Geometry whose arrays contextual sources read from.
    pub geometry_context: Option<Rc<VertexData>>,
}

impl<'g> BuildState<'g> {
    /// Creates a fresh state for one pass over `graph`.
    pub fn new(graph: &'g Graph, config: BuildConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            graph,
            config,
            outputs: HashMap::new(),
            built: HashSet::new(),
            diagnostics: Vec::new(),
            result: None,
            rng,
            scratch: Mat4::IDENTITY,
            execution_context: None,
            instancing_context: None,
            geometry_context: None,
        }
    }

    /// The graph being built.
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// The pass configuration.
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Random generator for sampling blocks.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Records a diagnostic. Repeats of the same diagnostic are dropped.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.contains(&diagnostic) {
            return;
        }
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    // ========================================================================
    // Building
    // ========================================================================

    /// Builds a block once per pass, after the blocks feeding it.
    ///
    /// A block with an unconnected required input is not built: each such
    /// input is recorded and all of its outputs store `Null`.
    pub fn build_block(&mut self, id: BlockId) {
        if !self.built.insert(id) {
            return;
        }
        let graph = self.graph;
        let Some(entry) = graph.entry(id) else {
            return;
        };

        for input in &entry.inputs {
            if let Some(peer) = input.peer {
                self.build_block(peer.block);
            }
        }

        let ctx = entry.context(id);
        let mut ready = true;
        for input in entry.inputs.iter().filter(|p| !p.is_optional() && p.peer.is_none()) {
            ready = false;
            self.record(Diagnostic::UnconnectedInput {
                block: id,
                block_name: entry.name.clone(),
                port: input.name().to_string(),
            });
        }
        if !ready {
            for output in ctx.outputs() {
                self.outputs.insert(output, OutputValue::default());
            }
            return;
        }

        if self.config.verbose {
            debug!(block = id, name = %entry.name, class = entry.block.class_name(), "building block");
        } else {
            trace!(block = id, class = entry.block.class_name(), "building block");
        }

        let mut scope = self.scope();
        entry.block.build(&ctx, &mut scope);
    }

    /// True once `id` has been built in this pass.
    pub fn is_built(&self, id: BlockId) -> bool {
        self.built.contains(&id)
    }

    /// Stores an output.
    ///
    /// With `evaluate_context` the evaluator is kept and invoked on every
    /// read. Otherwise it runs once now and its result is stored.
    pub fn store(&mut self, output: PortId, evaluator: Evaluator, evaluate_context: bool) {
        let stored = if evaluate_context {
            OutputValue::Evaluator(evaluator)
        } else {
            OutputValue::Literal(evaluator.call(self))
        };
        self.outputs.insert(output, stored);
    }

    /// Stores a literal output.
    pub fn store_value(&mut self, output: PortId, value: impl Into<Value>) {
        self.outputs.insert(output, OutputValue::Literal(value.into()));
    }

    /// Reads an output, building its block first if needed.
    pub fn output_value(&mut self, output: PortId) -> Value {
        self.build_block(output.block);
        match self.outputs.get(&output).cloned() {
            Some(stored) => stored.get(self),
            None => Value::Null,
        }
    }

    /// Hands the final value of the pass to the graph.
    pub fn set_result(&mut self, value: Value) {
        self.result = Some(value);
    }

    pub(crate) fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    // ========================================================================
    // Reading inputs
    // ========================================================================

    /// True if the input has a peer.
    pub fn is_connected(&self, input: PortId) -> bool {
        self.graph.port(input).is_some_and(|p| p.peer.is_some())
    }

    /// True if reads of `input` may differ from one another: its peer stored
    /// an evaluator. Builds the peer block if needed.
    pub fn is_varying(&mut self, input: PortId) -> bool {
        let Some(output) = self.graph.port(input).and_then(|p| p.peer) else {
            return false;
        };
        self.build_block(output.block);
        matches!(self.outputs.get(&output), Some(OutputValue::Evaluator(_)))
    }

    /// Reads an input.
    ///
    /// A connected input yields its peer's stored value, invoking the peer's
    /// evaluator with this state. An unconnected input yields its default.
    pub fn connected_value(&mut self, input: PortId) -> Value {
        let graph = self.graph;
        let Some(point) = graph.port(input) else {
            return Value::Null;
        };
        match point.peer {
            Some(output) => self.output_value(output),
            None => point.default.clone().unwrap_or_default(),
        }
    }

    /// Reads an input adapted to `kind`, or `default` when that fails.
    ///
    /// A non-null value that cannot be adapted is recorded as a type mismatch.
    pub fn adapt(&mut self, input: PortId, kind: ValueKind, default: Value) -> Value {
        let value = self.connected_value(input);
        match value.coerce(kind) {
            Some(adapted) => adapted,
            None => {
                if !value.is_null() {
                    let port = self
                        .graph
                        .port(input)
                        .map_or_else(String::new, |p| p.name().to_string());
                    self.record(Diagnostic::TypeMismatch {
                        block: input.block,
                        port,
                        expected: kind,
                        got: value.kind(),
                    });
                }
                default
            }
        }
    }

    /// Reads an input as a float.
    pub fn float(&mut self, input: PortId, default: f32) -> f32 {
        self.adapt(input, ValueKind::Float, Value::Float(default))
            .as_float()
            .unwrap_or(default)
    }

    /// Reads an input as an integer.
    pub fn int(&mut self, input: PortId, default: i32) -> i32 {
        self.adapt(input, ValueKind::Int, Value::Int(default))
            .as_int()
            .unwrap_or(default)
    }

    /// Reads an input as a Vec3.
    pub fn vec3(&mut self, input: PortId, default: Vec3) -> Vec3 {
        self.adapt(input, ValueKind::Vector3, Value::Vector3(default))
            .as_vec3()
            .unwrap_or(default)
    }

    /// Reads an input as a matrix.
    pub fn matrix(&mut self, input: PortId) -> Option<Mat4> {
        self.adapt(input, ValueKind::Matrix, Value::Null).as_matrix().ok()
    }

    /// Reads an input as geometry. `None` for null or non-geometry values.
    pub fn geometry(&mut self, input: PortId) -> Option<Rc<VertexData>> {
        self.adapt(input, ValueKind::Geometry, Value::Null)
            .as_geometry()
            .ok()
            .cloned()
    }

    // ========================================================================
    // Contexts
    // ========================================================================

    /// Opens a scope that restores all contexts when dropped.
    pub fn scope(&mut self) -> ContextScope<'_, 'g> {
        ContextScope::new(self)
    }

    /// Resolves a contextual source.
    ///
    /// Overrides on the execution context win, then the geometry context's
    /// arrays at the current index. With nothing to answer the request a
    /// diagnostic is recorded and `Null` returned.
    pub fn contextual_value(&mut self, source: ContextualSource) -> Value {
        let value = self.lookup_contextual(source);
        if value.is_null() {
            self.record(Diagnostic::MissingContextualData { source });
        }
        value
    }

    fn lookup_contextual(&self, source: ContextualSource) -> Value {
        let execution = self.execution_context.as_ref();
        let geometry = self.geometry_context.as_deref();
        let index = execution.map(ExecutionContext::current_index);
        let at = |read: fn(&VertexData, usize) -> Option<Value>| -> Value {
            match (geometry, index) {
                (Some(geometry), Some(index)) => read(geometry, index).unwrap_or_default(),
                _ => Value::Null,
            }
        };

        match source {
            ContextualSource::Positions => match execution.and_then(|c| c.override_position()) {
                Some(p) => Value::Vector3(p),
                None => at(|g, i| g.position(i).map(Value::Vector3)),
            },
            ContextualSource::Normals => match execution.and_then(|c| c.override_normal()) {
                Some(n) => Value::Vector3(n),
                None => at(|g, i| g.normal(i).map(Value::Vector3)),
            },
            ContextualSource::Colors => at(|g, i| g.color(i).map(Value::Vector4)),
            ContextualSource::Tangents => at(|g, i| g.tangent(i).map(Value::Vector4)),
            ContextualSource::Uv => at(|g, i| g.uv(i).map(Value::Vector2)),
            ContextualSource::VertexId => {
                execution.map_or(Value::Null, |c| Value::Int(c.current_index() as i32))
            }
            ContextualSource::FaceId => {
                execution.map_or(Value::Null, |c| Value::Int(c.current_face_index() as i32))
            }
            ContextualSource::LoopId => {
                execution.map_or(Value::Null, |c| Value::Int(c.current_loop_index() as i32))
            }
            ContextualSource::InstanceId => self
                .instancing_context
                .map_or(Value::Null, |c| Value::Int(c.instance_index as i32)),
            ContextualSource::GeometryId => {
                geometry.map_or(Value::Null, |g| Value::Int(g.id as i32))
            }
            ContextualSource::VertexCount => {
                geometry.map_or(Value::Null, |g| Value::Int(g.vertex_count() as i32))
            }
            ContextualSource::FaceCount => {
                geometry.map_or(Value::Null, |g| Value::Int(g.face_count() as i32))
            }
        }
    }

    // ========================================================================
    // Instancing
    // ========================================================================

    /// Transforms a clone by translation, Euler rotation (yaw, pitch, roll
    /// taken from y, x, z) and scale.
    pub fn instantiate_trs(
        &mut self,
        clone: &mut VertexData,
        position: Vec3,
        rotation: Vec3,
        scaling: Vec3,
    ) {
        let rotation = Quat::from_euler(EulerRot::YXZ, rotation.y, rotation.x, rotation.z);
        self.scratch = Mat4::from_scale_rotation_translation(scaling, rotation, position);
        clone.transform(&self.scratch);
    }

    /// Transforms a clone by a matrix.
    pub fn instantiate_matrix(&mut self, clone: &mut VertexData, matrix: Mat4) {
        self.scratch = matrix;
        clone.transform(&self.scratch);
    }

    /// Transforms a clone by a matrix, then moves it to `position`.
    pub fn instantiate_position_and_matrix(
        &mut self,
        clone: &mut VertexData,
        position: Vec3,
        matrix: Mat4,
    ) {
        self.scratch = Mat4::from_translation(position) * matrix;
        clone.transform(&self.scratch);
    }
}

// ============================================================================
// Context scope
// ============================================================================

/// Restores the execution, instancing and geometry contexts on drop.
///
/// Derefs to [`BuildState`], so a block sets its context on the scope and
/// keeps reading inputs through it. Every exit path restores the caller's
/// contexts.
pub struct ContextScope<'s, 'g> {
    state: &'s mut BuildState<'g>,
    execution: Option<ExecutionContext>,
    instancing: Option<InstancingContext>,
    geometry: Option<Rc<VertexData>>,
}

impl<'s, 'g> ContextScope<'s, 'g> {
    fn new(state: &'s mut BuildState<'g>) -> Self {
        Self {
            execution: state.execution_context,
            instancing: state.instancing_context,
            geometry: state.geometry_context.clone(),
            state,
        }
    }
}

impl<'g> Deref for ContextScope<'_, 'g> {
    type Target = BuildState<'g>;

    fn deref(&self) -> &Self::Target {
        self.state
    }
}

impl DerefMut for ContextScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.state
    }
}

impl Drop for ContextScope<'_, '_> {
    fn drop(&mut self) {
        self.state.execution_context = self.execution.take();
        self.state.instancing_context = self.instancing.take();
        self.state.geometry_context = self.geometry.take();
    }
}
