//! Integration tests for nodegeo-core: type resolution, acyclicity and
//! context restoration.

use std::cell::RefCell;
use std::rc::Rc;

use nodegeo_core::{
    Block, BlockContext, BlockId, BuildState, CompatibilityState, ContextualSource, Diagnostic,
    Evaluator, ExecutionContext, Graph, GraphError, PortId, PortSpec, Value, ValueKind,
    impl_as_any,
};
use proptest::prelude::*;

/// Sends build logs to the test writer; filter with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ─── Stub blocks ──────────────────────────────────────────────

/// Outputs a constant of a fixed kind.
struct Constant(Value, ValueKind);

impl Block for Constant {
    fn class_name(&self) -> &'static str {
        "Constant"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("output", self.1)]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        state.store_value(ctx.output(0), self.0.clone());
    }

    impl_as_any!();
}

/// Two linked AutoDetect inputs and a BasedOnInput output.
struct Binary;

impl Block for Binary {
    fn class_name(&self) -> &'static str {
        "Binary"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("left", ValueKind::AutoDetect)
                .linked_with("right")
                .optional()
                .excluding([ValueKind::Matrix, ValueKind::Geometry]),
            PortSpec::input("right", ValueKind::AutoDetect)
                .linked_with("left")
                .optional()
                .excluding([ValueKind::Matrix, ValueKind::Geometry]),
            PortSpec::output("output", ValueKind::BasedOnInput)
                .type_from("left")
                .fallback(ValueKind::Float),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let value = state.connected_value(ctx.input(0));
        state.store_value(ctx.output(0), value);
    }

    impl_as_any!();
}

/// Sets every context on the state and never restores it.
struct Leaky;

impl Block for Leaky {
    fn class_name(&self) -> &'static str {
        "Leaky"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("output", ValueKind::Int)]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        state.execution_context = Some(ExecutionContext::new(ctx.id()).at(42));
        state.geometry_context = Some(Rc::new(nodegeo_core::VertexData::new()));
        state.store_value(ctx.output(0), 1);
    }

    impl_as_any!();
}

type Snapshot = (Option<ExecutionContext>, bool);

/// Builds a sibling block and records the contexts before and after.
struct Observer {
    sibling: BlockId,
    log: Rc<RefCell<Vec<Snapshot>>>,
}

impl Block for Observer {
    fn class_name(&self) -> &'static str {
        "Observer"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("output", ValueKind::Int)]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let snapshot = |state: &BuildState<'_>| {
            (state.execution_context, state.geometry_context.is_some())
        };
        self.log.borrow_mut().push(snapshot(&*state));
        state.build_block(self.sibling);
        self.log.borrow_mut().push(snapshot(&*state));
        state.store_value(ctx.output(0), 0);
    }

    impl_as_any!();
}

/// Output evaluated lazily from the current loop index.
struct LoopIndex;

impl Block for LoopIndex {
    fn class_name(&self) -> &'static str {
        "LoopIndex"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("output", ValueKind::Int)]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let evaluator = Evaluator::new(|state| state.contextual_value(ContextualSource::LoopId));
        state.store(ctx.output(0), evaluator, true);
    }

    impl_as_any!();
}

// ─── Incompatible connections ─────────────────────────────────

#[test]
fn excluded_matrix_is_rejected() {
    let mut graph = Graph::new();
    let matrix = graph.add_block(
        "matrix",
        Constant(Value::Matrix(nodegeo_core::glam::Mat4::IDENTITY), ValueKind::Matrix),
    );
    let op = graph.add_block("op", Binary);

    let output = PortId::output(matrix, 0);
    let input = PortId::input(op, 0);
    assert_eq!(graph.can_connect(output, input), CompatibilityState::TypeIncompatible);

    let err = graph.connect(output, input).unwrap_err();
    assert_eq!(
        err,
        GraphError::Incompatible {
            state: CompatibilityState::TypeIncompatible,
            output,
            input,
        }
    );
    assert!(graph.port(output).unwrap().endpoints().is_empty());
    assert!(graph.port(input).unwrap().peer().is_none());
    assert!(graph.connections().is_empty());
}

#[test]
fn unchecked_connect_skips_type_rules() {
    let mut graph = Graph::new();
    let matrix = graph.add_block(
        "matrix",
        Constant(Value::Matrix(nodegeo_core::glam::Mat4::IDENTITY), ValueKind::Matrix),
    );
    let op = graph.add_block("op", Binary);

    // The bypass skips the type rules entirely.
    graph
        .connect_unchecked(PortId::output(matrix, 0), PortId::input(op, 0))
        .unwrap();
    assert_eq!(graph.resolved_kind(PortId::input(op, 0)), ValueKind::Matrix);
}

// ─── Context restoration ──────────────────────────────────────

#[test]
fn contexts_are_restored_after_sibling_build() {
    init_tracing();
    let mut graph = Graph::new();
    let leaky = graph.add_block("leaky", Leaky);
    let log = Rc::new(RefCell::new(Vec::new()));
    let observer = graph.add_block(
        "observer",
        Observer {
            sibling: leaky,
            log: log.clone(),
        },
    );
    graph.set_output_block(observer).unwrap();

    let outcome = graph.build().unwrap();
    // The observer outputs an Int, not geometry.
    assert!(outcome.geometry.is_none());

    let log = log.borrow();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], (None, false));
    assert_eq!(log[1], (None, false));
}

#[test]
fn evaluator_sees_context_set_by_caller() {
    init_tracing();
    let mut graph = Graph::new();
    let index = graph.add_block("index", LoopIndex);
    let mut state = BuildState::new(&graph, Default::default());

    {
        let mut scope = state.scope();
        scope.execution_context = Some(ExecutionContext::new(99).at(3));
        assert_eq!(scope.output_value(PortId::output(index, 0)), Value::Int(3));
    }

    assert!(state.execution_context.is_none());
    assert_eq!(state.output_value(PortId::output(index, 0)), Value::Null);
    assert_eq!(
        state.diagnostics(),
        &[Diagnostic::MissingContextualData {
            source: ContextualSource::LoopId
        }]
    );
}

// ─── Properties ───────────────────────────────────────────────

/// A graph of `sources` constants of mixed kinds and `ops` binary blocks.
fn mixed_graph(kinds: &[ValueKind], ops: usize) -> (Graph, Vec<BlockId>, Vec<BlockId>) {
    let mut graph = Graph::new();
    let sources = kinds
        .iter()
        .map(|&kind| graph.add_block("source", Constant(Value::Null, kind)))
        .collect();
    let ops = (0..ops).map(|_| graph.add_block("op", Binary)).collect();
    (graph, sources, ops)
}

fn kind_strategy() -> impl Strategy<Value = ValueKind> {
    prop_oneof![
        Just(ValueKind::Int),
        Just(ValueKind::Float),
        Just(ValueKind::Vector2),
        Just(ValueKind::Vector3),
        Just(ValueKind::Vector4),
        Just(ValueKind::Matrix),
        Just(ValueKind::Geometry),
    ]
}

proptest! {
    #[test]
    fn resolution_is_deterministic(
        kinds in prop::collection::vec(kind_strategy(), 1..5),
        ops in 1usize..6,
        edges in prop::collection::vec((0usize..16, 0usize..16, 0usize..2, any::<bool>()), 0..24),
    ) {
        let (mut graph, sources, ops) = mixed_graph(&kinds, ops);
        for (from, to, slot, from_source) in edges {
            let from = if from_source {
                sources[from % sources.len()]
            } else {
                ops[from % ops.len()]
            };
            let to = ops[to % ops.len()];
            let _ = graph.connect(PortId::output(from, 0), PortId::input(to, slot));
        }

        let ports: Vec<PortId> = graph
            .blocks()
            .flat_map(|(id, _, _)| {
                let inputs = graph.inputs(id).iter().map(|p| p.id());
                let outputs = graph.outputs(id).iter().map(|p| p.id());
                inputs.chain(outputs).collect::<Vec<_>>()
            })
            .collect();

        for port in ports {
            prop_assert_eq!(graph.resolved_kind(port), graph.resolved_kind(port));
        }
    }

    #[test]
    fn connections_never_form_a_cycle(
        blocks in 2usize..8,
        edges in prop::collection::vec((0usize..8, 0usize..8, 0usize..2), 0..32),
    ) {
        let (mut graph, _, ops) = mixed_graph(&[], blocks);
        for (from, to, slot) in edges {
            let output = PortId::output(ops[from % ops.len()], 0);
            let input = PortId::input(ops[to % ops.len()], slot);

            let state = graph.can_connect(output, input);
            let before = graph.connections().len();
            let result = graph.connect(output, input);

            if state == CompatibilityState::HierarchyIssue {
                prop_assert!(result.is_err());
                prop_assert_eq!(graph.connections().len(), before);
            }
            for &id in &ops {
                prop_assert!(!graph.is_ancestor_of(id, id));
            }
        }

        // Every connection points strictly downstream.
        for connection in graph.connections() {
            prop_assert!(graph.is_ancestor_of(connection.output.block, connection.input.block));
            prop_assert!(!graph.is_ancestor_of(connection.input.block, connection.output.block));
        }
    }
}
