//! End-to-end graph scenarios over the standard block library.

use nodegeo_blocks::{
    BoxBlock, GeometryInputBlock, GeometryOutputBlock, InstantiateBlock, InstantiateOnFacesBlock,
    MeshBlock, PointListBlock, RandomBlock, RandomLock, SetColorsBlock, SetNormalsBlock,
    SetPositionsBlock, SetTangentsBlock, TranslationBlock,
};
use nodegeo_core::glam::{Mat4, Vec3};
use nodegeo_core::{
    BlockId, BuildConfig, CompatibilityState, ContextualSource, Diagnostic, Graph, GraphError,
    PortId, ValueKind,
};
use nodegeo_mesh::{Cuboid, MeshTarget, Plane, VertexData};
use proptest::prelude::*;

/// Sends build logs to the test writer; filter with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Connects `from`'s first output to input `slot` of `to`.
fn wire(graph: &mut Graph, from: BlockId, to: BlockId, slot: usize) {
    graph
        .connect(PortId::output(from, 0), PortId::input(to, slot))
        .unwrap();
}

/// Routes `block` into a fresh output block and marks it as the graph output.
fn finish(graph: &mut Graph, block: BlockId) -> BlockId {
    init_tracing();
    let output = graph.add_block("output", GeometryOutputBlock);
    wire(graph, block, output, 0);
    graph.set_output_block(output).unwrap();
    output
}

// ─── Literal box passthrough ──────────────────────────────────

#[test]
fn box_passes_through_output() {
    let mut graph = Graph::new();
    let cube = graph.add_block("box", BoxBlock::default());
    finish(&mut graph, cube);

    let outcome = graph.build().unwrap();
    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    let data = outcome.into_vertex_data().unwrap();
    assert_eq!(data.positions.len(), 72);
    assert_eq!(data.indices.as_ref().unwrap().len() % 3, 0);
    assert_eq!(data, {
        let mut expected = Cuboid::unit().apply();
        expected.id = cube;
        expected
    });
}

/// Stands in for a renderer mesh.
#[derive(Default)]
struct RecordingMesh {
    uploads: Vec<(VertexData, bool)>,
}

impl MeshTarget for RecordingMesh {
    fn set_vertex_data(&mut self, data: &VertexData, updatable: bool) {
        self.uploads.push((data.clone(), updatable));
    }
}

#[test]
fn build_result_is_handed_to_a_mesh() {
    let mut graph = Graph::new();
    let cube = graph.add_block("box", BoxBlock::default());
    finish(&mut graph, cube);
    let data = graph.build().unwrap().into_vertex_data().unwrap();

    let mut mesh = RecordingMesh::default();
    let target: &mut dyn MeshTarget = &mut mesh;
    data.apply_to(target, false);
    data.apply_to(target, true);

    assert_eq!(mesh.uploads.len(), 2);
    assert_eq!(mesh.uploads[0], (data.clone(), false));
    assert!(mesh.uploads[1].1);
}

// ─── Loop instantiation ───────────────────────────────────────

#[test]
fn loop_of_single_point_multiplies_positions() {
    let mut graph = Graph::new();
    let point = graph.add_block("point", PointListBlock::new(vec![Vec3::new(1.0, 2.0, 3.0)]));
    let repeat = graph.add_block("repeat", InstantiateBlock::default());
    wire(&mut graph, point, repeat, 0);
    graph.set_input_default(PortId::input(repeat, 1), 5).unwrap();
    finish(&mut graph, repeat);

    let data = graph.build().unwrap().into_vertex_data().unwrap();
    assert_eq!(data.positions.len(), 15);
    assert!(data.indices.is_none());
}

#[test]
fn loop_matrix_replaces_trs() {
    let mut graph = Graph::new();
    let point = graph.add_block("point", PointListBlock::new(vec![Vec3::ZERO]));
    let offset = graph.add_block("offset", GeometryInputBlock::new(Vec3::new(0.0, 4.0, 0.0)));
    let translate = graph.add_block("translate", TranslationBlock);
    let ignored = graph.add_block("ignored", GeometryInputBlock::new(Vec3::splat(100.0)));
    let repeat = graph.add_block("repeat", InstantiateBlock::default());

    wire(&mut graph, point, repeat, 0);
    wire(&mut graph, offset, translate, 0);
    wire(&mut graph, translate, repeat, 2);
    wire(&mut graph, ignored, repeat, 3);
    graph.set_input_default(PortId::input(repeat, 1), 2).unwrap();
    finish(&mut graph, repeat);

    let data = graph.build().unwrap().into_vertex_data().unwrap();
    assert_eq!(data.positions, vec![0.0, 4.0, 0.0, 0.0, 4.0, 0.0]);
}

#[test]
fn random_locked_per_loop_varies_between_iterations() {
    let mut graph = Graph::new();
    let point = graph.add_block("point", PointListBlock::new(vec![Vec3::ZERO]));
    let random = graph.add_block("random", RandomBlock::new(RandomLock::LoopId));
    let repeat = graph.add_block("repeat", InstantiateBlock::default());
    wire(&mut graph, point, repeat, 0);
    // Float -> Vector3 needs the bypass; the value splats when read.
    graph
        .connect_unchecked(PortId::output(random, 0), PortId::input(repeat, 3))
        .unwrap();
    graph.set_input_default(PortId::input(repeat, 1), 8).unwrap();
    finish(&mut graph, repeat);

    let data = graph
        .build_with(BuildConfig::seeded(42))
        .unwrap()
        .into_vertex_data()
        .unwrap();
    let xs: Vec<f32> = data.positions.chunks_exact(3).map(|p| p[0]).collect();
    assert_eq!(xs.len(), 8);
    assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
    assert!(xs.windows(2).any(|w| w[0] != w[1]));

    // Same seed, same scatter.
    let again = graph
        .build_with(BuildConfig::seeded(42))
        .unwrap()
        .into_vertex_data()
        .unwrap();
    assert_eq!(again, data);
}

// ─── Per-face distribution ────────────────────────────────────

fn scatter_graph(base: VertexData, count: i32) -> Graph {
    let mut graph = Graph::new();
    let base = graph.add_block("base", MeshBlock::new(base));
    let point = graph.add_block("point", PointListBlock::new(vec![Vec3::ZERO]));
    let scatter = graph.add_block("scatter", InstantiateOnFacesBlock::default());
    wire(&mut graph, base, scatter, 0);
    wire(&mut graph, point, scatter, 1);
    graph.set_input_default(PortId::input(scatter, 2), count).unwrap();
    finish(&mut graph, scatter);
    graph
}

#[test]
fn faces_emit_exactly_count() {
    // 12 faces, 7 instances: the first face emits none.
    let graph = scatter_graph(Cuboid::unit().apply(), 7);
    let data = graph
        .build_with(BuildConfig::seeded(1))
        .unwrap()
        .into_vertex_data()
        .unwrap();
    assert_eq!(data.vertex_count(), 7);
}

#[test]
fn faces_publish_face_index() {
    // Each instance is moved along X by its face index.
    let mut graph = Graph::new();
    let base = graph.add_block("base", MeshBlock::new(Plane::new(1.0, 1.0, 2, 1).apply()));
    let point = graph.add_block("point", PointListBlock::new(vec![Vec3::ZERO]));
    let face = graph.add_block("face", GeometryInputBlock::contextual(ContextualSource::FaceId));
    let scatter = graph.add_block("scatter", InstantiateOnFacesBlock::default());
    wire(&mut graph, base, scatter, 0);
    wire(&mut graph, point, scatter, 1);
    graph
        .connect_unchecked(PortId::output(face, 0), PortId::input(scatter, 4))
        .unwrap();
    graph.set_input_default(PortId::input(scatter, 2), 4).unwrap();
    finish(&mut graph, scatter);

    let outcome = graph.build_with(BuildConfig::seeded(9)).unwrap();
    assert!(outcome.is_clean(), "{:?}", outcome.diagnostics);
    let data = outcome.into_vertex_data().unwrap();
    // Four faces, one instance each; offsets 0..4 added to points in [-0.5, 0.5].
    for (face, p) in data.positions.chunks_exact(3).enumerate() {
        let offset = face as f32;
        assert!(p[0] >= offset - 0.5 - 1e-5 && p[0] <= offset + 0.5 + 1e-5);
    }
}

proptest! {
    #[test]
    fn faces_total_equals_count(
        count in 0i32..300,
        sx in 1u32..6,
        sz in 1u32..6,
        seed in any::<u64>(),
    ) {
        let graph = scatter_graph(Plane::new(2.0, 2.0, sx, sz).apply(), count);
        let outcome = graph.build_with(BuildConfig::seeded(seed)).unwrap();
        let emitted = outcome.geometry.map_or(0, |g| g.vertex_count());
        prop_assert_eq!(emitted, count as usize);
    }
}

// ─── Attribute setters ────────────────────────────────────────

fn passthrough(graph: &mut Graph, setter: BlockId, data: &VertexData) {
    let mesh = graph.add_block("mesh", MeshBlock::new(data.clone()));
    wire(graph, mesh, setter, 0);
    finish(graph, setter);
}

#[test]
fn unconnected_setters_pass_geometry_through() {
    let original = Cuboid::new(1.0, 2.0, 3.0).apply();
    let setters: [Box<dyn Fn(&mut Graph) -> BlockId>; 4] = [
        Box::new(|g: &mut Graph| g.add_block("set", SetPositionsBlock::default())),
        Box::new(|g: &mut Graph| g.add_block("set", SetNormalsBlock::default())),
        Box::new(|g: &mut Graph| g.add_block("set", SetColorsBlock::default())),
        Box::new(|g: &mut Graph| g.add_block("set", SetTangentsBlock::default())),
    ];
    for add in setters {
        let mut graph = Graph::new();
        let setter = add(&mut graph);
        passthrough(&mut graph, setter, &original);
        let outcome = graph.build().unwrap();
        assert!(outcome.is_clean());
        assert_eq!(outcome.into_vertex_data().unwrap(), original);
    }
}

#[test]
fn setter_without_geometry_yields_nothing() {
    let mut graph = Graph::new();
    let empty = graph.add_block("empty", MeshBlock::default());
    let setter = graph.add_block("set", SetNormalsBlock::default());
    wire(&mut graph, empty, setter, 0);
    finish(&mut graph, setter);

    let outcome = graph.build().unwrap();
    assert!(outcome.geometry.is_none());
}

// ─── Degraded builds ──────────────────────────────────────────

#[test]
fn missing_instance_is_a_diagnostic_not_an_error() {
    let mut graph = Graph::new();
    let repeat = graph.add_block("repeat", InstantiateBlock::default());
    finish(&mut graph, repeat);

    let outcome = graph.build().unwrap();
    assert!(outcome.geometry.is_none());
    assert_eq!(
        outcome.diagnostics,
        vec![Diagnostic::UnconnectedInput {
            block: repeat,
            block_name: "repeat".to_string(),
            port: "instance".to_string(),
        }]
    );
}

#[test]
fn contextual_read_outside_context_is_reported() {
    let mut graph = Graph::new();
    let position = graph.add_block(
        "position",
        GeometryInputBlock::contextual(ContextualSource::Positions),
    );
    let translate = graph.add_block("translate", TranslationBlock);
    wire(&mut graph, position, translate, 0);
    let cube = graph.add_block("box", BoxBlock::default());
    let transform = graph.add_block("transform", nodegeo_blocks::GeometryTransformBlock::default());
    wire(&mut graph, cube, transform, 0);
    wire(&mut graph, translate, transform, 1);
    finish(&mut graph, transform);

    let outcome = graph.build().unwrap();
    assert!(outcome.diagnostics.contains(&Diagnostic::MissingContextualData {
        source: ContextualSource::Positions,
    }));
    // Translation fell back to zero; the box is unmoved.
    let (min, max) = outcome.geometry.unwrap().bounds().unwrap();
    assert_eq!((min, max), (Vec3::splat(-0.5), Vec3::splat(0.5)));
}

// ─── Connection rules ─────────────────────────────────────────

#[test]
fn matrix_into_math_operand_is_rejected() {
    let mut graph = Graph::new();
    let translate = graph.add_block("translate", TranslationBlock);
    let math = graph.add_block("math", nodegeo_blocks::MathBlock::default());
    let output = PortId::output(translate, 0);
    let input = PortId::input(math, 0);

    assert_eq!(graph.resolved_kind(output), ValueKind::Matrix);
    assert_eq!(
        graph.connect(output, input),
        Err(GraphError::Incompatible {
            state: CompatibilityState::TypeIncompatible,
            output,
            input,
        })
    );
    assert!(graph.connections().is_empty());
}

#[test]
fn cycles_are_rejected() {
    let mut graph = Graph::new();
    let a = graph.add_block("a", InstantiateBlock::default());
    let b = graph.add_block("b", InstantiateBlock::default());
    wire(&mut graph, a, b, 0);

    let back = (PortId::output(b, 0), PortId::input(a, 0));
    assert_eq!(graph.can_connect(back.0, back.1), CompatibilityState::HierarchyIssue);
    assert!(graph.connect_unchecked(back.0, back.1).is_err());
    assert_eq!(graph.connections().len(), 1);
}

#[test]
fn identity_matrix_literal_is_a_matrix() {
    let input = GeometryInputBlock::new(Mat4::IDENTITY);
    assert_eq!(input.kind(), ValueKind::Matrix);
}
