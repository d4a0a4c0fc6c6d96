//! Per-vertex attribute setters.
//!
//! One generic block, [`SetAttributeBlock`], parameterized by a marker type
//! naming the attribute. For each vertex of the incoming geometry it
//! publishes an [`ExecutionContext`] at that vertex, pulls the attribute
//! input, and writes the result into a copy of the geometry. Contextual
//! reads upstream (`Positions`, `VertexId`, ...) resolve against the
//! incoming geometry, never against the copy being written.

use std::marker::PhantomData;
use std::rc::Rc;

use nodegeo_core::{
    Block, BlockContext, BuildState, Diagnostic, Evaluator, ExecutionContext, PortId, PortSpec,
    Value, ValueKind, impl_as_any,
};
use nodegeo_mesh::AttributeKind;
use serde::{Deserialize, Serialize};

/// An attribute a [`SetAttributeBlock`] can write.
pub trait Attribute: 'static {
    /// Serialized class name of the setter.
    const CLASS_NAME: &'static str;
    /// Name of the attribute input port.
    const PORT: &'static str;
    /// Target array.
    const ATTRIBUTE: AttributeKind;
    /// Kind of the attribute input.
    const VALUE_KIND: ValueKind;

    /// Additional kinds the input accepts.
    fn accepted() -> Vec<ValueKind> {
        Vec::new()
    }

    /// Converts a pulled value to the components to write.
    fn components(value: Value) -> Option<Vec<f32>> {
        value.coerce(Self::VALUE_KIND)?.components()
    }
}

/// Marker for vertex positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Positions;

impl Attribute for Positions {
    const CLASS_NAME: &'static str = "SetPositionsBlock";
    const PORT: &'static str = "positions";
    const ATTRIBUTE: AttributeKind = AttributeKind::Position;
    const VALUE_KIND: ValueKind = ValueKind::Vector3;
}

/// Marker for vertex normals.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normals;

impl Attribute for Normals {
    const CLASS_NAME: &'static str = "SetNormalsBlock";
    const PORT: &'static str = "normals";
    const ATTRIBUTE: AttributeKind = AttributeKind::Normal;
    const VALUE_KIND: ValueKind = ValueKind::Vector3;
}

/// Marker for vertex colors. A Vector3 color gets alpha 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Colors;

impl Attribute for Colors {
    const CLASS_NAME: &'static str = "SetColorsBlock";
    const PORT: &'static str = "colors";
    const ATTRIBUTE: AttributeKind = AttributeKind::Color;
    const VALUE_KIND: ValueKind = ValueKind::Vector4;

    fn accepted() -> Vec<ValueKind> {
        vec![ValueKind::Vector3]
    }

    fn components(value: Value) -> Option<Vec<f32>> {
        match value {
            Value::Vector3(rgb) => Some(rgb.extend(1.0).to_array().to_vec()),
            other => other.coerce(ValueKind::Vector4)?.components(),
        }
    }
}

/// Marker for vertex tangents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tangents;

impl Attribute for Tangents {
    const CLASS_NAME: &'static str = "SetTangentsBlock";
    const PORT: &'static str = "tangents";
    const ATTRIBUTE: AttributeKind = AttributeKind::Tangent;
    const VALUE_KIND: ValueKind = ValueKind::Vector4;
}

/// Marker for texture coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uvs;

impl Attribute for Uvs {
    const CLASS_NAME: &'static str = "SetUvsBlock";
    const PORT: &'static str = "uvs";
    const ATTRIBUTE: AttributeKind = AttributeKind::Uv;
    const VALUE_KIND: ValueKind = ValueKind::Vector2;
}

/// Writes one attribute of every vertex from a per-vertex input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, bound = "", rename_all = "camelCase")]
pub struct SetAttributeBlock<A> {
    /// Re-evaluate per read. On by default, since the geometry input is
    /// commonly itself contextual (an instance pulled per loop step).
    pub evaluate_context: bool,
    #[serde(skip)]
    attribute: PhantomData<A>,
}

impl<A> Default for SetAttributeBlock<A> {
    fn default() -> Self {
        Self {
            evaluate_context: true,
            attribute: PhantomData,
        }
    }
}

pub type SetPositionsBlock = SetAttributeBlock<Positions>;
pub type SetNormalsBlock = SetAttributeBlock<Normals>;
pub type SetColorsBlock = SetAttributeBlock<Colors>;
pub type SetTangentsBlock = SetAttributeBlock<Tangents>;
pub type SetUvsBlock = SetAttributeBlock<Uvs>;

impl<A: Attribute> SetAttributeBlock<A> {
    fn evaluate(state: &mut BuildState<'_>, id: u32, geometry: PortId, source: PortId) -> Value {
        let mut scope = state.scope();
        let Some(original) = scope.geometry(geometry) else {
            return Value::Null;
        };
        if !original.has_positions() {
            return Value::Null;
        }
        if !scope.is_connected(source) {
            return Value::Geometry(original);
        }

        let mut data = (*original).clone();
        data.attribute_mut(A::ATTRIBUTE);
        scope.geometry_context = Some(Rc::clone(&original));

        for index in 0..original.vertex_count() {
            scope.execution_context = Some(ExecutionContext::new(id).at(index));
            let value = scope.connected_value(source);
            let got = value.kind();
            match A::components(value) {
                Some(components) => data.write_attribute(A::ATTRIBUTE, index, &components),
                // The vertex keeps its value.
                None if got.is_some() => scope.record(Diagnostic::TypeMismatch {
                    block: id,
                    port: A::PORT.to_string(),
                    expected: A::VALUE_KIND,
                    got,
                }),
                None => {}
            }
        }
        Value::from(data)
    }
}

impl<A: Attribute> Block for SetAttributeBlock<A> {
    fn class_name(&self) -> &'static str {
        A::CLASS_NAME
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("geometry", ValueKind::Geometry),
            PortSpec::input(A::PORT, A::VALUE_KIND)
                .optional()
                .accepting(A::accepted()),
            PortSpec::output("output", ValueKind::Geometry),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let id = ctx.id();
        let (geometry, source) = (ctx.input(0), ctx.input(1));
        let evaluator = Evaluator::new(move |state| Self::evaluate(state, id, geometry, source));
        state.store(ctx.output(0), evaluator, self.evaluate_context);
    }

    serde_properties!();
    impl_as_any!();
}
