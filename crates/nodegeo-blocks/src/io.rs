//! Graph inputs (literals and contextual reads) and the output block.

use nodegeo_core::{
    Block, BlockContext, BuildState, ContextualSource, Evaluator, PortSpec, Value, ValueKind,
    impl_as_any,
};
use serde::de::Error as _;
use serde_json::{Value as JsonValue, json};

// ============================================================================
// Input
// ============================================================================

/// Feeds a literal or a contextual value into the graph.
///
/// The output is `AutoDetect` and resolves to [`Block::literal_kind`], so a
/// downstream port sees the concrete kind without a connection having to
/// carry it.
#[derive(Debug, Clone)]
pub struct GeometryInputBlock {
    kind: ValueKind,
    value: Value,
    contextual: Option<ContextualSource>,
}

impl GeometryInputBlock {
    /// A literal input. The kind follows the value; `Null` reads as Float.
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            kind: value.kind().unwrap_or(ValueKind::Float),
            value,
            contextual: None,
        }
    }

    /// A contextual input, resolved per read against the active contexts.
    pub fn contextual(source: ContextualSource) -> Self {
        Self {
            kind: source.kind(),
            value: Value::Null,
            contextual: Some(source),
        }
    }

    /// Kind of the produced value.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The literal value. `Null` for contextual inputs.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replaces the literal, keeping the kind.
    ///
    /// Values of another kind are adapted; unadaptable values reset to `Null`.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = value.into().coerce(self.kind).unwrap_or_default();
    }

    /// The contextual source, if any.
    pub fn contextual_source(&self) -> Option<ContextualSource> {
        self.contextual
    }
}

impl Default for GeometryInputBlock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Block for GeometryInputBlock {
    fn class_name(&self) -> &'static str {
        "GeometryInputBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::output("output", ValueKind::AutoDetect)]
    }

    fn literal_kind(&self) -> Option<ValueKind> {
        Some(self.kind)
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        match self.contextual {
            Some(source) => {
                let evaluator = Evaluator::new(move |state| state.contextual_value(source));
                state.store(ctx.output(0), evaluator, true);
            }
            None => state.store_value(ctx.output(0), self.value.clone()),
        }
    }

    fn properties(&self) -> JsonValue {
        let mut properties = json!({
            "kind": self.kind,
            "value": self.value.to_json(),
        });
        if let Some(source) = self.contextual {
            properties["contextualValue"] = json!(source);
        }
        properties
    }

    fn set_properties(&mut self, properties: JsonValue) -> Result<(), serde_json::Error> {
        let contextual: Option<ContextualSource> = match properties.get("contextualValue") {
            Some(source) if !source.is_null() => Some(serde_json::from_value(source.clone())?),
            _ => None,
        };
        let kind = match properties.get("kind") {
            Some(kind) => serde_json::from_value(kind.clone())?,
            None => contextual.map_or(ValueKind::Float, ContextualSource::kind),
        };
        let value = match properties.get("value") {
            Some(json) => Value::from_json(kind, json).ok_or_else(|| {
                serde_json::Error::custom(format!("value {json} is not a {kind} literal"))
            })?,
            None => Value::Null,
        };

        self.kind = kind;
        self.value = value;
        self.contextual = contextual;
        Ok(())
    }

    impl_as_any!();
}

// ============================================================================
// Output
// ============================================================================

/// Terminal block. Hands its geometry input to the graph as the build result.
#[derive(Debug, Clone, Default)]
pub struct GeometryOutputBlock;

impl Block for GeometryOutputBlock {
    fn class_name(&self) -> &'static str {
        "GeometryOutputBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::input("geometry", ValueKind::Geometry)]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let value = state.connected_value(ctx.input(0));
        state.set_result(value);
    }

    impl_as_any!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use nodegeo_core::{Diagnostic, Graph, PortId};

    #[test]
    fn test_literal_kind_follows_value() {
        assert_eq!(GeometryInputBlock::new(3).kind(), ValueKind::Int);
        assert_eq!(GeometryInputBlock::new(Vec3::ONE).kind(), ValueKind::Vector3);
        assert_eq!(
            GeometryInputBlock::contextual(ContextualSource::Colors).kind(),
            ValueKind::Vector4
        );
    }

    #[test]
    fn test_set_value_adapts_to_kind() {
        let mut block = GeometryInputBlock::new(Vec3::ZERO);
        block.set_value(2.0);
        assert_eq!(block.value(), &Value::Vector3(Vec3::splat(2.0)));
    }

    #[test]
    fn test_auto_detect_output_resolves_to_literal_kind() {
        let mut graph = Graph::new();
        let input = graph.add_block("input", GeometryInputBlock::new(Vec3::X));
        assert_eq!(graph.resolved_kind(PortId::output(input, 0)), ValueKind::Vector3);
    }

    #[test]
    fn test_properties_round_trip() {
        let block = GeometryInputBlock::new(Vec3::new(1.0, 2.0, 3.0));
        let properties = block.properties();
        assert_eq!(properties, json!({ "kind": "Vector3", "value": [1.0, 2.0, 3.0] }));

        let mut restored = GeometryInputBlock::default();
        restored.set_properties(properties).unwrap();
        assert_eq!(restored.kind(), ValueKind::Vector3);
        assert_eq!(restored.value(), block.value());

        let mut contextual = GeometryInputBlock::default();
        contextual
            .set_properties(json!({ "contextualValue": "Positions" }))
            .unwrap();
        assert_eq!(contextual.contextual_source(), Some(ContextualSource::Positions));
        assert_eq!(contextual.kind(), ValueKind::Vector3);
    }

    #[test]
    fn test_bad_literal_is_rejected() {
        let mut block = GeometryInputBlock::default();
        let result = block.set_properties(json!({ "kind": "Vector3", "value": [1.0] }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unconnected_output_yields_no_geometry() {
        let mut graph = Graph::new();
        let output = graph.add_block("output", GeometryOutputBlock);
        graph.set_output_block(output).unwrap();

        let outcome = graph.build().unwrap();
        assert!(outcome.geometry.is_none());
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::UnconnectedInput {
                block: output,
                block_name: "output".to_string(),
                port: "geometry".to_string(),
            }]
        );
    }
}
