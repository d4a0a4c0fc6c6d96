//! Saving and loading nodegeo graphs.
//!
//! Graphs hold blocks as trait objects, which cannot be serialized directly.
//! This crate goes through an intermediate [`GraphDocument`] in which each
//! block is a JSON object holding its class name, ports and properties, and
//! uses a [`BlockRegistry`] to map class names back to block types.
//!
//! # Example
//!
//! ```
//! use nodegeo_blocks::{BoxBlock, GeometryOutputBlock};
//! use nodegeo_core::{Graph, PortId};
//! use nodegeo_serde::{BlockRegistry, JsonFormat, deserialize_graph, serialize_graph};
//!
//! let mut graph = Graph::new();
//! let cube = graph.add_block("cube", BoxBlock::default());
//! let output = graph.add_block("output", GeometryOutputBlock);
//! graph.connect(PortId::output(cube, 0), PortId::input(output, 0)).unwrap();
//! graph.set_output_block(output).unwrap();
//!
//! let format = JsonFormat::pretty();
//! let bytes = serialize_graph(&graph, &format).unwrap();
//! let loaded = deserialize_graph(&bytes, &BlockRegistry::with_defaults(), &format).unwrap();
//!
//! assert_eq!(loaded.block_count(), 2);
//! assert_eq!(loaded.build().unwrap().geometry, graph.build().unwrap().geometry);
//! ```

mod document;
mod error;
mod json;
mod registry;

pub use crate::document::{
    BlockDocument, ConnectionDocument, GraphDocument, InputDocument, OutputDocument,
};
pub use crate::error::SerdeError;
pub use crate::json::JsonFormat;
pub use crate::registry::BlockRegistry;

use nodegeo_core::{ConnectionPoint, Graph, Value, ValueKind};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

/// Converts a graph to a document.
///
/// Inputs are saved with their unconnected literal, if any.
pub fn graph_to_document(graph: &Graph) -> GraphDocument {
    let blocks = graph
        .blocks()
        .map(|(id, name, block)| BlockDocument {
            class_name: block.class_name().to_string(),
            id,
            name: name.to_string(),
            properties: match block.properties() {
                JsonValue::Object(properties) => properties,
                _ => Map::new(),
            },
            inputs: graph
                .inputs(id)
                .iter()
                .map(|port| InputDocument {
                    name: port.name().to_string(),
                    value: port
                        .default_value()
                        .map(Value::to_json)
                        .filter(|json| !json.is_null()),
                })
                .collect(),
            outputs: graph
                .outputs(id)
                .iter()
                .map(|port| OutputDocument {
                    name: port.name().to_string(),
                })
                .collect(),
        })
        .collect();

    let connections = graph
        .connections()
        .iter()
        .filter_map(|connection| {
            Some(ConnectionDocument {
                output_block_id: connection.output.block,
                output_port_name: graph.port(connection.output)?.name().to_string(),
                input_block_id: connection.input.block,
                input_port_name: graph.port(connection.input)?.name().to_string(),
            })
        })
        .collect();

    GraphDocument {
        output_node_id: graph.output_block(),
        blocks,
        connections,
    }
}

/// Reads an input literal. Meta-kinds take the kind the JSON shape implies.
fn literal_from_json(kind: ValueKind, json: &JsonValue) -> Option<Value> {
    let kind = if kind.is_meta() {
        match json {
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Int,
            JsonValue::Number(_) => ValueKind::Float,
            JsonValue::Array(items) => match items.len() {
                2 => ValueKind::Vector2,
                3 => ValueKind::Vector3,
                4 => ValueKind::Vector4,
                16 => ValueKind::Matrix,
                _ => return None,
            },
            _ => return None,
        }
    } else {
        kind
    };
    Value::from_json(kind, json)
}

/// Rebuilds a graph from a document.
///
/// Blocks keep their saved IDs. Saved inputs the block no longer declares
/// are skipped. Connections are replayed in document order; type rules are
/// not re-checked, since saved graphs may hold connections made with
/// [`Graph::connect_unchecked`], but a connection that would close a cycle
/// still fails.
///
/// # Errors
///
/// Returns an error if:
/// - a class name is not registered
/// - a block rejects its properties or an input literal is malformed
/// - a connection names a missing block or port, or would close a cycle
pub fn document_to_graph(
    document: GraphDocument,
    registry: &BlockRegistry,
) -> Result<Graph, SerdeError> {
    let mut graph = Graph::new();

    for saved in document.blocks {
        let block = registry.create(&saved.class_name, JsonValue::Object(saved.properties))?;
        graph.insert_block_with_id(saved.id, saved.name, block)?;

        for input in saved.inputs {
            let Some(json) = input.value else {
                continue;
            };
            let Ok(port) = graph.input_port(saved.id, &input.name) else {
                debug!(block = saved.id, input = %input.name, "skipping unknown input");
                continue;
            };
            let kind = graph
                .port(port)
                .map_or(ValueKind::Float, ConnectionPoint::declared_kind);
            let value =
                literal_from_json(kind, &json).ok_or_else(|| SerdeError::InvalidProperty {
                    block: saved.id,
                    property: input.name.clone(),
                    reason: format!("{json} is not a {kind} literal"),
                })?;
            graph.set_input_default(port, value)?;
        }
    }

    for connection in document.connections {
        let output = graph.output_port(connection.output_block_id, &connection.output_port_name)?;
        let input = graph.input_port(connection.input_block_id, &connection.input_port_name)?;
        graph.connect_unchecked(output, input)?;
    }

    if let Some(output) = document.output_node_id {
        graph.set_output_block(output)?;
    }

    debug!(
        blocks = graph.block_count(),
        connections = graph.connections().len(),
        "loaded graph"
    );
    Ok(graph)
}

/// Serializes a graph to JSON bytes.
pub fn serialize_graph(graph: &Graph, format: &JsonFormat) -> Result<Vec<u8>, SerdeError> {
    format.serialize(&graph_to_document(graph))
}

/// Deserializes a graph from JSON bytes.
pub fn deserialize_graph(
    bytes: &[u8],
    registry: &BlockRegistry,
    format: &JsonFormat,
) -> Result<Graph, SerdeError> {
    let document = format.deserialize(bytes)?;
    document_to_graph(document, registry)
}
