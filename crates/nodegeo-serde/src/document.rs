//! The saved-graph document.
//!
//! Blocks are trait objects, so a graph is saved through this intermediate
//! shape: each block as its class name with its properties inlined next to
//! it, each connection as a pair of `(block id, port name)` endpoints.

use nodegeo_core::BlockId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A saved graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    /// Block whose result is the graph's geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_node_id: Option<BlockId>,
    #[serde(default)]
    pub blocks: Vec<BlockDocument>,
    /// Replayed in order when loading.
    #[serde(default)]
    pub connections: Vec<ConnectionDocument>,
}

impl GraphDocument {
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// A saved block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDocument {
    /// Registry key, see [`Block::class_name`](nodegeo_core::Block::class_name).
    pub class_name: String,
    pub id: BlockId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<InputDocument>,
    #[serde(default)]
    pub outputs: Vec<OutputDocument>,
    /// Editable properties, stored inline on the block object. Missing
    /// fields take their defaults on load.
    #[serde(flatten)]
    pub properties: Map<String, JsonValue>,
}

/// A saved input. `value` is the literal used while unconnected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDocument {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
}

/// A saved output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub name: String,
}

/// A saved connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDocument {
    pub output_block_id: BlockId,
    pub output_port_name: String,
    pub input_block_id: BlockId,
    pub input_port_name: String,
}
