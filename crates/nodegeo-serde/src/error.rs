//! Serialization error types.

use nodegeo_core::{BlockId, GraphError};
use thiserror::Error;

/// Errors that can occur while saving or loading a graph.
#[derive(Debug, Error)]
pub enum SerdeError {
    /// The document names a block class the registry does not know.
    #[error("unknown block type: {0}")]
    UnknownBlockType(String),

    /// Malformed JSON, or properties a block could not accept.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The graph rejected a block or connection while being rebuilt.
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    /// A property or input literal of a block could not be read.
    #[error("block {block}: invalid {property}: {reason}")]
    InvalidProperty {
        block: BlockId,
        property: String,
        reason: String,
    },
}
