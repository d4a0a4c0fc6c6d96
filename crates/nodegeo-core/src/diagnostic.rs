//! Build diagnostics and results.

use nodegeo_mesh::VertexData;
use std::fmt;
use std::rc::Rc;

use crate::context::ContextualSource;
use crate::error::kind_name;
use crate::value::ValueKind;
use crate::BlockId;

/// A degraded-build condition.
///
/// Recorded on the build state instead of failing: the affected subgraph
/// yields a null or pass-through value and the build continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A required input has no connection.
    UnconnectedInput {
        /// Block owning the input.
        block: BlockId,
        /// Name of that block.
        block_name: String,
        /// Input name.
        port: String,
    },
    /// A contextual source was read with no context to answer it.
    MissingContextualData {
        /// The source that was requested.
        source: ContextualSource,
    },
    /// A block received geometry it could not use.
    InvalidGeometry {
        /// Block that rejected the geometry.
        block: BlockId,
        /// What was wrong.
        reason: String,
    },
    /// A connected value could not be adapted to the kind a block needed.
    TypeMismatch {
        /// Block reading the value.
        block: BlockId,
        /// Input name.
        port: String,
        /// Kind the block asked for.
        expected: ValueKind,
        /// Kind that arrived (`None` for null).
        got: Option<ValueKind>,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnconnectedInput {
                block,
                block_name,
                port,
            } => write!(f, "required input '{port}' of block {block} ({block_name}) is not connected"),
            Diagnostic::MissingContextualData { source } => {
                write!(f, "no contextual data available for {source}")
            }
            Diagnostic::InvalidGeometry { block, reason } => {
                write!(f, "block {block}: invalid geometry: {reason}")
            }
            Diagnostic::TypeMismatch {
                block,
                port,
                expected,
                got,
            } => write!(
                f,
                "block {block}: input '{port}' expected {expected}, got {}",
                kind_name(got)
            ),
        }
    }
}

/// Result of a build pass.
#[derive(Debug, Clone, Default)]
pub struct BuildOutcome {
    /// Final vertex data, or `None` if the graph produced nothing.
    pub geometry: Option<Rc<VertexData>>,
    /// Everything recorded during the pass, in order.
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildOutcome {
    /// True if no diagnostics were recorded.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Takes the final vertex data out of the outcome.
    pub fn into_vertex_data(self) -> Option<VertexData> {
        self.geometry
            .map(|rc| Rc::try_unwrap(rc).unwrap_or_else(|shared| (*shared).clone()))
    }
}
