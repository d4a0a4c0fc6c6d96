//! Error types for nodegeo-core.

use std::fmt;
use thiserror::Error;

use crate::port::PortId;
use crate::value::ValueKind;
use crate::BlockId;

/// Error when a value has the wrong kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("type error: expected {expected}, got {}", kind_name(.got))]
pub struct TypeError {
    /// The kind that was expected.
    pub expected: ValueKind,
    /// The kind that was actually provided (`None` for a null value).
    pub got: Option<ValueKind>,
}

impl TypeError {
    /// Create a new type error.
    pub fn expected(expected: ValueKind, got: Option<ValueKind>) -> Self {
        Self { expected, got }
    }
}

pub(crate) fn kind_name(kind: &Option<ValueKind>) -> String {
    kind.map_or_else(|| "null".to_string(), |k| k.to_string())
}

/// Result of checking whether two ports may be connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompatibilityState {
    /// The connection is allowed.
    Compatible,
    /// The kinds do not match and no acceptance rule applies, or the source
    /// kind is explicitly excluded.
    TypeIncompatible,
    /// The connection would create a cycle.
    HierarchyIssue,
}

impl fmt::Display for CompatibilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityState::Compatible => write!(f, "compatible"),
            CompatibilityState::TypeIncompatible => write!(f, "incompatible types"),
            CompatibilityState::HierarchyIssue => write!(f, "connection would create a cycle"),
        }
    }
}

/// Errors that can occur during graph operations.
///
/// Only structural problems are errors. Incomplete graphs still build and
/// report [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Block with the given ID was not found.
    #[error("block not found: {0}")]
    BlockNotFound(BlockId),

    /// Port on a block was not found.
    #[error("port not found: block {block}, port {port}")]
    PortNotFound {
        /// Block ID.
        block: BlockId,
        /// Port name or index.
        port: String,
    },

    /// Both ports of a connection have the same direction.
    #[error("cannot connect {0} to {1}: a connection needs one output and one input")]
    DirectionMismatch(PortId, PortId),

    /// `can_connect` rejected the connection.
    #[error("cannot connect {output} to {input}: {state}")]
    Incompatible {
        /// Why the connection was rejected.
        state: CompatibilityState,
        /// Output port.
        output: PortId,
        /// Input port.
        input: PortId,
    },

    /// The input already has a peer; disconnect it first.
    #[error("input already connected: block {block}, port {port}")]
    InputAlreadyConnected {
        /// Block ID.
        block: BlockId,
        /// Input name.
        port: String,
    },

    /// `build` was called without a designated output block.
    #[error("graph has no output block")]
    NoOutputBlock,

    /// A block was inserted with an ID that is already taken.
    #[error("duplicate block id: {0}")]
    DuplicateBlockId(BlockId),
}
