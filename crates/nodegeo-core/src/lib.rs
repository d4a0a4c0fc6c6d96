//! Core of the nodegeo geometry graph.
//!
//! A [`Graph`] holds [`Block`]s whose typed ports ([`ConnectionPoint`]s) are
//! connected output-to-input. Building the graph pulls values from the
//! designated output block back through its inputs:
//!
//! - [`ValueKind`] / [`Value`] - port kinds (with `AutoDetect` and
//!   `BasedOnInput` meta-kinds) and runtime values
//! - [`Graph::resolved_kind`] / [`Graph::can_connect`] - type resolution
//!   and the connectability check, including cycle rejection
//! - [`BuildState`] - per-pass state: stored outputs, execution / instancing
//!   / geometry contexts, diagnostics, seeded random generator
//! - [`ContextScope`] - restores contexts on every exit path
//! - [`Evaluator`] / [`OutputValue`] - lazy per-invocation outputs
//!
//! Structural mistakes (illegal connections) are [`GraphError`]s. Incomplete
//! graphs still build and report [`Diagnostic`]s.

mod block;
mod config;
mod context;
mod diagnostic;
mod error;
mod graph;
mod port;
mod state;
mod value;

/// Unique identifier for a block in a graph.
pub type BlockId = u32;

pub use block::{Block, BlockContext, BoxedBlock, Evaluator, OutputValue};
pub use config::BuildConfig;
pub use context::{ContextualSource, ExecutionContext, InstancingContext};
pub use diagnostic::{BuildOutcome, Diagnostic};
pub use error::{CompatibilityState, GraphError, TypeError};
pub use glam;
pub use graph::{Connection, Graph};
pub use nodegeo_mesh as mesh;
pub use nodegeo_mesh::VertexData;
pub use port::{ConnectionPoint, Direction, PortId, PortSpec};
pub use state::{BuildState, ContextScope};
pub use value::{Value, ValueKind};
