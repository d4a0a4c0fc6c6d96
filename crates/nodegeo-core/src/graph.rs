//! Graph container: blocks, connections, type resolution and build.

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::block::{Block, BlockContext, BoxedBlock};
use crate::config::BuildConfig;
use crate::diagnostic::{BuildOutcome, Diagnostic};
use crate::error::{CompatibilityState, GraphError};
use crate::port::{ConnectionPoint, Direction, PortId, PortSpec};
use crate::state::BuildState;
use crate::value::{Value, ValueKind};
use crate::BlockId;

/// A connection from an output to an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    /// Source output.
    pub output: PortId,
    /// Target input.
    pub input: PortId,
}

pub(crate) struct BlockEntry {
    pub(crate) name: String,
    pub(crate) block: BoxedBlock,
    pub(crate) inputs: Vec<ConnectionPoint>,
    pub(crate) outputs: Vec<ConnectionPoint>,
}

impl BlockEntry {
    fn new(id: BlockId, name: String, block: BoxedBlock) -> Self {
        let (input_specs, output_specs): (Vec<PortSpec>, Vec<PortSpec>) = block
            .ports()
            .into_iter()
            .partition(|spec| spec.direction == Direction::Input);

        let inputs = input_specs
            .iter()
            .enumerate()
            .map(|(i, spec)| ConnectionPoint::new(PortId::input(id, i), spec.clone(), &input_specs))
            .collect();
        let outputs = output_specs
            .into_iter()
            .enumerate()
            .map(|(i, spec)| ConnectionPoint::new(PortId::output(id, i), spec, &input_specs))
            .collect();

        Self {
            name,
            block,
            inputs,
            outputs,
        }
    }

    pub(crate) fn context(&self, id: BlockId) -> BlockContext {
        BlockContext::new(
            id,
            self.name.clone(),
            self.inputs.iter().map(ConnectionPoint::name).collect(),
            self.outputs.iter().map(ConnectionPoint::name).collect(),
        )
    }

    fn port(&self, id: PortId) -> Option<&ConnectionPoint> {
        match id.direction {
            Direction::Input => self.inputs.get(id.index),
            Direction::Output => self.outputs.get(id.index),
        }
    }

    fn port_mut(&mut self, id: PortId) -> Option<&mut ConnectionPoint> {
        match id.direction {
            Direction::Input => self.inputs.get_mut(id.index),
            Direction::Output => self.outputs.get_mut(id.index),
        }
    }
}

/// A geometry graph: blocks connected output-to-input.
///
/// The connection graph is kept acyclic: [`connect`](Graph::connect) rejects
/// any connection that would close a cycle.
///
/// ```
/// use nodegeo_core::{Block, BlockContext, BuildState, Graph, PortSpec, ValueKind, impl_as_any};
/// use nodegeo_core::mesh::VertexData;
/// use nodegeo_core::glam::Vec3;
///
/// struct Point;
///
/// impl Block for Point {
///     fn class_name(&self) -> &'static str { "Point" }
///     fn ports(&self) -> Vec<PortSpec> {
///         vec![PortSpec::output("geometry", ValueKind::Geometry)]
///     }
///     fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
///         state.store_value(ctx.output(0), VertexData::from_points(&[Vec3::ZERO]));
///     }
///     impl_as_any!();
/// }
///
/// let mut graph = Graph::new();
/// let point = graph.add_block("point", Point);
/// graph.set_output_block(point).unwrap();
///
/// let outcome = graph.build().unwrap();
/// assert_eq!(outcome.geometry.unwrap().vertex_count(), 1);
/// ```
#[derive(Default)]
pub struct Graph {
    blocks: BTreeMap<BlockId, BlockEntry>,
    connections: Vec<Connection>,
    next_id: BlockId,
    output_block: Option<BlockId>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Adds a block and returns its ID.
    pub fn add_block<B: Block>(&mut self, name: impl Into<String>, block: B) -> BlockId {
        self.add_boxed_block(name, Box::new(block))
    }

    /// Adds a boxed block and returns its ID.
    pub fn add_boxed_block(&mut self, name: impl Into<String>, block: BoxedBlock) -> BlockId {
        let id = self.next_id;
        self.next_id += 1;
        self.blocks.insert(id, BlockEntry::new(id, name.into(), block));
        id
    }

    /// Adds a block under a given ID, as when loading a saved graph.
    pub fn insert_block_with_id(
        &mut self,
        id: BlockId,
        name: impl Into<String>,
        block: BoxedBlock,
    ) -> Result<(), GraphError> {
        if self.blocks.contains_key(&id) {
            return Err(GraphError::DuplicateBlockId(id));
        }
        self.blocks.insert(id, BlockEntry::new(id, name.into(), block));
        self.next_id = self.next_id.max(id + 1);
        Ok(())
    }

    /// Removes a block after disconnecting all of its ports.
    pub fn remove_block(&mut self, id: BlockId) -> Option<BoxedBlock> {
        let touching: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.output.block == id || c.input.block == id)
            .copied()
            .collect();
        for connection in touching {
            self.disconnect(connection.output, connection.input);
        }
        if self.output_block == Some(id) {
            self.output_block = None;
        }
        self.blocks.remove(&id).map(|entry| entry.block)
    }

    /// Returns a block.
    pub fn block(&self, id: BlockId) -> Option<&dyn Block> {
        self.blocks.get(&id).map(|entry| entry.block.as_ref())
    }

    /// Returns a block mutably.
    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut (dyn Block + 'static)> {
        self.blocks.get_mut(&id).map(|entry| entry.block.as_mut())
    }

    /// Returns a block downcast to its concrete type.
    pub fn block_as<B: Block>(&self, id: BlockId) -> Option<&B> {
        self.block(id)?.as_any().downcast_ref()
    }

    /// Returns a block's name.
    pub fn block_name(&self, id: BlockId) -> Option<&str> {
        self.blocks.get(&id).map(|entry| entry.name.as_str())
    }

    /// Iterates over `(id, name, block)` in ID order.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &str, &dyn Block)> {
        self.blocks
            .iter()
            .map(|(id, entry)| (*id, entry.name.as_str(), entry.block.as_ref()))
    }

    /// Returns the number of blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Finds the first block with the given name.
    pub fn find_block_by_name(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(id, _)| *id)
    }

    /// Designates the block whose value the build returns.
    pub fn set_output_block(&mut self, id: BlockId) -> Result<(), GraphError> {
        if !self.blocks.contains_key(&id) {
            return Err(GraphError::BlockNotFound(id));
        }
        self.output_block = Some(id);
        Ok(())
    }

    /// The designated output block.
    pub fn output_block(&self) -> Option<BlockId> {
        self.output_block
    }

    pub(crate) fn entry(&self, id: BlockId) -> Option<&BlockEntry> {
        self.blocks.get(&id)
    }

    // ========================================================================
    // Ports
    // ========================================================================

    /// Returns a port.
    pub fn port(&self, id: PortId) -> Option<&ConnectionPoint> {
        self.blocks.get(&id.block)?.port(id)
    }

    fn port_mut(&mut self, id: PortId) -> Option<&mut ConnectionPoint> {
        self.blocks.get_mut(&id.block)?.port_mut(id)
    }

    fn require_port(&self, id: PortId) -> Result<&ConnectionPoint, GraphError> {
        let entry = self
            .blocks
            .get(&id.block)
            .ok_or(GraphError::BlockNotFound(id.block))?;
        entry.port(id).ok_or_else(|| GraphError::PortNotFound {
            block: id.block,
            port: id.index.to_string(),
        })
    }

    /// Inputs of a block, in declaration order.
    pub fn inputs(&self, block: BlockId) -> &[ConnectionPoint] {
        match self.blocks.get(&block) {
            Some(entry) => &entry.inputs,
            None => &[],
        }
    }

    /// Outputs of a block, in declaration order.
    pub fn outputs(&self, block: BlockId) -> &[ConnectionPoint] {
        match self.blocks.get(&block) {
            Some(entry) => &entry.outputs,
            None => &[],
        }
    }

    /// Looks up an input by name.
    pub fn input_port(&self, block: BlockId, name: &str) -> Result<PortId, GraphError> {
        self.named_port(block, name, Direction::Input)
    }

    /// Looks up an output by name.
    pub fn output_port(&self, block: BlockId, name: &str) -> Result<PortId, GraphError> {
        self.named_port(block, name, Direction::Output)
    }

    fn named_port(
        &self,
        block: BlockId,
        name: &str,
        direction: Direction,
    ) -> Result<PortId, GraphError> {
        let entry = self
            .blocks
            .get(&block)
            .ok_or(GraphError::BlockNotFound(block))?;
        let ports = match direction {
            Direction::Input => &entry.inputs,
            Direction::Output => &entry.outputs,
        };
        ports
            .iter()
            .find(|p| p.name() == name)
            .map(ConnectionPoint::id)
            .ok_or_else(|| GraphError::PortNotFound {
                block,
                port: name.to_string(),
            })
    }

    /// Replaces the literal an input yields while unconnected.
    pub fn set_input_default(
        &mut self,
        input: PortId,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        self.require_port(input)?;
        if let Some(point) = self.port_mut(input) {
            point.default = Some(value.into());
        }
        Ok(())
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    /// Resolves the effective kind of a port.
    ///
    /// Concrete kinds resolve to themselves. `AutoDetect` resolves to the
    /// owning block's literal kind, then to the connected peer's kind, then
    /// to a connected linked sibling's kind. `BasedOnInput` resolves to its
    /// connected type source's kind, then to its fallback. Anything left
    /// over stays a meta-kind, as do unknown ports.
    pub fn resolved_kind(&self, id: PortId) -> ValueKind {
        let Some(entry) = self.blocks.get(&id.block) else {
            return ValueKind::AutoDetect;
        };
        let Some(point) = entry.port(id) else {
            return ValueKind::AutoDetect;
        };
        let connected_input = |index: Option<usize>| {
            index
                .filter(|&i| entry.inputs.get(i).is_some_and(|p| p.peer.is_some()))
                .map(|i| PortId::input(id.block, i))
        };

        match point.spec.kind {
            ValueKind::AutoDetect => {
                if let Some(kind) = entry.block.literal_kind() {
                    return kind;
                }
                if let Some(peer) = point.peer {
                    return self.resolved_kind(peer);
                }
                match connected_input(point.linked) {
                    Some(sibling) => self.resolved_kind(sibling),
                    None => ValueKind::AutoDetect,
                }
            }
            ValueKind::BasedOnInput => match connected_input(point.type_source) {
                Some(source) => self.resolved_kind(source),
                None => point.spec.fallback.unwrap_or(ValueKind::BasedOnInput),
            },
            kind => kind,
        }
    }

    /// Checks whether `output` may be connected to `input`.
    ///
    /// The ports may be passed in either order.
    pub fn can_connect(&self, output: PortId, input: PortId) -> CompatibilityState {
        let Ok((output, input)) = self.orient(output, input) else {
            return CompatibilityState::TypeIncompatible;
        };
        let Some(target) = self.port(input) else {
            return CompatibilityState::TypeIncompatible;
        };

        let source_kind = self.resolved_kind(output);
        let target_kind = self.resolved_kind(input);

        if source_kind != target_kind
            && target.spec.kind != ValueKind::AutoDetect
            && !target.spec.accepted.contains(&source_kind)
        {
            return CompatibilityState::TypeIncompatible;
        }
        if target.spec.excluded.contains(&source_kind) {
            return CompatibilityState::TypeIncompatible;
        }
        self.hierarchy_state(output, input)
    }

    fn hierarchy_state(&self, output: PortId, input: PortId) -> CompatibilityState {
        if input.block == output.block || self.is_ancestor_of(input.block, output.block) {
            CompatibilityState::HierarchyIssue
        } else {
            CompatibilityState::Compatible
        }
    }

    /// True if `ancestor` feeds `block`, directly or transitively.
    pub fn is_ancestor_of(&self, ancestor: BlockId, block: BlockId) -> bool {
        let mut stack = vec![block];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            for input in self.inputs(current) {
                let Some(peer) = input.peer else {
                    continue;
                };
                if peer.block == ancestor {
                    return true;
                }
                if visited.insert(peer.block) {
                    stack.push(peer.block);
                }
            }
        }
        false
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// All connections, in the order they were made.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn orient(&self, a: PortId, b: PortId) -> Result<(PortId, PortId), GraphError> {
        self.require_port(a)?;
        self.require_port(b)?;
        match (a.direction, b.direction) {
            (Direction::Output, Direction::Input) => Ok((a, b)),
            (Direction::Input, Direction::Output) => Ok((b, a)),
            _ => Err(GraphError::DirectionMismatch(a, b)),
        }
    }

    /// Connects an output to an input (in either argument order).
    ///
    /// Fails if [`can_connect`](Self::can_connect) is not `Compatible` or if
    /// the input already has a peer.
    pub fn connect(&mut self, a: PortId, b: PortId) -> Result<(), GraphError> {
        self.connect_impl(a, b, true)
    }

    /// Connects without the type rules. Cycles are still rejected.
    pub fn connect_unchecked(&mut self, a: PortId, b: PortId) -> Result<(), GraphError> {
        self.connect_impl(a, b, false)
    }

    fn connect_impl(&mut self, a: PortId, b: PortId, check_types: bool) -> Result<(), GraphError> {
        let (output, input) = self.orient(a, b)?;
        let target = self.require_port(input)?;
        if target.peer.is_some() {
            return Err(GraphError::InputAlreadyConnected {
                block: input.block,
                port: target.name().to_string(),
            });
        }

        let state = if check_types {
            self.can_connect(output, input)
        } else {
            self.hierarchy_state(output, input)
        };
        if state != CompatibilityState::Compatible {
            debug!(%output, %input, %state, "connection rejected");
            return Err(GraphError::Incompatible {
                state,
                output,
                input,
            });
        }

        if let Some(point) = self.port_mut(input) {
            point.peer = Some(output);
        }
        if let Some(point) = self.port_mut(output) {
            point.endpoints.push(input);
        }
        self.connections.push(Connection { output, input });

        if let Some(block) = self.block_mut(output.block) {
            block.on_connected(output, input);
        }
        if let Some(block) = self.block_mut(input.block) {
            block.on_connected(input, output);
        }
        debug!(%output, %input, "connected");
        Ok(())
    }

    /// Removes a connection. Returns false if the ports were not connected.
    pub fn disconnect(&mut self, a: PortId, b: PortId) -> bool {
        let Ok((output, input)) = self.orient(a, b) else {
            return false;
        };
        let Some(position) = self
            .connections
            .iter()
            .position(|c| c.output == output && c.input == input)
        else {
            return false;
        };
        self.connections.remove(position);

        if let Some(point) = self.port_mut(input) {
            point.peer = None;
        }
        if let Some(point) = self.port_mut(output) {
            point.endpoints.retain(|endpoint| *endpoint != input);
        }

        if let Some(block) = self.block_mut(output.block) {
            block.on_disconnected(output, input);
        }
        if let Some(block) = self.block_mut(input.block) {
            block.on_disconnected(input, output);
        }
        debug!(%output, %input, "disconnected");
        true
    }

    /// Removes every connection of a port. Returns how many were removed.
    pub fn disconnect_all(&mut self, port: PortId) -> usize {
        let touching: Vec<Connection> = self
            .connections
            .iter()
            .filter(|c| c.output == port || c.input == port)
            .copied()
            .collect();
        touching
            .into_iter()
            .filter(|c| self.disconnect(c.output, c.input))
            .count()
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Builds the graph with the default configuration.
    pub fn build(&self) -> Result<BuildOutcome, GraphError> {
        self.build_with(BuildConfig::default())
    }

    /// Builds the graph from its output block.
    ///
    /// The result is the value the output block hands to
    /// [`BuildState::set_result`], or else its first output. Missing inputs
    /// and similar problems do not fail the build; they come back as
    /// diagnostics next to whatever geometry could be produced.
    pub fn build_with(&self, config: BuildConfig) -> Result<BuildOutcome, GraphError> {
        let output = self.output_block.ok_or(GraphError::NoOutputBlock)?;
        let entry = self.entry(output).ok_or(GraphError::BlockNotFound(output))?;
        debug!(output, blocks = self.blocks.len(), seed = ?config.seed, "building graph");

        let mut state = BuildState::new(self, config);
        state.build_block(output);
        let value = match state.take_result() {
            Some(value) => value,
            None => match entry.outputs.first() {
                Some(point) => state.output_value(point.id),
                None => Value::Null,
            },
        };

        let geometry = match value {
            Value::Null => None,
            Value::Geometry(geometry) => {
                if let Err(err) = geometry.validate() {
                    state.record(Diagnostic::InvalidGeometry {
                        block: output,
                        reason: err.to_string(),
                    });
                }
                Some(geometry)
            }
            other => {
                state.record(Diagnostic::TypeMismatch {
                    block: output,
                    port: entry
                        .outputs
                        .first()
                        .map_or_else(String::new, |p| p.name().to_string()),
                    expected: ValueKind::Geometry,
                    got: other.kind(),
                });
                None
            }
        };

        Ok(BuildOutcome {
            geometry,
            diagnostics: state.into_diagnostics(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_as_any;

    /// Block with configurable ports that outputs its first input.
    struct Relay {
        ports: Vec<PortSpec>,
        literal: Option<ValueKind>,
    }

    impl Relay {
        fn new(ports: Vec<PortSpec>) -> Self {
            Self {
                ports,
                literal: None,
            }
        }
    }

    impl Block for Relay {
        fn class_name(&self) -> &'static str {
            "Relay"
        }

        fn ports(&self) -> Vec<PortSpec> {
            self.ports.clone()
        }

        fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
            let value = state.connected_value(ctx.input(0));
            for output in ctx.outputs() {
                state.store_value(output, value.clone());
            }
        }

        fn literal_kind(&self) -> Option<ValueKind> {
            self.literal
        }

        impl_as_any!();
    }

    fn float_source(graph: &mut Graph) -> BlockId {
        graph.add_block(
            "float",
            Relay::new(vec![
                PortSpec::input("value", ValueKind::Float).with_default(1.0),
                PortSpec::output("output", ValueKind::Float),
            ]),
        )
    }

    fn binary(graph: &mut Graph) -> BlockId {
        graph.add_block(
            "binary",
            Relay::new(vec![
                PortSpec::input("left", ValueKind::AutoDetect)
                    .linked_with("right")
                    .excluding([ValueKind::Matrix]),
                PortSpec::input("right", ValueKind::AutoDetect).linked_with("left"),
                PortSpec::output("output", ValueKind::BasedOnInput)
                    .type_from("left")
                    .fallback(ValueKind::Float),
            ]),
        )
    }

    #[test]
    fn test_resolution_follows_peer_and_sibling() {
        let mut graph = Graph::new();
        let src = graph.add_block(
            "vec",
            Relay::new(vec![PortSpec::output("output", ValueKind::Vector3)]),
        );
        let op = binary(&mut graph);

        let left = PortId::input(op, 0);
        let right = PortId::input(op, 1);
        assert_eq!(graph.resolved_kind(left), ValueKind::AutoDetect);
        assert_eq!(graph.resolved_kind(PortId::output(op, 0)), ValueKind::Float);

        graph.connect(PortId::output(src, 0), right).unwrap();
        assert_eq!(graph.resolved_kind(right), ValueKind::Vector3);
        // Linked sibling mirrors the connected one.
        assert_eq!(graph.resolved_kind(left), ValueKind::Vector3);
        // Type source is not connected yet, so the fallback applies.
        assert_eq!(graph.resolved_kind(PortId::output(op, 0)), ValueKind::Float);

        graph.disconnect(PortId::output(src, 0), right);
        graph.connect(PortId::output(src, 0), left).unwrap();
        assert_eq!(graph.resolved_kind(PortId::output(op, 0)), ValueKind::Vector3);
    }

    #[test]
    fn test_literal_kind_wins() {
        let mut graph = Graph::new();
        let mut block = Relay::new(vec![PortSpec::output("output", ValueKind::AutoDetect)]);
        block.literal = Some(ValueKind::Int);
        let id = graph.add_block("literal", block);
        assert_eq!(graph.resolved_kind(PortId::output(id, 0)), ValueKind::Int);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let mut graph = Graph::new();
        let f = float_source(&mut graph);
        let g = graph.add_block(
            "geometry",
            Relay::new(vec![PortSpec::input("geometry", ValueKind::Geometry)]),
        );

        let err = graph
            .connect(PortId::output(f, 0), PortId::input(g, 0))
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Incompatible {
                state: CompatibilityState::TypeIncompatible,
                ..
            }
        ));
        assert!(graph.connections().is_empty());
    }

    #[test]
    fn test_accepted_kinds() {
        let mut graph = Graph::new();
        let f = float_source(&mut graph);
        let v = graph.add_block(
            "vector",
            Relay::new(vec![
                PortSpec::input("value", ValueKind::Vector3).accepting([ValueKind::Float]),
            ]),
        );
        assert_eq!(
            graph.can_connect(PortId::output(f, 0), PortId::input(v, 0)),
            CompatibilityState::Compatible
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = Graph::new();
        let a = float_source(&mut graph);
        let b = float_source(&mut graph);

        graph.connect(PortId::output(a, 0), PortId::input(b, 0)).unwrap();
        assert!(graph.is_ancestor_of(a, b));
        assert!(!graph.is_ancestor_of(b, a));

        assert_eq!(
            graph.can_connect(PortId::output(b, 0), PortId::input(a, 0)),
            CompatibilityState::HierarchyIssue
        );
        assert_eq!(
            graph.can_connect(PortId::output(a, 0), PortId::input(a, 0)),
            CompatibilityState::HierarchyIssue
        );
        // Bypassing the type rules does not bypass the cycle check.
        assert!(
            graph
                .connect_unchecked(PortId::output(b, 0), PortId::input(a, 0))
                .is_err()
        );
    }

    #[test]
    fn test_connect_accepts_either_order() {
        let mut graph = Graph::new();
        let a = float_source(&mut graph);
        let b = float_source(&mut graph);

        graph.connect(PortId::input(b, 0), PortId::output(a, 0)).unwrap();
        assert_eq!(graph.port(PortId::input(b, 0)).unwrap().peer(), Some(PortId::output(a, 0)));
        assert_eq!(graph.port(PortId::output(a, 0)).unwrap().endpoints(), &[PortId::input(b, 0)]);

        assert!(matches!(
            graph.connect(PortId::input(a, 0), PortId::input(b, 0)),
            Err(GraphError::DirectionMismatch(..))
        ));
    }

    #[test]
    fn test_input_already_connected() {
        let mut graph = Graph::new();
        let a = float_source(&mut graph);
        let b = float_source(&mut graph);
        let c = float_source(&mut graph);

        graph.connect(PortId::output(a, 0), PortId::input(c, 0)).unwrap();
        assert!(matches!(
            graph.connect(PortId::output(b, 0), PortId::input(c, 0)),
            Err(GraphError::InputAlreadyConnected { .. })
        ));
    }

    #[test]
    fn test_disconnect_is_noop_when_not_connected() {
        let mut graph = Graph::new();
        let a = float_source(&mut graph);
        let b = float_source(&mut graph);

        assert!(!graph.disconnect(PortId::output(a, 0), PortId::input(b, 0)));
        graph.connect(PortId::output(a, 0), PortId::input(b, 0)).unwrap();
        assert!(graph.disconnect(PortId::output(a, 0), PortId::input(b, 0)));
        assert!(!graph.disconnect(PortId::output(a, 0), PortId::input(b, 0)));
        assert!(graph.port(PortId::input(b, 0)).unwrap().peer().is_none());
    }

    #[test]
    fn test_remove_block_disconnects() {
        let mut graph = Graph::new();
        let a = float_source(&mut graph);
        let b = float_source(&mut graph);
        graph.connect(PortId::output(a, 0), PortId::input(b, 0)).unwrap();
        graph.set_output_block(a).unwrap();

        assert!(graph.remove_block(a).is_some());
        assert!(graph.connections().is_empty());
        assert!(graph.port(PortId::input(b, 0)).unwrap().peer().is_none());
        assert_eq!(graph.output_block(), None);
    }

    #[test]
    fn test_named_ports() {
        let mut graph = Graph::new();
        let op = binary(&mut graph);
        assert_eq!(graph.input_port(op, "right").unwrap(), PortId::input(op, 1));
        assert_eq!(graph.output_port(op, "output").unwrap(), PortId::output(op, 0));
        assert!(matches!(
            graph.input_port(op, "missing"),
            Err(GraphError::PortNotFound { .. })
        ));
        assert_eq!(graph.find_block_by_name("binary"), Some(op));
    }

    #[test]
    fn test_insert_block_with_id() {
        let mut graph = Graph::new();
        graph
            .insert_block_with_id(7, "seven", Box::new(Relay::new(Vec::new())))
            .unwrap();
        assert!(matches!(
            graph.insert_block_with_id(7, "again", Box::new(Relay::new(Vec::new()))),
            Err(GraphError::DuplicateBlockId(7))
        ));
        assert_eq!(graph.add_block("next", Relay::new(Vec::new())), 8);
    }

    #[test]
    fn test_build_without_output_block() {
        let graph = Graph::new();
        assert_eq!(graph.build().unwrap_err(), GraphError::NoOutputBlock);
    }

    #[test]
    fn test_build_records_unconnected_input() {
        let mut graph = Graph::new();
        let g = graph.add_block(
            "sink",
            Relay::new(vec![
                PortSpec::input("geometry", ValueKind::Geometry),
                PortSpec::output("output", ValueKind::Geometry),
            ]),
        );
        graph.set_output_block(g).unwrap();

        let outcome = graph.build().unwrap();
        assert!(outcome.geometry.is_none());
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::UnconnectedInput {
                block: g,
                block_name: "sink".into(),
                port: "geometry".into(),
            }]
        );
    }
}
