//! Connection points: typed block inputs and outputs.
//!
//! Blocks declare their ports as [`PortSpec`]s. When a block is added to a
//! [`Graph`](crate::Graph) each spec becomes a [`ConnectionPoint`] that also
//! tracks its connections.

use std::fmt;

use crate::value::{Value, ValueKind};
use crate::BlockId;

/// Direction of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Receives a value from at most one output.
    Input,
    /// Produces a value for any number of inputs.
    Output,
}

/// Identifies a port by owning block, direction and declaration index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId {
    /// Owning block.
    pub block: BlockId,
    /// Input or output.
    pub direction: Direction,
    /// Index among the block's ports of the same direction.
    pub index: usize,
}

impl PortId {
    /// Input `index` of `block`.
    pub fn input(block: BlockId, index: usize) -> Self {
        Self {
            block,
            direction: Direction::Input,
            index,
        }
    }

    /// Output `index` of `block`.
    pub fn output(block: BlockId, index: usize) -> Self {
        Self {
            block,
            direction: Direction::Output,
            index,
        }
    }

    /// Returns true for inputs.
    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            Direction::Input => "in",
            Direction::Output => "out",
        };
        write!(f, "{}.{}[{}]", self.block, dir, self.index)
    }
}

/// Declaration of a port, built by [`Block::ports`](crate::Block::ports).
///
/// ```
/// use nodegeo_core::{PortSpec, Value, ValueKind};
///
/// let count = PortSpec::input("count", ValueKind::Int).with_default(Value::Int(10));
/// let left = PortSpec::input("left", ValueKind::AutoDetect)
///     .linked_with("right")
///     .excluding([ValueKind::Geometry, ValueKind::Matrix]);
/// assert!(count.is_optional());
/// assert!(!left.is_optional());
/// ```
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub(crate) name: &'static str,
    pub(crate) direction: Direction,
    pub(crate) kind: ValueKind,
    pub(crate) optional: bool,
    pub(crate) default: Option<Value>,
    pub(crate) accepted: Vec<ValueKind>,
    pub(crate) excluded: Vec<ValueKind>,
    pub(crate) linked_with: Option<&'static str>,
    pub(crate) type_from: Option<&'static str>,
    pub(crate) fallback: Option<ValueKind>,
}

impl PortSpec {
    fn new(name: &'static str, direction: Direction, kind: ValueKind) -> Self {
        Self {
            name,
            direction,
            kind,
            optional: false,
            default: None,
            accepted: Vec::new(),
            excluded: Vec::new(),
            linked_with: None,
            type_from: None,
            fallback: None,
        }
    }

    /// Declares a required input.
    pub fn input(name: &'static str, kind: ValueKind) -> Self {
        Self::new(name, Direction::Input, kind)
    }

    /// Declares an output.
    pub fn output(name: &'static str, kind: ValueKind) -> Self {
        Self::new(name, Direction::Output, kind)
    }

    /// Marks the input as optional: building proceeds when it is unconnected.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Sets the literal used while the input is unconnected. Implies optional.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.optional = true;
        self
    }

    /// Adds kinds accepted even though they differ from the resolved kind.
    pub fn accepting(mut self, kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        self.accepted.extend(kinds);
        self
    }

    /// Adds kinds that may never be connected.
    pub fn excluding(mut self, kinds: impl IntoIterator<Item = ValueKind>) -> Self {
        self.excluded.extend(kinds);
        self
    }

    /// Links an `AutoDetect` port to a sibling input whose kind it mirrors.
    pub fn linked_with(mut self, sibling: &'static str) -> Self {
        self.linked_with = Some(sibling);
        self
    }

    /// Makes a `BasedOnInput` port mirror the kind of the named input.
    pub fn type_from(mut self, source: &'static str) -> Self {
        self.type_from = Some(source);
        self
    }

    /// Kind used by a `BasedOnInput` port when its source cannot resolve it.
    pub fn fallback(mut self, kind: ValueKind) -> Self {
        self.fallback = Some(kind);
        self
    }

    /// Port name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Port direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Declared kind (possibly a meta-kind).
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// True if building may proceed with this input unconnected.
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

/// A port instantiated on a block in a graph.
#[derive(Debug, Clone)]
pub struct ConnectionPoint {
    pub(crate) id: PortId,
    pub(crate) spec: PortSpec,
    /// Current literal default. Starts as the spec default and may be edited.
    pub(crate) default: Option<Value>,
    /// Sibling input index for `linked_with`.
    pub(crate) linked: Option<usize>,
    /// Input index for `type_from`.
    pub(crate) type_source: Option<usize>,
    pub(crate) peer: Option<PortId>,
    pub(crate) endpoints: Vec<PortId>,
}

impl ConnectionPoint {
    pub(crate) fn new(id: PortId, spec: PortSpec, inputs: &[PortSpec]) -> Self {
        let find = |name: Option<&'static str>| {
            name.and_then(|name| inputs.iter().position(|p| p.name == name))
        };
        Self {
            id,
            default: spec.default.clone(),
            linked: find(spec.linked_with),
            type_source: find(spec.type_from),
            spec,
            peer: None,
            endpoints: Vec::new(),
        }
    }

    /// This port's ID.
    pub fn id(&self) -> PortId {
        self.id
    }

    /// Port name.
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    /// Port direction.
    pub fn direction(&self) -> Direction {
        self.spec.direction
    }

    /// Declared kind (possibly a meta-kind).
    pub fn declared_kind(&self) -> ValueKind {
        self.spec.kind
    }

    /// True if building may proceed with this input unconnected.
    pub fn is_optional(&self) -> bool {
        self.spec.optional
    }

    /// Kinds accepted in addition to the resolved kind.
    pub fn accepted_kinds(&self) -> &[ValueKind] {
        &self.spec.accepted
    }

    /// Kinds that may never be connected.
    pub fn excluded_kinds(&self) -> &[ValueKind] {
        &self.spec.excluded
    }

    /// Literal returned while the input is unconnected.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The output feeding this input.
    pub fn peer(&self) -> Option<PortId> {
        self.peer
    }

    /// The inputs fed by this output.
    pub fn endpoints(&self) -> &[PortId] {
        &self.endpoints
    }

    /// True if the port has at least one connection.
    pub fn is_connected(&self) -> bool {
        self.peer.is_some() || !self.endpoints.is_empty()
    }
}
