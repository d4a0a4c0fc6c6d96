//! Block trait and build-time values.

use serde_json::Value as JsonValue;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::port::{PortId, PortSpec};
use crate::state::BuildState;
use crate::value::{Value, ValueKind};
use crate::BlockId;

/// A unit of computation in a geometry graph.
///
/// A block declares its ports once through [`ports`](Block::ports). During a
/// build pass the graph calls [`build`](Block::build), which reads inputs
/// through [`BuildState::connected_value`] and stores one
/// [`OutputValue`] per output with [`BuildState::store`].
pub trait Block: Any {
    /// Type tag used for serialization.
    fn class_name(&self) -> &'static str;

    /// Declares inputs and outputs, in order.
    fn ports(&self) -> Vec<PortSpec>;

    /// Builds the block for the current pass.
    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>);

    /// For input-literal blocks: the kind `AutoDetect` outputs resolve to.
    fn literal_kind(&self) -> Option<ValueKind> {
        None
    }

    /// Editable properties, as JSON.
    fn properties(&self) -> JsonValue {
        JsonValue::Object(Default::default())
    }

    /// Replaces editable properties from JSON. Missing fields default.
    fn set_properties(&mut self, _properties: JsonValue) -> Result<(), serde_json::Error> {
        Ok(())
    }

    /// Called after one of this block's ports gained a connection.
    fn on_connected(&mut self, _port: PortId, _peer: PortId) {}

    /// Called after one of this block's ports lost a connection.
    fn on_disconnected(&mut self, _port: PortId, _peer: PortId) {}

    /// Returns `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as `&mut dyn Any` for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A boxed block.
pub type BoxedBlock = Box<dyn Block>;

/// What a block sees of itself while building.
#[derive(Debug, Clone)]
pub struct BlockContext {
    id: BlockId,
    name: String,
    inputs: Vec<&'static str>,
    outputs: Vec<&'static str>,
}

impl BlockContext {
    pub(crate) fn new(
        id: BlockId,
        name: String,
        inputs: Vec<&'static str>,
        outputs: Vec<&'static str>,
    ) -> Self {
        Self {
            id,
            name,
            inputs,
            outputs,
        }
    }

    /// The building block's ID.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// The building block's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input `index` of this block.
    pub fn input(&self, index: usize) -> PortId {
        PortId::input(self.id, index)
    }

    /// Output `index` of this block.
    pub fn output(&self, index: usize) -> PortId {
        PortId::output(self.id, index)
    }

    /// Input with the given name.
    pub fn input_named(&self, name: &str) -> Option<PortId> {
        self.inputs
            .iter()
            .position(|n| *n == name)
            .map(|i| self.input(i))
    }

    /// Output with the given name.
    pub fn output_named(&self, name: &str) -> Option<PortId> {
        self.outputs
            .iter()
            .position(|n| *n == name)
            .map(|i| self.output(i))
    }

    /// Iterates over this block's outputs.
    pub fn outputs(&self) -> impl Iterator<Item = PortId> + '_ {
        (0..self.outputs.len()).map(|i| self.output(i))
    }
}

/// A lazily evaluated output.
///
/// Invoked with the build state each time a downstream input is read, so the
/// result may depend on the current execution context.
#[derive(Clone)]
pub struct Evaluator(Rc<dyn Fn(&mut BuildState<'_>) -> Value>);

impl Evaluator {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut BuildState<'_>) -> Value + 'static,
    {
        Self(Rc::new(f))
    }

    /// An evaluator that always returns `value`.
    pub fn constant(value: Value) -> Self {
        Self::new(move |_| value.clone())
    }

    /// Runs the evaluator.
    pub fn call(&self, state: &mut BuildState<'_>) -> Value {
        (self.0)(state)
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Evaluator(..)")
    }
}

/// Value stored for an output during a build pass.
#[derive(Debug, Clone)]
pub enum OutputValue {
    /// Computed once for the whole pass.
    Literal(Value),
    /// Computed on every read.
    Evaluator(Evaluator),
}

impl OutputValue {
    /// Produces the value, invoking the evaluator if needed.
    pub fn get(&self, state: &mut BuildState<'_>) -> Value {
        match self {
            OutputValue::Literal(value) => value.clone(),
            OutputValue::Evaluator(evaluator) => evaluator.call(state),
        }
    }
}

impl Default for OutputValue {
    fn default() -> Self {
        OutputValue::Literal(Value::Null)
    }
}

/// Implements the `as_any` boilerplate of [`Block`].
#[macro_export]
macro_rules! impl_as_any {
    () => {
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}
