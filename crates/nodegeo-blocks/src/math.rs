//! Numeric blocks: arithmetic, random values and vector conversion.
//!
//! All of these store evaluators, so a contextual upstream (a vertex
//! position, a loop index) is re-read on every pull.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec4;
use nodegeo_core::{
    Block, BlockContext, BuildState, ContextualSource, Evaluator, PortId, PortSpec, Value,
    ValueKind, impl_as_any,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kinds arithmetic operands never accept.
const NON_ARITHMETIC: [ValueKind; 3] = [ValueKind::Geometry, ValueKind::Matrix, ValueKind::Texture];

// ============================================================================
// Math
// ============================================================================

/// Binary operation applied component-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MathOperation {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
    Max,
    Min,
}

impl MathOperation {
    /// Applies the operation to one component.
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            MathOperation::Add => a + b,
            MathOperation::Subtract => a - b,
            MathOperation::Multiply => a * b,
            MathOperation::Divide => a / b,
            MathOperation::Max => a.max(b),
            MathOperation::Min => a.min(b),
        }
    }
}

/// `left <op> right`. The result takes the kind of `left`; `right` is
/// adapted to it, so a scalar right operand splats across a vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MathBlock {
    pub operation: MathOperation,
}

impl MathBlock {
    pub fn new(operation: MathOperation) -> Self {
        Self { operation }
    }
}

impl Block for MathBlock {
    fn class_name(&self) -> &'static str {
        "MathBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("left", ValueKind::AutoDetect)
                .linked_with("right")
                .excluding(NON_ARITHMETIC),
            PortSpec::input("right", ValueKind::AutoDetect)
                .linked_with("left")
                .excluding(NON_ARITHMETIC),
            PortSpec::output("output", ValueKind::BasedOnInput)
                .type_from("left")
                .fallback(ValueKind::Float),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let operation = self.operation;
        let (left, right) = (ctx.input(0), ctx.input(1));
        let evaluator = Evaluator::new(move |state| {
            let left = state.connected_value(left);
            let Some(kind) = left.kind() else {
                return Value::Null;
            };
            let right = state.adapt(right, kind, Value::Null);
            let (Some(a), Some(b)) = (left.components(), right.components()) else {
                return Value::Null;
            };
            let result: Vec<f32> = a
                .iter()
                .zip(&b)
                .map(|(&a, &b)| operation.apply(a, b))
                .collect();
            Value::from_components(kind, &result).unwrap_or_default()
        });
        state.store(ctx.output(0), evaluator, true);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Random
// ============================================================================

/// When a random block draws a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RandomLock {
    /// On every read.
    #[default]
    None,
    /// Once per loop iteration.
    LoopId,
    /// Once per instance.
    InstanceId,
    /// Once per build pass.
    Once,
}

/// Uniform random value between `min` and `max`, of the kind of `min`.
///
/// Integers are floored, so an Int range excludes `max`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RandomBlock {
    pub lock_mode: RandomLock,
}

impl RandomBlock {
    pub fn new(lock_mode: RandomLock) -> Self {
        Self { lock_mode }
    }

    fn draw(state: &mut BuildState<'_>, min: PortId, max: PortId) -> Value {
        let min = state.connected_value(min);
        let Some(kind) = min.kind().filter(|k| k.is_numeric()) else {
            return Value::Null;
        };
        let max = state.adapt(max, kind, Value::Null);
        let (Some(lo), Some(hi)) = (min.components(), max.components()) else {
            return Value::Null;
        };

        let values: Vec<f32> = lo
            .iter()
            .zip(&hi)
            .map(|(&lo, &hi)| {
                let value = lo + (hi - lo) * state.rng().random::<f32>();
                if kind == ValueKind::Int { value.floor() } else { value }
            })
            .collect();
        Value::from_components(kind, &values).unwrap_or_default()
    }
}

impl Block for RandomBlock {
    fn class_name(&self) -> &'static str {
        "RandomBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("min", ValueKind::AutoDetect)
                .linked_with("max")
                .excluding(NON_ARITHMETIC)
                .with_default(0.0),
            PortSpec::input("max", ValueKind::AutoDetect)
                .linked_with("min")
                .excluding(NON_ARITHMETIC)
                .with_default(1.0),
            PortSpec::output("output", ValueKind::BasedOnInput)
                .type_from("min")
                .fallback(ValueKind::Float),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let (min, max) = (ctx.input(0), ctx.input(1));
        let lock = self.lock_mode;
        // Lives for this pass only; a rebuild draws fresh values.
        let cache: Rc<RefCell<HashMap<usize, Value>>> = Rc::default();

        let evaluator = Evaluator::new(move |state| {
            let key = match lock {
                RandomLock::None => return Self::draw(state, min, max),
                RandomLock::Once => 0,
                RandomLock::LoopId | RandomLock::InstanceId => {
                    let source = if lock == RandomLock::LoopId {
                        ContextualSource::LoopId
                    } else {
                        ContextualSource::InstanceId
                    };
                    match state.contextual_value(source).as_int() {
                        Ok(index) => index as usize,
                        Err(_) => return Self::draw(state, min, max),
                    }
                }
            };

            if let Some(value) = cache.borrow().get(&key) {
                return value.clone();
            }
            let value = Self::draw(state, min, max);
            cache.borrow_mut().insert(key, value.clone());
            value
        });
        state.store(ctx.output(0), evaluator, true);
    }

    serde_properties!();
    impl_as_any!();
}

// ============================================================================
// Vector converter
// ============================================================================

/// Assembles and splits vectors.
///
/// The base vector is the first connected of `xyzwIn`, `xyzIn`, `xyIn`;
/// connected scalar inputs then replace single components. Every output
/// reads from that combined Vector4.
#[derive(Debug, Clone, Default)]
pub struct VectorConverterBlock;

impl VectorConverterBlock {
    const OUTPUTS: [&'static str; 7] = ["xyzw", "xyz", "xy", "x", "y", "z", "w"];

    fn combined(state: &mut BuildState<'_>, inputs: &[PortId; 7]) -> Vec4 {
        let [xyzw, xyz, xy, x, y, z, w] = *inputs;
        let mut base = Vec4::ZERO;
        for (port, kind) in [
            (xyzw, ValueKind::Vector4),
            (xyz, ValueKind::Vector3),
            (xy, ValueKind::Vector2),
        ] {
            if state.is_connected(port) {
                base = state
                    .adapt(port, kind, Value::Null)
                    .coerce(ValueKind::Vector4)
                    .and_then(|v| v.as_vec4().ok())
                    .unwrap_or(Vec4::ZERO);
                break;
            }
        }
        for (component, port) in [x, y, z, w].into_iter().enumerate() {
            if state.is_connected(port) {
                base[component] = state.float(port, base[component]);
            }
        }
        base
    }
}

impl Block for VectorConverterBlock {
    fn class_name(&self) -> &'static str {
        "VectorConverterBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        let mut ports = vec![
            PortSpec::input("xyzwIn", ValueKind::Vector4).optional(),
            PortSpec::input("xyzIn", ValueKind::Vector3).optional(),
            PortSpec::input("xyIn", ValueKind::Vector2).optional(),
            PortSpec::input("xIn", ValueKind::Float).optional(),
            PortSpec::input("yIn", ValueKind::Float).optional(),
            PortSpec::input("zIn", ValueKind::Float).optional(),
            PortSpec::input("wIn", ValueKind::Float).optional(),
        ];
        let kinds = [
            ValueKind::Vector4,
            ValueKind::Vector3,
            ValueKind::Vector2,
            ValueKind::Float,
            ValueKind::Float,
            ValueKind::Float,
            ValueKind::Float,
        ];
        ports.extend(
            Self::OUTPUTS
                .iter()
                .zip(kinds)
                .map(|(&name, kind)| PortSpec::output(name, kind)),
        );
        ports
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let inputs: [PortId; 7] = std::array::from_fn(|i| ctx.input(i));
        for output in 0..Self::OUTPUTS.len() {
            let evaluator = Evaluator::new(move |state| {
                let v = Self::combined(state, &inputs);
                match output {
                    0 => Value::Vector4(v),
                    1 => Value::Vector3(v.truncate()),
                    2 => Value::Vector2(v.truncate().truncate()),
                    component => Value::Float(v[component - 3]),
                }
            });
            state.store(ctx.output(output), evaluator, true);
        }
    }

    impl_as_any!();
}
