//! Transform matrix blocks.

use glam::{Mat4, Vec3};
use nodegeo_core::{
    Block, BlockContext, BuildState, Evaluator, PortSpec, Value, ValueKind, impl_as_any,
};
use serde::{Deserialize, Serialize};

/// Translation matrix from a Vector3.
#[derive(Debug, Clone, Default)]
pub struct TranslationBlock;

impl Block for TranslationBlock {
    fn class_name(&self) -> &'static str {
        "TranslationBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("translation", ValueKind::Vector3).with_default(Vec3::ZERO),
            PortSpec::output("matrix", ValueKind::Matrix),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let translation = ctx.input(0);
        let evaluator = Evaluator::new(move |state| {
            Value::Matrix(Mat4::from_translation(state.vec3(translation, Vec3::ZERO)))
        });
        state.store(ctx.output(0), evaluator, true);
    }

    impl_as_any!();
}

/// Scaling matrix from a Vector3.
#[derive(Debug, Clone, Default)]
pub struct ScalingBlock;

impl Block for ScalingBlock {
    fn class_name(&self) -> &'static str {
        "ScalingBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("scale", ValueKind::Vector3).with_default(Vec3::ONE),
            PortSpec::output("matrix", ValueKind::Matrix),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let scale = ctx.input(0);
        let evaluator = Evaluator::new(move |state| {
            Value::Matrix(Mat4::from_scale(state.vec3(scale, Vec3::ONE)))
        });
        state.store(ctx.output(0), evaluator, true);
    }

    impl_as_any!();
}

/// Rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Axis {
    #[default]
    X,
    Y,
    Z,
}

/// Rotation matrix around a principal axis. The angle is in radians.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationBlock {
    pub axis: Axis,
}

impl RotationBlock {
    pub fn new(axis: Axis) -> Self {
        Self { axis }
    }
}

impl Block for RotationBlock {
    fn class_name(&self) -> &'static str {
        "RotationBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("angle", ValueKind::Float).with_default(0.0),
            PortSpec::output("matrix", ValueKind::Matrix),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let axis = self.axis;
        let angle = ctx.input(0);
        let evaluator = Evaluator::new(move |state| {
            let angle = state.float(angle, 0.0);
            Value::Matrix(match axis {
                Axis::X => Mat4::from_rotation_x(angle),
                Axis::Y => Mat4::from_rotation_y(angle),
                Axis::Z => Mat4::from_rotation_z(angle),
            })
        });
        state.store(ctx.output(0), evaluator, true);
    }

    serde_properties!();
    impl_as_any!();
}

/// Applies `matrix0` first, then `matrix1`.
#[derive(Debug, Clone, Default)]
pub struct MatrixComposeBlock;

impl Block for MatrixComposeBlock {
    fn class_name(&self) -> &'static str {
        "MatrixComposeBlock"
    }

    fn ports(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input("matrix0", ValueKind::Matrix),
            PortSpec::input("matrix1", ValueKind::Matrix),
            PortSpec::output("output", ValueKind::Matrix),
        ]
    }

    fn build(&self, ctx: &BlockContext, state: &mut BuildState<'_>) {
        let (first, second) = (ctx.input(0), ctx.input(1));
        let evaluator = Evaluator::new(move |state| {
            match (state.matrix(first), state.matrix(second)) {
                (Some(first), Some(second)) => Value::Matrix(second * first),
                _ => Value::Null,
            }
        });
        state.store(ctx.output(0), evaluator, true);
    }

    impl_as_any!();
}
