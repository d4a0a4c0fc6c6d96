//! Value kinds and runtime values flowing through a geometry graph.

use glam::{Mat4, Vec2, Vec3, Vec4};
use nodegeo_mesh::VertexData;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;
use std::rc::Rc;

use crate::error::TypeError;

/// Kind of value a port carries.
///
/// `AutoDetect` and `BasedOnInput` are meta-kinds: they never describe a
/// runtime value and are resolved through the port's connections (see
/// [`Graph::resolved_kind`](crate::Graph::resolved_kind)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// 32-bit signed integer.
    Int,
    /// 32-bit float.
    Float,
    /// 2D vector.
    Vector2,
    /// 3D vector.
    Vector3,
    /// 4D vector.
    Vector4,
    /// 4x4 transform matrix.
    Matrix,
    /// Vertex data.
    Geometry,
    /// Texture handle. Declared for port typing only.
    Texture,
    /// Takes the kind of whatever the port is connected to.
    AutoDetect,
    /// Mirrors the resolved kind of another input on the same block.
    BasedOnInput,
}

impl ValueKind {
    /// Returns true for `AutoDetect` and `BasedOnInput`.
    pub fn is_meta(self) -> bool {
        matches!(self, ValueKind::AutoDetect | ValueKind::BasedOnInput)
    }

    /// Returns true for the scalar and vector kinds.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ValueKind::Int
                | ValueKind::Float
                | ValueKind::Vector2
                | ValueKind::Vector3
                | ValueKind::Vector4
        )
    }

    /// Number of float components of a numeric kind.
    pub fn components(self) -> Option<usize> {
        match self {
            ValueKind::Int | ValueKind::Float => Some(1),
            ValueKind::Vector2 => Some(2),
            ValueKind::Vector3 => Some(3),
            ValueKind::Vector4 => Some(4),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "Int",
            ValueKind::Float => "Float",
            ValueKind::Vector2 => "Vector2",
            ValueKind::Vector3 => "Vector3",
            ValueKind::Vector4 => "Vector4",
            ValueKind::Matrix => "Matrix",
            ValueKind::Geometry => "Geometry",
            ValueKind::Texture => "Texture",
            ValueKind::AutoDetect => "AutoDetect",
            ValueKind::BasedOnInput => "BasedOnInput",
        };
        f.write_str(name)
    }
}

/// Runtime value produced by a block output.
///
/// `Null` marks "no value": it is what degraded subgraphs produce and what
/// downstream blocks treat as missing geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// 2D vector.
    Vector2(Vec2),
    /// 3D vector.
    Vector3(Vec3),
    /// 4D vector.
    Vector4(Vec4),
    /// 4x4 transform matrix.
    Matrix(Mat4),
    /// Shared vertex data. Blocks that mutate geometry clone it first.
    Geometry(Rc<VertexData>),
}

impl Value {
    /// Returns the kind of this value, or `None` for `Null`.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(ValueKind::Int),
            Value::Float(_) => Some(ValueKind::Float),
            Value::Vector2(_) => Some(ValueKind::Vector2),
            Value::Vector3(_) => Some(ValueKind::Vector3),
            Value::Vector4(_) => Some(ValueKind::Vector4),
            Value::Matrix(_) => Some(ValueKind::Matrix),
            Value::Geometry(_) => Some(ValueKind::Geometry),
        }
    }

    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Attempts to extract an integer.
    pub fn as_int(&self) -> Result<i32, TypeError> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(TypeError::expected(ValueKind::Int, other.kind())),
        }
    }

    /// Attempts to extract a float.
    pub fn as_float(&self) -> Result<f32, TypeError> {
        match self {
            Value::Float(v) => Ok(*v),
            other => Err(TypeError::expected(ValueKind::Float, other.kind())),
        }
    }

    /// Attempts to extract a Vec2.
    pub fn as_vec2(&self) -> Result<Vec2, TypeError> {
        match self {
            Value::Vector2(v) => Ok(*v),
            other => Err(TypeError::expected(ValueKind::Vector2, other.kind())),
        }
    }

    /// Attempts to extract a Vec3.
    pub fn as_vec3(&self) -> Result<Vec3, TypeError> {
        match self {
            Value::Vector3(v) => Ok(*v),
            other => Err(TypeError::expected(ValueKind::Vector3, other.kind())),
        }
    }

    /// Attempts to extract a Vec4.
    pub fn as_vec4(&self) -> Result<Vec4, TypeError> {
        match self {
            Value::Vector4(v) => Ok(*v),
            other => Err(TypeError::expected(ValueKind::Vector4, other.kind())),
        }
    }

    /// Attempts to extract a matrix.
    pub fn as_matrix(&self) -> Result<Mat4, TypeError> {
        match self {
            Value::Matrix(v) => Ok(*v),
            other => Err(TypeError::expected(ValueKind::Matrix, other.kind())),
        }
    }

    /// Attempts to extract shared vertex data.
    pub fn as_geometry(&self) -> Result<&Rc<VertexData>, TypeError> {
        match self {
            Value::Geometry(v) => Ok(v),
            other => Err(TypeError::expected(ValueKind::Geometry, other.kind())),
        }
    }

    /// Returns the float components of a numeric value.
    pub fn components(&self) -> Option<Vec<f32>> {
        match self {
            Value::Int(v) => Some(vec![*v as f32]),
            Value::Float(v) => Some(vec![*v]),
            Value::Vector2(v) => Some(v.to_array().to_vec()),
            Value::Vector3(v) => Some(v.to_array().to_vec()),
            Value::Vector4(v) => Some(v.to_array().to_vec()),
            _ => None,
        }
    }

    /// Builds a numeric value of `kind` from float components.
    ///
    /// Missing components are zero; extra components are dropped.
    pub fn from_components(kind: ValueKind, components: &[f32]) -> Option<Value> {
        let at = |i: usize| components.get(i).copied().unwrap_or(0.0);
        match kind {
            ValueKind::Int => Some(Value::Int(at(0) as i32)),
            ValueKind::Float => Some(Value::Float(at(0))),
            ValueKind::Vector2 => Some(Value::Vector2(Vec2::new(at(0), at(1)))),
            ValueKind::Vector3 => Some(Value::Vector3(Vec3::new(at(0), at(1), at(2)))),
            ValueKind::Vector4 => Some(Value::Vector4(Vec4::new(at(0), at(1), at(2), at(3)))),
            _ => None,
        }
    }

    /// Adapts this value to `kind`.
    ///
    /// Scalars splat into vectors, Int and Float convert into each other,
    /// vectors widen with zeros or truncate. Meta-kinds accept anything.
    /// Returns `None` for `Null` and when no adaptation exists.
    pub fn coerce(&self, kind: ValueKind) -> Option<Value> {
        if self.is_null() {
            return None;
        }
        if kind.is_meta() || self.kind() == Some(kind) {
            return Some(self.clone());
        }

        match (self, kind) {
            (Value::Int(v), ValueKind::Float) => Some(Value::Float(*v as f32)),
            (Value::Float(v), ValueKind::Int) => Some(Value::Int(*v as i32)),
            (Value::Int(_) | Value::Float(_), _) if kind.is_numeric() => {
                let scalar = self.components()?[0];
                Value::from_components(kind, &[scalar; 4])
            }
            (Value::Vector2(_) | Value::Vector3(_) | Value::Vector4(_), _)
                if matches!(kind, ValueKind::Vector2 | ValueKind::Vector3 | ValueKind::Vector4) =>
            {
                Value::from_components(kind, &self.components()?)
            }
            _ => None,
        }
    }

    /// Serializes a literal to JSON (numbers and arrays).
    ///
    /// Geometry is not a literal and serializes as `null`.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null | Value::Geometry(_) => JsonValue::Null,
            Value::Int(v) => json!(v),
            Value::Float(v) => json!(v),
            Value::Vector2(v) => json!(v.to_array()),
            Value::Vector3(v) => json!(v.to_array()),
            Value::Vector4(v) => json!(v.to_array()),
            Value::Matrix(m) => json!(m.to_cols_array()),
        }
    }

    /// Reads a literal of `kind` from JSON written by [`to_json`](Self::to_json).
    pub fn from_json(kind: ValueKind, json: &JsonValue) -> Option<Value> {
        if json.is_null() {
            return Some(Value::Null);
        }
        let numbers: Vec<f32> = match json {
            JsonValue::Number(n) => vec![n.as_f64()? as f32],
            JsonValue::Array(items) => items
                .iter()
                .map(|item| item.as_f64().map(|f| f as f32))
                .collect::<Option<_>>()?,
            _ => return None,
        };

        match kind {
            ValueKind::Int => numbers
                .first()
                .map(|&f| Value::Int(json.as_i64().map_or(f as i32, |v| v as i32))),
            ValueKind::Matrix => {
                let cols: [f32; 16] = numbers.try_into().ok()?;
                Some(Value::Matrix(Mat4::from_cols_array(&cols)))
            }
            kind if kind.components() == Some(numbers.len()) => {
                Value::from_components(kind, &numbers)
            }
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vector2(v)
    }
}

impl From<Vec3> for Value {
    fn from(v: Vec3) -> Self {
        Value::Vector3(v)
    }
}

impl From<Vec4> for Value {
    fn from(v: Vec4) -> Self {
        Value::Vector4(v)
    }
}

impl From<Mat4> for Value {
    fn from(v: Mat4) -> Self {
        Value::Matrix(v)
    }
}

impl From<VertexData> for Value {
    fn from(v: VertexData) -> Self {
        Value::Geometry(Rc::new(v))
    }
}

impl From<Rc<VertexData>> for Value {
    fn from(v: Rc<VertexData>) -> Self {
        Value::Geometry(v)
    }
}

impl From<Option<VertexData>> for Value {
    fn from(v: Option<VertexData>) -> Self {
        v.map_or(Value::Null, Value::from)
    }
}
