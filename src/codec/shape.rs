//! Structure of a parameter value as far as serialization is concerned.

use indexmap::IndexMap;
use serde_json::Value;

use crate::resolve::ReferenceTable;
use crate::types::{Scalar, Shape, TypeDescriptor, map_type};

/// Decoded layout of a parameter value.
///
/// Named types are looked through; unions and untyped values travel as text.
#[derive(Debug, Clone, PartialEq)]
pub enum WireShape {
    Scalar(Scalar),
    Text,
    Array(Box<WireShape>),
    /// Declared fields in declaration order.
    Object(IndexMap<String, WireShape>),
    /// Free-form keys with one value type.
    Map(Box<WireShape>),
}

/// Top-level kind of a parameter value; selects the column of the style matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Scalar,
    Array,
    Object,
}

impl WireShape {
    pub fn kind(&self) -> ValueKind {
        match self {
            WireShape::Scalar(_) | WireShape::Text => ValueKind::Scalar,
            WireShape::Array(_) => ValueKind::Array,
            WireShape::Object(_) | WireShape::Map(_) => ValueKind::Object,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.kind() == ValueKind::Scalar
    }

    /// Shape of the member `key` of an object or map.
    pub fn member(&self, key: &str) -> Option<&WireShape> {
        match self {
            WireShape::Object(fields) => fields.get(key),
            WireShape::Map(value) => Some(value),
            _ => None,
        }
    }

    /// Members are all scalars (arrays of scalars, flat objects).
    pub fn is_flat(&self) -> bool {
        match self {
            WireShape::Scalar(_) | WireShape::Text => true,
            WireShape::Array(item) | WireShape::Map(item) => item.is_scalar(),
            WireShape::Object(fields) => fields.values().all(WireShape::is_scalar),
        }
    }

    /// Arrays inside a deepObject may only hold scalars; objects nest freely.
    pub fn is_deep_encodable(&self) -> bool {
        match self {
            WireShape::Scalar(_) | WireShape::Text => true,
            WireShape::Array(item) => item.is_scalar(),
            WireShape::Object(fields) => fields.values().all(WireShape::is_deep_encodable),
            WireShape::Map(value) => value.is_deep_encodable(),
        }
    }
}

pub(crate) fn wire_shape(table: &ReferenceTable, descriptor: &TypeDescriptor) -> WireShape {
    ShapeBuilder {
        table,
        visiting: Vec::new(),
    }
    .build(descriptor)
}

struct ShapeBuilder<'t> {
    table: &'t ReferenceTable,
    visiting: Vec<String>,
}

impl ShapeBuilder<'_> {
    fn build(&mut self, descriptor: &TypeDescriptor) -> WireShape {
        match &descriptor.shape {
            Shape::Scalar(scalar) => WireShape::Scalar(*scalar),
            Shape::Enum(values) => values.first().map_or(WireShape::Text, literal_shape),
            Shape::Array(items) => WireShape::Array(Box::new(self.build(items))),
            Shape::Object { fields, .. } => WireShape::Object(
                fields
                    .iter()
                    .map(|f| (f.name.clone(), self.build(&f.ty)))
                    .collect(),
            ),
            Shape::Map(value) => WireShape::Map(Box::new(self.build(value))),
            Shape::Intersection(members) => {
                let mut fields = IndexMap::new();
                for member in members {
                    match self.build(member) {
                        WireShape::Object(more) => fields.extend(more),
                        _ => return WireShape::Text,
                    }
                }
                WireShape::Object(fields)
            }
            Shape::Named { pointer, .. } => {
                if self.visiting.contains(pointer) {
                    return WireShape::Text;
                }
                let Some(id) = self.table.get(pointer) else {
                    return WireShape::Text;
                };
                self.visiting.push(pointer.clone());
                let shape = self.build(&map_type(self.table, id));
                self.visiting.pop();
                shape
            }
            Shape::Union { .. } | Shape::Any => WireShape::Text,
        }
    }
}

fn literal_shape(value: &Value) -> WireShape {
    match value {
        Value::String(_) => WireShape::Scalar(Scalar::String),
        Value::Bool(_) => WireShape::Scalar(Scalar::Boolean),
        Value::Number(n) if n.is_f64() => WireShape::Scalar(Scalar::Number),
        Value::Number(_) => WireShape::Scalar(Scalar::Integer),
        _ => WireShape::Text,
    }
}
