//! `format` keyword handling.

use crate::resolve::Primitive;

/// A primitive refined by its `format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    String,
    Uuid,
    Date,
    DateTime,
    Email,
    Uri,
    /// Raw bytes (`format: binary`), e.g. file uploads.
    Binary,
    /// Base64 text (`format: byte`).
    Byte,
    Password,
    Integer,
    Int32,
    /// Wide integer; does not fit a JavaScript number.
    Int64,
    Number,
    Float,
    Double,
    Boolean,
    Null,
}

/// Map a primitive and its `format` to a scalar.
///
/// Returns `None` when the format is not known for that primitive; callers
/// fall back to [`Scalar::from_primitive`] and record a warning.
pub fn refine(primitive: Primitive, format: Option<&str>) -> Option<Scalar> {
    let Some(format) = format else {
        return Some(Scalar::from_primitive(primitive));
    };
    match (primitive, format) {
        (Primitive::Integer, "int32") => Some(Scalar::Int32),
        (Primitive::Integer, "int64") => Some(Scalar::Int64),
        (Primitive::Number, "float") => Some(Scalar::Float),
        (Primitive::Number, "double") => Some(Scalar::Double),
        (Primitive::String, "uuid") => Some(Scalar::Uuid),
        (Primitive::String, "date") => Some(Scalar::Date),
        (Primitive::String, "date-time") => Some(Scalar::DateTime),
        (Primitive::String, "email") => Some(Scalar::Email),
        (Primitive::String, "uri" | "url") => Some(Scalar::Uri),
        (Primitive::String, "binary") => Some(Scalar::Binary),
        (Primitive::String, "byte") => Some(Scalar::Byte),
        (Primitive::String, "password") => Some(Scalar::Password),
        _ => None,
    }
}

impl Scalar {
    pub fn from_primitive(primitive: Primitive) -> Self {
        match primitive {
            Primitive::String => Scalar::String,
            Primitive::Integer => Scalar::Integer,
            Primitive::Number => Scalar::Number,
            Primitive::Boolean => Scalar::Boolean,
            Primitive::Null => Scalar::Null,
        }
    }

    pub fn primitive(self) -> Primitive {
        match self {
            Scalar::String
            | Scalar::Uuid
            | Scalar::Date
            | Scalar::DateTime
            | Scalar::Email
            | Scalar::Uri
            | Scalar::Binary
            | Scalar::Byte
            | Scalar::Password => Primitive::String,
            Scalar::Integer | Scalar::Int32 | Scalar::Int64 => Primitive::Integer,
            Scalar::Number | Scalar::Float | Scalar::Double => Primitive::Number,
            Scalar::Boolean => Primitive::Boolean,
            Scalar::Null => Primitive::Null,
        }
    }

    pub fn is_integer(self) -> bool {
        self.primitive() == Primitive::Integer
    }

    pub fn is_numeric(self) -> bool {
        matches!(self.primitive(), Primitive::Integer | Primitive::Number)
    }
}
