//! Normalized schema nodes stored in the resolver arena.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::document::{ExclusiveBound, Schema};

/// Stable index of a node in the [`ReferenceTable`](super::ReferenceTable) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// JSON primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Integer,
    Number,
    Boolean,
    Null,
}

impl Primitive {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Primitive::String),
            "integer" => Some(Primitive::Integer),
            "number" => Some(Primitive::Number),
            "boolean" => Some(Primitive::Boolean),
            "null" => Some(Primitive::Null),
            _ => None,
        }
    }
}

/// Validation keywords carried through to the descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

impl Constraints {
    pub fn from_schema(schema: &Schema) -> Self {
        let mut constraints = Constraints {
            minimum: schema.minimum,
            maximum: schema.maximum,
            multiple_of: schema.multiple_of,
            min_length: schema.min_length,
            max_length: schema.max_length,
            pattern: schema.pattern.clone(),
            min_items: schema.min_items,
            max_items: schema.max_items,
            unique_items: schema.unique_items,
            ..Constraints::default()
        };
        // 3.0 spells exclusivity as a flag on minimum/maximum.
        match schema.exclusive_minimum {
            Some(ExclusiveBound::Value(v)) => constraints.exclusive_minimum = Some(v),
            Some(ExclusiveBound::Flag(true)) => {
                constraints.exclusive_minimum = constraints.minimum.take();
            }
            Some(ExclusiveBound::Flag(false)) | None => {}
        }
        match schema.exclusive_maximum {
            Some(ExclusiveBound::Value(v)) => constraints.exclusive_maximum = Some(v),
            Some(ExclusiveBound::Flag(true)) => {
                constraints.exclusive_maximum = constraints.maximum.take();
            }
            Some(ExclusiveBound::Flag(false)) | None => {}
        }
        constraints
    }

    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }
}

/// An object property. `required` is a single flag, so a property can never be
/// both required and optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub node: NodeId,
    pub required: bool,
}

/// `additionalProperties` policy of an object node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Additional {
    Forbidden,
    Any,
    Schema(NodeId),
}

/// Discriminator carried by a union node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscriminatorInfo {
    pub property: String,
    /// Discriminator value -> target pointer.
    pub mapping: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Primitive(Primitive),
    Object {
        properties: Vec<Property>,
        additional: Option<Additional>,
    },
    Array {
        items: Option<NodeId>,
    },
    /// Literal values, `null` excluded (it sets the node's `nullable` flag instead).
    Enum {
        values: Vec<Value>,
    },
    /// `oneOf` (`exclusive`) or `anyOf`, one member per declared branch.
    Union {
        members: Vec<NodeId>,
        exclusive: bool,
        discriminator: Option<DiscriminatorInfo>,
    },
    /// `allOf` that could not be flattened into one object.
    Intersection {
        members: Vec<NodeId>,
    },
    /// A `$ref` to a completed node.
    Reference {
        pointer: String,
        target: NodeId,
    },
    /// A `$ref` that pointed back into a schema still being resolved.
    RecursionMarker {
        pointer: String,
        target: Option<NodeId>,
    },
    /// No constraints at all (`{}`).
    Any,
}

/// A normalized JSON-Schema fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub kind: NodeKind,
    /// Where this node was declared.
    pub pointer: String,
    pub format: Option<String>,
    pub constraints: Constraints,
    /// Every required property name, including names merged in from `allOf`.
    pub required: Vec<String>,
    pub nullable: bool,
    pub default: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub read_only: bool,
    pub write_only: bool,
}

impl SchemaNode {
    pub fn new(kind: NodeKind, pointer: impl Into<String>) -> Self {
        Self {
            kind,
            pointer: pointer.into(),
            format: None,
            constraints: Constraints::default(),
            required: Vec::new(),
            nullable: false,
            default: None,
            title: None,
            description: None,
            deprecated: false,
            read_only: false,
            write_only: false,
        }
    }

    /// Copy the annotation keywords (everything except the structure) from a schema.
    pub(crate) fn with_annotations(mut self, schema: &Schema) -> Self {
        self.format.clone_from(&schema.format);
        self.constraints = Constraints::from_schema(schema);
        self.required.clone_from(&schema.required);
        self.nullable = self.nullable || schema.is_nullable();
        self.default.clone_from(&schema.default);
        self.title.clone_from(&schema.title);
        self.description.clone_from(&schema.description);
        self.deprecated = schema.deprecated;
        self.read_only = schema.read_only;
        self.write_only = schema.write_only;
        self
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, NodeKind::Object { .. })
    }

    pub fn properties(&self) -> &[Property] {
        match &self.kind {
            NodeKind::Object { properties, .. } => properties,
            _ => &[],
        }
    }
}
