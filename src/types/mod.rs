//! Type Mapper: resolved schema nodes to language-neutral type descriptors.
//!
//! Descriptors are plain trees. Named component schemas and anything that
//! takes part in a cycle stay behind a [`Shape::Named`] reference, so mapping
//! a recursive schema never expands it more than once.

mod format;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::document::pointer_name;
use crate::error::Warning;
use crate::resolve::{Additional, Constraints, NodeId, NodeKind, ReferenceTable};

pub use format::{Scalar, refine};

/// The structural part of a [`TypeDescriptor`].
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Scalar(Scalar),
    Object {
        fields: Vec<Field>,
        /// Type of undeclared keys, if any are allowed.
        additional: Option<Box<TypeDescriptor>>,
    },
    /// Object with no declared properties and a value schema (`Record<string, T>`).
    Map(Box<TypeDescriptor>),
    Array(Box<TypeDescriptor>),
    /// Literal values in declaration order.
    Enum(Vec<Value>),
    Union {
        members: Vec<TypeDescriptor>,
        exclusive: bool,
        tag: Option<Tag>,
    },
    Intersection(Vec<TypeDescriptor>),
    /// A reference to a type that is emitted once under its own name.
    Named {
        pointer: String,
        /// Unsanitized name (last pointer token).
        name: String,
        recursive: bool,
    },
    Any,
}

/// Discriminator of a tagged union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub property: String,
    /// Tag value -> schema pointer.
    pub mapping: IndexMap<String, String>,
}

/// Presence rules of an object field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optionality {
    Required,
    /// May be absent, never null.
    Optional,
    /// May be absent or null.
    OptionalNullable,
}

impl Optionality {
    pub fn is_required(self) -> bool {
        self == Optionality::Required
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Name on the wire, never sanitized.
    pub name: String,
    pub optionality: Optionality,
    pub ty: TypeDescriptor,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub shape: Shape,
    pub nullable: bool,
    /// Copied verbatim from the schema.
    pub default: Option<Value>,
    pub constraints: Constraints,
    pub warnings: Vec<Warning>,
    /// Node this descriptor was mapped from.
    pub source: NodeId,
}

impl TypeDescriptor {
    fn new(shape: Shape, source: NodeId) -> Self {
        Self {
            shape,
            nullable: false,
            default: None,
            constraints: Constraints::default(),
            warnings: Vec::new(),
            source,
        }
    }

    pub fn scalar(&self) -> Option<Scalar> {
        match self.shape {
            Shape::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn fields(&self) -> &[Field] {
        match &self.shape {
            Shape::Object { fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Every named reference inside this descriptor (depth-first, in order).
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.visit(&mut |d| {
            if let Shape::Named { pointer, .. } = &d.shape {
                out.push(pointer.as_str());
            }
        });
        out
    }

    /// Every object shape inside this descriptor, this one included, depth-first.
    pub fn objects(&self) -> Vec<&TypeDescriptor> {
        let mut out = Vec::new();
        self.visit(&mut |d| {
            if matches!(d.shape, Shape::Object { .. }) {
                out.push(d);
            }
        });
        out
    }

    /// Warnings of this descriptor and all nested ones.
    pub fn all_warnings(&self) -> Vec<Warning> {
        let mut out = Vec::new();
        self.visit(&mut |d| out.extend(d.warnings.iter().cloned()));
        out
    }

    fn visit<'a>(&'a self, f: &mut impl FnMut(&'a TypeDescriptor)) {
        f(self);
        match &self.shape {
            Shape::Object { fields, additional } => {
                for field in fields {
                    field.ty.visit(f);
                }
                if let Some(additional) = additional {
                    additional.visit(f);
                }
            }
            Shape::Map(inner) | Shape::Array(inner) => inner.visit(f),
            Shape::Union { members, .. } | Shape::Intersection(members) => {
                for member in members {
                    member.visit(f);
                }
            }
            Shape::Scalar(_) | Shape::Enum(_) | Shape::Named { .. } | Shape::Any => {}
        }
    }
}

/// Map the node `id` to a descriptor.
///
/// References become [`Shape::Named`] when they point at a component schema
/// or at a recursive schema; any other reference is inlined.
pub fn map_type(table: &ReferenceTable, id: NodeId) -> TypeDescriptor {
    Mapper { table }.map(id)
}

/// A named type of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub pointer: String,
    pub name: String,
    pub descriptor: TypeDescriptor,
    /// The type refers back to itself, directly or through other types.
    pub recursive: bool,
}

/// Every named type in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeCatalog {
    types: IndexMap<String, NamedType>,
}

impl TypeCatalog {
    pub fn get(&self, pointer: &str) -> Option<&NamedType> {
        self.types.get(pointer)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn warnings(&self) -> Vec<Warning> {
        self.iter().flat_map(|t| t.descriptor.all_warnings()).collect()
    }
}

/// Map every component schema, followed by recursive schemas that live
/// outside the components section (they need a name too).
pub fn map_catalog(table: &ReferenceTable) -> TypeCatalog {
    let mut types = IndexMap::new();
    let extra = table
        .recursion_targets()
        .filter(|p| !is_component_pointer(p))
        .map(str::to_string)
        .collect::<Vec<_>>();

    for pointer in table.components().iter().chain(&extra) {
        let Some(id) = table.get(pointer) else {
            continue;
        };
        let descriptor = map_type(table, id);
        types.insert(
            pointer.clone(),
            NamedType {
                pointer: pointer.clone(),
                name: pointer_name(pointer),
                recursive: table.is_recursive(pointer),
                descriptor,
            },
        );
    }

    debug!(types = types.len(), "Type catalog mapped.");
    TypeCatalog { types }
}

/// `#/components/schemas/<name>` exactly (not a pointer into one).
pub fn is_component_pointer(pointer: &str) -> bool {
    pointer
        .strip_prefix("#/components/schemas/")
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
}

struct Mapper<'t> {
    table: &'t ReferenceTable,
}

impl Mapper<'_> {
    fn map(&self, id: NodeId) -> TypeDescriptor {
        let node = self.table.node(id);
        let mut warnings = Vec::new();

        let shape = match &node.kind {
            NodeKind::Primitive(primitive) => {
                let scalar = refine(*primitive, node.format.as_deref()).unwrap_or_else(|| {
                    warnings.push(Warning {
                        pointer: node.pointer.clone(),
                        message: format!(
                            "unknown format '{}', using the plain type",
                            node.format.as_deref().unwrap_or_default()
                        ),
                    });
                    Scalar::from_primitive(*primitive)
                });
                Shape::Scalar(scalar)
            }
            NodeKind::Object {
                properties,
                additional,
            } => {
                let additional = match additional {
                    Some(Additional::Schema(value)) => Some(Box::new(self.map(*value))),
                    Some(Additional::Any) => Some(Box::new(TypeDescriptor::new(Shape::Any, id))),
                    Some(Additional::Forbidden) | None => None,
                };
                match additional {
                    Some(value) if properties.is_empty() => Shape::Map(value),
                    additional => {
                        let fields = properties
                            .iter()
                            .map(|property| {
                                let ty = self.map(property.node);
                                let field_node = self.table.node(property.node);
                                let optionality = if property.required {
                                    Optionality::Required
                                } else if ty.nullable {
                                    Optionality::OptionalNullable
                                } else {
                                    Optionality::Optional
                                };
                                Field {
                                    name: property.name.clone(),
                                    optionality,
                                    read_only: field_node.read_only,
                                    write_only: field_node.write_only,
                                    deprecated: field_node.deprecated,
                                    description: field_node.description.clone(),
                                    ty,
                                }
                            })
                            .collect();
                        Shape::Object { fields, additional }
                    }
                }
            }
            NodeKind::Array { items } => {
                let items = match items {
                    Some(items) => self.map(*items),
                    None => TypeDescriptor::new(Shape::Any, id),
                };
                Shape::Array(Box::new(items))
            }
            NodeKind::Enum { values } => Shape::Enum(values.clone()),
            NodeKind::Union {
                members,
                exclusive,
                discriminator,
            } => Shape::Union {
                members: members.iter().map(|m| self.map(*m)).collect(),
                exclusive: *exclusive,
                tag: discriminator.as_ref().map(|d| Tag {
                    property: d.property.clone(),
                    mapping: d.mapping.clone(),
                }),
            },
            NodeKind::Intersection { members } => {
                Shape::Intersection(members.iter().map(|m| self.map(*m)).collect())
            }
            NodeKind::Reference { pointer, target } => {
                let recursive = self.table.is_recursive(pointer);
                if recursive || is_component_pointer(pointer) {
                    Shape::Named {
                        pointer: pointer.clone(),
                        name: pointer_name(pointer),
                        recursive,
                    }
                } else {
                    // Plain reference into some other part of the document.
                    let mut inlined = self.map(*target);
                    inlined.nullable = inlined.nullable || node.nullable;
                    inlined.source = id;
                    if node.default.is_some() {
                        inlined.default.clone_from(&node.default);
                    }
                    return inlined;
                }
            }
            NodeKind::RecursionMarker { pointer, .. } => Shape::Named {
                pointer: pointer.clone(),
                name: pointer_name(pointer),
                recursive: true,
            },
            NodeKind::Any => Shape::Any,
        };

        TypeDescriptor {
            shape,
            nullable: node.nullable,
            default: node.default.clone(),
            constraints: node.constraints.clone(),
            warnings,
            source: id,
        }
    }
}
