//! Schema resolution.
//!
//! Walks the document depth-first, dereferences every `$ref`, flattens `allOf`
//! and turns `oneOf`/`anyOf` into union nodes. Nodes live in one arena and are
//! addressed by [`NodeId`]; references are never followed structurally, so a
//! cyclic schema graph cannot make the walk recurse forever:
//!
//! - Every pointer being resolved sits in an in-progress set.
//! - A `$ref` to an in-progress pointer yields a [`NodeKind::RecursionMarker`]
//!   instead of recursing.
//! - Once the whole document is done every marker is patched with the id of
//!   the node it stands for.
//!
//! Any failure aborts the run; a partial [`ReferenceTable`] is never returned.

mod merge;
mod node;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, trace};

use crate::document::{
    Document, OperationEntry, Schema, escape_pointer_token, local_pointer_path,
};
use crate::error::{Error, Result};

pub use merge::MergePolicy;
pub use node::{
    Additional, Constraints, DiscriminatorInfo, NodeId, NodeKind, Primitive, Property, SchemaNode,
};

/// Pointer of a component schema (`#/components/schemas/<name>`).
pub fn component_pointer(name: &str) -> String {
    format!("#/components/schemas/{}", escape_pointer_token(name))
}

/// Canonical spelling of a local `$ref` (percent-decoding applied).
pub fn canonical_pointer(reference: &str) -> Result<String> {
    Ok(format!("#{}", local_pointer_path(reference)?))
}

/// The resolver's output: the node arena plus the pointer -> node mapping.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    nodes: Vec<SchemaNode>,
    pointers: IndexMap<String, NodeId>,
    components: Vec<String>,
    recursive: IndexSet<String>,
}

impl ReferenceTable {
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    /// Node registered for a pointer.
    pub fn get(&self, pointer: &str) -> Option<NodeId> {
        self.pointers.get(pointer).copied()
    }

    /// Registered pointers, in resolution order.
    pub fn pointers(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.pointers.iter().map(|(p, id)| (p.as_str(), *id))
    }

    /// Component schema pointers in declaration order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SchemaNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every recursion marker node in the arena.
    pub fn markers(&self) -> impl Iterator<Item = (NodeId, &SchemaNode)> {
        self.nodes()
            .filter(|(_, n)| matches!(n.kind, NodeKind::RecursionMarker { .. }))
    }

    /// Pointers that were revisited while in progress, i.e. the entry points of cycles.
    pub fn recursion_targets(&self) -> impl Iterator<Item = &str> {
        self.recursive.iter().map(String::as_str)
    }

    pub fn is_recursive(&self, pointer: &str) -> bool {
        self.recursive.contains(pointer)
    }

    /// Follow references and recursion markers to the node that carries the structure.
    pub fn target(&self, id: NodeId) -> NodeId {
        let mut current = id;
        // A chain longer than the arena would have to revisit a node.
        for _ in 0..=self.nodes.len() {
            match &self.node(current).kind {
                NodeKind::Reference { target, .. }
                | NodeKind::RecursionMarker {
                    target: Some(target),
                    ..
                } => current = *target,
                _ => return current,
            }
        }
        current
    }
}

/// Resolve every schema in the document into a [`ReferenceTable`].
///
/// Component schemas are resolved first, in declaration order, followed by
/// every schema reachable from operations (parameters, request bodies and
/// responses).
pub fn resolve(document: &Document, policy: MergePolicy) -> Result<ReferenceTable> {
    let mut resolver = Resolver::new(document, policy);

    if let Some(components) = document.components() {
        for (name, schema) in &components.schemas {
            let pointer = component_pointer(name);
            resolver.resolve_root(&pointer, schema)?;
            resolver.components.push(pointer);
        }
    }

    for entry in document.operations() {
        resolver.resolve_operation(&entry)?;
    }

    resolver.finish()
}

pub(crate) struct Resolver<'a> {
    document: &'a Document,
    policy: MergePolicy,
    nodes: Vec<SchemaNode>,
    pointers: IndexMap<String, NodeId>,
    components: Vec<String>,
    in_progress: IndexSet<String>,
    recursive: IndexSet<String>,
}

impl<'a> Resolver<'a> {
    fn new(document: &'a Document, policy: MergePolicy) -> Self {
        Self {
            document,
            policy,
            nodes: Vec::new(),
            pointers: IndexMap::new(),
            components: Vec::new(),
            in_progress: IndexSet::new(),
            recursive: IndexSet::new(),
        }
    }

    fn push(&mut self, node: SchemaNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SchemaNode {
        &mut self.nodes[id.0]
    }

    fn resolve_operation(&mut self, entry: &OperationEntry<'_>) -> Result<()> {
        let path_pointer = entry.path_pointer();
        for (i, parameter) in entry.item.parameters.iter().enumerate() {
            self.resolve_parameter(format!("{path_pointer}/parameters/{i}"), parameter)?;
        }

        let op_pointer = entry.pointer();
        for (i, parameter) in entry.operation.parameters.iter().enumerate() {
            self.resolve_parameter(format!("{op_pointer}/parameters/{i}"), parameter)?;
        }

        if let Some(body) = &entry.operation.request_body {
            let (pointer, body) = self
                .document
                .deref_object(format!("{op_pointer}/requestBody"), body)?;
            for (media, content) in &body.content {
                if let Some(schema) = &content.schema {
                    let schema_pointer =
                        format!("{pointer}/content/{}/schema", escape_pointer_token(media));
                    self.resolve_root(&schema_pointer, schema)?;
                }
            }
        }

        for (status, response) in &entry.operation.responses {
            let (pointer, response) = self.document.deref_object(
                format!("{op_pointer}/responses/{}", escape_pointer_token(status)),
                response,
            )?;
            for (media, content) in &response.content {
                if let Some(schema) = &content.schema {
                    let schema_pointer =
                        format!("{pointer}/content/{}/schema", escape_pointer_token(media));
                    self.resolve_root(&schema_pointer, schema)?;
                }
            }
        }

        Ok(())
    }

    fn resolve_parameter(
        &mut self,
        pointer: String,
        parameter: &crate::document::Parameter,
    ) -> Result<()> {
        let (pointer, parameter) = self.document.deref_object(pointer, parameter)?;
        if let Some((schema_pointer, schema)) = parameter.schema_location(&pointer) {
            self.resolve_root(&schema_pointer, schema)?;
        }
        Ok(())
    }

    /// Resolve a schema that is registered under its own pointer.
    fn resolve_root(&mut self, pointer: &str, schema: &Schema) -> Result<NodeId> {
        if let Some(id) = self.pointers.get(pointer) {
            return Ok(*id);
        }

        self.in_progress.insert(pointer.to_string());
        let built = self.build(schema, pointer);
        self.in_progress.shift_remove(pointer);

        let id = built?;
        self.pointers.insert(pointer.to_string(), id);
        Ok(id)
    }

    /// Resolve a `$ref` found at `site`, producing a fresh node for that use site.
    fn resolve_ref(&mut self, reference: &str, site: &str) -> Result<NodeId> {
        let pointer = canonical_pointer(reference)?;

        if let Some(&target) = self.pointers.get(&pointer) {
            return Ok(self.push(SchemaNode::new(
                NodeKind::Reference { pointer, target },
                site,
            )));
        }

        if self.in_progress.contains(&pointer) {
            trace!(pointer = %pointer, site = %site, "Cycle detected, inserting recursion marker.");
            self.recursive.insert(pointer.clone());
            return Ok(self.push(SchemaNode::new(
                NodeKind::RecursionMarker {
                    pointer,
                    target: None,
                },
                site,
            )));
        }

        let schema: Schema = self.document.deref_as(&pointer)?;
        let target = self.resolve_root(&pointer, &schema)?;
        Ok(self.push(SchemaNode::new(
            NodeKind::Reference { pointer, target },
            site,
        )))
    }

    /// Build the node for an inline schema located at `pointer`.
    pub(crate) fn build(&mut self, schema: &Schema, pointer: &str) -> Result<NodeId> {
        if let Some(reference) = &schema.ref_path {
            let id = self.resolve_ref(reference, pointer)?;
            // 3.1 allows annotations next to `$ref`; they apply to this use site only.
            let node = self.node_mut(id);
            node.nullable = node.nullable || schema.is_nullable();
            if schema.default.is_some() {
                node.default.clone_from(&schema.default);
            }
            if schema.description.is_some() {
                node.description.clone_from(&schema.description);
            }
            node.deprecated = node.deprecated || schema.deprecated;
            return Ok(id);
        }

        if let Some(fragments) = &schema.all_of {
            return self.build_all_of(schema, fragments, pointer);
        }

        if schema.one_of.is_some() || schema.any_of.is_some() {
            return self.build_union(schema, pointer);
        }

        if let Some(value) = &schema.const_value {
            let kind = if value.is_null() {
                NodeKind::Primitive(Primitive::Null)
            } else {
                NodeKind::Enum {
                    values: vec![value.clone()],
                }
            };
            return Ok(self.push(SchemaNode::new(kind, pointer).with_annotations(schema)));
        }

        if let Some(values) = &schema.enum_values {
            let has_null = values.iter().any(serde_json::Value::is_null);
            let values = values.iter().filter(|v| !v.is_null()).cloned().collect();
            let mut node = SchemaNode::new(NodeKind::Enum { values }, pointer).with_annotations(schema);
            node.nullable = node.nullable || has_null;
            return Ok(self.push(node));
        }

        let types: Vec<&str> = schema
            .type_names()
            .into_iter()
            .filter(|t| *t != "null")
            .collect();

        match types.as_slice() {
            [] => {
                let kind = if schema.properties.is_some()
                    || schema.additional_properties.is_some()
                    || !schema.required.is_empty()
                {
                    self.build_object(schema, pointer)?
                } else if let Some(items) = &schema.items {
                    NodeKind::Array {
                        items: Some(self.build(items, &format!("{pointer}/items"))?),
                    }
                } else if schema.is_null_type() {
                    NodeKind::Primitive(Primitive::Null)
                } else {
                    NodeKind::Any
                };
                Ok(self.push(SchemaNode::new(kind, pointer).with_annotations(schema)))
            }
            [single] => {
                let kind = self.build_typed(schema, single, pointer)?;
                Ok(self.push(SchemaNode::new(kind, pointer).with_annotations(schema)))
            }
            many => {
                // `type: [string, integer]` is an untagged union of the listed types.
                let mut members = Vec::with_capacity(many.len());
                for type_name in many {
                    let kind = self.build_typed(schema, type_name, pointer)?;
                    let mut member = SchemaNode::new(kind, pointer).with_annotations(schema);
                    member.nullable = false;
                    member.default = None;
                    members.push(self.push(member));
                }
                let mut node = SchemaNode::new(
                    NodeKind::Union {
                        members,
                        exclusive: false,
                        discriminator: None,
                    },
                    pointer,
                )
                .with_annotations(schema);
                node.format = None;
                Ok(self.push(node))
            }
        }
    }

    fn build_typed(&mut self, schema: &Schema, type_name: &str, pointer: &str) -> Result<NodeKind> {
        match type_name {
            "object" => self.build_object(schema, pointer),
            "array" => {
                let items = match &schema.items {
                    Some(items) => Some(self.build(items, &format!("{pointer}/items"))?),
                    None => None,
                };
                Ok(NodeKind::Array { items })
            }
            other => Primitive::from_type_name(other)
                .map(NodeKind::Primitive)
                .ok_or_else(|| Error::resolution(pointer, format!("unknown type '{other}'"))),
        }
    }

    fn build_object(&mut self, schema: &Schema, pointer: &str) -> Result<NodeKind> {
        let mut properties = Vec::new();
        if let Some(declared) = &schema.properties {
            for (name, property) in declared {
                let property_pointer =
                    format!("{pointer}/properties/{}", escape_pointer_token(name));
                let node = self.build(property, &property_pointer)?;
                properties.push(Property {
                    name: name.clone(),
                    node,
                    required: schema.required.contains(name),
                });
            }
        }

        let additional = match &schema.additional_properties {
            None => None,
            Some(crate::document::AdditionalProperties::Bool(true)) => Some(Additional::Any),
            Some(crate::document::AdditionalProperties::Bool(false)) => Some(Additional::Forbidden),
            Some(crate::document::AdditionalProperties::Schema(value)) => Some(Additional::Schema(
                self.build(value, &format!("{pointer}/additionalProperties"))?,
            )),
        };

        Ok(NodeKind::Object {
            properties,
            additional,
        })
    }

    fn build_union(&mut self, schema: &Schema, pointer: &str) -> Result<NodeId> {
        let (branches, keyword, exclusive) = match (&schema.one_of, &schema.any_of) {
            (Some(one_of), _) => (one_of, "oneOf", true),
            (None, Some(any_of)) => (any_of, "anyOf", false),
            (None, None) => return Err(Error::resolution(pointer, "expected oneOf or anyOf")),
        };
        if branches.is_empty() {
            return Err(Error::resolution(
                pointer,
                format!("{keyword} must list at least one schema"),
            ));
        }

        let mut nullable = schema.is_nullable();
        let mut members = Vec::with_capacity(branches.len());
        for (i, branch) in branches.iter().enumerate() {
            if branch.is_null_type() {
                nullable = true;
                continue;
            }
            members.push(self.build(branch, &format!("{pointer}/{keyword}/{i}"))?);
        }

        let discriminator = schema.discriminator.as_ref().map(|d| DiscriminatorInfo {
            property: d.property_name.clone(),
            mapping: d.mapping.clone(),
        });

        let union = match members.as_slice() {
            [] => {
                let mut node =
                    SchemaNode::new(NodeKind::Primitive(Primitive::Null), pointer).with_annotations(schema);
                node.nullable = true;
                self.push(node)
            }
            // `anyOf: [X, {type: null}]` is just a nullable X; the member node is
            // private to this use site so it can carry the flag.
            [single] if discriminator.is_none() => {
                let single = *single;
                let node = self.node_mut(single);
                node.nullable = node.nullable || nullable;
                if schema.default.is_some() {
                    node.default.clone_from(&schema.default);
                }
                if schema.description.is_some() {
                    node.description.clone_from(&schema.description);
                }
                single
            }
            _ => {
                let mut node = SchemaNode::new(
                    NodeKind::Union {
                        members,
                        exclusive,
                        discriminator,
                    },
                    pointer,
                )
                .with_annotations(schema);
                node.nullable = nullable;
                self.push(node)
            }
        };

        if schema.properties.is_none() {
            return Ok(union);
        }

        // Shared properties declared next to the union: `{ common } & (A | B)`.
        let object = self.build_object(schema, pointer)?;
        let mut object_node = SchemaNode::new(object, pointer);
        object_node.required.clone_from(&schema.required);
        let object_id = self.push(object_node);
        Ok(self.push(SchemaNode::new(
            NodeKind::Intersection {
                members: vec![object_id, union],
            },
            pointer,
        )))
    }

    /// Follow references to a node whose structure is complete.
    ///
    /// A recursion marker here means the caller needs the content of a schema
    /// that is still being resolved.
    fn completed_target(&self, id: NodeId, site: &str) -> Result<NodeId> {
        let mut current = id;
        loop {
            match &self.nodes[current.0].kind {
                NodeKind::Reference { target, .. } => current = *target,
                NodeKind::RecursionMarker { pointer, .. } => {
                    return Err(Error::resolution(
                        site,
                        format!("allOf cannot extend '{pointer}' while it is still being resolved"),
                    ));
                }
                _ => return Ok(current),
            }
        }
    }

    fn finish(self) -> Result<ReferenceTable> {
        let Resolver {
            mut nodes,
            pointers,
            components,
            recursive,
            ..
        } = self;

        for node in &mut nodes {
            if let NodeKind::RecursionMarker { pointer, target } = &mut node.kind {
                let Some(&completed) = pointers.get(pointer.as_str()) else {
                    return Err(Error::resolution(
                        pointer.clone(),
                        "recursion marker has no completed schema",
                    ));
                };
                *target = Some(completed);
            }
        }

        debug!(
            nodes = nodes.len(),
            pointers = pointers.len(),
            cycles = recursive.len(),
            "Schema resolution complete."
        );

        Ok(ReferenceTable {
            nodes,
            pointers,
            components,
            recursive,
        })
    }
}
