//! `allOf` flattening.

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use tracing::trace;

use super::node::{Additional, Constraints, NodeId, NodeKind, Property, SchemaNode};
use super::Resolver;
use crate::document::Schema;
use crate::error::Result;

/// How conflicting scalar keywords of `allOf` fragments are reconciled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// The later fragment's value wins, `type` included. Fragments that
    /// leave `nullable` unset do not reset it.
    #[default]
    LastWins,
    /// Numeric and length bounds keep the tightest value; `nullable` only
    /// survives if every fragment is nullable.
    StrictestWins,
}

impl MergePolicy {
    fn merge_constraints(self, acc: &mut Constraints, next: &Constraints) {
        match self {
            MergePolicy::LastWins => {
                overwrite(&mut acc.minimum, next.minimum);
                overwrite(&mut acc.maximum, next.maximum);
                overwrite(&mut acc.exclusive_minimum, next.exclusive_minimum);
                overwrite(&mut acc.exclusive_maximum, next.exclusive_maximum);
                overwrite(&mut acc.multiple_of, next.multiple_of);
                overwrite(&mut acc.min_length, next.min_length);
                overwrite(&mut acc.max_length, next.max_length);
                overwrite(&mut acc.min_items, next.min_items);
                overwrite(&mut acc.max_items, next.max_items);
            }
            MergePolicy::StrictestWins => {
                acc.minimum = tightest(acc.minimum, next.minimum, f64::max);
                acc.maximum = tightest(acc.maximum, next.maximum, f64::min);
                acc.exclusive_minimum =
                    tightest(acc.exclusive_minimum, next.exclusive_minimum, f64::max);
                acc.exclusive_maximum =
                    tightest(acc.exclusive_maximum, next.exclusive_maximum, f64::min);
                overwrite(&mut acc.multiple_of, next.multiple_of);
                acc.min_length = tightest(acc.min_length, next.min_length, u64::max);
                acc.max_length = tightest(acc.max_length, next.max_length, u64::min);
                acc.min_items = tightest(acc.min_items, next.min_items, u64::max);
                acc.max_items = tightest(acc.max_items, next.max_items, u64::min);
            }
        }
        if next.pattern.is_some() {
            acc.pattern.clone_from(&next.pattern);
        }
        acc.unique_items = acc.unique_items || next.unique_items;
    }

    /// `fragments` holds each fragment's stated nullability, `None` when unset.
    fn merge_nullable(self, fragments: &[Option<bool>]) -> bool {
        match self {
            MergePolicy::LastWins => fragments.iter().rev().find_map(|n| *n).unwrap_or(false),
            MergePolicy::StrictestWins => {
                !fragments.is_empty() && fragments.iter().all(|n| *n == Some(true))
            }
        }
    }
}

fn overwrite<T: Copy>(acc: &mut Option<T>, next: Option<T>) {
    if next.is_some() {
        *acc = next;
    }
}

fn tightest<T: Copy>(a: Option<T>, b: Option<T>, pick: impl Fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => b.or(a),
    }
}

/// Keywords next to `allOf` that contribute structure and therefore act as
/// one more fragment.
fn has_structural_siblings(schema: &Schema) -> bool {
    schema.schema_type.is_some()
        || schema.properties.is_some()
        || schema.additional_properties.is_some()
        || !schema.required.is_empty()
        || schema.items.is_some()
        || schema.one_of.is_some()
        || schema.any_of.is_some()
        || schema.enum_values.is_some()
        || schema.const_value.is_some()
        || !Constraints::from_schema(schema).is_empty()
}

impl Resolver<'_> {
    pub(super) fn build_all_of(
        &mut self,
        schema: &Schema,
        fragments: &[Schema],
        pointer: &str,
    ) -> Result<NodeId> {
        let mut members = Vec::with_capacity(fragments.len() + 1);
        let mut stated = Vec::with_capacity(fragments.len() + 1);
        for (i, fragment) in fragments.iter().enumerate() {
            members.push(self.build(fragment, &format!("{pointer}/allOf/{i}"))?);
            stated.push(fragment.nullable);
        }
        if has_structural_siblings(schema) {
            let siblings = Schema {
                all_of: None,
                ..schema.clone()
            };
            members.push(self.build(&siblings, pointer)?);
            stated.push(siblings.nullable);
        }

        let mut targets = Vec::with_capacity(members.len());
        for member in &members {
            targets.push(self.completed_target(*member, pointer)?);
        }

        let mut required: IndexSet<String> = IndexSet::new();
        let mut nullable = Vec::with_capacity(members.len());
        for ((member, target), stated) in members.iter().zip(&targets).zip(&stated) {
            required.extend(self.nodes[target.0].required.iter().cloned());
            let resolved = self.nodes[member.0].nullable || self.nodes[target.0].nullable;
            nullable.push(if resolved { Some(true) } else { *stated });
        }

        let keeps_intersection = targets.iter().any(|t| {
            matches!(
                self.nodes[t.0].kind,
                NodeKind::Union { .. } | NodeKind::Intersection { .. }
            )
        });

        let mut node = if keeps_intersection {
            trace!(pointer = %pointer, "allOf contains a union, keeping an intersection.");
            SchemaNode::new(NodeKind::Intersection { members }, pointer)
        } else {
            self.absorb(&targets, &required, pointer)
        };

        node.required = required.into_iter().collect();
        node.nullable = self.policy.merge_nullable(&nullable) || schema.is_nullable();
        if schema.format.is_some() {
            node.format.clone_from(&schema.format);
        }
        if schema.title.is_some() {
            node.title.clone_from(&schema.title);
        }
        if schema.description.is_some() {
            node.description.clone_from(&schema.description);
        }
        if schema.default.is_some() {
            node.default.clone_from(&schema.default);
        }
        node.deprecated = node.deprecated || schema.deprecated;
        node.read_only = node.read_only || schema.read_only;
        node.write_only = node.write_only || schema.write_only;

        Ok(self.push(node))
    }

    /// Fold the fragments' content into one node.
    fn absorb(&self, targets: &[NodeId], required: &IndexSet<String>, pointer: &str) -> SchemaNode {
        let mut properties: IndexMap<String, NodeId> = IndexMap::new();
        let mut additional: Option<Additional> = None;
        let mut kind: Option<NodeKind> = None;
        let mut merged = SchemaNode::new(NodeKind::Any, pointer);

        for target in targets {
            let fragment = &self.nodes[target.0];
            self.policy
                .merge_constraints(&mut merged.constraints, &fragment.constraints);
            if fragment.format.is_some() {
                merged.format.clone_from(&fragment.format);
            }
            if fragment.title.is_some() {
                merged.title.clone_from(&fragment.title);
            }
            if fragment.description.is_some() {
                merged.description.clone_from(&fragment.description);
            }
            if fragment.default.is_some() {
                merged.default.clone_from(&fragment.default);
            }
            merged.deprecated = merged.deprecated || fragment.deprecated;
            merged.read_only = merged.read_only || fragment.read_only;
            merged.write_only = merged.write_only || fragment.write_only;

            match &fragment.kind {
                NodeKind::Object {
                    properties: declared,
                    additional: extra,
                } => {
                    // A redeclared property keeps its first position.
                    for property in declared {
                        properties.insert(property.name.clone(), property.node);
                    }
                    if extra.is_some() {
                        additional = *extra;
                    }
                    kind = None;
                }
                NodeKind::Any => {}
                other => kind = Some(other.clone()),
            }
        }

        merged.kind = match kind {
            Some(kind) => kind,
            None if properties.is_empty() && additional.is_none() && required.is_empty() => {
                NodeKind::Any
            }
            None => NodeKind::Object {
                properties: properties
                    .into_iter()
                    .map(|(name, node)| Property {
                        required: required.contains(&name),
                        name,
                        node,
                    })
                    .collect(),
                additional,
            },
        };
        merged
    }
}
