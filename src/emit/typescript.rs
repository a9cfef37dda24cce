//! TypeDescriptor to TypeScript type translation.

use indexmap::IndexSet;

use super::ast::{TsPrimitive, TsProp, TsType, TsTypeDef, TypeDefKind};
use super::utils::{enum_value_to_key, json_to_literal, make_string_record};
use crate::codec::{ParamCodec, WireShape};
use crate::ir::{ApiIr, ContentKind, Operation, Payload};
use crate::types::{Field, NamedType, Scalar, Shape, TypeDescriptor};

/// TypeScript type of a descriptor, nullability included.
pub fn ts_type(ir: &ApiIr, descriptor: &TypeDescriptor) -> TsType {
    let ty = match &descriptor.shape {
        Shape::Scalar(scalar) => scalar_type(*scalar),
        Shape::Object { fields, additional } => {
            let object = TsType::Object(fields.iter().map(|f| field_prop(ir, f)).collect());
            match additional {
                Some(value) if fields.is_empty() => make_string_record(ts_type(ir, value)),
                Some(value) => {
                    TsType::Intersection(vec![object, make_string_record(ts_type(ir, value))])
                }
                None => object,
            }
        }
        Shape::Map(value) => make_string_record(ts_type(ir, value)),
        Shape::Array(items) => TsType::Array(Box::new(ts_type(ir, items))),
        Shape::Enum(values) => {
            let literals: Vec<TsType> = values
                .iter()
                .filter_map(json_to_literal)
                .map(TsType::Literal)
                .collect();
            if literals.is_empty() {
                TsType::unknown()
            } else {
                union_of(literals)
            }
        }
        Shape::Union { members, .. } => union_of(members.iter().map(|m| ts_type(ir, m)).collect()),
        Shape::Intersection(members) => {
            TsType::Intersection(members.iter().map(|m| ts_type(ir, m)).collect())
        }
        Shape::Named { pointer, .. } => TsType::Ref(ir.type_name(pointer)),
        Shape::Any => TsType::unknown(),
    };
    if descriptor.nullable { ty.or_null() } else { ty }
}

fn scalar_type(scalar: Scalar) -> TsType {
    match scalar {
        Scalar::String
        | Scalar::Uuid
        | Scalar::Date
        | Scalar::DateTime
        | Scalar::Email
        | Scalar::Uri
        | Scalar::Byte
        | Scalar::Password => TsType::string(),
        Scalar::Binary => TsType::Ref("Blob".into()),
        Scalar::Integer
        | Scalar::Int32
        | Scalar::Int64
        | Scalar::Number
        | Scalar::Float
        | Scalar::Double => TsType::Primitive(TsPrimitive::Number),
        Scalar::Boolean => TsType::Primitive(TsPrimitive::Boolean),
        Scalar::Null => TsType::Primitive(TsPrimitive::Null),
    }
}

const INT64_NOTE: &str = "int64: values beyond 2^53 lose precision as a JavaScript number.";

/// Note for descriptors whose values may not fit a JavaScript number.
fn precision_note(descriptor: &TypeDescriptor) -> Option<&'static str> {
    match &descriptor.shape {
        Shape::Scalar(Scalar::Int64) => Some(INT64_NOTE),
        Shape::Array(items) => precision_note(items),
        _ => None,
    }
}

fn with_note(doc: Option<String>, note: Option<&str>) -> Option<String> {
    match (doc, note) {
        (Some(text), Some(note)) => Some(format!("{text}\n{note}")),
        (doc, note) => doc.or_else(|| note.map(str::to_string)),
    }
}

fn union_of(mut members: Vec<TsType>) -> TsType {
    members.dedup();
    if members.len() == 1 {
        members.remove(0)
    } else {
        TsType::Union(members)
    }
}

/// Object fields keep their wire names as keys.
fn field_prop(ir: &ApiIr, field: &Field) -> TsProp {
    let mut description = with_note(field.description.clone(), precision_note(&field.ty));
    if field.deprecated {
        description = Some(match description {
            Some(text) => format!("{text}\n@deprecated"),
            None => "@deprecated".to_string(),
        });
    }
    TsProp {
        name: field.name.clone(),
        ty: ts_type(ir, &field.ty),
        optional: !field.optionality.is_required(),
        readonly: field.read_only,
        doc: description,
    }
}

/// Declaration of a named catalog type.
pub fn named_typedef(ir: &ApiIr, named: &NamedType) -> TsTypeDef {
    let name = ir.type_name(&named.pointer);
    let descriptor = &named.descriptor;
    let doc = with_note(
        ir.table.node(descriptor.source).description.clone(),
        precision_note(descriptor),
    );

    let kind = match &descriptor.shape {
        Shape::Object {
            fields,
            additional: None,
        } if !descriptor.nullable => TypeDefKind::Interface {
            properties: fields.iter().map(|f| field_prop(ir, f)).collect(),
        },
        Shape::Enum(values) if !descriptor.nullable && values.iter().all(|v| v.is_string() || v.is_number()) => {
            TypeDefKind::ConstEnum {
                values: values
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| json_to_literal(v).map(|lit| (enum_value_to_key(v, i), lit)))
                    .collect(),
            }
        }
        _ => TypeDefKind::TypeAlias {
            ty: ts_type(ir, descriptor),
        },
    };

    TsTypeDef { name, kind, doc }
}

/// Interface of an operation's parameters, keyed by sanitized variable names.
pub fn params_typedef(ir: &ApiIr, operation: &Operation) -> TsTypeDef {
    let properties = operation
        .parameters
        .iter()
        .map(|param| TsProp {
            name: ir.param_name(operation, param.wire.location, &param.name),
            ty: param_type(ir, param),
            optional: !param.required,
            readonly: false,
            doc: param_doc(param),
        })
        .collect();
    TsTypeDef {
        name: ir.params_type_name(operation),
        kind: TypeDefKind::Interface { properties },
        doc: None,
    }
}

pub fn param_type(ir: &ApiIr, param: &ParamCodec) -> TsType {
    ts_type(ir, &param.descriptor)
}

/// Wire name and format, e.g. ``X-Trace`: header simple (scalar)``.
fn param_doc(param: &ParamCodec) -> Option<String> {
    let mut doc = format!("`{}`: {}", param.name, param.wire.describe());
    if param.wire.media_type.is_some() {
        doc.push_str(", JSON");
    }
    with_note(Some(doc), precision_note(&param.descriptor))
}

/// Type of a payload as the client sees it.
pub fn payload_type(ir: &ApiIr, payload: &Payload) -> TsType {
    match payload.kind {
        ContentKind::Json | ContentKind::UrlEncoded => ts_type(ir, &payload.descriptor),
        ContentKind::FormData => TsType::Ref("FormData".into()),
        ContentKind::Text => TsType::string(),
        ContentKind::Binary => TsType::Ref("Blob".into()),
    }
}

/// The response type the client resolves with (without the `{ data }` wrapper).
pub fn response_type(ir: &ApiIr, operation: &Operation) -> TsType {
    operation
        .success()
        .and_then(|r| r.payload.as_ref())
        .map_or(TsType::Primitive(TsPrimitive::Void), |p| payload_type(ir, p))
}

/// Named types the signatures of `operations` mention, in first-use order.
pub fn referenced_types(ir: &ApiIr, operations: &[&Operation]) -> Vec<String> {
    let mut names = IndexSet::new();
    for operation in operations {
        if !operation.parameters.is_empty() {
            names.insert(ir.params_type_name(operation));
        }
        let mut descriptors: Vec<&TypeDescriptor> = Vec::new();
        let payloads = operation
            .request_body
            .as_ref()
            .map(|b| &b.payload)
            .into_iter()
            .chain(operation.success().and_then(|r| r.payload.as_ref()));
        for payload in payloads {
            if matches!(payload.kind, ContentKind::Json | ContentKind::UrlEncoded) {
                descriptors.push(&payload.descriptor);
            }
        }
        for descriptor in descriptors {
            for pointer in descriptor.references() {
                names.insert(ir.type_name(pointer));
            }
        }
    }
    names.into_iter().collect()
}

/// Runtime scalar hint for the parameter decoder.
pub fn scalar_hint(shape: &WireShape) -> &'static str {
    match shape {
        WireShape::Scalar(Scalar::Boolean) => "boolean",
        WireShape::Scalar(s) if s.is_integer() => "integer",
        WireShape::Scalar(s) if s.is_numeric() => "number",
        _ => "string",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::document::Document;
    use crate::emit::render::Emit;
    use crate::ir::build_ir;
    use crate::resolve::{MergePolicy, resolve};

    fn api(json: &str) -> ApiIr {
        let document = Document::from_json(json).unwrap();
        let table = resolve(&document, MergePolicy::LastWins).unwrap();
        build_ir(&document, table, &GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn test_named_typedefs() {
        let ir = api(r##"{ "paths": {}, "components": { "schemas": {
  "Status": { "type": "string", "enum": ["available", "sold-out"] },
  "Pet": { "type": "object", "description": "A pet", "required": ["id"], "properties": {
    "id": { "type": "integer", "format": "int64", "readOnly": true },
    "tag": { "type": ["string", "null"] },
    "status": { "$ref": "#/components/schemas/Status" },
    "photo": { "type": "string", "format": "binary" }
  } },
  "Labels": { "type": "object", "additionalProperties": { "type": "string" } },
  "Shape": { "oneOf": [ { "$ref": "#/components/schemas/Pet" }, { "type": "null" } ] }
} } }"##);

        let rendered: Vec<String> = ir.catalog.iter().map(|t| named_typedef(&ir, t).emit()).collect();
        assert!(rendered[0].contains("export const Status = {\n  available: \"available\",\n  \"sold-out\": \"sold-out\",\n} as const;"));
        assert_eq!(
            rendered[1],
            "/** A pet */\nexport interface Pet {\n  /** int64: values beyond 2^53 lose precision as a JavaScript number. */\n  readonly id: number;\n  tag?: string | null;\n  status?: Status;\n  photo?: Blob;\n}\n"
        );
        assert_eq!(rendered[2], "export type Labels = Record<string, string>;\n");
        assert!(rendered[3].starts_with("export type Shape = Pet"));
        assert!(rendered[3].contains("null"));
    }

    #[test]
    fn test_int64_precision_is_documented() {
        let ir = api(r##"{ "paths": { "/ledger/{entryId}": { "get": {
  "operationId": "getEntry",
  "parameters": [
    { "name": "entryId", "in": "path", "required": true, "schema": { "type": "integer", "format": "int64" } },
    { "name": "page", "in": "query", "schema": { "type": "integer", "format": "int32" } }
  ],
  "responses": {}
} } }, "components": { "schemas": {
  "Entry": { "type": "object", "properties": {
    "amount": { "type": "integer", "format": "int64", "description": "Minor units" },
    "refs": { "type": "array", "items": { "type": "integer", "format": "int64" } },
    "count": { "type": "integer", "format": "int32" }
  } },
  "Cursor": { "type": "integer", "format": "int64" }
} } }"##);

        let rendered: Vec<String> = ir.catalog.iter().map(|t| named_typedef(&ir, t).emit()).collect();
        assert_eq!(
            rendered[0],
            "export interface Entry {\n  /**\n   * Minor units\n   * int64: values beyond 2^53 lose precision as a JavaScript number.\n   */\n  amount?: number;\n  /** int64: values beyond 2^53 lose precision as a JavaScript number. */\n  refs?: number[];\n  count?: number;\n}\n"
        );
        assert_eq!(
            rendered[1],
            "/** int64: values beyond 2^53 lose precision as a JavaScript number. */\nexport type Cursor = number;\n"
        );

        let params = params_typedef(&ir, &ir.operations[0]).emit();
        assert!(params.contains("   * `entryId`: path simple (scalar)\n   * int64: values beyond 2^53"));
        assert!(params.contains("  /** `page`: query form (exploded scalar) */\n"));
    }

    #[test]
    fn test_recursive_type_is_referenced_by_name() {
        let ir = api(r##"{ "paths": {}, "components": { "schemas": {
  "Node": { "type": "object", "properties": {
    "children": { "type": "array", "items": { "$ref": "#/components/schemas/Node" } }
  } }
} } }"##);
        let node = ir.catalog.iter().next().unwrap();
        assert_eq!(
            named_typedef(&ir, node).emit(),
            "export interface Node {\n  children?: Node[];\n}\n"
        );
    }
}
