//! End-to-end tests: document in, IR and artifacts out.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;

use oapigen::codec::Location;
use oapigen::config::NamingConfig;
use oapigen::resolve::{MergePolicy, NodeKind, Primitive};
use oapigen::types::Shape;
use oapigen::{Document, Error, Generation, GeneratorConfig, Target, generate};

fn run(json: &str, config: &GeneratorConfig) -> Generation {
    let document = Document::from_json(json).expect("Failed to parse document");
    generate(&document, config).expect("Generation failed")
}

fn artifact<'a>(generation: &'a Generation, path: &str) -> &'a str {
    generation
        .artifacts
        .iter()
        .find(|a| a.path == path)
        .map(|a| a.contents.as_str())
        .unwrap_or_else(|| panic!("no artifact {path}"))
}

#[test]
fn test_reserved_field_names_keep_wire_names() {
    let config = GeneratorConfig {
        naming: NamingConfig::with_reserved(&["class", "type", "default"]),
        ..GeneratorConfig::default()
    };
    let generation = run(
        r##"{ "paths": {}, "components": { "schemas": {
  "Widget": { "type": "object", "properties": {
    "class": { "type": "string" }, "type": { "type": "string" }, "default": { "type": "string" }
  } }
} } }"##,
        &config,
    );

    let widget = generation.ir.catalog.iter().next().unwrap();
    let wire: Vec<_> = widget.descriptor.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(wire, ["class", "type", "default"]);

    let idents: Vec<_> = wire
        .iter()
        .map(|name| generation.ir.property_name(&widget.descriptor, name))
        .collect();
    assert_eq!(idents, ["class_", "type_", "default_"]);

    // Interfaces keep the wire names as keys.
    let types = artifact(&generation, "types.ts");
    assert!(types.contains("  class?: string;\n  type?: string;\n  default?: string;\n"));
}

#[test]
fn test_deep_object_query_parameter() {
    let generation = run(
        r##"{ "paths": { "/users": { "get": {
  "operationId": "listUsers",
  "parameters": [ {
    "name": "pagination", "in": "query", "style": "deepObject", "explode": true,
    "schema": { "type": "object", "properties": {
      "page": { "type": "integer" }, "limit": { "type": "integer" }, "cursor": { "type": "string" }
    } }
  } ],
  "responses": { "200": { "description": "ok" } }
} } } }"##,
        &GeneratorConfig::default(),
    );

    let op = generation.ir.operation("listUsers").unwrap();
    let pagination = op.param("pagination", Location::Query).unwrap();
    assert_eq!(
        pagination
            .decode("pagination[page]=2&pagination[limit]=50")
            .unwrap(),
        json!({ "page": 2, "limit": 50 })
    );

    let client = artifact(&generation, "client.ts");
    assert!(client.contains(
        "encodeQuery(\"pagination\", params?.pagination, { style: \"deepObject\", explode: true, kind: \"object\", fields: { page: \"integer\", limit: \"integer\", cursor: \"string\" } })"
    ));
}

#[test]
fn test_nested_deep_object_layout_reaches_client_and_server() {
    let generation = run(
        r##"{ "paths": { "/products": { "get": {
  "operationId": "listProducts",
  "parameters": [ {
    "name": "filter", "in": "query", "style": "deepObject", "explode": true,
    "schema": { "type": "object", "properties": {
      "tags": { "type": "array", "items": { "type": "string" } },
      "range": { "type": "object", "properties": { "from": { "type": "number" }, "to": { "type": "number" } } },
      "active": { "type": "boolean" }
    } }
  } ],
  "responses": { "200": { "description": "ok" } }
} } } }"##,
        &GeneratorConfig::default(),
    );

    let layout = "{ style: \"deepObject\", explode: true, kind: \"object\", fields: { tags: [\"string\"], range: { fields: { from: \"number\", to: \"number\" } }, active: \"boolean\" } }";
    assert!(artifact(&generation, "client.ts").contains(&format!(
        "encodeQuery(\"filter\", params?.filter, {layout})"
    )));
    assert!(artifact(&generation, "server.ts").contains(&format!(
        "decodeQuery(\"filter\", rawQuery(req), {layout})"
    )));

    // A single list item still decodes as a list; nested members keep their types.
    let filter = generation.ir.operations[0].param("filter", Location::Query).unwrap();
    assert_eq!(
        filter.decode("filter[tags]=x&filter[range][from]=1.5&filter[active]=true").unwrap(),
        json!({ "tags": ["x"], "range": { "from": 1.5 }, "active": true })
    );
    assert!(filter.decode("filter[__proto__][polluted]=1").is_err());
}

#[test]
fn test_same_parameter_name_in_two_locations() {
    let generation = run(
        r##"{ "paths": { "/items/{id}": { "get": {
  "operationId": "getItem",
  "parameters": [
    { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
    { "name": "id", "in": "query", "schema": { "type": "integer" } }
  ],
  "responses": { "200": { "description": "ok" } }
} } } }"##,
        &GeneratorConfig::default(),
    );

    let op = &generation.ir.operations[0];
    assert_eq!(generation.ir.param_name(op, Location::Path, "id"), "id");
    assert_eq!(generation.ir.param_name(op, Location::Query, "id"), "id_2");

    let types = artifact(&generation, "types.ts");
    assert!(types.contains("  id: string;\n"));
    assert!(types.contains("  id_2?: number;\n"));

    let client = artifact(&generation, "client.ts");
    assert!(client.contains("encodeValue(\"id\", params.id, { style: \"simple\", explode: false, kind: \"scalar\", type: \"string\" })"));
    assert!(client.contains("encodeQuery(\"id\", params.id_2, { style: \"form\", explode: true, kind: \"scalar\", type: \"integer\" })"));

    let server = artifact(&generation, "server.ts");
    assert!(server.contains("id: decodeValue(\"id\", path?.id, "));
    assert!(server.contains("id_2: decodeQuery(\"id\", rawQuery(req), "));
}

#[test]
fn test_empty_exploded_query_array() {
    let generation = run(
        r##"{ "paths": { "/search": { "get": {
  "operationId": "search",
  "parameters": [ { "name": "tag", "in": "query",
    "schema": { "type": "array", "items": { "type": "string" } } } ],
  "responses": {}
} } } }"##,
        &GeneratorConfig::default(),
    );
    let codec = generation.ir.operations[0].param("tag", Location::Query).unwrap();
    assert!(codec.wire.explode);
    let encoded = codec.encode(&json!([])).unwrap();
    assert_eq!(encoded, "tag=");
    assert_eq!(codec.decode(&encoded).unwrap(), json!([]));
    assert_eq!(codec.decode("other=1").unwrap(), json!(null));
}

#[test]
fn test_exploded_form_cookie_array_is_rejected() {
    let document = Document::from_json(
        r##"{ "paths": { "/a": { "get": {
  "operationId": "a",
  "parameters": [ { "name": "prefs", "in": "cookie", "style": "form",
    "schema": { "type": "array", "items": { "type": "string" } } } ],
  "responses": {}
} } } }"##,
    )
    .unwrap();
    let err = generate(&document, &GeneratorConfig::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedConstruct { ref parameter, .. } if parameter == "prefs"));
}

#[test]
fn test_all_of_merge_policy() {
    let json = r##"{ "paths": {}, "components": { "schemas": {
  "Merged": { "allOf": [
    { "type": "number", "minimum": 0, "required": ["a"] },
    { "type": "string", "minimum": 5, "required": ["b"] },
    { "type": "integer", "minimum": 2, "required": ["c"] }
  ] }
} } }"##;

    let generation = run(json, &GeneratorConfig::default());
    let table = &generation.ir.table;
    let merged = table.node(table.get("#/components/schemas/Merged").unwrap());
    assert_eq!(merged.required, ["a", "b", "c"]);
    assert_eq!(merged.kind, NodeKind::Primitive(Primitive::Integer));

    let strict = GeneratorConfig {
        merge_policy: MergePolicy::StrictestWins,
        ..GeneratorConfig::default()
    };
    let generation = run(json, &strict);
    let table = &generation.ir.table;
    let merged = table.node(table.get("#/components/schemas/Merged").unwrap());
    assert_eq!(merged.required, ["a", "b", "c"]);
}

#[test]
fn test_self_referential_schema() {
    let generation = run(
        r##"{ "paths": {}, "components": { "schemas": {
  "Category": { "type": "object", "properties": {
    "name": { "type": "string" },
    "parentId": { "$ref": "#/components/schemas/Category" }
  } }
} } }"##,
        &GeneratorConfig::default(),
    );

    assert_eq!(generation.ir.table.markers().count(), 1);
    let category = generation.ir.catalog.iter().next().unwrap();
    assert!(category.recursive);
    assert!(matches!(
        category.descriptor.field("parentId").unwrap().ty.shape,
        Shape::Named { recursive: true, .. }
    ));
    assert!(artifact(&generation, "types.ts").contains("  parentId?: Category;\n"));
}

#[test]
fn test_derived_operation_name() {
    let json = r##"{ "paths": { "/users/{userId}": { "get": {
  "parameters": [ { "name": "userId", "in": "path", "required": true, "schema": { "type": "string" } } ],
  "responses": { "200": { "description": "ok" } }
} } } }"##;
    let generation = run(json, &GeneratorConfig::default());
    let op = &generation.ir.operations[0];
    assert_eq!(op.id, "getUsersUserId");
    assert_eq!(generation.ir.function_name(op), "getUsersUserId");
    assert_eq!(generation.ir.params_type_name(op), "GetUsersUserIdParams");
    assert!(artifact(&generation, "client.ts").contains("export const getUsersUserId = async ("));
    assert!(artifact(&generation, "hooks.ts").contains("export function useGetUsersUserId<"));
}

#[test]
fn test_form_array_without_explode() {
    let generation = run(
        r##"{ "paths": { "/search": { "get": {
  "operationId": "search",
  "parameters": [ { "name": "p", "in": "query", "style": "form", "explode": false,
    "schema": { "type": "array", "items": { "type": "string" } } } ],
  "responses": {}
} } } }"##,
        &GeneratorConfig::default(),
    );
    let codec = generation.ir.operations[0].param("p", Location::Query).unwrap();
    let value = json!(["a", "b", "c"]);
    let encoded = codec.encode(&value).unwrap();
    assert_eq!(encoded, "p=a,b,c");
    assert_eq!(codec.decode(&encoded).unwrap(), value);
}

#[test]
fn test_generation_is_deterministic() {
    let json = r##"{
  "paths": {
    "/items/{id}": {
      "get": { "operationId": "getItem",
        "parameters": [ { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } } ],
        "responses": { "200": { "description": "ok", "content": { "application/json": {
          "schema": { "$ref": "#/components/schemas/Item" } } } } } },
      "delete": { "operationId": "get_item",
        "parameters": [ { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } } ],
        "responses": { "204": { "description": "gone" } } }
    }
  },
  "components": { "schemas": {
    "Item": { "type": "object", "properties": { "class": { "type": "string" }, "Class": { "type": "string" } } },
    "item": { "type": "string" }
  } }
}"##;
    let first = run(json, &GeneratorConfig::default());
    for _ in 0..3 {
        let again = run(json, &GeneratorConfig::default());
        assert_eq!(again.artifacts, first.artifacts);
        assert_eq!(again.ir.names.entries(), first.ir.names.entries());
        assert_eq!(again.ir.operations, first.ir.operations);
    }

    // Scope-wide uniqueness.
    let entries = first.ir.names.entries();
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            assert!(
                a.scope != b.scope || a.identifier != b.identifier,
                "{} assigned twice in {}",
                a.identifier,
                a.scope
            );
        }
    }
    let delete = &first.ir.operations[1];
    assert_eq!(first.ir.function_name(delete), "getItem_2");
}

#[test]
fn test_yaml_document() {
    let yaml = r##"
openapi: 3.0.3
info:
  title: Store
  version: "1.0"
paths:
  /orders:
    post:
      operationId: placeOrder
      requestBody:
        required: true
        content:
          application/json:
            schema:
              $ref: "#/components/schemas/Order"
      responses:
        201:
          description: created
          content:
            application/json:
              schema:
                $ref: "#/components/schemas/Order"
components:
  schemas:
    Order:
      type: object
      required: [quantity]
      properties:
        quantity:
          type: integer
          format: int32
        note:
          type: string
          nullable: true
"##;
    let document = Document::from_yaml(yaml).unwrap();
    let generation = generate(&document, &GeneratorConfig::default()).unwrap();

    let types = artifact(&generation, "types.ts");
    assert!(types.contains("export interface Order {\n  quantity: number;\n  note?: string | null;\n}\n"));
    let client = artifact(&generation, "client.ts");
    assert!(client.contains(
        "export const placeOrder = async (data: Order, options?: RequestInit): Promise<{ data: Order }> => {"
    ));
    let hooks = artifact(&generation, "hooks.ts");
    assert!(hooks.contains("UseMutationOptions<{ data: Order }, ApiError, Order>"));
    assert!(artifact(&generation, "server.ts").contains("placeOrder: Handler<Record<string, never>, Order, Order>;"));
}

#[test]
fn test_unknown_format_is_a_warning() {
    let generation = run(
        r##"{ "paths": {}, "components": { "schemas": {
  "Money": { "type": "string", "format": "decimal128" }
} } }"##,
        &GeneratorConfig::default(),
    );
    assert_eq!(generation.warnings.len(), 1);
    assert_eq!(generation.warnings[0].pointer, "#/components/schemas/Money");
    assert!(artifact(&generation, "types.ts").contains("export type Money = string;"));
}

#[test]
fn test_selected_targets_only() {
    let config = GeneratorConfig {
        targets: vec![Target::Types, Target::Server],
        ..GeneratorConfig::default()
    };
    let generation = run(r##"{ "paths": {} }"##, &config);
    let paths: Vec<_> = generation.artifacts.iter().map(|a| a.path.as_str()).collect();
    assert_eq!(paths, ["types.ts", "server.ts", "params.ts"]);
}

#[test]
fn test_errors_abort_the_run() {
    let document = Document::from_json(
        r##"{ "paths": { "/a": { "get": {
  "operationId": "a",
  "parameters": [ { "name": "f", "in": "query", "style": "deepObject",
    "schema": { "type": "array", "items": { "type": "string" } } } ],
  "responses": {}
} } } }"##,
    )
    .unwrap();
    let err = generate(&document, &GeneratorConfig::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedConstruct { ref operation, ref parameter, .. }
        if operation == "a" && parameter == "f"));

    let bad_config = GeneratorConfig {
        targets: vec![Target::ReactQuery],
        ..GeneratorConfig::default()
    };
    let err = generate(&Document::from_json(r#"{ "paths": {} }"#).unwrap(), &bad_config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
