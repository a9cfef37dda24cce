//! Operation model and IR assembly.
//!
//! [`build_ir`] runs after the resolver: it maps the type catalog, merges and
//! validates every operation's parameters into [`ParamCodec`]s, maps request
//! and response payloads, and assigns every identifier the emitters will
//! print. The result is read-only from here on.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::codec::{Location, ParamCodec, Parameter, build_codec};
use crate::config::GeneratorConfig;
use crate::document::{Document, HttpMethod, MediaType, OperationEntry, escape_pointer_token};
use crate::error::{Error, Result, Warning};
use crate::naming::{NameTable, Scope, derive_operation_name};
use crate::resolve::{NodeId, ReferenceTable};
use crate::types::{TypeCatalog, TypeDescriptor, map_catalog, map_type};

/// One piece of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Literal(String),
    /// Wire name of a path parameter.
    Param(String),
}

/// `/users/{userId}/posts` split into literal text and parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    pub raw: String,
    pub segments: Vec<PathSegment>,
}

impl PathTemplate {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = raw;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            literal.push_str(&rest[..open]);
            if !literal.is_empty() {
                segments.push(PathSegment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(PathSegment::Param(rest[open + 1..open + close].to_string()));
            rest = &rest[open + close + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(PathSegment::Literal(literal));
        }

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// Parameter names in template order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            PathSegment::Param(name) => Some(name.as_str()),
            PathSegment::Literal(_) => None,
        })
    }
}

/// How a payload travels, derived from its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Json,
    FormData,
    UrlEncoded,
    Text,
    Binary,
}

impl ContentKind {
    pub fn from_media_type(media_type: &str) -> Self {
        let essence = media_type.split(';').next().unwrap_or(media_type).trim();
        if essence == "application/json" || essence.ends_with("+json") {
            ContentKind::Json
        } else if essence == "multipart/form-data" {
            ContentKind::FormData
        } else if essence == "application/x-www-form-urlencoded" {
            ContentKind::UrlEncoded
        } else if essence.starts_with("text/") || essence == "application/xml" || essence.ends_with("+xml") {
            ContentKind::Text
        } else {
            ContentKind::Binary
        }
    }
}

/// A request or response body with a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub media_type: String,
    pub kind: ContentKind,
    pub node: NodeId,
    pub descriptor: TypeDescriptor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestBody {
    pub payload: Payload,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code as declared (`200`, `2XX`, `default`).
    pub status: String,
    pub description: Option<String>,
    /// `None` for responses without content (e.g. `204`).
    pub payload: Option<Payload>,
}

/// A normalized HTTP operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Pointer of the operation object; keys its names in the [`NameTable`].
    pub key: String,
    /// Declared `operationId`, or one derived from method and path.
    pub id: String,
    pub method: HttpMethod,
    pub path: PathTemplate,
    /// Path-level parameters merged with operation-level ones, in declaration order.
    pub parameters: Vec<ParamCodec>,
    pub request_body: Option<RequestBody>,
    pub responses: Vec<Response>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
}

/// Success statuses in order of preference.
const SUCCESS_STATUSES: [&str; 8] = ["200", "201", "202", "203", "206", "207", "2XX", "default"];

impl Operation {
    pub fn is_query(&self) -> bool {
        self.method.is_query()
    }

    /// Safe and bodiless: the client caches it under a key.
    pub fn is_cacheable(&self) -> bool {
        self.is_query() && self.request_body.is_none()
    }

    /// The response whose payload the client hands back.
    pub fn success(&self) -> Option<&Response> {
        SUCCESS_STATUSES.iter().find_map(|status| {
            self.responses
                .iter()
                .find(|r| r.status == *status && r.payload.is_some())
        })
    }

    /// A `204` is declared, so the client may get no body at all.
    pub fn may_be_empty(&self) -> bool {
        self.responses.iter().any(|r| r.status == "204")
    }

    pub fn params_in(&self, location: Location) -> impl Iterator<Item = &ParamCodec> {
        self.parameters
            .iter()
            .filter(move |p| p.wire.location == location)
    }

    pub fn param(&self, name: &str, location: Location) -> Option<&ParamCodec> {
        self.params_in(location).find(|p| p.name == name)
    }

    /// Key of the params interface name in the schema-type scope.
    pub fn params_type_key(&self) -> String {
        format!("{}/parameters", self.key)
    }
}

/// Everything the emitters read.
#[derive(Debug, Clone)]
pub struct ApiIr {
    pub title: Option<String>,
    pub table: ReferenceTable,
    pub catalog: TypeCatalog,
    pub operations: Vec<Operation>,
    pub names: NameTable,
    /// `components.securitySchemes`, passed through untouched.
    pub security_schemes: Option<Value>,
}

impl ApiIr {
    /// Identifier of the named type at `pointer`.
    pub fn type_name(&self, pointer: &str) -> String {
        self.name(&Scope::schema_types(), pointer)
    }

    pub fn function_name(&self, operation: &Operation) -> String {
        self.name(&Scope::operations(), &operation.key)
    }

    pub fn cache_key_name(&self, operation: &Operation) -> String {
        self.name(&Scope::cache_keys(), &operation.key)
    }

    pub fn params_type_name(&self, operation: &Operation) -> String {
        self.name(&Scope::schema_types(), &operation.params_type_key())
    }

    /// Variable name of the `location` parameter `wire_name` of `operation`.
    pub fn param_name(&self, operation: &Operation, location: Location, wire_name: &str) -> String {
        self.name(
            &Scope::parameters(operation.key.clone()),
            &param_key(location, wire_name),
        )
    }

    /// Identifier of field `wire_name` of the object mapped from `object`.
    pub fn property_name(&self, object: &TypeDescriptor, wire_name: &str) -> String {
        let owner = self.table.node(object.source).pointer.clone();
        self.name(&Scope::properties(owner), wire_name)
    }

    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.id == id)
    }

    /// Warnings of every mapped descriptor, catalog first.
    pub fn warnings(&self) -> Vec<Warning> {
        let mut warnings = self.catalog.warnings();
        for operation in &self.operations {
            for descriptor in operation_descriptors(operation) {
                for warning in descriptor.all_warnings() {
                    if !warnings.contains(&warning) {
                        warnings.push(warning);
                    }
                }
            }
        }
        warnings
    }

    fn name(&self, scope: &Scope, key: &str) -> String {
        self.names
            .get(scope, key)
            .map_or_else(|| key.to_string(), |e| e.identifier.clone())
    }
}

/// Parameters are unique per (location, name), not per name.
fn param_key(location: Location, wire_name: &str) -> String {
    format!("{location}:{wire_name}")
}

/// Assemble the IR of `document` from its resolved reference table.
pub fn build_ir(document: &Document, table: ReferenceTable, config: &GeneratorConfig) -> Result<ApiIr> {
    let catalog = map_catalog(&table);

    let mut operations = Vec::new();
    for entry in document.operations() {
        operations.push(build_operation(document, &table, &entry)?);
    }

    let names = assign_names(&table, &catalog, &operations, config);
    debug!(
        types = catalog.len(),
        operations = operations.len(),
        names = names.len(),
        "IR assembled."
    );

    Ok(ApiIr {
        title: document.title().map(str::to_string),
        security_schemes: document.security_schemes().cloned(),
        table,
        catalog,
        operations,
        names,
    })
}

fn build_operation(document: &Document, table: &ReferenceTable, entry: &OperationEntry<'_>) -> Result<Operation> {
    let key = entry.pointer();
    let id = entry
        .operation
        .operation_id
        .clone()
        .unwrap_or_else(|| derive_operation_name(entry.method, entry.path));
    let path = PathTemplate::parse(entry.path);

    let path_pointer = entry.path_pointer();
    let path_level = collect_parameters(document, &id, &path_pointer, &entry.item.parameters)?;
    let op_level = collect_parameters(document, &id, &key, &entry.operation.parameters)?;
    let merged = merge_parameters(path_level, op_level);

    let declared_path_params: Vec<&str> = merged
        .iter()
        .filter(|(p, _)| p.parameter.location == Location::Path)
        .map(|(p, _)| p.parameter.name.as_str())
        .collect();
    for name in path.params() {
        if !declared_path_params.contains(&name) {
            return Err(Error::unsupported(
                &id,
                name,
                "path template parameter has no declaration",
            ));
        }
    }
    for name in &declared_path_params {
        if !path.params().any(|p| p == *name) {
            return Err(Error::unsupported(
                &id,
                *name,
                "path parameter does not appear in the path template",
            ));
        }
    }

    let mut parameters = Vec::with_capacity(merged.len());
    for (parameter, pointer) in &merged {
        let parameter = Parameter {
            schema: match &parameter.schema_pointer {
                Some(schema_pointer) => Some(table.get(schema_pointer).ok_or_else(|| {
                    Error::resolution(schema_pointer.as_str(), "parameter schema was not resolved")
                })?),
                None => None,
            },
            ..parameter.parameter.clone()
        };
        trace!(operation = %id, parameter = %parameter.name, pointer = %pointer, "Building codec.");
        parameters.push(build_codec(&id, &parameter, table)?);
    }

    let request_body = match &entry.operation.request_body {
        Some(body) => {
            let (pointer, body) = document.deref_object(format!("{key}/requestBody"), body)?;
            payload(table, &pointer, &body.content)?.map(|payload| RequestBody {
                payload,
                required: body.required,
            })
        }
        None => None,
    };

    let mut responses = Vec::with_capacity(entry.operation.responses.len());
    for (status, response) in &entry.operation.responses {
        let (pointer, response) = document.deref_object(
            format!("{key}/responses/{}", escape_pointer_token(status)),
            response,
        )?;
        responses.push(Response {
            status: status.clone(),
            payload: payload(table, &pointer, &response.content)?,
            description: response.description,
        });
    }

    Ok(Operation {
        key,
        id,
        method: entry.method,
        path,
        parameters,
        request_body,
        responses,
        summary: entry.operation.summary.clone(),
        description: entry.operation.description.clone(),
        tags: entry.operation.tags.clone(),
        deprecated: entry.operation.deprecated,
    })
}

/// A dereferenced parameter whose schema has not been looked up yet.
#[derive(Debug, Clone)]
struct Declared {
    parameter: Parameter,
    schema_pointer: Option<String>,
}

fn collect_parameters(
    document: &Document,
    operation: &str,
    owner: &str,
    declared: &[crate::document::Parameter],
) -> Result<Vec<(Declared, String)>> {
    let mut out: Vec<(Declared, String)> = Vec::with_capacity(declared.len());
    for (i, parameter) in declared.iter().enumerate() {
        let (pointer, parameter) =
            document.deref_object(format!("{owner}/parameters/{i}"), parameter)?;
        let location = Location::parse(&parameter.location).ok_or_else(|| {
            Error::unsupported(
                operation,
                &parameter.name,
                format!("unknown parameter location '{}'", parameter.location),
            )
        })?;
        if out
            .iter()
            .any(|(d, _)| d.parameter.name == parameter.name && d.parameter.location == location)
        {
            return Err(Error::unsupported(
                operation,
                &parameter.name,
                format!("declared twice as a {location} parameter"),
            ));
        }

        let media_type = match (&parameter.schema, &parameter.content) {
            (None, Some(content)) => content.keys().next().cloned(),
            _ => None,
        };
        let schema_pointer = parameter.schema_location(&pointer).map(|(p, _)| p);

        out.push((
            Declared {
                parameter: Parameter {
                    name: parameter.name.clone(),
                    location,
                    style: parameter.style.clone(),
                    explode: parameter.explode,
                    // Path parameters are always required.
                    required: parameter.required || location == Location::Path,
                    deprecated: parameter.deprecated,
                    description: parameter.description.clone(),
                    schema: None,
                    media_type,
                },
                schema_pointer,
            },
            pointer,
        ));
    }
    Ok(out)
}

/// Operation-level parameters replace path-level ones with the same name and
/// location in place; new ones are appended.
fn merge_parameters(
    mut path_level: Vec<(Declared, String)>,
    op_level: Vec<(Declared, String)>,
) -> Vec<(Declared, String)> {
    for (parameter, pointer) in op_level {
        let existing = path_level.iter_mut().find(|(d, _)| {
            d.parameter.name == parameter.parameter.name
                && d.parameter.location == parameter.parameter.location
        });
        match existing {
            Some(slot) => *slot = (parameter, pointer),
            None => path_level.push((parameter, pointer)),
        }
    }
    path_level
}

/// Pick the payload of a content map: JSON first, then the first media type
/// with a schema.
fn payload(table: &ReferenceTable, owner: &str, content: &IndexMap<String, MediaType>) -> Result<Option<Payload>> {
    let chosen = content
        .iter()
        .filter(|(_, mt)| mt.schema.is_some())
        .min_by_key(|(media, _)| ContentKind::from_media_type(media) != ContentKind::Json);
    let Some((media_type, _)) = chosen else {
        return Ok(None);
    };

    let pointer = format!("{owner}/content/{}/schema", escape_pointer_token(media_type));
    let node = table
        .get(&pointer)
        .ok_or_else(|| Error::resolution(pointer.as_str(), "payload schema was not resolved"))?;
    Ok(Some(Payload {
        kind: ContentKind::from_media_type(media_type),
        media_type: media_type.clone(),
        descriptor: map_type(table, node),
        node,
    }))
}

fn operation_descriptors(operation: &Operation) -> Vec<&TypeDescriptor> {
    let mut out: Vec<&TypeDescriptor> = operation.parameters.iter().map(|p| &p.descriptor).collect();
    if let Some(body) = &operation.request_body {
        out.push(&body.payload.descriptor);
    }
    out.extend(
        operation
            .responses
            .iter()
            .filter_map(|r| r.payload.as_ref().map(|p| &p.descriptor)),
    );
    out
}

/// Assign identifiers in a fixed order: schema types, then per operation its
/// function, cache key (cacheable operations only), params interface and
/// parameter variables, then the fields of every object.
fn assign_names(
    table: &ReferenceTable,
    catalog: &TypeCatalog,
    operations: &[Operation],
    config: &GeneratorConfig,
) -> NameTable {
    let naming = &config.naming;
    let mut names = NameTable::new();

    for named in catalog.iter() {
        names.assign_keyed(&Scope::schema_types(), &named.pointer, &named.name, naming);
    }

    for operation in operations {
        let function = names
            .assign_keyed(&Scope::operations(), &operation.key, &operation.id, naming)
            .identifier
            .clone();
        if operation.is_cacheable() {
            names.assign_keyed(
                &Scope::cache_keys(),
                &operation.key,
                &format!("{function}Key"),
                naming,
            );
        }
        if !operation.parameters.is_empty() {
            names.assign_keyed(
                &Scope::schema_types(),
                &operation.params_type_key(),
                &format!("{function}Params"),
                naming,
            );
        }
        let scope = Scope::parameters(operation.key.clone());
        for parameter in &operation.parameters {
            names.assign_keyed(
                &scope,
                &param_key(parameter.wire.location, &parameter.name),
                &parameter.name,
                naming,
            );
        }
    }

    let descriptors = catalog
        .iter()
        .map(|t| &t.descriptor)
        .chain(operations.iter().flat_map(operation_descriptors));
    for descriptor in descriptors {
        for object in descriptor.objects() {
            let scope = Scope::properties(table.node(object.source).pointer.clone());
            for field in object.fields() {
                names.assign(&scope, &field.name, naming);
            }
        }
    }

    names
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::codec::Style;
    use crate::resolve::{MergePolicy, resolve};

    fn ir(json: &str) -> Result<ApiIr> {
        let document = Document::from_json(json).unwrap();
        let table = resolve(&document, MergePolicy::LastWins)?;
        build_ir(&document, table, &GeneratorConfig::default())
    }

    #[test]
    fn test_path_template() {
        let template = PathTemplate::parse("/users/{userId}/posts/{post-id}.json");
        assert_eq!(
            template.segments,
            vec![
                PathSegment::Literal("/users/".into()),
                PathSegment::Param("userId".into()),
                PathSegment::Literal("/posts/".into()),
                PathSegment::Param("post-id".into()),
                PathSegment::Literal(".json".into()),
            ]
        );
        assert_eq!(template.params().collect::<Vec<_>>(), ["userId", "post-id"]);

        let unterminated = PathTemplate::parse("/a/{b");
        assert_eq!(unterminated.segments, vec![PathSegment::Literal("/a/{b".into())]);
    }

    #[test]
    fn test_content_kind() {
        assert_eq!(ContentKind::from_media_type("application/json"), ContentKind::Json);
        assert_eq!(
            ContentKind::from_media_type("application/problem+json; charset=utf-8"),
            ContentKind::Json
        );
        assert_eq!(ContentKind::from_media_type("text/csv"), ContentKind::Text);
        assert_eq!(ContentKind::from_media_type("multipart/form-data"), ContentKind::FormData);
        assert_eq!(ContentKind::from_media_type("image/png"), ContentKind::Binary);
    }

    #[test]
    fn test_operation_level_parameter_wins() {
        let api = ir(r##"{ "paths": { "/items/{id}": {
  "parameters": [
    { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } },
    { "name": "limit", "in": "query", "schema": { "type": "integer" } }
  ],
  "get": {
    "operationId": "getItem",
    "parameters": [
      { "name": "limit", "in": "query", "schema": { "type": "integer", "format": "int32" } },
      { "name": "X-Trace", "in": "header", "schema": { "type": "string" } }
    ],
    "responses": { "200": { "description": "ok" } }
  }
} } }"##)
        .unwrap();

        let op = api.operation("getItem").unwrap();
        let names: Vec<_> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "limit", "X-Trace"]);
        let limit = op.param("limit", Location::Query).unwrap();
        assert_eq!(limit.descriptor.scalar(), Some(crate::types::Scalar::Int32));
        assert_eq!(limit.wire.style, Style::Form);
        assert!(op.param("id", Location::Path).unwrap().required);
    }

    #[test]
    fn test_parameter_ref_is_followed() {
        let api = ir(r##"{
  "paths": { "/pets": { "get": {
    "parameters": [ { "$ref": "#/components/parameters/Limit" } ],
    "responses": {}
  } } },
  "components": { "parameters": {
    "Limit": { "name": "limit", "in": "query", "schema": { "type": "integer" } }
  } }
}"##)
        .unwrap();

        let op = &api.operations[0];
        assert_eq!(op.id, "getPets");
        assert_eq!(op.parameters[0].name, "limit");
        assert_eq!(api.params_type_name(op), "GetPetsParams");
        assert_eq!(api.param_name(op, Location::Query, "limit"), "limit");
    }

    #[test]
    fn test_undeclared_path_parameter() {
        let err = ir(r##"{ "paths": { "/items/{id}": { "get": { "responses": {} } } } }"##).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedConstruct { ref parameter, .. } if parameter == "id"
        ));
    }

    #[test]
    fn test_unknown_location() {
        let err = ir(r##"{ "paths": { "/items": { "get": {
  "operationId": "list",
  "parameters": [ { "name": "q", "in": "body", "schema": { "type": "string" } } ],
  "responses": {}
} } } }"##)
        .unwrap_err();
        assert!(err.to_string().contains("unknown parameter location 'body'"));
        assert!(err.to_string().contains("list"));
    }

    #[test]
    fn test_bodies_and_responses() {
        let api = ir(r##"{
  "paths": { "/pets": { "post": {
    "operationId": "createPet",
    "requestBody": { "$ref": "#/components/requestBodies/NewPet" },
    "responses": {
      "201": { "description": "created", "content": {
        "text/plain": { "schema": { "type": "string" } },
        "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
      } },
      "204": { "description": "nothing" }
    }
  } } },
  "components": {
    "schemas": { "Pet": { "type": "object", "properties": { "name": { "type": "string" } } } },
    "requestBodies": { "NewPet": { "required": true, "content": {
      "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
    } } }
  }
}"##)
        .unwrap();

        let op = api.operation("createPet").unwrap();
        let body = op.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.payload.kind, ContentKind::Json);
        assert_eq!(body.payload.descriptor.references(), ["#/components/schemas/Pet"]);

        let success = op.success().unwrap();
        assert_eq!(success.status, "201");
        assert_eq!(success.payload.as_ref().unwrap().media_type, "application/json");
        assert!(op.may_be_empty());
        assert!(!op.is_query());
    }

    #[test]
    fn test_name_assignment() {
        let api = ir(r##"{
  "paths": { "/users/{user-id}": { "get": {
    "operationId": "get-user",
    "parameters": [
      { "name": "user-id", "in": "path", "required": true, "schema": { "type": "string" } },
      { "name": "class", "in": "query", "schema": { "type": "string" } }
    ],
    "responses": {}
  } } },
  "components": { "schemas": {
    "GetUserParams": { "type": "object", "properties": { "default": { "type": "string" } } }
  } }
}"##)
        .unwrap();

        let op = &api.operations[0];
        assert_eq!(api.function_name(op), "getUser");
        assert_eq!(api.cache_key_name(op), "getUserKey");
        // The component claimed the name first.
        assert_eq!(api.params_type_name(op), "GetUserParams_2");
        assert_eq!(api.param_name(op, Location::Path, "user-id"), "userId");
        assert_eq!(api.param_name(op, Location::Query, "class"), "class_");

        let schema = api.catalog.iter().next().unwrap();
        assert_eq!(api.type_name(&schema.pointer), "GetUserParams");
        assert_eq!(api.property_name(&schema.descriptor, "default"), "default_");
    }

    #[test]
    fn test_same_name_in_two_locations() {
        let api = ir(r##"{ "paths": { "/items/{id}": { "get": {
  "operationId": "getItem",
  "parameters": [
    { "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } },
    { "name": "id", "in": "query", "schema": { "type": "string" } }
  ],
  "responses": {}
} } } }"##)
        .unwrap();

        let op = &api.operations[0];
        assert_eq!(api.param_name(op, Location::Path, "id"), "id");
        assert_eq!(api.param_name(op, Location::Query, "id"), "id_2");
    }
}
