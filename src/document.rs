//! OpenAPI document structs for serde deserialization.
//!
//! This is the subset of OpenAPI 3.0/3.1 the core consumes. Maps are
//! [`IndexMap`]s so declaration order survives parsing; everything downstream
//! (property order, name assignment order) depends on it.
//!
//! The untouched JSON tree is kept next to the typed view so the resolver can
//! follow `$ref` pointers into any part of the document.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// A parsed API description document.
#[derive(Debug, Clone)]
pub struct Document {
    spec: OpenApiSpec,
    raw: Value,
}

/// Root OpenAPI specification.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenApiSpec {
    pub openapi: Option<String>,
    pub info: Option<Info>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    pub components: Option<Components>,
}

/// Document metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    pub title: Option<String>,
    pub version: Option<String>,
}

/// Components section containing reusable objects.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(default)]
    pub request_bodies: IndexMap<String, RequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    /// Opaque to the core; handed to emitters untouched.
    pub security_schemes: Option<Value>,
}

/// A path item containing operations for different HTTP methods.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
    pub summary: Option<String>,
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
    /// Path-level parameters shared by all operations.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// An API operation (endpoint).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
}

/// A parameter (path, query, header or cookie), or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Parameter {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "in", default)]
    pub location: String,
    #[serde(default)]
    pub required: bool,
    pub style: Option<String>,
    pub explode: Option<bool>,
    #[serde(default)]
    pub deprecated: bool,
    pub description: Option<String>,
    pub schema: Option<Schema>,
    pub content: Option<IndexMap<String, MediaType>>,
}

/// A request body definition, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestBody {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// A response definition, or a `$ref` to one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Media type content (e.g., application/json).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    pub schema: Option<Schema>,
}

/// JSON Schema definition used in OpenAPI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// The type of the schema (string, number, integer, boolean, object, array, null).
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,

    /// Reference to another schema.
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    pub title: Option<String>,
    pub description: Option<String>,

    /// Properties for object types, in declaration order.
    pub properties: Option<IndexMap<String, Schema>>,

    /// Required property names for object types.
    #[serde(default)]
    pub required: Vec<String>,

    /// Item schema for array types.
    pub items: Option<Box<Schema>>,

    /// Enum values.
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<Value>>,

    /// Union type (any of these schemas).
    pub any_of: Option<Vec<Schema>>,

    /// Union type (exactly one of these schemas).
    pub one_of: Option<Vec<Schema>>,

    /// Intersection type (all of these schemas combined).
    pub all_of: Option<Vec<Schema>>,

    /// Additional properties for object types (for Record/dict types).
    pub additional_properties: Option<AdditionalProperties>,

    /// Discriminator for polymorphic oneOf schemas.
    pub discriminator: Option<Discriminator>,

    /// Format hint (e.g., date-time, uuid).
    pub format: Option<String>,

    /// Constant value - schema matches only this exact value.
    #[serde(rename = "const")]
    pub const_value: Option<Value>,

    /// Default value for the schema.
    pub default: Option<Value>,

    /// OpenAPI 3.0 nullable flag (3.1 uses type arrays instead).
    pub nullable: Option<bool>,

    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,

    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// A number in 3.1, a boolean modifier of `minimum` in 3.0.
    pub exclusive_minimum: Option<ExclusiveBound>,
    pub exclusive_maximum: Option<ExclusiveBound>,
    pub multiple_of: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    #[serde(default)]
    pub unique_items: bool,
}

/// Discriminator for polymorphic schemas (oneOf/anyOf).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    /// The property name that contains the discriminator value.
    pub property_name: String,
    /// Optional mapping from discriminator values to schema refs.
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
}

/// Schema type can be a single type or an array of types (for nullable).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// Additional properties can be a boolean or a schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<Schema>),
}

/// `exclusiveMinimum` / `exclusiveMaximum` in either dialect.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum ExclusiveBound {
    Flag(bool),
    Value(f64),
}

impl Document {
    /// Parse a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(json)
            .map_err(|e| Error::DocumentParse(format!("invalid JSON: {e}")))?;
        Self::from_value(raw)
    }

    /// Parse a document from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let tree: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| Error::DocumentParse(format!("invalid YAML: {e}")))?;
        // Going through the serializer turns integer keys such as `200:` into strings.
        let raw = serde_json::to_value(tree)
            .map_err(|e| Error::DocumentParse(format!("unsupported YAML construct: {e}")))?;
        Self::from_value(raw)
    }

    /// Build a document from an already parsed JSON tree.
    pub fn from_value(raw: Value) -> Result<Self> {
        let spec: OpenApiSpec = serde_json::from_value(raw.clone())
            .map_err(|e| Error::DocumentParse(format!("not an OpenAPI document: {e}")))?;
        Ok(Self { spec, raw })
    }

    pub fn spec(&self) -> &OpenApiSpec {
        &self.spec
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn title(&self) -> Option<&str> {
        self.spec.info.as_ref().and_then(|i| i.title.as_deref())
    }

    pub fn components(&self) -> Option<&Components> {
        self.spec.components.as_ref()
    }

    pub fn security_schemes(&self) -> Option<&Value> {
        self.components().and_then(|c| c.security_schemes.as_ref())
    }

    /// Look up the raw JSON at a local `#/...` pointer.
    pub fn lookup(&self, pointer: &str) -> Result<&Value> {
        let path = local_pointer_path(pointer)?;
        self.raw
            .pointer(&path)
            .ok_or_else(|| Error::resolution(pointer, "pointer does not exist in the document"))
    }

    /// Dereference a `$ref` and deserialize its target as `T`.
    pub fn deref_as<T: serde::de::DeserializeOwned>(&self, pointer: &str) -> Result<T> {
        let value = self.lookup(pointer)?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::resolution(pointer, format!("target has an unexpected shape: {e}")))
    }
}

/// Turn a `$ref` value into the path understood by [`Value::pointer`].
///
/// Only document-local references are accepted; the fragment is
/// percent-decoded, `~0`/`~1` escapes are left for `Value::pointer`.
pub fn local_pointer_path(pointer: &str) -> Result<String> {
    let Some(fragment) = pointer.strip_prefix('#') else {
        return Err(Error::resolution(
            pointer,
            "external references are not supported",
        ));
    };
    let decoded = percent_encoding::percent_decode_str(fragment)
        .decode_utf8()
        .map_err(|e| Error::resolution(pointer, format!("invalid percent-encoding: {e}")))?;
    if !decoded.is_empty() && !decoded.starts_with('/') {
        return Err(Error::resolution(pointer, "fragment is not a JSON pointer"));
    }
    Ok(decoded.into_owned())
}

/// Escape one reference token for use inside a JSON pointer.
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Last token of a pointer, unescaped (`#/components/schemas/Pet` -> `Pet`).
pub fn pointer_name(pointer: &str) -> String {
    pointer
        .rsplit('/')
        .next()
        .unwrap_or(pointer)
        .replace("~1", "/")
        .replace("~0", "~")
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// Path item field order, which is also the operation declaration order.
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Post,
        HttpMethod::Delete,
        HttpMethod::Options,
        HttpMethod::Head,
        HttpMethod::Patch,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }

    pub fn as_lower(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }

    /// Safe methods become cached queries in the client bindings.
    pub fn is_query(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Trace => self.trace.as_ref(),
        }
    }
}

/// One operation of the paths section, with where it lives in the document.
#[derive(Debug, Clone, Copy)]
pub struct OperationEntry<'a> {
    pub path: &'a str,
    pub method: HttpMethod,
    pub item: &'a PathItem,
    pub operation: &'a Operation,
}

impl OperationEntry<'_> {
    /// `#/paths/~1users~1{userId}`
    pub fn path_pointer(&self) -> String {
        format!("#/paths/{}", escape_pointer_token(self.path))
    }

    /// `#/paths/~1users~1{userId}/get`
    pub fn pointer(&self) -> String {
        format!("{}/{}", self.path_pointer(), self.method.as_lower())
    }
}

/// Objects that may be replaced by a `$ref` (parameters, bodies, responses).
pub trait Referenceable: serde::de::DeserializeOwned + Clone {
    fn ref_path(&self) -> Option<&str>;
}

impl Referenceable for Parameter {
    fn ref_path(&self) -> Option<&str> {
        self.ref_path.as_deref()
    }
}

impl Referenceable for RequestBody {
    fn ref_path(&self) -> Option<&str> {
        self.ref_path.as_deref()
    }
}

impl Referenceable for Response {
    fn ref_path(&self) -> Option<&str> {
        self.ref_path.as_deref()
    }
}

impl Document {
    /// Every operation in declaration order (paths first, then method order).
    pub fn operations(&self) -> Vec<OperationEntry<'_>> {
        let mut entries = Vec::new();
        for (path, item) in &self.spec.paths {
            for method in HttpMethod::ALL {
                if let Some(operation) = item.operation(method) {
                    entries.push(OperationEntry {
                        path,
                        method,
                        item,
                        operation,
                    });
                }
            }
        }
        entries
    }

    /// Follow a chain of `$ref`s starting at an inline object.
    ///
    /// Returns the pointer of the object that was finally used together with
    /// the object itself.
    pub fn deref_object<T: Referenceable>(&self, pointer: String, object: &T) -> Result<(String, T)> {
        let mut current_pointer = pointer;
        let mut current = object.clone();
        let mut seen = std::collections::HashSet::new();
        while let Some(target) = current.ref_path().map(str::to_string) {
            if !seen.insert(target.clone()) {
                return Err(Error::resolution(target, "reference chain loops back on itself"));
            }
            current = self.deref_as(&target)?;
            current_pointer = target;
        }
        Ok((current_pointer, current))
    }
}

impl Parameter {
    /// The schema describing the parameter value and its pointer.
    ///
    /// Parameters declared through `content` use the schema of their first media type.
    pub fn schema_location(&self, pointer: &str) -> Option<(String, &Schema)> {
        if let Some(schema) = &self.schema {
            return Some((format!("{pointer}/schema"), schema));
        }
        self.content.as_ref().and_then(|content| {
            content.iter().find_map(|(media, mt)| {
                mt.schema.as_ref().map(|schema| {
                    (
                        format!("{pointer}/content/{}/schema", escape_pointer_token(media)),
                        schema,
                    )
                })
            })
        })
    }
}

impl Schema {
    /// Declared type names, in order.
    pub fn type_names(&self) -> Vec<&str> {
        match &self.schema_type {
            Some(SchemaType::Single(t)) => vec![t.as_str()],
            Some(SchemaType::Multiple(types)) => types.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    /// Check if this schema is only `{"type": "null"}`.
    pub fn is_null_type(&self) -> bool {
        self.ref_path.is_none() && self.type_names() == ["null"]
    }

    /// Check if this schema is nullable through the 3.0 flag or a 3.1 type array.
    pub fn is_nullable(&self) -> bool {
        self.nullable == Some(true) || self.type_names().contains(&"null")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_declaration_order() {
        let doc = Document::from_json(
            r##"{
  "openapi": "3.1.0",
  "paths": {},
  "components": { "schemas": {
    "Zebra": { "type": "object", "properties": { "z": { "type": "string" }, "a": { "type": "string" } } },
    "Apple": { "type": "string" }
  } }
}"##,
        )
        .unwrap();
        let schemas = &doc.components().unwrap().schemas;
        let names: Vec<_> = schemas.keys().map(String::as_str).collect();
        assert_eq!(names, ["Zebra", "Apple"]);
        let props: Vec<_> = schemas["Zebra"]
            .properties
            .as_ref()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(props, ["z", "a"]);
    }

    #[test]
    fn test_from_yaml_with_integer_status_keys() {
        let doc = Document::from_yaml(
            r#"
openapi: 3.0.3
paths:
  /ping:
    get:
      responses:
        200:
          description: ok
"#,
        )
        .unwrap();
        let op = doc.spec().paths["/ping"].get.as_ref().unwrap();
        assert!(op.responses.contains_key("200"));
    }

    #[test]
    fn test_exclusive_bounds_in_both_dialects() {
        let doc = Document::from_json(
            r##"{ "paths": {}, "components": { "schemas": {
  "A": { "type": "integer", "minimum": 1, "exclusiveMinimum": true },
  "B": { "type": "integer", "exclusiveMinimum": 1 }
} } }"##,
        )
        .unwrap();
        let schemas = &doc.components().unwrap().schemas;
        assert!(matches!(
            schemas["A"].exclusive_minimum,
            Some(ExclusiveBound::Flag(true))
        ));
        assert!(matches!(
            schemas["B"].exclusive_minimum,
            Some(ExclusiveBound::Value(v)) if (v - 1.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_lookup_and_pointer_helpers() {
        let doc = Document::from_json(
            r##"{ "paths": {}, "components": { "schemas": { "a/b": { "type": "string" } } } }"##,
        )
        .unwrap();
        assert!(doc.lookup("#/components/schemas/a~1b").is_ok());
        assert!(doc.lookup("#/components/schemas/nope").is_err());
        assert!(matches!(
            doc.lookup("other.yaml#/Pet"),
            Err(Error::SchemaResolution { .. })
        ));
        assert_eq!(pointer_name("#/components/schemas/a~1b"), "a/b");
        assert_eq!(escape_pointer_token("/users/{id}"), "~1users~1{id}");
        assert_eq!(
            local_pointer_path("#/components/schemas/My%20Type").unwrap(),
            "/components/schemas/My Type"
        );
    }

    #[test]
    fn test_malformed_input_is_a_parse_error() {
        assert!(matches!(
            Document::from_json("{ not json"),
            Err(Error::DocumentParse(_))
        ));
        assert!(matches!(
            Document::from_json(r#"{ "paths": [] }"#),
            Err(Error::DocumentParse(_))
        ));
    }
}
