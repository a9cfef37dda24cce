//! `client.ts`: one `fetch` function per operation.
//!
//! Parameters go through the `params.ts` runtime with the wire format
//! computed for them, so a value is encoded exactly the way the server
//! scaffolding decodes it.

use super::ast::{
    TemplatePart, TsExpr, TsFunction, TsImport, TsModule, TsParam, TsPrimitive, TsProp, TsStmt, TsType,
};
use super::render::Emit;
use super::runtime::{PARAMS_PATH, PARAMS_RUNTIME, format_literal};
use super::typescript::{payload_type, referenced_types, response_type};
use super::{Artifact, header};
use crate::codec::{Location, ParamCodec};
use crate::config::EmitConfig;
use crate::error::Result;
use crate::ir::{ApiIr, ContentKind, Operation, PathSegment};

pub const CLIENT_PATH: &str = "client.ts";

const API_ERROR: &str = r#"export class ApiError extends Error {
  status: number;
  statusText: string;
  body: unknown;

  constructor(status: number, statusText: string, body: unknown) {
    super(`HTTP ${status}: ${statusText}`);
    this.name = "ApiError";
    this.status = status;
    this.statusText = statusText;
    this.body = body;
  }
}"#;

const ERROR_CHECK: &str = r#"if (!res.ok) {
  const body = await res.text();
  let parsed: unknown;
  try { parsed = JSON.parse(body); } catch { parsed = body; }
  throw new ApiError(res.status, res.statusText, parsed);
}"#;

/// Positional arguments of a client function: `(params, data, options)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Signature {
    /// `Some(optional)` when the operation has parameters.
    pub params: Option<bool>,
    /// `Some(optional)` when the operation has a request body.
    pub data: Option<bool>,
}

impl Signature {
    pub fn of(operation: &Operation) -> Self {
        let has_body = operation.request_body.is_some();
        Self {
            params: (!operation.parameters.is_empty())
                .then(|| !has_body && operation.parameters.iter().all(|p| !p.required)),
            data: operation.request_body.as_ref().map(|b| !b.required),
        }
    }
}

/// What the client resolves with: `{ data: T }`, `{ data: T } | void`, or `void`.
pub(super) fn result_type(ir: &ApiIr, operation: &Operation) -> TsType {
    let data = response_type(ir, operation);
    if data == TsType::Primitive(TsPrimitive::Void) {
        return data;
    }
    let wrapped = TsType::Object(vec![TsProp::new("data", data, false)]);
    if operation.may_be_empty() {
        TsType::Union(vec![wrapped, TsType::Primitive(TsPrimitive::Void)])
    } else {
        wrapped
    }
}

pub fn emit_client(ir: &ApiIr, config: &EmitConfig) -> Result<Vec<Artifact>> {
    let operations: Vec<&Operation> = ir.operations.iter().collect();

    let mut runtime = Vec::new();
    if operations.iter().any(|op| op.params_in(Location::Query).next().is_some()) {
        runtime.push("encodeQuery".to_string());
    }
    if operations.iter().any(|op| op.params_in(Location::Cookie).next().is_some()) {
        runtime.push("encodeCookies".to_string());
    }
    if operations.iter().any(|op| {
        op.parameters
            .iter()
            .any(|p| matches!(p.wire.location, Location::Path | Location::Header))
    }) {
        runtime.push("encodeValue".to_string());
    }
    runtime.sort();

    let module = TsModule {
        header: Some(header(ir)),
        imports: vec![
            TsImport::new("./params", runtime, false),
            TsImport::new("./types", referenced_types(ir, &operations), true),
        ],
        types: Vec::new(),
        statements: vec![
            TsStmt::VarDecl {
                name: "BASE_PATH".into(),
                ty: None,
                init: TsExpr::string(config.base_path.trim_end_matches('/')),
                export: true,
            },
            TsStmt::Raw(API_ERROR.into()),
        ],
        functions: operations.iter().map(|op| fetch_function(ir, op)).collect(),
    };

    Ok(vec![
        Artifact::new(CLIENT_PATH, module.emit()),
        Artifact::new(PARAMS_PATH, PARAMS_RUNTIME),
    ])
}

/// JSDoc of an operation: summary, description, deprecation.
pub(super) fn operation_doc(operation: &Operation) -> Option<String> {
    let mut parts: Vec<String> = operation
        .summary
        .iter()
        .chain(&operation.description)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    parts.dedup();
    if operation.deprecated {
        parts.push("@deprecated".into());
    }
    (!parts.is_empty()).then(|| parts.join("\n\n"))
}

fn fetch_function(ir: &ApiIr, operation: &Operation) -> TsFunction {
    let signature = Signature::of(operation);

    let mut params = Vec::new();
    if let Some(optional) = signature.params {
        params.push(TsParam::new(
            "params",
            TsType::Ref(ir.params_type_name(operation)),
            optional,
        ));
    }
    if let (Some(optional), Some(body)) = (signature.data, &operation.request_body) {
        params.push(TsParam::new("data", payload_type(ir, &body.payload), optional));
    }
    params.push(TsParam::new("options", TsType::Ref("RequestInit".into()), true));

    let result = result_type(ir, operation);
    let return_type = TsType::Ref(format!("Promise<{}>", result.emit()));

    TsFunction {
        name: ir.function_name(operation),
        type_params: Vec::new(),
        params,
        return_type: Some(return_type),
        body: fetch_body(ir, operation, signature),
        is_async: true,
        is_export: true,
        is_arrow: true,
        doc: operation_doc(operation),
    }
}

/// `params.x`, or `params?.x` when the whole argument may be missing.
fn access(ir: &ApiIr, operation: &Operation, codec: &ParamCodec, signature: Signature) -> TsExpr {
    TsExpr::member(
        TsExpr::ident("params"),
        ir.param_name(operation, codec.wire.location, &codec.name),
        signature.params == Some(true),
    )
}

fn runtime_call(function: &str, ir: &ApiIr, operation: &Operation, codec: &ParamCodec, signature: Signature) -> TsExpr {
    TsExpr::call(
        function,
        vec![
            TsExpr::string(&codec.name),
            access(ir, operation, codec, signature),
            format_literal(codec),
        ],
    )
}

fn fetch_body(ir: &ApiIr, operation: &Operation, signature: Signature) -> Vec<TsStmt> {
    let mut stmts = Vec::new();

    // Query string
    let query: Vec<TsExpr> = operation
        .params_in(Location::Query)
        .map(|codec| TsExpr::Spread(Box::new(runtime_call("encodeQuery", ir, operation, codec, signature))))
        .collect();
    let has_query = !query.is_empty();
    if has_query {
        stmts.push(TsStmt::const_decl(
            "query",
            TsExpr::Call {
                callee: Box::new(TsExpr::member(TsExpr::Array(query), "join", false)),
                args: vec![TsExpr::string("&")],
            },
        ));
    }

    // URL
    let mut parts = vec![TemplatePart::Dynamic(TsExpr::ident("BASE_PATH"))];
    for segment in &operation.path.segments {
        match segment {
            PathSegment::Literal(text) => parts.push(TemplatePart::Static(text.clone())),
            PathSegment::Param(name) => {
                if let Some(codec) = operation.param(name, Location::Path) {
                    parts.push(TemplatePart::Dynamic(runtime_call(
                        "encodeValue",
                        ir,
                        operation,
                        codec,
                        signature,
                    )));
                }
            }
        }
    }
    if has_query {
        parts.push(TemplatePart::Dynamic(TsExpr::Raw(
            "query ? `?${query}` : \"\"".into(),
        )));
    }
    stmts.push(TsStmt::const_decl("url", TsExpr::Template(parts)));

    // Cookies
    let cookies: Vec<TsExpr> = operation
        .params_in(Location::Cookie)
        .map(|codec| {
            TsExpr::Array(vec![
                TsExpr::string(&codec.name),
                access(ir, operation, codec, signature),
                format_literal(codec),
            ])
        })
        .collect();
    let has_cookies = !cookies.is_empty();
    if has_cookies {
        stmts.push(TsStmt::const_decl(
            "cookie",
            TsExpr::call("encodeCookies", vec![TsExpr::Array(cookies)]),
        ));
    }

    // Headers
    let mut headers: Vec<(String, TsExpr)> = Vec::new();
    let body = operation.request_body.as_ref();
    if let Some(body) = body {
        // The browser sets the multipart boundary itself.
        if body.payload.kind != ContentKind::FormData {
            headers.push(("Content-Type".into(), TsExpr::string(&body.payload.media_type)));
        }
    }
    for codec in operation.params_in(Location::Header) {
        let value = runtime_call("encodeValue", ir, operation, codec, signature);
        if codec.required {
            headers.push((codec.name.clone(), value));
        } else {
            let check = access(ir, operation, codec, signature).emit();
            let entry = TsExpr::Object(vec![(codec.name.clone(), value)]);
            headers.push((
                String::new(),
                TsExpr::Spread(Box::new(TsExpr::Raw(format!("({check} != null && {})", entry.emit())))),
            ));
        }
    }
    if has_cookies {
        headers.push((
            String::new(),
            TsExpr::Spread(Box::new(TsExpr::Raw("(cookie && { Cookie: cookie })".into()))),
        ));
    }

    let mut init = vec![
        (String::new(), TsExpr::Spread(Box::new(TsExpr::ident("options")))),
        ("method".into(), TsExpr::string(operation.method.as_str())),
    ];
    if !headers.is_empty() {
        headers.push((
            String::new(),
            TsExpr::Spread(Box::new(TsExpr::member(TsExpr::ident("options"), "headers", true))),
        ));
        init.push(("headers".into(), TsExpr::Object(headers)));
    }
    if let Some(body) = body {
        let encoded = match body.payload.kind {
            ContentKind::Json => TsExpr::call("JSON.stringify", vec![TsExpr::ident("data")]),
            ContentKind::UrlEncoded => TsExpr::Raw("new URLSearchParams(data as Record<string, string>)".into()),
            ContentKind::FormData | ContentKind::Text | ContentKind::Binary => TsExpr::ident("data"),
        };
        let encoded = if body.required {
            encoded
        } else {
            TsExpr::Raw(format!("data === undefined ? undefined : {}", encoded.emit()))
        };
        init.push(("body".into(), encoded));
    }

    stmts.push(TsStmt::const_decl(
        "res",
        TsExpr::Raw(format!(
            "await {}",
            TsExpr::call("fetch", vec![TsExpr::ident("url"), TsExpr::Object(init)]).emit()
        )),
    ));
    stmts.push(TsStmt::Raw(ERROR_CHECK.into()));

    // Result
    match operation.success().and_then(|r| r.payload.as_ref()) {
        None => stmts.push(TsStmt::Return(None)),
        Some(payload) => {
            if operation.may_be_empty() {
                stmts.push(TsStmt::Raw("if (res.status === 204) return;".into()));
            }
            let data = match payload.kind {
                ContentKind::Json => "await res.json()",
                ContentKind::Text => "await res.text()",
                ContentKind::Binary => "await res.blob()",
                ContentKind::FormData => "await res.formData()",
                ContentKind::UrlEncoded => "Object.fromEntries(new URLSearchParams(await res.text()))",
            };
            stmts.push(TsStmt::Return(Some(TsExpr::Object(vec![(
                "data".into(),
                TsExpr::Raw(data.into()),
            )]))));
        }
    }

    stmts
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::document::Document;
    use crate::ir::build_ir;
    use crate::resolve::{MergePolicy, resolve};

    fn api(json: &str) -> ApiIr {
        let document = Document::from_json(json).unwrap();
        let table = resolve(&document, MergePolicy::LastWins).unwrap();
        build_ir(&document, table, &GeneratorConfig::default()).unwrap()
    }

    fn client(ir: &ApiIr) -> String {
        let config = EmitConfig {
            base_path: "/api/".into(),
        };
        emit_client(ir, &config).unwrap()[0].contents.clone()
    }

    #[test]
    fn test_query_path_header_and_cookie() {
        let ir = api(r##"{
  "paths": { "/users/{userId}/posts": { "get": {
    "operationId": "listPosts",
    "parameters": [
      { "name": "userId", "in": "path", "required": true, "schema": { "type": "integer" } },
      { "name": "tags", "in": "query", "schema": { "type": "array", "items": { "type": "string" } } },
      { "name": "X-Trace", "in": "header", "schema": { "type": "string" } },
      { "name": "session", "in": "cookie", "required": true, "schema": { "type": "string" } }
    ],
    "responses": { "200": { "description": "ok", "content": { "application/json": {
      "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Post" } } } } } }
  } } },
  "components": { "schemas": { "Post": { "type": "object", "properties": { "title": { "type": "string" } } } } }
}"##);
        let ts = client(&ir);

        assert!(ts.contains("import { encodeCookies, encodeQuery, encodeValue } from \"./params\";"));
        assert!(ts.contains("import type { ListPostsParams, Post } from \"./types\";"));
        assert!(ts.contains("export const BASE_PATH = \"/api\";"));
        assert!(ts.contains(
            "export const listPosts = async (params: ListPostsParams, options?: RequestInit): Promise<{ data: Post[] }> => {"
        ));
        assert!(ts.contains(
            "const query = [...encodeQuery(\"tags\", params.tags, { style: \"form\", explode: true, kind: \"array\", items: \"string\" })].join(\"&\");"
        ));
        assert!(ts.contains(
            "const url = `${BASE_PATH}/users/${encodeValue(\"userId\", params.userId, { style: \"simple\", explode: false, kind: \"scalar\", type: \"integer\" })}/posts${query ? `?${query}` : \"\"}`;"
        ));
        assert!(ts.contains("const cookie = encodeCookies([[\"session\", params.session, "));
        assert!(ts.contains("...(params.xTrace != null && { \"X-Trace\": encodeValue(\"X-Trace\", params.xTrace, "));
        assert!(ts.contains("...(cookie && { Cookie: cookie }), ...options?.headers }"));
        assert!(ts.contains("method: \"GET\""));
        assert!(ts.contains("return { data: await res.json() };"));
        assert!(ts.contains("throw new ApiError(res.status, res.statusText, parsed);"));
    }

    #[test]
    fn test_body_and_empty_response() {
        let ir = api(r##"{
  "paths": { "/pets/{id}": {
    "put": {
      "operationId": "updatePet",
      "parameters": [ { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } } ],
      "requestBody": { "required": true, "content": { "application/json": {
        "schema": { "$ref": "#/components/schemas/Pet" } } } },
      "responses": {
        "200": { "description": "ok", "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } } },
        "204": { "description": "unchanged" }
      }
    },
    "delete": {
      "operationId": "deletePet",
      "deprecated": true,
      "summary": "Remove a pet",
      "parameters": [ { "name": "id", "in": "path", "required": true, "schema": { "type": "string" } } ],
      "responses": { "204": { "description": "gone" } }
    }
  } },
  "components": { "schemas": { "Pet": { "type": "object", "properties": { "name": { "type": "string" } } } } }
}"##);
        let ts = client(&ir);

        assert!(ts.contains(
            "export const updatePet = async (params: UpdatePetParams, data: Pet, options?: RequestInit): Promise<{ data: Pet } | void> => {"
        ));
        assert!(ts.contains("headers: { \"Content-Type\": \"application/json\", ...options?.headers }"));
        assert!(ts.contains("body: JSON.stringify(data)"));
        assert!(ts.contains("  if (res.status === 204) return;\n"));

        assert!(ts.contains("/**\n * Remove a pet\n *\n * @deprecated\n */\nexport const deletePet = async (params: DeletePetParams, options?: RequestInit): Promise<void> => {"));
        assert!(ts.contains("method: \"DELETE\""));
        assert!(ts.contains("  return;\n"));
    }

    #[test]
    fn test_optional_arguments() {
        let ir = api(r##"{
  "paths": { "/search": {
    "get": {
      "operationId": "search",
      "parameters": [ { "name": "q", "in": "query", "schema": { "type": "string" } } ],
      "responses": { "200": { "description": "ok", "content": { "text/plain": { "schema": { "type": "string" } } } } }
    },
    "post": {
      "operationId": "upload",
      "parameters": [ { "name": "q", "in": "query", "schema": { "type": "string" } } ],
      "requestBody": { "content": { "multipart/form-data": { "schema": { "type": "object" } } } },
      "responses": {}
    }
  } }
}"##);
        let search = ir.operation("search").unwrap();
        let upload = ir.operation("upload").unwrap();
        assert_eq!(Signature::of(search), Signature { params: Some(true), data: None });
        assert_eq!(Signature::of(upload), Signature { params: Some(false), data: Some(true) });

        let ts = client(&ir);
        assert!(ts.contains("async (params?: SearchParams, options?: RequestInit): Promise<{ data: string }>"));
        assert!(ts.contains("encodeQuery(\"q\", params?.q, "));
        assert!(ts.contains("return { data: await res.text() };"));
        assert!(ts.contains("async (params: UploadParams, data?: FormData, options?: RequestInit): Promise<void>"));
        assert!(ts.contains("body: data === undefined ? undefined : data"));
        assert!(!ts.contains("\"Content-Type\": \"multipart/form-data\""));
    }

    #[test]
    fn test_emits_runtime_alongside() {
        let ir = api(r##"{ "paths": {} }"##);
        let artifacts = emit_client(&ir, &EmitConfig::default()).unwrap();
        assert_eq!(artifacts[0].path, CLIENT_PATH);
        assert_eq!(artifacts[1].path, PARAMS_PATH);
        assert!(!artifacts[0].contents.contains("import"));
        assert!(artifacts[0].contents.contains("export const BASE_PATH = \"\";"));
    }
}
