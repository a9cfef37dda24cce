//! `server.ts`: Express router scaffolding.
//!
//! The generated `createRouter` registers one route per operation, decodes
//! every parameter from the raw request with the `params.ts` runtime and
//! hands a typed `params` object to the user's handler. Decoding failures and
//! missing required parameters answer `400`.

use super::ast::{TsExpr, TsImport, TsModule, TsProp, TsStmt, TsType, TsTypeDef, TypeDefKind};
use super::fetch::operation_doc;
use super::render::Emit;
use super::runtime::{PARAMS_PATH, PARAMS_RUNTIME, format_literal};
use super::typescript::{payload_type, referenced_types, response_type};
use super::utils::escape_js_string;
use super::{Artifact, header};
use crate::codec::{Location, ParamCodec};
use crate::error::Result;
use crate::ir::{ApiIr, ContentKind, Operation, PathSegment};

pub const SERVER_PATH: &str = "server.ts";

const HANDLER_TYPE: &str = r#"export type Handler<P, B, R> = (input: {
  params: P;
  body: B;
  req: Request;
  res: Response;
}) => Promise<R> | R;"#;

const RAW_QUERY: &str = r#"const rawQuery = (req: Request): string => {
  const i = req.originalUrl.indexOf("?");
  return i < 0 ? "" : req.originalUrl.slice(i + 1);
};"#;

const REJECT: &str = r#"const reject = (err: unknown, res: Response, next: NextFunction): void => {
  if (err instanceof ParamError) {
    res.status(400).json({ error: err.message, param: err.param });
    return;
  }
  next(err);
};"#;

pub fn emit_server(ir: &ApiIr) -> Result<Vec<Artifact>> {
    let operations: Vec<&Operation> = ir.operations.iter().collect();

    let mut runtime = vec!["ParamError".to_string()];
    let uses = |location: Location| operations.iter().any(|op| op.params_in(location).next().is_some());
    if uses(Location::Cookie) {
        runtime.push("cookieValue".into());
    }
    if uses(Location::Query) {
        runtime.push("decodeQuery".into());
    }
    if uses(Location::Path) || uses(Location::Header) || uses(Location::Cookie) {
        runtime.push("decodeValue".into());
    }
    if uses(Location::Path) {
        runtime.push("matchPath".into());
    }

    let handlers = TsTypeDef {
        name: "Handlers".into(),
        kind: TypeDefKind::Interface {
            properties: operations.iter().map(|op| handler_prop(ir, op)).collect(),
        },
        doc: Some("One implementation per operation.".into()),
    };

    let mut statements = vec![TsStmt::Raw(HANDLER_TYPE.into())];
    if uses(Location::Query) {
        statements.push(TsStmt::Raw(RAW_QUERY.into()));
    }
    statements.push(TsStmt::Raw(REJECT.into()));
    statements.push(TsStmt::Raw(create_router(ir, &operations)));

    let module = TsModule {
        header: Some(header(ir)),
        imports: vec![
            TsImport::new("express", ["Router".to_string()], false),
            TsImport::new(
                "express",
                ["NextFunction", "Request", "Response"].map(String::from),
                true,
            ),
            TsImport::new("./params", runtime, false),
            TsImport::new("./types", referenced_types(ir, &operations), true),
        ],
        types: vec![handlers],
        statements,
        functions: Vec::new(),
    };

    Ok(vec![
        Artifact::new(SERVER_PATH, module.emit()),
        Artifact::new(PARAMS_PATH, PARAMS_RUNTIME),
    ])
}

fn params_type(ir: &ApiIr, operation: &Operation) -> TsType {
    if operation.parameters.is_empty() {
        TsType::Ref("Record<string, never>".into())
    } else {
        TsType::Ref(ir.params_type_name(operation))
    }
}

fn body_type(ir: &ApiIr, operation: &Operation) -> TsType {
    match &operation.request_body {
        Some(body) if body.required => payload_type(ir, &body.payload),
        Some(body) => TsType::Union(vec![
            payload_type(ir, &body.payload),
            TsType::Ref("undefined".into()),
        ]),
        None => TsType::Ref("undefined".into()),
    }
}

fn handler_prop(ir: &ApiIr, operation: &Operation) -> TsProp {
    let ty = TsType::Ref(format!(
        "Handler<{}, {}, {}>",
        params_type(ir, operation).emit(),
        body_type(ir, operation).emit(),
        response_type(ir, operation).emit()
    ));
    TsProp {
        doc: operation_doc(operation).or_else(|| Some(format!("{} {}", operation.method.as_str(), operation.path.raw))),
        ..TsProp::new(ir.function_name(operation), ty, false)
    }
}

/// Express route path: `{name}` becomes `:name` with the parameter's
/// variable name, which is always a valid route parameter.
fn route_path(ir: &ApiIr, operation: &Operation) -> String {
    operation
        .path
        .segments
        .iter()
        .map(|segment| match segment {
            PathSegment::Literal(text) => text.clone(),
            PathSegment::Param(name) => format!(":{}", ir.param_name(operation, Location::Path, name)),
        })
        .collect()
}

/// Expression reading the raw value of `codec` off the request.
fn decode_expr(codec: &ParamCodec) -> TsExpr {
    let name = TsExpr::string(&codec.name);
    let format = format_literal(codec);
    match codec.wire.location {
        Location::Path => TsExpr::call(
            "decodeValue",
            vec![name, TsExpr::member(TsExpr::ident("path"), &codec.name, true), format],
        ),
        Location::Query => TsExpr::call(
            "decodeQuery",
            vec![name, TsExpr::call("rawQuery", vec![TsExpr::ident("req")]), format],
        ),
        Location::Header => TsExpr::call(
            "decodeValue",
            vec![name.clone(), TsExpr::call("req.get", vec![name]), format],
        ),
        Location::Cookie => TsExpr::call(
            "decodeValue",
            vec![
                name.clone(),
                TsExpr::call(
                    "cookieValue",
                    vec![TsExpr::call("req.get", vec![TsExpr::string("Cookie")]), name],
                ),
                format,
            ],
        ),
    }
}

/// Success status the route answers with.
fn success_status(operation: &Operation) -> String {
    let numeric = |status: &str| status.len() == 3 && status.starts_with('2') && status.chars().all(|c| c.is_ascii_digit());
    match operation.success() {
        Some(response) if numeric(&response.status) => response.status.clone(),
        Some(_) => "200".into(),
        None => operation
            .responses
            .iter()
            .map(|r| r.status.as_str())
            .find(|s| numeric(s))
            .unwrap_or("204")
            .to_string(),
    }
}

fn route(ir: &ApiIr, operation: &Operation) -> String {
    let function = ir.function_name(operation);
    let mut body: Vec<TsStmt> = Vec::new();

    if operation.params_in(Location::Path).next().is_some() {
        body.push(TsStmt::const_decl(
            "path",
            TsExpr::call(
                "matchPath",
                vec![
                    TsExpr::string(&operation.path.raw),
                    TsExpr::member(TsExpr::ident("req"), "path", false),
                ],
            ),
        ));
    }

    let params = if operation.parameters.is_empty() {
        TsExpr::Raw("{}".into())
    } else {
        let fields = operation
            .parameters
            .iter()
            .map(|codec| (ir.param_name(operation, codec.wire.location, &codec.name), decode_expr(codec)))
            .collect();
        TsExpr::Cast {
            expr: Box::new(TsExpr::Object(fields)),
            ty: params_type(ir, operation),
        }
    };
    body.push(TsStmt::const_decl("params", params));

    for codec in operation.parameters.iter().filter(|p| p.required) {
        let variable = ir.param_name(operation, codec.wire.location, &codec.name);
        body.push(TsStmt::If {
            cond: TsExpr::Raw(format!(
                "{} === undefined",
                TsExpr::member(TsExpr::ident("params"), variable, false).emit()
            )),
            then_body: vec![TsStmt::Raw(format!(
                "throw new ParamError(\"{}\", \"is required\");",
                escape_js_string(&codec.name)
            ))],
        });
    }

    body.push(TsStmt::const_decl(
        "result",
        TsExpr::Raw(format!(
            "await handlers.{function}({{ params, body: req.body, req, res }})"
        )),
    ));

    let status = success_status(operation);
    let send = match operation.success().and_then(|r| r.payload.as_ref()) {
        None => format!("res.status({status}).end();"),
        Some(payload) if payload.kind == ContentKind::Json => format!("res.status({status}).json(result);"),
        Some(payload) => format!(
            "res.status({status}).type(\"{}\").send(result);",
            escape_js_string(&payload.media_type)
        ),
    };
    body.push(TsStmt::Raw(send));

    let body: String = body.iter().map(|stmt| stmt.emit_indented(3)).collect();
    format!(
        "  router.{method}(\"{path}\", async (req, res, next) => {{\n    try {{\n{body}    }} catch (err) {{\n      reject(err, res, next);\n    }}\n  }});\n",
        method = operation.method.as_lower(),
        path = escape_js_string(&route_path(ir, operation)),
    )
}

fn create_router(ir: &ApiIr, operations: &[&Operation]) -> String {
    let mut out = String::from(
        "/**\n * Routes for every operation. Request bodies are read from `req.body`,\n * so mount a body parser (e.g. `express.json()`) first.\n */\nexport function createRouter(handlers: Handlers): Router {\n  const router = Router();\n",
    );
    for operation in operations {
        out.push('\n');
        out.push_str(&route(ir, operation));
    }
    out.push_str("\n  return router;\n}");
    out
}
