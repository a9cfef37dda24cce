//! `types.ts`: every named schema type and every operation's params interface.

use super::ast::{TsExpr, TsModule, TsStmt};
use super::render::Emit;
use super::typescript::{named_typedef, params_typedef};
use super::{Artifact, header};
use crate::error::{Error, Result};
use crate::ir::ApiIr;

pub const TYPES_PATH: &str = "types.ts";

pub fn emit_types(ir: &ApiIr) -> Result<Vec<Artifact>> {
    check_references(ir)?;

    let mut types: Vec<_> = ir.catalog.iter().map(|named| named_typedef(ir, named)).collect();
    types.extend(
        ir.operations
            .iter()
            .filter(|op| !op.parameters.is_empty())
            .map(|op| params_typedef(ir, op)),
    );

    let mut statements = Vec::new();
    if let Some(schemes) = &ir.security_schemes {
        let json = serde_json::to_string_pretty(schemes).map_err(|e| Error::Emission {
            target: "types".into(),
            reason: format!("cannot serialize securitySchemes: {e}"),
        })?;
        statements.push(TsStmt::VarDecl {
            name: "securitySchemes".into(),
            ty: None,
            init: TsExpr::Raw(format!("{json} as const")),
            export: true,
        });
    }

    let module = TsModule {
        header: Some(header(ir)),
        types,
        statements,
        ..TsModule::default()
    };
    Ok(vec![Artifact::new(TYPES_PATH, module.emit())])
}

/// Every `Named` reference must land on a catalog entry, or the output would
/// mention a type it never declares.
fn check_references(ir: &ApiIr) -> Result<()> {
    let catalog = ir.catalog.iter().map(|t| &t.descriptor);
    let operations = ir.operations.iter().flat_map(|op| {
        op.parameters
            .iter()
            .map(|p| &p.descriptor)
            .chain(op.request_body.iter().map(|b| &b.payload.descriptor))
            .chain(op.responses.iter().filter_map(|r| r.payload.as_ref().map(|p| &p.descriptor)))
    });
    for descriptor in catalog.chain(operations) {
        if let Some(pointer) = descriptor
            .references()
            .into_iter()
            .find(|pointer| ir.catalog.get(pointer).is_none())
        {
            return Err(Error::Emission {
                target: "types".into(),
                reason: format!("type '{pointer}' is referenced but was never declared"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::document::Document;
    use crate::ir::build_ir;
    use crate::resolve::{MergePolicy, resolve};
    use crate::types::Shape;

    fn api(json: &str) -> ApiIr {
        let document = Document::from_json(json).unwrap();
        let table = resolve(&document, MergePolicy::LastWins).unwrap();
        build_ir(&document, table, &GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn test_types_file() {
        let ir = api(r##"{
  "paths": { "/users/{id}": { "get": {
    "operationId": "getUser",
    "parameters": [
      { "name": "id", "in": "path", "required": true, "schema": { "type": "integer" } },
      { "name": "X-Request-Id", "in": "header", "schema": { "type": "string" } }
    ],
    "responses": { "200": { "description": "ok", "content": { "application/json": {
      "schema": { "$ref": "#/components/schemas/User" } } } } }
  } } },
  "components": {
    "schemas": { "User": { "type": "object", "required": ["id"], "properties": {
      "id": { "type": "integer" }, "email": { "type": "string", "format": "email" }
    } } },
    "securitySchemes": { "bearer": { "type": "http", "scheme": "bearer" } }
  }
}"##);

        let artifacts = emit_types(&ir).unwrap();
        let ts = &artifacts[0].contents;
        assert!(ts.contains("export interface User {\n  id: number;\n  email?: string;\n}\n"));
        assert!(ts.contains("export interface GetUserParams {\n"));
        assert!(ts.contains("  /** `id`: path simple (scalar) */\n  id: number;\n"));
        assert!(ts.contains("  xRequestId?: string;\n"));
        assert!(ts.contains("export const securitySchemes = {"));
        assert!(ts.contains("} as const;"));
        // Schema types come before params interfaces.
        assert!(ts.find("interface User").unwrap() < ts.find("interface GetUserParams").unwrap());
    }

    #[test]
    fn test_undeclared_reference_is_an_emission_error() {
        let mut ir = api(r##"{ "paths": { "/things": { "get": {
  "operationId": "listThings",
  "responses": { "200": { "description": "ok", "content": { "application/json": {
    "schema": { "type": "array", "items": { "type": "string" } } } } } }
} } } }"##);
        assert!(emit_types(&ir).is_ok());

        let payload = ir.operations[0].responses[0].payload.as_mut().unwrap();
        if let Shape::Array(items) = &mut payload.descriptor.shape {
            items.shape = Shape::Named {
                pointer: "#/components/schemas/Gone".into(),
                name: "Gone".into(),
                recursive: false,
            };
        }
        let err = emit_types(&ir).unwrap_err();
        assert!(matches!(err, Error::Emission { ref target, .. } if target == "types"));
        assert!(err.to_string().contains("#/components/schemas/Gone"));
    }
}
