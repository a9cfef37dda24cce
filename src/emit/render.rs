//! TypeScript printing via the [`Emit`] trait.
//!
//! Each AST node renders itself; composite nodes render their children.

use super::ast::{
    TemplatePart, TsExpr, TsFunction, TsImport, TsLiteral, TsModule, TsParam, TsPrimitive, TsProp,
    TsStmt, TsType, TsTypeDef, TypeDefKind,
};
use super::utils::{escape_js_string, escape_template, jsdoc, needs_bracket_notation, quote_if_needed};

/// Convert an AST node to its TypeScript source text.
pub trait Emit {
    fn emit(&self) -> String;
}

// =============================================================================
// Types
// =============================================================================

impl Emit for TsPrimitive {
    fn emit(&self) -> String {
        match self {
            TsPrimitive::String => "string",
            TsPrimitive::Number => "number",
            TsPrimitive::Boolean => "boolean",
            TsPrimitive::Null => "null",
            TsPrimitive::Void => "void",
            TsPrimitive::Unknown => "unknown",
        }
        .to_string()
    }
}

impl Emit for TsLiteral {
    fn emit(&self) -> String {
        match self {
            TsLiteral::String(s) => format!("\"{}\"", escape_js_string(s)),
            TsLiteral::Number(n) => n.to_string(),
            TsLiteral::Int(i) => i.to_string(),
            TsLiteral::Bool(b) => b.to_string(),
            TsLiteral::Null => "null".to_string(),
        }
    }
}

impl Emit for TsType {
    fn emit(&self) -> String {
        match self {
            TsType::Primitive(p) => p.emit(),
            TsType::Array(inner) => {
                let inner_str = inner.emit();
                if matches!(**inner, TsType::Union(_) | TsType::Intersection(_)) {
                    format!("({inner_str})[]")
                } else {
                    format!("{inner_str}[]")
                }
            }
            TsType::Union(types) => types.iter().map(Emit::emit).collect::<Vec<_>>().join(" | "),
            TsType::Intersection(types) => types
                .iter()
                .map(|t| {
                    let s = t.emit();
                    if matches!(t, TsType::Union(_)) {
                        format!("({s})")
                    } else {
                        s
                    }
                })
                .collect::<Vec<_>>()
                .join(" & "),
            TsType::Object(props) => {
                if props.is_empty() {
                    "{}".to_string()
                } else {
                    let parts: Vec<_> = props.iter().map(Emit::emit).collect();
                    format!("{{ {} }}", parts.join("; "))
                }
            }
            TsType::Record { key, value } => format!("Record<{}, {}>", key.emit(), value.emit()),
            TsType::Literal(lit) => lit.emit(),
            TsType::Ref(name) => name.clone(),
        }
    }
}

impl Emit for TsProp {
    fn emit(&self) -> String {
        let readonly = if self.readonly { "readonly " } else { "" };
        let opt = if self.optional { "?" } else { "" };
        format!("{readonly}{}{opt}: {}", quote_if_needed(&self.name), self.ty.emit())
    }
}

impl Emit for TsTypeDef {
    fn emit(&self) -> String {
        let mut output = self.doc.as_deref().map(|d| jsdoc(d, "")).unwrap_or_default();
        match &self.kind {
            TypeDefKind::Interface { properties } => {
                output.push_str(&format!("export interface {} {{\n", self.name));
                for prop in properties {
                    if let Some(doc) = &prop.doc {
                        output.push_str(&jsdoc(doc, "  "));
                    }
                    output.push_str(&format!("  {};\n", prop.emit()));
                }
                output.push_str("}\n");
            }
            TypeDefKind::TypeAlias { ty } => {
                output.push_str(&format!("export type {} = {};\n", self.name, ty.emit()));
            }
            TypeDefKind::ConstEnum { values } => {
                output.push_str(&format!("export const {} = {{\n", self.name));
                for (key, value) in values {
                    output.push_str(&format!("  {}: {},\n", key, value.emit()));
                }
                output.push_str("} as const;\n\n");
                output.push_str(&format!(
                    "export type {} = (typeof {})[keyof typeof {}];\n",
                    self.name, self.name, self.name
                ));
            }
        }
        output
    }
}

// =============================================================================
// Expressions
// =============================================================================

impl Emit for TsExpr {
    fn emit(&self) -> String {
        match self {
            TsExpr::Ident(name) => name.clone(),
            TsExpr::Literal(lit) => lit.emit(),
            TsExpr::Call { callee, args } => {
                let args_str = args.iter().map(Emit::emit).collect::<Vec<_>>().join(", ");
                format!("{}({args_str})", callee.emit())
            }
            TsExpr::Object(props) => {
                if props.is_empty() {
                    "{}".to_string()
                } else {
                    let parts: Vec<_> = props
                        .iter()
                        .map(|(k, v)| match v {
                            TsExpr::Spread(_) => v.emit(),
                            _ => format!("{}: {}", quote_if_needed(k), v.emit()),
                        })
                        .collect();
                    format!("{{ {} }}", parts.join(", "))
                }
            }
            TsExpr::Member {
                object,
                prop,
                optional,
            } => {
                let object = object.emit();
                match (needs_bracket_notation(prop), optional) {
                    (true, true) => format!("{object}?.[\"{}\"]", escape_js_string(prop)),
                    (true, false) => format!("{object}[\"{}\"]", escape_js_string(prop)),
                    (false, true) => format!("{object}?.{prop}"),
                    (false, false) => format!("{object}.{prop}"),
                }
            }
            TsExpr::Template(parts) => {
                let content: String = parts
                    .iter()
                    .map(|p| match p {
                        TemplatePart::Static(s) => escape_template(s),
                        TemplatePart::Dynamic(e) => format!("${{{}}}", e.emit()),
                    })
                    .collect();
                format!("`{content}`")
            }
            TsExpr::Spread(expr) => format!("...{}", expr.emit()),
            TsExpr::Array(items) => {
                let items_str = items.iter().map(Emit::emit).collect::<Vec<_>>().join(", ");
                format!("[{items_str}]")
            }
            TsExpr::Cast { expr, ty } => format!("{} as {}", expr.emit(), ty.emit()),
            TsExpr::Raw(code) => code.clone(),
        }
    }
}

impl Emit for TsParam {
    fn emit(&self) -> String {
        let opt = if self.optional { "?" } else { "" };
        format!("{}{opt}: {}", self.name, self.ty.emit())
    }
}

// =============================================================================
// Statements
// =============================================================================

impl Emit for TsStmt {
    fn emit(&self) -> String {
        self.emit_indented(1)
    }
}

impl TsStmt {
    /// Emit with specified indentation level (2 spaces per level)
    pub fn emit_indented(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        match self {
            TsStmt::VarDecl {
                name,
                ty,
                init,
                export,
            } => {
                let export = if *export { "export " } else { "" };
                let ty_str = ty.as_ref().map(|t| format!(": {}", t.emit())).unwrap_or_default();
                format!("{prefix}{export}const {name}{ty_str} = {};\n", init.emit())
            }
            TsStmt::Return(expr) => match expr {
                Some(e) => format!("{prefix}return {};\n", e.emit()),
                None => format!("{prefix}return;\n"),
            },
            TsStmt::If { cond, then_body } => {
                let mut output = format!("{prefix}if ({}) {{\n", cond.emit());
                for stmt in then_body {
                    output.push_str(&stmt.emit_indented(indent + 1));
                }
                output.push_str(&format!("{prefix}}}\n"));
                output
            }
            TsStmt::Raw(code) => code
                .lines()
                .map(|line| {
                    if line.is_empty() {
                        "\n".to_string()
                    } else {
                        format!("{prefix}{line}\n")
                    }
                })
                .collect(),
        }
    }
}

// =============================================================================
// Functions
// =============================================================================

impl Emit for TsFunction {
    fn emit(&self) -> String {
        let mut output = self.doc.as_deref().map(|d| jsdoc(d, "")).unwrap_or_default();

        if self.is_export {
            output.push_str("export ");
        }

        let type_params_str = if self.type_params.is_empty() {
            String::new()
        } else {
            format!("<{}>", self.type_params.join(", "))
        };
        let params_str = self.params.iter().map(Emit::emit).collect::<Vec<_>>().join(", ");
        let return_type_str = self
            .return_type
            .as_ref()
            .map(|t| format!(": {}", t.emit()))
            .unwrap_or_default();
        let async_str = if self.is_async { "async " } else { "" };

        if self.is_arrow {
            // export const name = async (...): Type => { ... }
            output.push_str(&format!(
                "const {} = {async_str}{type_params_str}({params_str}){return_type_str}",
                self.name
            ));
            if self.body.is_empty() {
                output.push_str(" => {};\n");
            } else {
                output.push_str(" => {\n");
                for stmt in &self.body {
                    output.push_str(&stmt.emit_indented(1));
                }
                output.push_str("};\n");
            }
        } else {
            // export function name<T>(...): Type { ... }
            output.push_str(&format!(
                "{async_str}function {}{type_params_str}({params_str}){return_type_str}",
                self.name
            ));
            if self.body.is_empty() {
                output.push_str(" {}\n");
            } else {
                output.push_str(" {\n");
                for stmt in &self.body {
                    output.push_str(&stmt.emit_indented(1));
                }
                output.push_str("}\n");
            }
        }

        output
    }
}

// =============================================================================
// Imports and modules
// =============================================================================

impl Emit for TsImport {
    fn emit(&self) -> String {
        let items_str = self.items.join(", ");
        let type_keyword = if self.type_only { "type " } else { "" };
        format!("import {type_keyword}{{ {items_str} }} from \"{}\";\n", self.from)
    }
}

impl Emit for TsModule {
    fn emit(&self) -> String {
        let mut output = String::new();

        if let Some(header) = &self.header {
            for line in header.lines() {
                output.push_str(&format!("// {line}\n"));
            }
            output.push('\n');
        }

        for import in self.imports.iter().filter(|i| !i.items.is_empty()) {
            output.push_str(&import.emit());
        }
        if self.imports.iter().any(|i| !i.items.is_empty()) {
            output.push('\n');
        }

        for type_def in &self.types {
            output.push_str(&type_def.emit());
            output.push('\n');
        }

        for stmt in &self.statements {
            output.push_str(&stmt.emit_indented(0));
            output.push('\n');
        }

        for func in &self.functions {
            output.push_str(&func.emit());
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_literal() {
        assert_eq!(TsLiteral::String("hello".into()).emit(), "\"hello\"");
        assert_eq!(TsLiteral::String("say \"hi\"".into()).emit(), "\"say \\\"hi\\\"\"");
        assert_eq!(TsLiteral::Number(2.5).emit(), "2.5");
        assert_eq!(TsLiteral::Int(42).emit(), "42");
        assert_eq!(TsLiteral::Null.emit(), "null");
    }

    #[test]
    fn test_emit_union_array() {
        let ty = TsType::Array(Box::new(TsType::string().or_null()));
        assert_eq!(ty.emit(), "(string | null)[]");
    }

    #[test]
    fn test_or_null_is_idempotent() {
        let ty = TsType::string().or_null().or_null();
        assert_eq!(ty.emit(), "string | null");
        assert_eq!(TsType::unknown().or_null().emit(), "unknown");
    }

    #[test]
    fn test_emit_object_type() {
        let mut id = TsProp::new("id", TsType::Primitive(TsPrimitive::Number), false);
        id.readonly = true;
        let ty = TsType::Object(vec![id, TsProp::new("first-name", TsType::string(), true)]);
        assert_eq!(ty.emit(), "{ readonly id: number; \"first-name\"?: string }");
    }

    #[test]
    fn test_emit_interface_with_docs() {
        let mut name = TsProp::new("name", TsType::string(), false);
        name.doc = Some("Display name".into());
        let def = TsTypeDef {
            name: "Pet".into(),
            kind: TypeDefKind::Interface {
                properties: vec![name],
            },
            doc: Some("A pet".into()),
        };
        assert_eq!(
            def.emit(),
            "/** A pet */\nexport interface Pet {\n  /** Display name */\n  name: string;\n}\n"
        );
    }

    #[test]
    fn test_emit_const_enum() {
        let def = TsTypeDef {
            name: "Status".into(),
            kind: TypeDefKind::ConstEnum {
                values: vec![("available".into(), TsLiteral::String("available".into()))],
            },
            doc: None,
        };
        let out = def.emit();
        assert!(out.contains("export const Status = {\n  available: \"available\",\n} as const;"));
        assert!(out.contains("export type Status = (typeof Status)[keyof typeof Status];"));
    }

    #[test]
    fn test_emit_member_access() {
        let params = TsExpr::ident("params");
        assert_eq!(TsExpr::member(params.clone(), "userId", false).emit(), "params.userId");
        assert_eq!(
            TsExpr::member(params, "X-Trace", true).emit(),
            "params?.[\"X-Trace\"]"
        );
    }

    #[test]
    fn test_emit_template_and_object() {
        let url = TsExpr::Template(vec![
            TemplatePart::Static("/users/".into()),
            TemplatePart::Dynamic(TsExpr::ident("id")),
        ]);
        assert_eq!(url.emit(), "`/users/${id}`");

        let obj = TsExpr::Object(vec![
            ("style".into(), TsExpr::string("form")),
            ("".into(), TsExpr::Spread(Box::new(TsExpr::ident("rest")))),
        ]);
        assert_eq!(obj.emit(), "{ style: \"form\", ...rest }");
    }

    #[test]
    fn test_emit_import() {
        let import = TsImport::new(
            "@tanstack/react-query",
            ["useQuery".to_string(), "useMutation".to_string()],
            false,
        );
        assert_eq!(
            import.emit(),
            "import { useQuery, useMutation } from \"@tanstack/react-query\";\n"
        );
    }

    #[test]
    fn test_emit_arrow_function() {
        let func = TsFunction {
            name: "fetchData".into(),
            type_params: vec![],
            params: vec![],
            return_type: Some(TsType::Ref("Promise<void>".into())),
            body: vec![TsStmt::Return(None)],
            is_async: true,
            is_export: true,
            is_arrow: true,
            doc: None,
        };
        let result = func.emit();
        assert!(result.contains("export const fetchData = async (): Promise<void> => {"));
        assert!(result.contains("  return;"));
    }

    #[test]
    fn test_emit_regular_function() {
        let func = TsFunction {
            name: "useItem".into(),
            type_params: vec!["TData".into()],
            params: vec![TsParam::new("id", TsType::Primitive(TsPrimitive::Number), false)],
            return_type: None,
            body: vec![],
            is_async: false,
            is_export: true,
            is_arrow: false,
            doc: Some("Fetch one item".into()),
        };
        let result = func.emit();
        assert!(result.starts_with("/** Fetch one item */\n"));
        assert!(result.contains("export function useItem<TData>(id: number) {}"));
    }

    #[test]
    fn test_emit_module_skips_empty_imports() {
        let module = TsModule {
            header: Some("Generated".into()),
            imports: vec![TsImport::new("./types", Vec::new(), true)],
            statements: vec![TsStmt::const_decl("BASE_PATH", TsExpr::string(""))],
            ..TsModule::default()
        };
        assert_eq!(module.emit(), "// Generated\n\nconst BASE_PATH = \"\";\n\n");
    }
}
