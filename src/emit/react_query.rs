//! `hooks.ts`: React Query bindings over the fetch client.
//!
//! Cacheable operations get a cache-key function plus `useX` and
//! `useXSuspense` query hooks; everything else gets a `useX` mutation hook.

use super::ast::{TsExpr, TsFunction, TsImport, TsLiteral, TsModule, TsParam, TsStmt, TsType};
use super::fetch::{Signature, operation_doc, result_type};
use super::render::Emit;
use super::typescript::{payload_type, referenced_types};
use super::utils::capitalize_first;
use super::{Artifact, header};
use crate::document::HttpMethod;
use crate::error::Result;
use crate::ir::{ApiIr, Operation};

pub const HOOKS_PATH: &str = "hooks.ts";

pub fn emit_hooks(ir: &ApiIr) -> Result<Vec<Artifact>> {
    let operations: Vec<&Operation> = ir.operations.iter().collect();
    let has_queries = operations.iter().any(|op| op.is_cacheable());
    let has_mutations = operations.iter().any(|op| !op.is_cacheable());

    let mut imports = codegen_imports(has_queries, has_mutations);
    let mut client = vec!["ApiError".to_string()];
    client.extend(operations.iter().map(|op| ir.function_name(op)));
    if !operations.is_empty() {
        imports.push(TsImport::new("./client", client, false));
    }
    imports.push(TsImport::new("./types", referenced_types(ir, &operations), true));

    let mut functions = Vec::new();
    for operation in &operations {
        if operation.is_cacheable() {
            functions.push(query_key_function(ir, operation));
            functions.push(query_hook(ir, operation, QueryKind::Query));
            functions.push(query_hook(ir, operation, QueryKind::Suspense));
        } else {
            functions.push(mutation_hook(ir, operation));
        }
    }

    let module = TsModule {
        header: Some(header(ir)),
        imports,
        functions,
        ..TsModule::default()
    };
    Ok(vec![Artifact::new(HOOKS_PATH, module.emit())])
}

/// Generate import statements.
fn codegen_imports(has_queries: bool, has_mutations: bool) -> Vec<TsImport> {
    let mut runtime_items = Vec::new();
    let mut type_items = Vec::new();

    if has_queries {
        runtime_items.extend(["useQuery", "useSuspenseQuery"]);
        type_items.extend(["UseQueryOptions", "UseSuspenseQueryOptions"]);
    }
    if has_mutations {
        runtime_items.push("useMutation");
        type_items.push("UseMutationOptions");
    }

    let names = |items: Vec<&str>| items.into_iter().map(str::to_string).collect::<Vec<_>>();
    vec![
        TsImport::new("@tanstack/react-query", names(runtime_items), false),
        TsImport::new("@tanstack/react-query", names(type_items), true),
    ]
}

fn hook_name(ir: &ApiIr, operation: &Operation) -> String {
    format!("use{}", capitalize_first(&ir.function_name(operation)))
}

/// `["/pets/{id}", params] as const`; HEAD keys are prefixed so they never
/// share a cache entry with the GET of the same path.
fn query_key_function(ir: &ApiIr, operation: &Operation) -> TsFunction {
    let path = match operation.method {
        HttpMethod::Head => format!("HEAD {}", operation.path.raw),
        _ => operation.path.raw.clone(),
    };
    let mut key = vec![TsExpr::Literal(TsLiteral::String(path))];
    let mut params = Vec::new();
    if !operation.parameters.is_empty() {
        key.push(TsExpr::ident("params"));
        params.push(TsParam::new(
            "params",
            TsType::Ref(ir.params_type_name(operation)),
            true,
        ));
    }
    let body = TsExpr::Cast {
        expr: Box::new(TsExpr::Array(key)),
        ty: TsType::Ref("const".into()),
    };

    TsFunction {
        name: ir.cache_key_name(operation),
        type_params: Vec::new(),
        params,
        return_type: None,
        body: vec![TsStmt::Return(Some(body))],
        is_async: false,
        is_export: true,
        is_arrow: true,
        doc: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryKind {
    Query,
    Suspense,
}

fn query_hook(ir: &ApiIr, operation: &Operation, kind: QueryKind) -> TsFunction {
    let (name, hook_fn, options_type) = match kind {
        QueryKind::Query => (hook_name(ir, operation), "useQuery", "UseQueryOptions"),
        QueryKind::Suspense => (
            format!("{}Suspense", hook_name(ir, operation)),
            "useSuspenseQuery",
            "UseSuspenseQueryOptions",
        ),
    };
    let wrapped = result_type(ir, operation).emit();
    let fetch_fn = ir.function_name(operation);
    let key_fn = ir.cache_key_name(operation);

    let mut params = Vec::new();
    let args = match Signature::of(operation).params {
        Some(optional) => {
            params.push(TsParam::new(
                "params",
                TsType::Ref(ir.params_type_name(operation)),
                optional,
            ));
            "params"
        }
        None => "",
    };
    params.push(TsParam::new(
        "options",
        TsType::Ref(format!(
            "{{ query?: Omit<{options_type}<{wrapped}, ApiError, TData>, \"queryKey\" | \"queryFn\"> }}"
        )),
        true,
    ));

    TsFunction {
        name,
        type_params: vec![format!("TData = {wrapped}")],
        params,
        return_type: None,
        body: vec![TsStmt::Raw(format!(
            "return {hook_fn}({{ queryKey: {key_fn}({args}), queryFn: () => {fetch_fn}({args}), ...options?.query }});"
        ))],
        is_async: false,
        is_export: true,
        is_arrow: false,
        doc: operation_doc(operation),
    }
}

fn mutation_hook(ir: &ApiIr, operation: &Operation) -> TsFunction {
    let wrapped = result_type(ir, operation).emit();
    let fetch_fn = ir.function_name(operation);
    let signature = Signature::of(operation);
    let params_type = ir.params_type_name(operation);
    let data_type = operation
        .request_body
        .as_ref()
        .map(|body| payload_type(ir, &body.payload).emit());

    let (vars, mutation_fn) = match (signature.params, signature.data, data_type) {
        (Some(_), Some(optional), Some(data)) => {
            let opt = if optional { "?" } else { "" };
            (
                format!("{{ params: {params_type}; data{opt}: {data} }}"),
                format!("(vars) => {fetch_fn}(vars.params, vars.data)"),
            )
        }
        (Some(_), _, _) => (params_type, format!("(params) => {fetch_fn}(params)")),
        (None, Some(optional), Some(data)) => {
            let data = if optional { format!("{data} | undefined") } else { data };
            (data, format!("(data) => {fetch_fn}(data)"))
        }
        _ => ("void".to_string(), format!("() => {fetch_fn}()")),
    };

    TsFunction {
        name: hook_name(ir, operation),
        type_params: Vec::new(),
        params: vec![TsParam::new(
            "options",
            TsType::Ref(format!(
                "{{ mutation?: UseMutationOptions<{wrapped}, ApiError, {vars}> }}"
            )),
            true,
        )],
        return_type: None,
        body: vec![TsStmt::Raw(format!(
            "return useMutation({{ mutationFn: {mutation_fn}, ...options?.mutation }});"
        ))],
        is_async: false,
        is_export: true,
        is_arrow: false,
        doc: operation_doc(operation),
    }
}
