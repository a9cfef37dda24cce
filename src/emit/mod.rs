//! Emitters: pure functions from the finished IR to text artifacts.
//!
//! Every target builds a TypeScript syntax tree ([`ast`]) and prints it
//! through the [`Emit`] trait. Targets only read the IR, so
//! [`emit_all`] runs them in parallel.

pub mod ast;
mod fetch;
mod react_query;
pub mod render;
mod runtime;
mod server;
mod types;
mod typescript;
pub mod utils;

use std::fmt;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Deserialize;
use tracing::debug;

use crate::config::EmitConfig;
use crate::error::Result;
use crate::ir::ApiIr;

pub use render::Emit;
pub use runtime::{PARAMS_PATH, PARAMS_RUNTIME};

/// One output family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// `types.ts`: interfaces, aliases and const enums.
    Types,
    /// `server.ts`: Express router scaffolding.
    Server,
    /// `client.ts`: `fetch` functions.
    FetchClient,
    /// `hooks.ts`: React Query hooks and cache-key functions.
    ReactQuery,
}

impl Target {
    pub const ALL: [Target; 4] = [
        Target::Types,
        Target::Server,
        Target::FetchClient,
        Target::ReactQuery,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Target::Types => "types",
            Target::Server => "server",
            Target::FetchClient => "fetch-client",
            Target::ReactQuery => "react-query",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Targets whose artifacts this target's artifacts import.
    pub fn requires(self) -> &'static [Target] {
        match self {
            Target::Types => &[],
            Target::Server | Target::FetchClient => &[Target::Types],
            Target::ReactQuery => &[Target::Types, Target::FetchClient],
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A generated file: logical relative path plus contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub contents: String,
}

impl Artifact {
    fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Run one emitter.
pub fn emit(target: Target, ir: &ApiIr, config: &EmitConfig) -> Result<Vec<Artifact>> {
    let artifacts = match target {
        Target::Types => types::emit_types(ir)?,
        Target::Server => server::emit_server(ir)?,
        Target::FetchClient => fetch::emit_client(ir, config)?,
        Target::ReactQuery => react_query::emit_hooks(ir)?,
    };
    debug!(target = %target, artifacts = artifacts.len(), "Emitter finished.");
    Ok(artifacts)
}

/// Run `targets` in parallel. Artifacts come back in target order; a path
/// produced by several targets (the shared runtime) is kept once.
pub fn emit_all(targets: &[Target], ir: &ApiIr, config: &EmitConfig) -> Result<Vec<Artifact>> {
    let per_target = targets
        .par_iter()
        .map(|target| emit(*target, ir, config))
        .collect::<Result<Vec<_>>>()?;

    let mut by_path: IndexMap<String, Artifact> = IndexMap::new();
    for artifact in per_target.into_iter().flatten() {
        by_path.entry(artifact.path.clone()).or_insert(artifact);
    }
    Ok(by_path.into_values().collect())
}

/// First line of every generated file.
fn header(ir: &ApiIr) -> String {
    match &ir.title {
        Some(title) => format!("Generated by oapigen from \"{title}\". Do not edit."),
        None => "Generated by oapigen. Do not edit.".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::document::Document;
    use crate::ir::build_ir;
    use crate::resolve::{MergePolicy, resolve};

    fn api() -> ApiIr {
        let document = Document::from_json(
            r##"{
  "info": { "title": "Pets" },
  "paths": { "/pets": { "get": {
    "operationId": "listPets",
    "parameters": [ { "name": "limit", "in": "query", "schema": { "type": "integer" } } ],
    "responses": { "200": { "description": "ok", "content": { "application/json": {
      "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
    } } } }
  } } },
  "components": { "schemas": { "Pet": { "type": "object", "properties": { "name": { "type": "string" } } } } }
}"##,
        )
        .unwrap();
        let table = resolve(&document, MergePolicy::LastWins).unwrap();
        build_ir(&document, table, &GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn test_target_names() {
        for target in Target::ALL {
            assert_eq!(Target::parse(target.name()), Some(target));
        }
        assert_eq!(Target::parse("fetch"), None);
        assert_eq!(Target::ReactQuery.to_string(), "react-query");
    }

    #[test]
    fn test_emit_all_keeps_target_order_and_dedups_runtime() {
        let ir = api();
        let artifacts = emit_all(&Target::ALL, &ir, &EmitConfig::default()).unwrap();
        let paths: Vec<_> = artifacts.iter().map(|a| a.path.as_str()).collect();
        assert_eq!(paths, ["types.ts", "server.ts", PARAMS_PATH, "client.ts", "hooks.ts"]);
        assert!(artifacts.iter().all(|a| a.contents.starts_with("// ")));
    }

    #[test]
    fn test_emit_is_deterministic() {
        let ir = api();
        let first = emit_all(&Target::ALL, &ir, &EmitConfig::default()).unwrap();
        for _ in 0..5 {
            assert_eq!(emit_all(&Target::ALL, &ir, &EmitConfig::default()).unwrap(), first);
        }
    }

    #[test]
    fn test_single_target() {
        let ir = api();
        let artifacts = emit(Target::Types, &ir, &EmitConfig::default()).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert!(artifacts[0].contents.contains("export interface Pet {"));
        assert!(artifacts[0].contents.contains("export interface ListPetsParams {"));
        assert!(artifacts[0].contents.starts_with("// Generated by oapigen from \"Pets\". Do not edit."));
    }
}
