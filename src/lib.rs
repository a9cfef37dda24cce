#![forbid(unsafe_code)]
#![deny(unused_must_use, missing_debug_implementations)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! OpenAPI 3.0/3.1 to TypeScript: type declarations, Express route
//! scaffolding, `fetch` client functions and React Query hooks.
//!
//! ```text
//! Document -> resolve -> map types -> codecs -> names -> emit
//! ```
//!
//! [`generate`] runs the whole pipeline; the stages are public for callers
//! that need the intermediate results.

pub mod codec;
pub mod config;
pub mod document;
pub mod emit;
pub mod error;
pub mod ir;
pub mod naming;
pub mod resolve;
pub mod types;

use tracing::{info, warn};

pub use config::{EmitConfig, GeneratorConfig, NamingConfig};
pub use document::Document;
pub use emit::{Artifact, Target};
pub use error::{Error, Result, Warning};
pub use ir::ApiIr;

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct Generation {
    pub ir: ApiIr,
    /// In target order; each logical path appears once.
    pub artifacts: Vec<Artifact>,
    pub warnings: Vec<Warning>,
}

/// Run the full pipeline over `document`.
///
/// Any error aborts the run; no artifacts are produced from a partially
/// resolved document.
pub fn generate(document: &Document, config: &GeneratorConfig) -> Result<Generation> {
    config.validate()?;

    let table = resolve::resolve(document, config.merge_policy)?;
    let ir = ir::build_ir(document, table, config)?;
    let warnings = ir.warnings();
    for warning in &warnings {
        warn!(pointer = %warning.pointer, "{}", warning.message);
    }

    let artifacts = emit::emit_all(&config.targets, &ir, &config.emit)?;
    info!(
        operations = ir.operations.len(),
        types = ir.catalog.len(),
        artifacts = artifacts.len(),
        warnings = warnings.len(),
        "Generation complete."
    );

    Ok(Generation {
        ir,
        artifacts,
        warnings,
    })
}
