#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod generate;

#[derive(Parser, Debug)]
#[command(
    name = "oapigen",
    version,
    about = "Generate TypeScript types, server scaffolding and clients from an OpenAPI document"
)]
struct Cli {
    /// Log at debug level (overridden by OAPIGEN_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate artifacts from an OpenAPI document
    Generate(generate::GenerateArgs),
}

fn main() {
    let code = match Cli::try_parse() {
        Ok(cli) => {
            init_tracing(cli.verbose);
            match cli.command {
                Commands::Generate(args) => generate::run(args),
            }
        }
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbose: bool) {
    // OAPIGEN_LOG takes a plain level ("debug") or a full filter spec
    // ("oapigen=trace,oapigen_cli=info").
    let default_level = if verbose { "debug" } else { "info" };
    let filter = match std::env::var("OAPIGEN_LOG") {
        Ok(level) if is_plain_level(&level) => format!("oapigen={level},oapigen_cli={level}"),
        Ok(spec) => spec,
        Err(_) => format!("oapigen={default_level},oapigen_cli={default_level}"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}
