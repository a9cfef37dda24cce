use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use oapigen::{Document, GeneratorConfig, Target};

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// OpenAPI document (JSON, or YAML with a .yaml/.yml extension)
    #[arg(value_name = "SPEC")]
    pub spec: PathBuf,

    /// Directory the artifacts are written to
    #[arg(long, short, value_name = "DIR")]
    pub out: PathBuf,

    /// Generator configuration (TOML)
    #[arg(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Targets to emit; overrides the configuration. Repeatable.
    #[arg(long = "target", short, value_name = "TARGET", value_parser = parse_target)]
    pub targets: Vec<Target>,
}

fn parse_target(raw: &str) -> Result<Target, String> {
    Target::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = Target::ALL.iter().map(|t| t.name()).collect();
        format!("unknown target '{raw}' (expected one of: {})", known.join(", "))
    })
}

pub fn run(args: GenerateArgs) -> i32 {
    match generate(&args) {
        Ok(written) => {
            println!("wrote {written} file(s) to {}", args.out.display());
            0
        }
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn generate(args: &GenerateArgs) -> Result<usize, String> {
    let mut config = match &args.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
            GeneratorConfig::from_toml_str(&contents).map_err(|e| e.to_string())?
        }
        None => GeneratorConfig::default(),
    };
    if !args.targets.is_empty() {
        config.targets.clone_from(&args.targets);
    }

    let document = load_document(&args.spec)?;
    let generation = oapigen::generate(&document, &config).map_err(|e| e.to_string())?;

    fs::create_dir_all(&args.out)
        .map_err(|e| format!("failed to create {}: {e}", args.out.display()))?;
    for artifact in &generation.artifacts {
        let path = args.out.join(&artifact.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }
        fs::write(&path, &artifact.contents)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        debug!(path = %path.display(), bytes = artifact.contents.len(), "Wrote artifact.");
    }

    info!(
        spec = %args.spec.display(),
        warnings = generation.warnings.len(),
        "Artifacts written."
    );
    Ok(generation.artifacts.len())
}

fn load_document(path: &Path) -> Result<Document, String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let document = if is_yaml {
        Document::from_yaml(&contents)
    } else {
        Document::from_json(&contents)
    };
    document.map_err(|e| format!("{}: {e}", path.display()))
}
