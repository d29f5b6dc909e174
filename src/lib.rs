pub mod blocks;
pub mod catalog;
pub mod generator;
pub mod project;
pub mod registry;
pub mod session;
pub mod workspace;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

use anyhow::{Context, Result};
use catalog::{Catalog, ResultKind};
use generator::{GenerateOptions, Generator};
use project::ProjectFile;
use std::path::{Path, PathBuf};

#[cfg(all(target_arch = "wasm32", feature = "wasm-bindings"))]
pub mod wasm;

#[cfg(not(target_arch = "wasm32"))]
pub fn run_cli(args: &cli::Args) -> Result<()> {
    if args.list_blocks {
        print!("{}", describe_catalog(&Catalog::standard()));
        return Ok(());
    }
    let Some(input) = args.input.as_deref() else {
        anyhow::bail!("An input project file is required unless --list-blocks is given.");
    };

    let total_stages = 3 + usize::from(args.output.is_some());
    let progress = CliProgress::new("Generate", total_stages);

    progress.emit(1, "Reading project");
    let input = canonicalize_file(input)?;
    let project = ProjectFile::load(&input)?;

    progress.emit(2, "Restoring registries");
    let (registries, workspace) = project.into_parts()?;

    progress.emit(3, "Generating code");
    let catalog = Catalog::standard();
    let options = GenerateOptions {
        indent_width: args.indent,
        include_prefix: !args.no_prefix,
    };
    let source = Generator::new(&catalog)
        .with_options(options)
        .generate(&workspace, &registries)
        .with_context(|| format!("Cannot generate code for '{}'.", pretty_path(&input)))?;

    match &args.output {
        Some(output) => {
            progress.emit(4, "Writing output");
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(output, with_trailing_newline(&source))
                .with_context(|| format!("Failed to write '{}'.", output.display()))?;
        }
        None => print!("{}", with_trailing_newline(&source)),
    }
    Ok(())
}

/// Generates program text from a serialized project, as the web front-end
/// sends it.
pub fn generate_from_project_json(json: &str, options: GenerateOptions) -> Result<String> {
    let project = ProjectFile::from_json(json)?;
    let (registries, workspace) = project.into_parts()?;
    let catalog = Catalog::standard();
    Ok(Generator::new(&catalog)
        .with_options(options)
        .generate(&workspace, &registries)?)
}

/// Sets up `tracing` output on stderr. `RUST_LOG` overrides the default level.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging(verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;
    Ok(())
}

pub fn describe_catalog(catalog: &Catalog) -> String {
    let mut out = String::new();
    for block_type in catalog.block_types() {
        let Some(descriptor) = catalog.get(block_type) else {
            continue;
        };
        let shape = match (descriptor.kind, descriptor.output) {
            (ResultKind::Statement, _) => "statement".to_string(),
            (ResultKind::Value, Some(output)) => format!("value {:?}", output),
            (ResultKind::Value, None) => "value".to_string(),
        };
        out.push_str(&format!("{:<28} {}\n", block_type, shape));
    }
    out
}

pub fn canonicalize_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!("Input file not found: '{}'.", path.display()));
    }
    Ok(path.canonicalize()?)
}

fn with_trailing_newline(source: &str) -> String {
    if source.is_empty() || source.ends_with('\n') {
        source.to_string()
    } else {
        format!("{}\n", source)
    }
}

fn pretty_path(path: &Path) -> String {
    let raw = path.display().to_string();
    if let Some(stripped) = raw.strip_prefix(r"\\?\") {
        stripped.to_string()
    } else {
        raw
    }
}

#[cfg(not(target_arch = "wasm32"))]
struct CliProgress {
    prefix: &'static str,
    total: usize,
}

#[cfg(not(target_arch = "wasm32"))]
impl CliProgress {
    fn new(prefix: &'static str, total: usize) -> Self {
        Self {
            prefix,
            total: total.max(1),
        }
    }

    fn emit(&self, step: usize, label: &str) {
        let step = step.clamp(1, self.total);
        let bar = render_progress_bar(step, self.total, 14);
        eprintln!("[{}] {}... ({}/{}) {}", self.prefix, label, step, self.total, bar);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn render_progress_bar(step: usize, total: usize, width: usize) -> String {
    let width = width.max(1);
    let filled = ((step * width) + (total / 2)) / total;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    for i in 0..width {
        s.push(if i < filled { '=' } else { '-' });
    }
    s.push(']');
    s
}
