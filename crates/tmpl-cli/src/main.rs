//! tmplcheck: static type checking for template files.
//!
//! ```text
//! tmplcheck --manifest types.json --dot example.com/site.Page page.tmpl partials.tmpl
//! ```
//!
//! The first file is the entry template; further files contribute named
//! templates. Exit status is 0 when no error diagnostics were produced,
//! 1 when the check found problems, and 2 on fatal errors (I/O, parse
//! failure, unresolvable types).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tmpl_analysis::{
    add_trees, CheckOptions, Checker, ManifestLoader, NamedTreeMap, NullLoader, TypeLoader,
    TypeStore,
};
use tmpl_common::{DiagnosticEmitter, SourceManager};
use tmpl_syntax::parse;

#[derive(Parser)]
#[command(name = "tmplcheck")]
#[command(about = "Static type checker for text/template files", long_about = None)]
struct Cli {
    /// Template files; the first is the entry template.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Default dot type, e.g. example.com/site.Page
    #[arg(long)]
    dot: Option<String>,

    /// Function-map variable, e.g. example.com/site.Funcs
    #[arg(long)]
    funcmap: Option<String>,

    /// JSON manifest describing the host packages
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Downgrade unknown functions and templates to warnings
    #[arg(long)]
    soft: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Render labelled source excerpts instead of compact lines
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(message) => {
            eprintln!("tmplcheck: {}", message);
            ExitCode::from(2)
        }
    }
}

/// Runs the check; `Ok(true)` means no error diagnostics.
fn run(cli: Cli) -> Result<bool, String> {
    let mut sources = SourceManager::new();
    let mut trees = NamedTreeMap::new();
    let mut entry = None;

    for path in &cli.files {
        let file = sources
            .add_file_from_path(path)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        let name = sources.name(file).unwrap_or_default().to_string();
        let source = sources.source(file).unwrap_or_default().to_string();

        let set = parse(&name, &source)
            .map_err(|e| format!("{}: {}", sources.format_location(file, e.span.start), e))?;
        add_trees(&mut trees, file, set).map_err(|e| e.to_string())?;

        if entry.is_none() {
            entry = Some(name);
        }
    }
    let entry = entry.ok_or_else(|| "no template files given".to_string())?;

    let mut store = TypeStore::new();
    let mut loader: Box<dyn TypeLoader> = match &cli.manifest {
        Some(path) => Box::new(ManifestLoader::from_path(path).map_err(|e| e.to_string())?),
        None => Box::new(NullLoader),
    };

    let initial_dot = match &cli.dot {
        Some(qualified) => Some(
            loader
                .load_type(&mut store, qualified)
                .map_err(|e| format!("--dot {}: {}", qualified, e))?,
        ),
        None => None,
    };
    let func_map = match &cli.funcmap {
        Some(qualified) => loader
            .load_func_map(&mut store, qualified)
            .map_err(|e| format!("--funcmap {}: {}", qualified, e))?,
        None => BTreeMap::new(),
    };

    let opts = CheckOptions {
        allow_undefined_funcs: cli.soft,
        allow_undefined_templates: cli.soft,
        verbose: cli.verbose,
    };

    let sink = Checker::new(&mut store, loader.as_mut(), &sources, &trees, opts)
        .with_func_map(func_map)
        .check(&entry, initial_dot)
        .map_err(|e| e.to_string())?;

    let emitter = DiagnosticEmitter::new(&sources);
    if cli.pretty {
        emitter.emit_all_pretty(&sink);
    } else {
        emitter
            .emit_compact(&mut std::io::stderr(), &sink)
            .map_err(|e| e.to_string())?;
    }
    Ok(!sink.has_errors())
}
