//! Docmap CLI - map a Python project's structure and documentation coverage.

use std::path::PathBuf;

use clap::Parser;
use docmap::builder::{RunOutcome, Summarizer};
use docmap::config::Config;
use docmap::errors::{exit_code, DocmapError};
use docmap::extract::DeclarationKind;
use docmap::report::display_path;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "docmap")]
#[command(about = "Map a Python project's structure and documentation coverage")]
#[command(version)]
struct Cli {
    /// Path to project root directory
    #[arg(default_value = ".")]
    project_root: PathBuf,

    /// Output directory for analysis files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Custom filename for project summary
    #[arg(long)]
    summary_file: Option<PathBuf>,

    /// Custom filename for undocumented elements
    #[arg(long)]
    undocumented_file: Option<PathBuf>,

    /// Disable .gitignore updates in the output directory
    #[arg(long)]
    no_gitignore: bool,

    /// Do not read ignore patterns from the project's .gitignore
    #[arg(long)]
    no_project_ignore: bool,

    /// Additional ignore pattern (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    ignore: Vec<String>,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Documentation preview length in characters
    #[arg(long)]
    preview_len: Option<usize>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let json = cli.json;

    match run(cli) {
        Ok(outcome) => {
            if json {
                print_json(&outcome);
            } else {
                println!(
                    "\nAnalysis complete:\n- Summary: {}\n- Undocumented: {}",
                    outcome.summary_path.display(),
                    outcome.undocumented_path.display()
                );
            }
        }
        Err(e) => {
            tracing::error!("Analysis failed: {}", e);
            if json {
                #[derive(Serialize)]
                struct ErrorOutput {
                    error: String,
                }

                let payload = ErrorOutput {
                    error: e.to_string(),
                };

                let json = serde_json::to_string(&payload)
                    .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
                eprintln!("{json}");
            } else {
                eprintln!("error: {}", e);
            }
            std::process::exit(exit_code(&e));
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "docmap=debug" } else { "docmap=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<RunOutcome, DocmapError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    config.extra_ignores.extend(cli.ignore);
    if cli.no_gitignore {
        config.update_output_ignore = false;
    }
    if cli.no_project_ignore {
        config.read_gitignore = false;
    }
    if let Some(len) = cli.preview_len {
        config.preview_len = len;
    }

    let mut summarizer = Summarizer::new(cli.project_root)
        .output_dir(cli.output_dir)
        .config(config);

    if let Some(path) = cli.summary_file {
        summarizer = summarizer.summary_file(path);
    }
    if let Some(path) = cli.undocumented_file {
        summarizer = summarizer.undocumented_file(path);
    }

    summarizer.run()
}

#[derive(Serialize)]
struct JsonOutcome<'a> {
    summary: String,
    undocumented: String,
    files: usize,
    declarations: usize,
    skipped: Vec<String>,
    undocumented_elements: Vec<JsonElement<'a>>,
}

#[derive(Serialize)]
struct JsonElement<'a> {
    file: String,
    kind: DeclarationKind,
    name: &'a str,
    line: usize,
}

fn print_json(outcome: &RunOutcome) {
    let report = &outcome.report;

    let payload = JsonOutcome {
        summary: outcome.summary_path.display().to_string(),
        undocumented: outcome.undocumented_path.display().to_string(),
        files: report.files.len(),
        declarations: report.declaration_count(),
        skipped: report
            .files
            .iter()
            .filter(|f| f.skipped.is_some())
            .map(|f| display_path(&f.path))
            .collect(),
        undocumented_elements: report
            .undocumented()
            .map(|d| JsonElement {
                file: display_path(&d.file),
                kind: d.kind,
                name: &d.name,
                line: d.line,
            })
            .collect(),
    };

    match serde_json::to_string_pretty(&payload) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: {e}"),
    }
}
