mod commands;
mod config;
mod diagnostics;
mod docs;
mod document;
mod error;
mod info;
mod language;
mod matcher;
mod providers;
mod resolver;
mod scanner;
mod settings;
mod task;
mod types;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::Context;

/// Environment variable holding the log filter, e.g. `PIPENAV_LOG=pipenav=debug`.
const LOG_ENV: &str = "PIPENAV_LOG";

/// Command-line arguments.
#[derive(Parser)]
#[command(
    name = "pipenav",
    version,
    about = "Navigate file, template and task references in Azure Pipelines YAML",
    long_about = None
)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,

    /// Settings file [default: <first root>/.pipenav.toml]
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Workspace root; repeat for multi-root workspaces [default: .]
    #[arg(long = "root", global = true, value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Log resolution steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Subcommands, one per host operation.
#[derive(Subcommand)]
enum Commands {
    /// Print the go-to-definition target of a line (exit 1 if none)
    Definition {
        /// Document containing the reference
        file: PathBuf,
        /// One-based line number
        line: usize,
    },
    /// Print the hover text of a line (exit 1 if none)
    Hover {
        /// Document containing the reference
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
        /// One-based line number
        line: usize,
    },
    /// Reference page with the effective settings
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print underline ranges and documentation links
    Links {
        /// Document to scan
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a path replacement rule
    Replace {
        /// Text to find in template paths (empty adds a prefix)
        find: String,
        /// Replacement text (may be empty)
        replace: String,
        /// Zero-based rule slot
        #[arg(long, default_value_t = 0)]
        slot: usize,
    },
    /// List every reference in a document and what it resolves to
    Scan {
        /// Document to scan
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Flip a feature toggle: InternetFetch or ReplaceStrings
    Toggle {
        /// Feature name
        feature: String,
    },
    /// Reprint links whenever the document or settings change
    Watch {
        /// Document to watch
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run one command; errors are rendered as diagnostics and exit 3.
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let roots = if cli.roots.is_empty() { vec![PathBuf::from(".")] } else { cli.roots };
    let settings_path = cli.config.unwrap_or_else(|| {
        return roots.first().map_or_else(|| return PathBuf::from("."), PathBuf::clone).join(config::SETTINGS_FILE);
    });
    let ctx = Context { roots, settings_path };

    let result = match &cli.command {
        Commands::Definition { file, line } => commands::definition(&ctx, file, *line),
        Commands::Hover { file, json, line } => commands::hover(&ctx, file, *line, *json),
        Commands::Info { json } => info::run(&ctx, *json).map(|()| return ExitCode::SUCCESS),
        Commands::Links { file, json } => commands::links(&ctx, file, *json),
        Commands::Replace { find, replace, slot } => commands::replace(&ctx, find, replace, *slot),
        Commands::Scan { file, json } => commands::scan(&ctx, file, *json),
        Commands::Toggle { feature } => commands::toggle(&ctx, feature),
        Commands::Watch { file, json } => watch::run(&ctx, file, *json),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
}

/// Send `tracing` events to stderr. `-v` shows debug events for this
/// crate; otherwise the filter comes from `PIPENAV_LOG`, defaulting to warn.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pipenav=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
