//! Folio CLI - Markdown and diagrams to paginated documents.
//!
//! Provides commands for:
//! - `render`: Render the preview page once
//! - `export`: Export a paginated artifact
//! - `watch`: Re-render the preview page as the source changes

mod commands;
mod error;
mod output;
mod settings;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ExportArgs, RenderArgs, WatchArgs};
use error::CliError;
use output::Output;

/// Folio - Markdown and diagrams to paginated documents.
#[derive(Parser)]
#[command(name = "folio", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the preview page once.
    Render(RenderArgs),
    /// Export a paginated document.
    Export(ExportArgs),
    /// Watch a source file and keep the preview page current.
    Watch(WatchArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Render(args) => args.common.verbose,
            Self::Export(args) => args.common.verbose,
            Self::Watch(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = tokio::runtime::Runtime::new()
        .map_err(CliError::from)
        .and_then(|rt| {
            rt.block_on(async {
                match cli.command {
                    Commands::Render(args) => args.execute().await,
                    Commands::Export(args) => args.execute().await,
                    Commands::Watch(args) => args.execute().await,
                }
            })
        });

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
