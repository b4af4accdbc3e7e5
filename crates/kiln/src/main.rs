//! kiln CLI - front-end asset pipeline.
//!
//! Runs the project tasks by name. Without a command, compiles styles and
//! scripts, then serves `app/` with live reload while watching for changes.

mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::{Commands, GlobalArgs};
use error::CliError;
use output::Output;

/// Filter used when neither `--verbose` nor `RUST_LOG` is set.
const DEFAULT_FILTER: &str = "warn,kiln=info";

/// kiln - front-end asset pipeline.
#[derive(Parser)]
#[command(name = "kiln", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO for everything, otherwise RUST_LOG or the default
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(commands::execute(cli.command, cli.global)),
        Err(err) => Err(CliError::Io(err)),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
