//! mdpdf CLI - Markdown to PDF with Mermaid diagrams.
//!
//! Provides commands for:
//! - `convert`: Convert one markdown file
//! - `batch`: Convert every file matching a set of patterns
//! - `watch`: Reconvert files as they change
//! - `init`: Write a starter `mdpdf.toml`

mod commands;
mod error;
mod output;

use std::future::Future;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use commands::{BatchArgs, ConvertArgs, GlobalArgs, InitArgs, WatchArgs};
use error::CliError;
use output::Output;

/// mdpdf - Markdown to PDF converter.
#[derive(Parser)]
#[command(name = "mdpdf", version, about)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a markdown file to PDF.
    Convert(ConvertArgs),
    /// Convert every file matching the given patterns.
    Batch(BatchArgs),
    /// Watch files and convert them when they change.
    Watch(WatchArgs),
    /// Create an mdpdf.toml with the default settings.
    Init(InitArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.global.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .from_env_lossy()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;
    match command {
        Commands::Convert(args) => block_on(args.execute(&global)),
        Commands::Batch(args) => block_on(args.execute(&global)),
        Commands::Watch(args) => block_on(args.execute(&global)),
        Commands::Init(args) => args.execute(),
    }
}

fn block_on(future: impl Future<Output = Result<(), CliError>>) -> Result<(), CliError> {
    tokio::runtime::Runtime::new()?.block_on(future)
}
