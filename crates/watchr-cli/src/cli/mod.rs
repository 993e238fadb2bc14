//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use std::process::ExitCode;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Create context for commands
    let ctx = commands::Context {
        config_path: cli.config,
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
        verbose: cli.verbose,
        no_color: cli.no_color,
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Check(args) => commands::check::execute(ctx, args).await,
        Commands::View(args) => commands::view::execute(ctx, args).await,
    }
}

/// Default filter for a verbosity level; `RUST_LOG` takes precedence.
fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    // Logs go to stderr so JSON output stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .try_init();
}
