//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.no_color);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // File first, then flags and environment
    let config = Config::load()?.with_overrides(cli.admin_url, cli.data_dir);
    let output_format = cli.output.or(config.output_format).unwrap_or_default();

    let ctx = commands::Context {
        config,
        output_format,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Proxy(args) => commands::proxy::execute(ctx, args).await,
        Commands::Redirect(args) => commands::redirect::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args).await,
        Commands::Status => commands::status::execute(ctx).await,
        Commands::Reload => commands::reload::execute(ctx).await,
    }
}

/// Log to stderr. `RUST_LOG` is honoured unless `-v` forces debug.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = if verbose {
        EnvFilter::new("cpm=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cpm=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!no_color)
        .init();
}
