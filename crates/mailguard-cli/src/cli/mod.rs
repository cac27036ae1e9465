//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = commands::Context {
        config_path: cli.config,
        password: cli.password,
        output_format: cli.output,
    };

    match cli.command.unwrap_or_else(|| Commands::Run(args::RunArgs::default())) {
        Commands::Run(args) => commands::run::execute(ctx, args).await,
        Commands::Flatten(args) => commands::flatten::execute(ctx, args).await,
        Commands::Check(args) => commands::check::execute(ctx, args).await,
    }
}

/// Logs go to stderr so JSON on stdout stays parseable.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
