use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod actions;
mod cli;
mod commands;
mod config;
mod models;
mod runner;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Actions => commands::actions::execute().await,
    }
}
