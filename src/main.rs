//! codeintel CLI - build and query a SCIP symbol index for your project.

mod cli;
mod commands;
mod config;
mod indexer;
mod pipeline;
mod store;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Controlled by RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    cli.command.execute().await
}
