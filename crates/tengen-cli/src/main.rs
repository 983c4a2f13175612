//! CLI entry point.

use anyhow::Result;
use clap::Parser;

use tengen_cli::bootstrap;
use tengen_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    let cli = Cli::parse();
    let config = tengen_cli::config::load(&cli.config)?;

    match cli.command {
        Commands::Serve => bootstrap::serve(config).await,
        Commands::Provision => bootstrap::provision(&config).await,
        Commands::Check => bootstrap::check(&config).await,
    }
}
