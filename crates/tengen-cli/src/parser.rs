//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Analysis engine broker: serves a long-running engine process over HTTP.
#[derive(Debug, Parser)]
#[command(name = "tengen", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(
        short,
        long,
        global = true,
        env = "TENGEN_CONFIG_FILE",
        default_value = "config.yaml"
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Provision model artifacts and serve the HTTP API.
    Serve,
    /// Ensure model artifacts are present and verified, then exit.
    Provision,
    /// Validate the configuration and report artifact status without
    /// touching the network.
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_flag_overrides_the_default() {
        let cli = Cli::parse_from(["tengen", "--config", "/etc/tengen.yaml", "serve"]);
        assert_eq!(cli.config, PathBuf::from("/etc/tengen.yaml"));
        assert!(matches!(cli.command, Commands::Serve));
    }

    #[test]
    fn default_config_path_is_local() {
        let cli = Cli::parse_from(["tengen", "check"]);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
    }
}
