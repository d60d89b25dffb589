//! CLI argument definitions using clap
//!
//! Commands:
//! - itemgate serve --config <path> [--port <port>]
//! - itemgate check --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// itemgate - hook-driven items API server
#[derive(Parser, Debug)]
#[command(name = "itemgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load extensions and serve the HTTP API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./itemgate.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration, load extensions and print a summary
    Check {
        /// Path to configuration file
        #[arg(long, default_value = "./itemgate.json")]
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["itemgate", "serve"]).unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, PathBuf::from("./itemgate.json"));
                assert!(port.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_check_with_config() {
        let cli = Cli::try_parse_from(["itemgate", "check", "--config", "/etc/itemgate.json"]).unwrap();
        assert!(matches!(cli.command, Command::Check { .. }));
    }
}
