//! CLI argument definitions using clap
//!
//! Commands:
//! - harbormaster serve [--config <path>]
//! - harbormaster check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// harbormaster - a pluggable lifecycle broker for managed resources
#[derive(Parser, Debug)]
#[command(name = "harbormaster")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the broker server
    Serve {
        /// Path to a JSON configuration file; defaults apply when absent
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate a configuration file and exit
    CheckConfig {
        /// Path to the JSON configuration file
        #[arg(long, default_value = "./harbormaster.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_without_config() {
        let cli = Cli::parse_from(["harbormaster", "serve"]);
        assert!(matches!(cli.command, Command::Serve { config: None }));
    }

    #[test]
    fn test_serve_with_config_path() {
        let cli = Cli::parse_from(["harbormaster", "serve", "--config", "/etc/broker.json"]);
        match cli.command {
            Command::Serve { config: Some(path) } => {
                assert_eq!(path, PathBuf::from("/etc/broker.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
