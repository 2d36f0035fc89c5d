//! CLI front end
//!
//! Thin wrapper over the engine and HTTP server:
//! - serve: build store + registry, boot the server loop
//! - check-config: validate a configuration file and exit

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, run_command, serve};
pub use errors::{CliError, CliResult};

/// Parse arguments and run the selected command.
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args())
}
