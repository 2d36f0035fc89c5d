//! harbormaster CLI entry point
//!
//! Parses arguments, dispatches to the CLI module, prints errors to
//! stderr, exits non-zero on failure. All boot logic lives in `cli`.

use harbormaster::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
