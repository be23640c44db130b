//! # bufconfig CLI
//!
//! This is the binary entry point for the `bufconfig` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Setting up logging.
//! - Handling top-level errors and translating them into user-friendly
//!   output.
//!
//! All reading, validation and writing of configuration files lives in the
//! library crate; the binary only wires it to a directory on disk.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
