//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which reads every
//! configuration file present in a directory and reports, per file, either
//! its version and a short summary or the error that makes it invalid.
//!
//! This command is a safe, read-only operation that does not modify any files.

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use bufconfig::bucket::DirBucket;

use super::discover;

/// Check every configuration file in a directory
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Directory holding the configuration files.
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,
}

/// Execute the `validate` command.
///
/// Every file is reported before failing, so one run shows all problems.
pub fn execute(args: ValidateArgs) -> Result<()> {
    let bucket = DirBucket::new(&args.dir);
    let found = discover(&bucket, ".")?;
    if found.is_empty() {
        bail!("no configuration files found in {}", args.dir.display());
    }
    let mut invalid = 0;
    for entry in &found {
        let file_name = entry.file_type.canonical_file_name();
        match &entry.result {
            Ok(document) => println!(
                "{}: ok ({}, {})",
                file_name,
                document.file_version(),
                document.summary()
            ),
            Err(e) => {
                invalid += 1;
                println!("{}: {}", file_name, e);
            }
        }
    }
    if invalid > 0 {
        bail!("{} of {} configuration files are invalid", invalid, found.len());
    }
    Ok(())
}
