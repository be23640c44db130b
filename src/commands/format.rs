//! # Format Command Implementation
//!
//! This module implements the `format` subcommand. Each configuration file in
//! the target directory is parsed and written back in canonical form: shared
//! lint and breaking settings factored out, lists sorted, defaults omitted.
//! Without `--write` the canonical form is printed; with it the files are
//! replaced in place.
//!
//! A V1 `buf.gen.yaml` comes out as V2.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bufconfig::bucket::DirBucket;

use super::{discover, Document};

/// Print or rewrite configuration files in canonical form
#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Directory holding the configuration files.
    #[arg(value_name = "DIR", default_value = ".")]
    pub dir: PathBuf,

    /// Rewrite the files in place instead of printing them.
    #[arg(short, long)]
    pub write: bool,
}

/// Execute the `format` command.
///
/// Nothing is written unless every file parses.
pub fn execute(args: FormatArgs) -> Result<()> {
    let bucket = DirBucket::new(&args.dir);
    let found = discover(&bucket, ".")?;
    if found.is_empty() {
        bail!("no configuration files found in {}", args.dir.display());
    }
    let mut documents = Vec::with_capacity(found.len());
    for entry in found {
        let file_name = entry.file_type.canonical_file_name();
        let document = entry.result.with_context(|| format!("cannot format {}", file_name))?;
        documents.push((file_name, document));
    }

    if args.write {
        for (file_name, document) in &documents {
            document
                .put(&bucket, ".")
                .with_context(|| format!("failed to write {}", file_name))?;
            remove_legacy_names(&args.dir, document)?;
            println!("formatted {}", args.dir.join(file_name).display());
        }
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    let many = documents.len() > 1;
    for (i, (file_name, document)) in documents.iter().enumerate() {
        if many {
            if i > 0 {
                writeln!(stdout)?;
            }
            writeln!(stdout, "# ==> {} <==", file_name)?;
        }
        stdout.write_all(&document.canonical_bytes()?)?;
    }
    Ok(())
}

/// Files read under a legacy name are written back under the canonical one,
/// so the legacy file has to go.
fn remove_legacy_names(dir: &Path, document: &Document) -> Result<()> {
    for name in document.file_type().all_file_names().into_iter().skip(1) {
        let legacy = dir.join(name);
        if legacy.is_file() {
            fs::remove_file(&legacy).with_context(|| format!("failed to remove {}", legacy.display()))?;
            log::info!("removed legacy file {}", legacy.display());
        }
    }
    Ok(())
}
