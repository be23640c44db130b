//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `bufconfig` command-line tool. Each subcommand is defined in its own file
//! with an `Args` struct derived using `clap` and an `execute` function.
//!
//! Both commands work on the same set of files: whatever configuration files
//! are present directly in the target directory, found through
//! [`discover`].

pub mod format;
pub mod validate;

use bufconfig::bucket::{self, Bucket, ConfigFile};
use bufconfig::buf_lock::BufLockFile;
use bufconfig::buf_policy_yaml::BufPolicyYamlFile;
use bufconfig::buf_work_yaml::BufWorkYamlFile;
use bufconfig::buf_yaml::BufYamlFile;
use bufconfig::error::Result;
use bufconfig::file_version::{FileType, FileVersion};
use bufconfig::generate::BufGenYamlFile;
use log::debug;

/// One parsed configuration file.
pub enum Document {
    BufYaml(BufYamlFile),
    BufWorkYaml(BufWorkYamlFile),
    BufGenYaml(BufGenYamlFile),
    BufLock(BufLockFile),
    BufPolicyYaml(BufPolicyYamlFile),
}

impl Document {
    pub fn file_version(&self) -> FileVersion {
        match self {
            Document::BufYaml(f) => f.file_version(),
            Document::BufWorkYaml(f) => f.file_version(),
            Document::BufGenYaml(f) => f.file_version(),
            Document::BufLock(f) => f.file_version(),
            Document::BufPolicyYaml(f) => f.file_version(),
        }
    }

    /// A one-line description of what the file holds.
    pub fn summary(&self) -> String {
        match self {
            Document::BufYaml(f) => plural(f.module_configs().len(), "module"),
            Document::BufWorkYaml(f) => plural(f.directory_paths().len(), "directory"),
            Document::BufGenYaml(f) => plural(f.generate_config().plugins().len(), "plugin"),
            Document::BufLock(f) => plural(f.deps().len(), "dependency"),
            Document::BufPolicyYaml(f) => match f.name() {
                Some(name) => format!("policy {}", name),
                None => "unnamed policy".to_string(),
            },
        }
    }

    /// Write this file back under `prefix` in canonical form.
    pub fn put(&self, bucket: &dyn Bucket, prefix: &str) -> Result<()> {
        match self {
            Document::BufYaml(f) => bucket::put_for_prefix(bucket, prefix, f),
            Document::BufWorkYaml(f) => bucket::put_for_prefix(bucket, prefix, f),
            Document::BufGenYaml(f) => bucket::put_for_prefix(bucket, prefix, f),
            Document::BufLock(f) => bucket::put_for_prefix(bucket, prefix, f),
            Document::BufPolicyYaml(f) => bucket::put_for_prefix(bucket, prefix, f),
        }
    }

    /// The canonical bytes `put` would write.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let bucket = bucket::MemoryBucket::new();
        self.put(&bucket, ".")?;
        bucket.read_path(self.file_type().canonical_file_name())
    }

    pub fn file_type(&self) -> FileType {
        match self {
            Document::BufYaml(_) => FileType::BufYAML,
            Document::BufWorkYaml(_) => FileType::BufWorkYAML,
            Document::BufGenYaml(_) => FileType::BufGenYAML,
            Document::BufLock(_) => FileType::BufLock,
            Document::BufPolicyYaml(_) => FileType::BufPolicyYAML,
        }
    }
}

/// A configuration file found in the target directory.
pub struct Found {
    pub file_type: FileType,
    pub result: Result<Document>,
}

/// Every file type, in the order commands report them.
const FILE_TYPES: [FileType; 5] = [
    FileType::BufYAML,
    FileType::BufWorkYAML,
    FileType::BufGenYAML,
    FileType::BufLock,
    FileType::BufPolicyYAML,
];

/// Find and parse every configuration file directly under `prefix`.
///
/// A file that exists but does not parse is reported in its `Found` entry
/// rather than stopping discovery.
pub fn discover(bucket: &dyn Bucket, prefix: &str) -> Result<Vec<Found>> {
    let mut found = Vec::new();
    for file_type in FILE_TYPES {
        let present = match file_type {
            FileType::BufYAML => bucket::exists_for_prefix::<BufYamlFile>(bucket, prefix),
            FileType::BufWorkYAML => bucket::exists_for_prefix::<BufWorkYamlFile>(bucket, prefix),
            FileType::BufGenYAML => bucket::exists_for_prefix::<BufGenYamlFile>(bucket, prefix),
            FileType::BufLock => bucket::exists_for_prefix::<BufLockFile>(bucket, prefix),
            FileType::BufPolicyYAML => bucket::exists_for_prefix::<BufPolicyYamlFile>(bucket, prefix),
        };
        let present = match present {
            Ok(present) => present,
            Err(e) => {
                found.push(Found {
                    file_type,
                    result: Err(e),
                });
                continue;
            }
        };
        if !present {
            debug!("no {} under {:?}", file_type, prefix);
            continue;
        }
        let result = match file_type {
            FileType::BufYAML => get(bucket, prefix, Document::BufYaml),
            FileType::BufWorkYAML => get(bucket, prefix, Document::BufWorkYaml),
            FileType::BufGenYAML => get(bucket, prefix, Document::BufGenYaml),
            FileType::BufLock => get(bucket, prefix, Document::BufLock),
            FileType::BufPolicyYAML => get(bucket, prefix, Document::BufPolicyYaml),
        };
        found.push(Found { file_type, result });
    }
    Ok(found)
}

fn get<F: ConfigFile>(bucket: &dyn Bucket, prefix: &str, wrap: fn(F) -> Document) -> Result<Document> {
    bucket::get_for_prefix::<F>(bucket, prefix).map(wrap)
}

fn plural(count: usize, noun: &str) -> String {
    match (count, noun.strip_suffix('y')) {
        (1, _) => format!("1 {}", noun),
        (n, Some(stem)) => format!("{} {}ies", n, stem),
        (n, None) => format!("{} {}s", n, noun),
    }
}
