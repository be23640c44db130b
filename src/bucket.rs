//! # Buckets
//!
//! A bucket is the storage boundary configuration files are read from and
//! written to. This crate never touches storage anywhere else: parsing and
//! encoding work on byte buffers, and the helpers here move those buffers in
//! and out of a bucket under the right file name.
//!
//! Two buckets are provided. [`MemoryBucket`] keeps files in a map and is
//! what tests use. [`DirBucket`] is rooted at a directory on disk and
//! writes through a uniquely named temporary file that is then renamed into
//! place, so a reader never sees a half-written file.

use crate::buf_lock::BufLockFile;
use crate::buf_policy_yaml::BufPolicyYamlFile;
use crate::buf_work_yaml::BufWorkYamlFile;
use crate::buf_yaml::BufYamlFile;
use crate::error::{Error, Result};
use crate::file_version::{FileType, FileVersion};
use crate::generate::BufGenYamlFile;
use crate::path;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

/// Storage for configuration files, addressed by normalized relative path.
pub trait Bucket {
    /// Read the file at `path`, or `Error::NotFound` if there is none.
    fn read_path(&self, path: &str) -> Result<Vec<u8>>;

    /// Replace the file at `path` in one step.
    fn write_path_atomic(&self, path: &str, data: &[u8]) -> Result<()>;
}

/// An in-memory bucket.
#[derive(Debug, Default)]
pub struct MemoryBucket {
    files: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bucket holding the given files.
    pub fn with_files<P: AsRef<str>, D: AsRef<[u8]>>(files: &[(P, D)]) -> Result<Self> {
        let bucket = Self::new();
        for (file_path, data) in files {
            bucket.write_path_atomic(file_path.as_ref(), data.as_ref())?;
        }
        Ok(bucket)
    }

    /// All stored paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl Bucket for MemoryBucket {
    fn read_path(&self, file_path: &str) -> Result<Vec<u8>> {
        let file_path = path::normalize(file_path)?;
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&file_path)
            .cloned()
            .ok_or(Error::NotFound { path: file_path })
    }

    fn write_path_atomic(&self, file_path: &str, data: &[u8]) -> Result<()> {
        let file_path = path::normalize(file_path)?;
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_path, data.to_vec());
        Ok(())
    }
}

/// A bucket rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DirBucket {
    root: PathBuf,
}

impl DirBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn full_path(&self, file_path: &str) -> Result<PathBuf> {
        let file_path = path::normalize(file_path)?;
        Ok(file_path.split('/').fold(self.root.clone(), |acc, part| {
            if part == "." {
                acc
            } else {
                acc.join(part)
            }
        }))
    }
}

impl Bucket for DirBucket {
    fn read_path(&self, file_path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(file_path)?;
        match fs::read(&full_path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::NotFound {
                path: full_path.display().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn write_path_atomic(&self, file_path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(file_path)?;
        let parent = full_path
            .parent()
            .ok_or_else(|| Error::internal(format!("{} has no parent", full_path.display())))?;
        fs::create_dir_all(parent)?;
        let file_name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".tmp")
            .tempfile_in(parent)?;
        temp.write_all(data)?;
        temp.persist(&full_path).map_err(|e| Error::from(e.error))?;
        debug!("wrote {}", full_path.display());
        Ok(())
    }
}

/// A configuration file that lives in a bucket under a known name.
pub trait ConfigFile: Sized {
    const FILE_TYPE: FileType;

    fn parse_from(file_name: &str, data: &[u8]) -> Result<Self>;

    fn file_version(&self) -> FileVersion;

    fn encode(&self) -> Result<Vec<u8>>;

    fn header_comment(&self) -> Option<&'static str>;
}

impl ConfigFile for BufYamlFile {
    const FILE_TYPE: FileType = FileType::BufYAML;

    fn parse_from(file_name: &str, data: &[u8]) -> Result<Self> {
        BufYamlFile::parse_named(file_name, data, false)
    }

    fn file_version(&self) -> FileVersion {
        BufYamlFile::file_version(self)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        self.to_bytes()
    }

    fn header_comment(&self) -> Option<&'static str> {
        self.header()
    }
}

impl ConfigFile for BufWorkYamlFile {
    const FILE_TYPE: FileType = FileType::BufWorkYAML;

    fn parse_from(file_name: &str, data: &[u8]) -> Result<Self> {
        BufWorkYamlFile::parse_named(file_name, data)
    }

    fn file_version(&self) -> FileVersion {
        BufWorkYamlFile::file_version(self)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        self.to_bytes()
    }

    fn header_comment(&self) -> Option<&'static str> {
        self.header()
    }
}

impl ConfigFile for BufGenYamlFile {
    const FILE_TYPE: FileType = FileType::BufGenYAML;

    fn parse_from(file_name: &str, data: &[u8]) -> Result<Self> {
        BufGenYamlFile::parse_named(file_name, data)
    }

    fn file_version(&self) -> FileVersion {
        BufGenYamlFile::file_version(self)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        self.to_bytes()
    }

    fn header_comment(&self) -> Option<&'static str> {
        self.header()
    }
}

impl ConfigFile for BufLockFile {
    const FILE_TYPE: FileType = FileType::BufLock;

    fn parse_from(file_name: &str, data: &[u8]) -> Result<Self> {
        BufLockFile::parse_named(file_name, data)
    }

    fn file_version(&self) -> FileVersion {
        BufLockFile::file_version(self)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        self.to_bytes()
    }

    fn header_comment(&self) -> Option<&'static str> {
        self.header()
    }
}

impl ConfigFile for BufPolicyYamlFile {
    const FILE_TYPE: FileType = FileType::BufPolicyYAML;

    fn parse_from(file_name: &str, data: &[u8]) -> Result<Self> {
        BufPolicyYamlFile::parse_named(file_name, data)
    }

    fn file_version(&self) -> FileVersion {
        BufPolicyYamlFile::file_version(self)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        self.to_bytes()
    }

    fn header_comment(&self) -> Option<&'static str> {
        self.header()
    }
}

/// Find the one file of type `F` under `prefix`, returning its name and
/// contents. Legacy names are accepted with a warning; two names at once
/// is an error.
fn find_for_prefix<F: ConfigFile>(bucket: &dyn Bucket, prefix: &str) -> Result<Option<(String, Vec<u8>)>> {
    let prefix = path::normalize(prefix)?;
    let mut found: Vec<(String, Vec<u8>)> = Vec::new();
    for file_name in F::FILE_TYPE.all_file_names() {
        let file_path = path::join(&prefix, file_name);
        match bucket.read_path(&file_path) {
            Ok(data) => found.push((file_path, data)),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }
    }
    match found.len() {
        0 => Ok(None),
        1 => {
            let (file_path, data) = found.remove(0);
            if !file_path.ends_with(F::FILE_TYPE.canonical_file_name()) {
                warn!(
                    "{} uses a legacy file name; rename it to {}",
                    file_path,
                    F::FILE_TYPE.canonical_file_name()
                );
            }
            debug!("found {} for prefix {:?}", file_path, prefix);
            Ok(Some((file_path, data)))
        }
        _ => {
            let names: Vec<&str> = found.iter().map(|(p, _)| p.as_str()).collect();
            Err(Error::InvalidConfig {
                message: format!("found more than one {} file: {}", F::FILE_TYPE, names.join(", ")),
                hint: Some("keep only one of them".to_string()),
            })
        }
    }
}

/// Read and parse the file of type `F` under `prefix`.
pub fn get_for_prefix<F: ConfigFile>(bucket: &dyn Bucket, prefix: &str) -> Result<F> {
    match find_for_prefix::<F>(bucket, prefix)? {
        Some((file_path, data)) => F::parse_from(&file_path, &data),
        None => Err(Error::NotFound {
            path: path::join(&path::normalize(prefix)?, F::FILE_TYPE.canonical_file_name()),
        }),
    }
}

/// Whether a file of type `F` exists under `prefix`.
pub fn exists_for_prefix<F: ConfigFile>(bucket: &dyn Bucket, prefix: &str) -> Result<bool> {
    Ok(find_for_prefix::<F>(bucket, prefix)?.is_some())
}

/// Write `file` under `prefix` with its canonical name and header comment.
pub fn put_for_prefix<F: ConfigFile>(bucket: &dyn Bucket, prefix: &str, file: &F) -> Result<()> {
    let mut data = file.header_comment().unwrap_or_default().as_bytes().to_vec();
    data.extend(file.encode()?);
    let file_path = path::join(&path::normalize(prefix)?, F::FILE_TYPE.canonical_file_name());
    bucket.write_path_atomic(&file_path, &data)
}

pub fn get_buf_yaml_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<BufYamlFile> {
    get_for_prefix(bucket, prefix)
}

pub fn put_buf_yaml_file_for_prefix(bucket: &dyn Bucket, prefix: &str, file: &BufYamlFile) -> Result<()> {
    put_for_prefix(bucket, prefix, file)
}

pub fn exists_buf_yaml_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<bool> {
    exists_for_prefix::<BufYamlFile>(bucket, prefix)
}

pub fn get_buf_work_yaml_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<BufWorkYamlFile> {
    get_for_prefix(bucket, prefix)
}

pub fn put_buf_work_yaml_file_for_prefix(
    bucket: &dyn Bucket,
    prefix: &str,
    file: &BufWorkYamlFile,
) -> Result<()> {
    put_for_prefix(bucket, prefix, file)
}

pub fn exists_buf_work_yaml_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<bool> {
    exists_for_prefix::<BufWorkYamlFile>(bucket, prefix)
}

pub fn get_buf_gen_yaml_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<BufGenYamlFile> {
    get_for_prefix(bucket, prefix)
}

pub fn put_buf_gen_yaml_file_for_prefix(
    bucket: &dyn Bucket,
    prefix: &str,
    file: &BufGenYamlFile,
) -> Result<()> {
    put_for_prefix(bucket, prefix, file)
}

pub fn exists_buf_gen_yaml_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<bool> {
    exists_for_prefix::<BufGenYamlFile>(bucket, prefix)
}

pub fn get_buf_lock_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<BufLockFile> {
    get_for_prefix(bucket, prefix)
}

pub fn put_buf_lock_file_for_prefix(bucket: &dyn Bucket, prefix: &str, file: &BufLockFile) -> Result<()> {
    put_for_prefix(bucket, prefix, file)
}

pub fn exists_buf_lock_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<bool> {
    exists_for_prefix::<BufLockFile>(bucket, prefix)
}

pub fn get_buf_policy_yaml_file_for_prefix(
    bucket: &dyn Bucket,
    prefix: &str,
) -> Result<BufPolicyYamlFile> {
    get_for_prefix(bucket, prefix)
}

pub fn put_buf_policy_yaml_file_for_prefix(
    bucket: &dyn Bucket,
    prefix: &str,
    file: &BufPolicyYamlFile,
) -> Result<()> {
    put_for_prefix(bucket, prefix, file)
}

pub fn exists_buf_policy_yaml_file_for_prefix(bucket: &dyn Bucket, prefix: &str) -> Result<bool> {
    exists_for_prefix::<BufPolicyYamlFile>(bucket, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bucket_not_found() {
        let bucket = MemoryBucket::new();
        let err = bucket.read_path("buf.yaml").unwrap_err();
        assert!(err.is_not_found());
        assert!(!exists_buf_yaml_file_for_prefix(&bucket, ".").unwrap());
        assert!(get_buf_lock_file_for_prefix(&bucket, "proto").unwrap_err().is_not_found());
    }

    #[test]
    fn test_put_writes_header_and_canonical_form() {
        let bucket = MemoryBucket::new();
        let file = BufYamlFile::parse(b"version: v2\nmodules:\n- path: proto\n").unwrap();
        put_buf_yaml_file_for_prefix(&bucket, "workspace", &file).unwrap();
        assert_eq!(bucket.paths(), vec!["workspace/buf.yaml"]);
        let data = String::from_utf8(bucket.read_path("workspace/buf.yaml").unwrap()).unwrap();
        assert!(data.starts_with("# For details on buf.yaml configuration"));
        assert!(data.ends_with("version: v2\nmodules:\n- path: proto\n"));
        let reread = get_buf_yaml_file_for_prefix(&bucket, "workspace").unwrap();
        assert_eq!(reread, file);
    }

    #[test]
    fn test_legacy_name_is_found() {
        let bucket = MemoryBucket::with_files(&[("buf.work", "version: v1\ndirectories: [proto]\n")]).unwrap();
        let file = get_buf_work_yaml_file_for_prefix(&bucket, ".").unwrap();
        assert_eq!(file.directory_paths(), &["proto"]);
    }

    #[test]
    fn test_two_names_at_once() {
        let bucket = MemoryBucket::with_files(&[
            ("buf.yaml", "version: v1\n"),
            ("buf.mod", "version: v1\n"),
        ])
        .unwrap();
        let err = get_buf_yaml_file_for_prefix(&bucket, ".").unwrap_err();
        assert!(err.to_string().contains("more than one"), "{}", err);
    }

    #[test]
    fn test_dir_bucket_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = DirBucket::new(dir.path());
        assert!(bucket.read_path("buf.lock").unwrap_err().is_not_found());
        bucket.write_path_atomic("nested/buf.work.yaml", b"version: v1\ndirectories: [a]\n").unwrap();
        assert!(exists_buf_work_yaml_file_for_prefix(&bucket, "nested").unwrap());
        let names: Vec<String> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["buf.work.yaml"]);
    }

    #[test]
    fn test_dir_bucket_concurrent_writes_to_one_path() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = DirBucket::new(dir.path());
        let contents: Vec<String> = (0..8)
            .map(|i| format!("version: v1\ndirectories: [m{}]\n", i))
            .collect();
        std::thread::scope(|scope| {
            for data in &contents {
                let bucket = &bucket;
                scope.spawn(move || {
                    bucket
                        .write_path_atomic("buf.work.yaml", data.as_bytes())
                        .unwrap();
                });
            }
        });
        let written = String::from_utf8(bucket.read_path("buf.work.yaml").unwrap()).unwrap();
        assert!(contents.contains(&written), "{}", written);
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["buf.work.yaml"]);
    }

    #[test]
    fn test_legacy_name_with_new_version_is_rejected() {
        let bucket = MemoryBucket::with_files(&[("proto/buf.mod", "version: v2\n")]).unwrap();
        let err = get_buf_yaml_file_for_prefix(&bucket, "proto").unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }), "{}", err);
        assert!(err.to_string().contains("named buf.mod"), "{}", err);

        let bucket = MemoryBucket::with_files(&[("proto/buf.mod", "version: v1\n")]).unwrap();
        let file = get_buf_yaml_file_for_prefix(&bucket, "proto").unwrap();
        assert_eq!(file.file_version(), FileVersion::V1);
    }
}
