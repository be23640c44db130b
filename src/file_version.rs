//! # File Versions and File Types
//!
//! Every configuration file carries a `version` key that selects one of three
//! schema generations. This module holds the closed set of versions, the set
//! of file types, and the read-only lookup tables that say which versions a
//! file type accepts, under which file names it may appear, and which version
//! is assumed when the `version` key is missing.

use crate::error::{Error, Result};
use std::fmt;

/// A schema generation, ordered by recency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileVersion {
    V1Beta1,
    V1,
    V2,
}

impl FileVersion {
    /// All versions, oldest first.
    pub const ALL: [FileVersion; 3] = [FileVersion::V1Beta1, FileVersion::V1, FileVersion::V2];

    /// The string used for this version in the `version` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileVersion::V1Beta1 => "v1beta1",
            FileVersion::V1 => "v1",
            FileVersion::V2 => "v2",
        }
    }

    /// Parses a version string without regard to file type.
    pub fn parse(s: &str) -> Option<FileVersion> {
        match s {
            "v1beta1" => Some(FileVersion::V1Beta1),
            "v1" => Some(FileVersion::V1),
            "v2" => Some(FileVersion::V2),
            _ => None,
        }
    }
}

impl fmt::Display for FileVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kinds of configuration files this crate knows how to read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    BufYAML,
    BufWorkYAML,
    BufGenYAML,
    BufLock,
    BufPolicyYAML,
}

impl FileType {
    /// The versions this file type may be written in.
    pub fn supported_versions(&self) -> &'static [FileVersion] {
        match self {
            FileType::BufYAML | FileType::BufLock => &FileVersion::ALL,
            FileType::BufWorkYAML => &[FileVersion::V1],
            FileType::BufGenYAML => &[FileVersion::V1, FileVersion::V2],
            FileType::BufPolicyYAML => &[FileVersion::V2],
        }
    }

    /// The file names this file type may appear under for a given version.
    ///
    /// The first name is canonical and is the one used on write. Any further
    /// names are legacy names accepted on read.
    pub fn file_names(&self, file_version: FileVersion) -> &'static [&'static str] {
        match (self, file_version) {
            (FileType::BufYAML, FileVersion::V1Beta1 | FileVersion::V1) => &["buf.yaml", "buf.mod"],
            (FileType::BufYAML, FileVersion::V2) => &["buf.yaml"],
            (FileType::BufWorkYAML, FileVersion::V1) => &["buf.work.yaml", "buf.work"],
            (FileType::BufGenYAML, FileVersion::V1 | FileVersion::V2) => &["buf.gen.yaml"],
            (FileType::BufLock, _) => &["buf.lock"],
            (FileType::BufPolicyYAML, FileVersion::V2) => &["buf.policy.yaml"],
            _ => &[],
        }
    }

    /// Every file name this file type may appear under, across versions, in
    /// lookup order.
    pub fn all_file_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for file_version in self.supported_versions() {
            for name in self.file_names(*file_version) {
                if !names.contains(name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// The canonical file name, used when writing.
    pub fn canonical_file_name(&self) -> &'static str {
        self.all_file_names()
            .first()
            .copied()
            .unwrap_or("buf.yaml")
    }

    /// The version assumed when a document has no `version` key, if any.
    pub fn default_version(&self) -> Option<FileVersion> {
        match self {
            FileType::BufYAML | FileType::BufLock => Some(FileVersion::V1Beta1),
            FileType::BufWorkYAML | FileType::BufGenYAML | FileType::BufPolicyYAML => None,
        }
    }

    /// Resolves the raw `version` value of a document into a version that is
    /// legal for this file type.
    pub fn resolve_version(&self, raw: Option<&str>) -> Result<FileVersion> {
        let file_version = match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => self.default_version().ok_or_else(|| Error::UnsupportedVersion {
                file_type: *self,
                message: format!(
                    "no version set, set \"version\" to one of {}",
                    self.version_list()
                ),
            })?,
            Some(raw) => FileVersion::parse(raw).ok_or_else(|| Error::UnsupportedVersion {
                file_type: *self,
                message: format!(
                    "unknown version {:?}, must be one of {}",
                    raw,
                    self.version_list()
                ),
            })?,
        };
        self.check_supported(file_version)?;
        Ok(file_version)
    }

    /// Fails if the version is not legal for this file type.
    pub fn check_supported(&self, file_version: FileVersion) -> Result<()> {
        if self.supported_versions().contains(&file_version) {
            return Ok(());
        }
        Err(Error::UnsupportedVersion {
            file_type: *self,
            message: format!(
                "version {} is not supported, must be one of {}",
                file_version,
                self.version_list()
            ),
        })
    }

    /// Checks that a file read under `file_name` may hold `file_version`.
    /// Only the last path component is compared, and names that are not
    /// names of this file type at all are left to the caller.
    pub fn check_file_name(&self, file_name: &str, file_version: FileVersion) -> Result<()> {
        let base = file_name.rsplit('/').next().unwrap_or(file_name);
        if !self.all_file_names().contains(&base) {
            return Ok(());
        }
        let legal = self.file_names(file_version);
        if legal.contains(&base) {
            return Ok(());
        }
        Err(Error::UnsupportedVersion {
            file_type: *self,
            message: format!(
                "version {} cannot be used in a file named {}, rename it to {}",
                file_version,
                base,
                legal.first().copied().unwrap_or(self.canonical_file_name())
            ),
        })
    }

    fn version_list(&self) -> String {
        self.supported_versions()
            .iter()
            .map(|v| format!("{:?}", v.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_file_name())
    }
}
