//! # buf.work.yaml
//!
//! The V1 workspace file. It lists the module directories of a workspace,
//! relative to the directory holding the file.

use crate::encoding;
use crate::error::{Error, Result};
use crate::file_version::{FileType, FileVersion};
use crate::path;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufWorkYamlFileV1 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    directories: Vec<String>,
}

/// A parsed `buf.work.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufWorkYamlFile {
    file_version: FileVersion,
    directory_paths: Vec<String>,
}

impl BufWorkYamlFile {
    /// Validate and normalize a list of workspace directories.
    ///
    /// Directories must be distinct, must not be the workspace root, and
    /// must not contain one another.
    pub fn new<S: AsRef<str>>(file_version: FileVersion, directories: &[S]) -> Result<Self> {
        FileType::BufWorkYAML.check_supported(file_version)?;
        if directories.is_empty() {
            return Err(Error::InvalidConfig {
                message: "directories is empty".to_string(),
                hint: Some("list at least one module directory".to_string()),
            });
        }
        let mut directory_paths = Vec::with_capacity(directories.len());
        for directory in directories {
            let normalized = path::normalize(directory.as_ref())?;
            if normalized == "." {
                return Err(Error::invalid_path(format!(
                    "directory {:?} is equal to the workspace root, which is not allowed",
                    directory.as_ref()
                )));
            }
            if directory_paths.contains(&normalized) {
                return Err(Error::invalid_path(format!(
                    "directory {:?} is listed more than once",
                    normalized
                )));
            }
            directory_paths.push(normalized);
        }
        directory_paths.sort();
        for (i, outer) in directory_paths.iter().enumerate() {
            if let Some(inner) = directory_paths[i + 1..]
                .iter()
                .find(|inner| path::contains(outer, inner))
            {
                return Err(Error::invalid_path(format!(
                    "directory {:?} contains directory {:?}, which is not allowed",
                    outer, inner
                )));
            }
        }
        Ok(Self {
            file_version,
            directory_paths,
        })
    }

    /// Parse a `buf.work.yaml`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_named(FileType::BufWorkYAML.canonical_file_name(), data)
    }

    pub fn parse_named(file_name: &str, data: &[u8]) -> Result<Self> {
        let raw_version = encoding::read_version(file_name, data, false)?;
        let file_version = FileType::BufWorkYAML.resolve_version(raw_version.as_deref())?;
        FileType::BufWorkYAML.check_file_name(file_name, file_version)?;
        debug!("reading {} as version {}", file_name, file_version);
        let external: ExternalBufWorkYamlFileV1 =
            encoding::decode(file_name, Some(file_version), data, false)?;
        Self::new(file_version, &external.directories)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encoding::encode_yaml(&ExternalBufWorkYamlFileV1 {
            version: self.file_version.to_string(),
            directories: self.directory_paths.clone(),
        })
    }

    pub fn header(&self) -> Option<&'static str> {
        Some("# For details on buf.work.yaml configuration, visit https://buf.build/docs/configuration/v1/buf-work-yaml\n")
    }

    pub fn file_type(&self) -> FileType {
        FileType::BufWorkYAML
    }

    pub fn file_version(&self) -> FileVersion {
        self.file_version
    }

    /// The workspace directories, sorted.
    pub fn directory_paths(&self) -> &[String] {
        &self.directory_paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_sort() {
        let file = BufWorkYamlFile::parse(b"version: v1\ndirectories:\n- proto\n- vendor/./ext\n- api\n").unwrap();
        assert_eq!(file.directory_paths(), &["api", "proto", "vendor/ext"]);
        assert_eq!(
            String::from_utf8(file.to_bytes().unwrap()).unwrap(),
            "version: v1\ndirectories:\n- api\n- proto\n- vendor/ext\n"
        );
    }

    #[test]
    fn test_version_is_required() {
        let err = BufWorkYamlFile::parse(b"directories: [proto]\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
        let err = BufWorkYamlFile::parse(b"version: v2\ndirectories: [proto]\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_invalid_directories() {
        let cases: &[(&[u8], &str)] = &[
            (b"version: v1\ndirectories: [.]\n", "workspace root"),
            (b"version: v1\ndirectories: [a, a/]\n", "more than once"),
            (b"version: v1\ndirectories: [a, a/b]\n", "contains directory"),
            (b"version: v1\ndirectories: [../a]\n", ""),
            (b"version: v1\n", "directories is empty"),
        ];
        for (data, fragment) in cases {
            let err = BufWorkYamlFile::parse(data).unwrap_err();
            assert!(err.to_string().contains(fragment), "{}", err);
        }
    }

    #[test]
    fn test_unknown_field() {
        let err = BufWorkYamlFile::parse(b"version: v1\ndirectories: [a]\nroots: [b]\n").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
