//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! `bufconfig`. It uses the `thiserror` library to create a single `Error`
//! enum that covers every failure mode of reading, validating and writing
//! configuration files.
//!
//! ## Categories
//!
//! - **Malformed input** (`Decode`): the bytes could not be decoded, or an
//!   unknown field was present. Carries the file name and the version that
//!   was attempted.
//! - **Unsupported version** (`UnsupportedVersion`): the version string is
//!   unknown, or is known but not legal for the file type.
//! - **Invalid configuration shape** (`InvalidConfig`): a tagged union had the
//!   wrong number of discriminants set, an option was not allowed for a
//!   variant, two mutually exclusive options were both set, and so on.
//! - **Invalid path** (`InvalidPath`): any violation of the include/exclude
//!   path rules or of path normalization.
//! - **Internal** (`Internal`): a value escaped validation that should have
//!   been impossible. This is a logic defect and never the user's mistake.
//!
//! `NotFound` is returned by buckets when a path does not exist, and `Io`
//! wraps storage failures. `Yaml` and `Json` only come from encoding a model
//! that has already been validated, so like `Internal` they are defects.
//! Decoding failures are always reported as `Decode`.

use crate::file_version::{FileType, FileVersion};
use thiserror::Error;

/// Main error type for bufconfig operations
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be decoded, or it contained unknown fields.
    #[error("Could not decode {file_name}{}: {message}", file_version.map(|v| format!(" as version {}", v)).unwrap_or_default())]
    Decode {
        file_name: String,
        /// The version the decoder attempted, if it got that far.
        file_version: Option<FileVersion>,
        message: String,
    },

    /// The version string is unknown or not supported for this file type.
    #[error("Unsupported version for {file_type}: {message}")]
    UnsupportedVersion { file_type: FileType, message: String },

    /// The configuration decoded but its shape is not legal.
    ///
    /// An optional hint describes how to fix the configuration.
    #[error("Invalid configuration: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    InvalidConfig {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A path is malformed or violates the include/exclude rules.
    #[error("Invalid path: {message}")]
    InvalidPath { message: String },

    /// A value reached a point it never should have.
    #[error("Internal error (this is a bug, please report it): {message}")]
    Internal { message: String },

    /// A bucket lookup found nothing at the given path.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML encoding error, wrapped from `serde_yaml::Error`.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON encoding error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an `InvalidConfig` error without a hint.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
            hint: None,
        }
    }

    /// Shorthand for an `InvalidPath` error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Error::InvalidPath {
            message: message.into(),
        }
    }

    /// Shorthand for an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Returns true if the error describes a problem with the user's input
    /// rather than a defect in this library.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Error::Internal { .. } | Error::Yaml(_) | Error::Json(_))
    }

    /// Returns true if this is a bucket `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
