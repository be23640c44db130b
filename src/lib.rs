//! # bufconfig
//!
//! This library reads, validates and writes the configuration files of a
//! Protocol Buffers workspace: `buf.yaml`, `buf.work.yaml`, `buf.gen.yaml`,
//! `buf.lock` and `buf.policy.yaml`. Every supported version of each file is
//! decoded into one version-independent model, and that model can be written
//! back out in canonical form. The `bufconfig` command-line tool is a thin
//! layer over it.
//!
//! ## Quick Example
//!
//! ```
//! use bufconfig::buf_yaml::BufYamlFile;
//! use bufconfig::check::CheckSettings;
//!
//! let file = BufYamlFile::parse(
//!     b"version: v2\nmodules:\n- path: proto\n  lint:\n    use: [BASIC]\n",
//! )
//! .unwrap();
//! let module = &file.module_configs()[0];
//! assert_eq!(module.dir_path(), "proto");
//! assert_eq!(module.lint_config().use_ids(), &["BASIC"]);
//!
//! let written = String::from_utf8(file.to_bytes().unwrap()).unwrap();
//! assert!(written.starts_with("version: v2\n"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Versions (`file_version`)**: every file kind declares the versions it
//!   may be written in and the names it may appear under.
//! - **Check settings (`check`)**: lint and breaking configurations share one
//!   set of rule selections and ignores, plus per-kind options.
//! - **Modules (`module_config`)**: the unit a `buf.yaml` describes, with a
//!   directory, an optional name, include/exclude paths and effective lint and
//!   breaking settings.
//! - **Resolution and factoring (`resolve`, `factor`)**: V2 files share lint
//!   and breaking blocks across modules. Reading resolves them into effective
//!   per-module settings; writing factors shared settings back out.
//! - **Buckets (`bucket`)**: the only place bytes meet storage. Each file kind
//!   has get, put and exists helpers keyed by directory prefix.

pub mod bucket;
pub mod buf_lock;
pub mod buf_policy_yaml;
pub mod buf_work_yaml;
pub mod buf_yaml;
pub mod check;
pub mod encoding;
pub mod error;
pub mod factor;
pub mod file_version;
pub mod generate;
pub mod input_config;
pub mod module_config;
pub mod module_name;
pub mod path;
pub mod path_validation;
pub mod resolve;

#[cfg(test)]
mod path_proptest;
