//! # Module Configuration
//!
//! A `ModuleConfig` is one scoped unit of compilation inside a `buf.yaml`:
//! its directory, its optional name, the roots it compiles with their
//! include and exclude paths, and the effective lint and breaking
//! configuration that governs it.
//!
//! The version-specific shape rules are enforced here, so a `ModuleConfig`
//! built programmatically obeys the same invariants as one read from a file:
//!
//! - V1Beta1 and V1 modules live at `.`; V2 modules may live anywhere.
//! - V1 and V2 have exactly one root, `.`. V1Beta1 may have several roots,
//!   which must not overlap.
//! - Only V2 has include paths.
//! - Lint and breaking configs share the module's file version.

use crate::check::{BreakingConfig, CheckSettings, LintConfig};
use crate::error::{Error, Result};
use crate::file_version::FileVersion;
use crate::module_name::ModuleFullName;
use crate::path;
use crate::path_validation::validate_includes_and_excludes;
use std::collections::BTreeMap;

/// One module in a `buf.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleConfig {
    dir_path: String,
    full_name: Option<ModuleFullName>,
    root_to_includes: BTreeMap<String, Vec<String>>,
    root_to_excludes: BTreeMap<String, Vec<String>>,
    lint_config: LintConfig,
    breaking_config: BreakingConfig,
}

impl ModuleConfig {
    /// Build and validate a module config.
    ///
    /// Include and exclude paths are relative to their root. An empty
    /// `root_to_excludes` map means the single root `.` with no excludes.
    pub fn new(
        dir_path: &str,
        full_name: Option<ModuleFullName>,
        root_to_includes: BTreeMap<String, Vec<String>>,
        root_to_excludes: BTreeMap<String, Vec<String>>,
        lint_config: LintConfig,
        breaking_config: BreakingConfig,
    ) -> Result<Self> {
        let file_version = lint_config.file_version();
        if breaking_config.file_version() != file_version {
            return Err(Error::internal(format!(
                "lint config has version {} but breaking config has version {}",
                file_version,
                breaking_config.file_version()
            )));
        }
        let dir_path = path::normalize(dir_path)?;
        if file_version < FileVersion::V2 && dir_path != "." {
            return Err(Error::invalid_config(format!(
                "module directory must be \".\" for version {}, got {:?}",
                file_version, dir_path
            )));
        }

        let mut root_to_excludes = normalize_root_map(root_to_excludes)?;
        if root_to_excludes.is_empty() {
            root_to_excludes.insert(".".to_string(), Vec::new());
        }
        let mut root_to_includes = normalize_root_map(root_to_includes)?;
        root_to_includes.retain(|_, includes| !includes.is_empty());

        match file_version {
            FileVersion::V1Beta1 => {
                if !root_to_includes.is_empty() {
                    return Err(Error::invalid_config(
                        "include paths are not available in version v1beta1",
                    ));
                }
                validate_roots(&root_to_excludes)?;
                for excludes in root_to_excludes.values_mut() {
                    excludes.sort();
                }
            }
            FileVersion::V1 | FileVersion::V2 => {
                if root_to_excludes.len() != 1 || !root_to_excludes.contains_key(".") {
                    return Err(Error::invalid_config(format!(
                        "version {} modules have exactly one root \".\", got roots {:?}",
                        file_version,
                        root_to_excludes.keys().collect::<Vec<_>>()
                    )));
                }
                if file_version == FileVersion::V1 && !root_to_includes.is_empty() {
                    return Err(Error::invalid_config(
                        "include paths are not available in version v1",
                    ));
                }
                if root_to_includes.keys().any(|root| root != ".") {
                    return Err(Error::invalid_config(
                        "include paths must belong to the root \".\"",
                    ));
                }
                let includes = root_to_includes.get(".").cloned().unwrap_or_default();
                let excludes = root_to_excludes.get(".").cloned().unwrap_or_default();
                let validated = validate_includes_and_excludes(".", &includes, &excludes)?;
                root_to_excludes.insert(".".to_string(), validated.excludes);
                if !validated.includes.is_empty() {
                    root_to_includes.insert(".".to_string(), validated.includes);
                }
            }
        }

        Ok(Self {
            dir_path,
            full_name,
            root_to_includes,
            root_to_excludes,
            lint_config,
            breaking_config,
        })
    }

    pub fn file_version(&self) -> FileVersion {
        self.lint_config.file_version()
    }

    /// The module directory, relative to the document root.
    pub fn dir_path(&self) -> &str {
        &self.dir_path
    }

    pub fn full_name(&self) -> Option<&ModuleFullName> {
        self.full_name.as_ref()
    }

    /// Root directory to the include paths under it, relative to the root.
    pub fn root_to_includes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.root_to_includes
    }

    /// Root directory to the excluded paths under it, relative to the root.
    pub fn root_to_excludes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.root_to_excludes
    }

    /// Include paths of the single root `.`.
    pub fn includes(&self) -> &[String] {
        self.root_to_includes
            .get(".")
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Exclude paths of the single root `.`.
    pub fn excludes(&self) -> &[String] {
        self.root_to_excludes
            .get(".")
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The effective lint configuration for this module.
    pub fn lint_config(&self) -> &LintConfig {
        &self.lint_config
    }

    /// The effective breaking configuration for this module.
    pub fn breaking_config(&self) -> &BreakingConfig {
        &self.breaking_config
    }
}

fn normalize_root_map(
    root_to_paths: BTreeMap<String, Vec<String>>,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut normalized: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (root, paths) in root_to_paths {
        let root = path::normalize(&root)?;
        let paths = paths
            .iter()
            .map(|p| path::normalize(p))
            .collect::<Result<Vec<_>>>()?;
        normalized.entry(root).or_default().extend(paths);
    }
    Ok(normalized)
}

fn validate_roots(root_to_excludes: &BTreeMap<String, Vec<String>>) -> Result<()> {
    let roots: Vec<&String> = root_to_excludes.keys().collect();
    for root in &roots {
        if let Some(parent) = roots.iter().find(|other| path::contains(other, root)) {
            return Err(Error::invalid_path(format!(
                "root {:?} is contained in root {:?}, roots cannot overlap",
                root, parent
            )));
        }
    }
    for (root, excludes) in root_to_excludes {
        if excludes.iter().any(|p| p.as_str() == ".") {
            return Err(Error::invalid_path(format!(
                "exclude path \".\" would exclude the entire root {:?}",
                root
            )));
        }
        let sorted = path::sort_dedup(excludes.clone());
        if sorted.len() != excludes.len() {
            return Err(Error::invalid_path(format!(
                "duplicate exclude path under root {:?}",
                root
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{BreakingConfig, LintConfig};

    fn lint(v: FileVersion) -> LintConfig {
        LintConfig::default_config(v).clone()
    }

    fn breaking(v: FileVersion) -> BreakingConfig {
        BreakingConfig::default_config(v).clone()
    }

    fn roots(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(root, paths)| (root.to_string(), paths.iter().map(|p| p.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_v1_module_defaults_to_single_root() {
        let module = ModuleConfig::new(
            ".",
            None,
            BTreeMap::new(),
            BTreeMap::new(),
            lint(FileVersion::V1),
            breaking(FileVersion::V1),
        )
        .unwrap();
        assert_eq!(module.dir_path(), ".");
        assert_eq!(module.root_to_excludes().len(), 1);
        assert!(module.excludes().is_empty());
        assert_eq!(module.file_version(), FileVersion::V1);
    }

    #[test]
    fn test_v1_requires_root_directory() {
        let err = ModuleConfig::new(
            "proto",
            None,
            BTreeMap::new(),
            BTreeMap::new(),
            lint(FileVersion::V1),
            breaking(FileVersion::V1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be \".\""));
    }

    #[test]
    fn test_v1beta1_allows_multiple_roots() {
        let module = ModuleConfig::new(
            ".",
            None,
            BTreeMap::new(),
            roots(&[("proto", &["a"]), ("vendor", &[])]),
            lint(FileVersion::V1Beta1),
            breaking(FileVersion::V1Beta1),
        )
        .unwrap();
        assert_eq!(module.root_to_excludes().len(), 2);
        assert_eq!(module.root_to_excludes()["proto"], vec!["a"]);
    }

    #[test]
    fn test_v1beta1_rejects_overlapping_roots() {
        let err = ModuleConfig::new(
            ".",
            None,
            BTreeMap::new(),
            roots(&[("proto", &[]), ("proto/sub", &[])]),
            lint(FileVersion::V1Beta1),
            breaking(FileVersion::V1Beta1),
        )
        .unwrap_err();
        assert!(err.to_string().contains("roots cannot overlap"));
    }

    #[test]
    fn test_v2_rejects_multiple_roots() {
        let err = ModuleConfig::new(
            "proto",
            None,
            BTreeMap::new(),
            roots(&[("a", &[]), ("b", &[])]),
            lint(FileVersion::V2),
            breaking(FileVersion::V2),
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly one root"));
    }

    #[test]
    fn test_v2_validates_includes_and_excludes() {
        let module = ModuleConfig::new(
            "proto",
            Some("buf.build/acme/weather".parse().unwrap()),
            roots(&[(".", &["b", "a"])]),
            roots(&[(".", &["a/x"])]),
            lint(FileVersion::V2),
            breaking(FileVersion::V2),
        )
        .unwrap();
        assert_eq!(module.includes(), &["a", "b"]);
        assert_eq!(module.excludes(), &["a/x"]);
        assert_eq!(module.full_name().unwrap().name(), "weather");

        let err = ModuleConfig::new(
            "proto",
            None,
            roots(&[(".", &["x/y"])]),
            roots(&[(".", &["x"])]),
            lint(FileVersion::V2),
            breaking(FileVersion::V2),
        )
        .unwrap_err();
        assert!(err.to_string().contains("(an exclude path)"));
    }

    #[test]
    fn test_mismatched_versions_are_internal() {
        let err = ModuleConfig::new(
            ".",
            None,
            BTreeMap::new(),
            BTreeMap::new(),
            lint(FileVersion::V2),
            breaking(FileVersion::V1),
        )
        .unwrap_err();
        assert!(!err.is_user_error());
    }
}
