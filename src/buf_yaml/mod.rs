//! # buf.yaml
//!
//! A `buf.yaml` describes one module (V1Beta1, V1) or a workspace of modules
//! (V2), together with lint and breaking configuration, dependencies and, in
//! V2, check plugins. All three versions read into the same `BufYamlFile`
//! model, where every module carries its *effective* lint and breaking
//! configuration.
//!
//! Writing goes the other way: the effective configs are factored back into a
//! shared block and per-module blocks (see [`crate::factor`]), producing a
//! minimal document whose output does not depend on input order.
//!
//! ## Example
//!
//! ```
//! use bufconfig::buf_yaml::BufYamlFile;
//! use bufconfig::check::CheckSettings;
//!
//! let data = b"version: v2
//! modules:
//! - path: proto/b
//! - path: proto/a
//! lint:
//!   use:
//!   - STANDARD
//!   ignore:
//!   - proto/a
//! ";
//! let file = BufYamlFile::parse(data).unwrap();
//! assert_eq!(file.module_configs().len(), 2);
//! assert_eq!(file.module_configs()[0].dir_path(), "proto/a");
//! assert!(file.module_configs()[0].lint_config().disabled());
//! assert!(!file.module_configs()[1].lint_config().disabled());
//! ```

mod external;
mod read;
mod write;

pub(crate) use external::{
    ExternalBreakingConfigV2, ExternalCheckPluginV2, ExternalLintConfigV2, StringOrList,
};
pub(crate) use read::{
    breaking_config_from_v2, check_plugin_configs_from_v2, lint_config_from_v2,
};
pub(crate) use write::{breaking_block_v2, check_plugins_to_v2, lint_block_v2};

use crate::check::CheckPluginConfig;
use crate::error::{Error, Result};
use crate::file_version::{FileType, FileVersion};
use crate::module_config::ModuleConfig;
use crate::module_name::ModuleRef;

/// The file name used for `buf.yaml` in error messages when none is given.
const DEFAULT_FILE_NAME: &str = "buf.yaml";

/// A parsed `buf.yaml` of any version.
#[derive(Debug, Clone, PartialEq)]
pub struct BufYamlFile {
    file_version: FileVersion,
    module_configs: Vec<ModuleConfig>,
    config_deps: Vec<ModuleRef>,
    plugin_configs: Vec<CheckPluginConfig>,
}

impl BufYamlFile {
    /// Build and validate a `buf.yaml` model.
    ///
    /// Modules are sorted by directory and dependencies by name.
    pub fn new(
        file_version: FileVersion,
        mut module_configs: Vec<ModuleConfig>,
        config_deps: Vec<ModuleRef>,
        plugin_configs: Vec<CheckPluginConfig>,
    ) -> Result<Self> {
        if module_configs.is_empty() {
            return Err(Error::invalid_config("a buf.yaml must describe at least one module"));
        }
        if let Some(module) = module_configs
            .iter()
            .find(|m| m.file_version() != file_version)
        {
            return Err(Error::internal(format!(
                "module {:?} has version {} in a {} buf.yaml",
                module.dir_path(),
                module.file_version(),
                file_version
            )));
        }
        if file_version < FileVersion::V2 && module_configs.len() != 1 {
            return Err(Error::invalid_config(format!(
                "a {} buf.yaml describes exactly one module, got {}",
                file_version,
                module_configs.len()
            )));
        }
        if file_version < FileVersion::V2 && !plugin_configs.is_empty() {
            return Err(Error::internal(format!(
                "check plugins were set for a {} buf.yaml",
                file_version
            )));
        }
        module_configs.sort_by(|a, b| a.dir_path().cmp(b.dir_path()));
        for pair in module_configs.windows(2) {
            if pair[0].dir_path() == pair[1].dir_path() {
                return Err(Error::invalid_config(format!(
                    "module path {:?} is listed more than once",
                    pair[0].dir_path()
                )));
            }
        }
        for (i, module) in module_configs.iter().enumerate() {
            let Some(name) = module.full_name() else {
                continue;
            };
            if module_configs[..i]
                .iter()
                .any(|other| other.full_name() == Some(name))
            {
                return Err(Error::invalid_config(format!(
                    "module name {} is used by more than one module",
                    name
                )));
            }
        }
        let config_deps = sort_and_check_deps(config_deps)?;
        Ok(Self {
            file_version,
            module_configs,
            config_deps,
            plugin_configs,
        })
    }

    /// Parse a YAML `buf.yaml`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        read::read_buf_yaml_file(DEFAULT_FILE_NAME, data, false)
    }

    /// Parse a `buf.yaml` read from `file_name`, optionally accepting JSON.
    pub fn parse_named(file_name: &str, data: &[u8], allow_json: bool) -> Result<Self> {
        read::read_buf_yaml_file(file_name, data, allow_json)
    }

    /// The canonical YAML form of this file.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        write::write_buf_yaml_file(self)
    }

    /// The canonical form of this file as JSON.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        write::write_buf_yaml_file_json(self)
    }

    /// The comment placed at the top of files written to a bucket.
    pub fn header(&self) -> Option<&'static str> {
        match self.file_version {
            FileVersion::V1Beta1 => None,
            FileVersion::V1 => Some(
                "# For details on buf.yaml configuration, visit https://buf.build/docs/configuration/v1/buf-yaml\n",
            ),
            FileVersion::V2 => Some(
                "# For details on buf.yaml configuration, visit https://buf.build/docs/configuration/v2/buf-yaml\n",
            ),
        }
    }

    pub fn file_type(&self) -> FileType {
        FileType::BufYAML
    }

    pub fn file_version(&self) -> FileVersion {
        self.file_version
    }

    /// The modules of this file, sorted by directory.
    pub fn module_configs(&self) -> &[ModuleConfig] {
        &self.module_configs
    }

    /// The module at `dir_path`, if any.
    pub fn module_config(&self, dir_path: &str) -> Option<&ModuleConfig> {
        self.module_configs.iter().find(|m| m.dir_path() == dir_path)
    }

    /// The `deps` of this file, sorted.
    pub fn config_deps(&self) -> &[ModuleRef] {
        &self.config_deps
    }

    /// File-level check plugins (V2 only).
    pub fn plugin_configs(&self) -> &[CheckPluginConfig] {
        &self.plugin_configs
    }
}

fn sort_and_check_deps(mut deps: Vec<ModuleRef>) -> Result<Vec<ModuleRef>> {
    deps.sort();
    deps.dedup();
    for pair in deps.windows(2) {
        if pair[0].full_name() == pair[1].full_name() {
            return Err(Error::InvalidConfig {
                message: format!(
                    "dependency {} is listed more than once with different refs",
                    pair[0].full_name()
                ),
                hint: Some("keep a single entry per module in deps".to_string()),
            });
        }
    }
    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckSettings;

    #[test]
    fn test_parse_missing_version_is_v1beta1() {
        let file = BufYamlFile::parse(b"build:\n  roots:\n  - proto\n").unwrap();
        assert_eq!(file.file_version(), FileVersion::V1Beta1);
        let module = &file.module_configs()[0];
        assert!(module.root_to_excludes().contains_key("proto"));
        assert_eq!(module.lint_config().use_ids(), &["DEFAULT"]);
    }

    #[test]
    fn test_parse_v1beta1_excludes_are_root_relative() {
        let data = b"version: v1beta1
build:
  roots:
  - proto
  - vendor
  excludes:
  - proto/gen
";
        let file = BufYamlFile::parse(data).unwrap();
        let module = &file.module_configs()[0];
        assert_eq!(module.root_to_excludes()["proto"], vec!["gen"]);
        assert!(module.root_to_excludes()["vendor"].is_empty());

        let err = BufYamlFile::parse(b"version: v1beta1\nbuild:\n  roots: [proto]\n  excludes: [other]\n")
            .unwrap_err();
        assert!(err.to_string().contains("not contained in any root"));
    }

    #[test]
    fn test_parse_v1() {
        let data = b"version: v1
name: buf.build/acme/weather
deps:
- buf.build/googleapis/googleapis
build:
  excludes:
  - gen
lint:
  use:
  - DEFAULT
  except:
  - PACKAGE_VERSION_SUFFIX
  allow_comment_ignores: true
breaking:
  use:
  - WIRE_JSON
";
        let file = BufYamlFile::parse(data).unwrap();
        assert_eq!(file.file_version(), FileVersion::V1);
        let module = &file.module_configs()[0];
        assert_eq!(module.full_name().unwrap().to_string(), "buf.build/acme/weather");
        assert_eq!(module.excludes(), &["gen"]);
        assert_eq!(module.lint_config().except_ids(), &["PACKAGE_VERSION_SUFFIX"]);
        assert!(module.lint_config().allow_comment_ignores());
        assert_eq!(module.breaking_config().use_ids(), &["WIRE_JSON"]);
        assert_eq!(file.config_deps().len(), 1);
    }

    #[test]
    fn test_parse_v2_top_level_name_shorthand() {
        let file = BufYamlFile::parse(b"version: v2\nname: buf.build/acme/weather\n").unwrap();
        assert_eq!(file.module_configs().len(), 1);
        assert_eq!(file.module_configs()[0].dir_path(), ".");
        assert_eq!(
            file.module_configs()[0].lint_config().use_ids(),
            &["STANDARD"]
        );
        assert!(file.module_configs()[0].lint_config().allow_comment_ignores());
    }

    #[test]
    fn test_parse_v2_rejects_unknown_fields() {
        let err = BufYamlFile::parse(b"version: v2\nmodules:\n- path: a\n  lnt: {}\n").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
        assert!(err.to_string().contains("lnt"));
    }

    #[test]
    fn test_parse_v1_rejects_v2_fields() {
        let err = BufYamlFile::parse(b"version: v1\nmodules:\n- path: a\n").unwrap_err();
        assert!(matches!(err, Error::Decode { file_version: Some(FileVersion::V1), .. }));
    }

    #[test]
    fn test_parse_rejects_unknown_version() {
        let err = BufYamlFile::parse(b"version: v3\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_parse_v2_duplicate_module_paths() {
        let err = BufYamlFile::parse(b"version: v2\nmodules:\n- path: a\n- path: a/\n").unwrap_err();
        assert!(err.to_string().contains("listed more than once"));
    }

    #[test]
    fn test_parse_v2_top_level_name_with_modules() {
        let err = BufYamlFile::parse(
            b"version: v2\nname: buf.build/acme/a\nmodules:\n- path: a\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("top-level name"));
    }

    #[test]
    fn test_parse_v2_local_block_overrides() {
        let data = b"version: v2
modules:
- path: proto/a
  lint:
    use:
    - MINIMAL
- path: proto/b
lint:
  use:
  - STANDARD
  ignore:
  - proto/b/gen
  - proto/a/gen
";
        let file = BufYamlFile::parse(data).unwrap();
        let a = file.module_config("proto/a").unwrap();
        assert_eq!(a.lint_config().use_ids(), &["MINIMAL"]);
        assert!(a.lint_config().ignore_paths().is_empty());
        let b = file.module_config("proto/b").unwrap();
        assert_eq!(b.lint_config().use_ids(), &["STANDARD"]);
        assert_eq!(b.lint_config().ignore_paths(), &["gen"]);
    }

    #[test]
    fn test_parse_v2_disabled_propagation() {
        let data = b"version: v2
modules:
- path: proto/a
- path: proto/b
lint:
  ignore:
  - proto/a
breaking:
  ignore:
  - proto/a
";
        let file = BufYamlFile::parse(data).unwrap();
        let a = file.module_config("proto/a").unwrap();
        assert!(a.lint_config().disabled());
        assert!(a.breaking_config().disabled());
        let b = file.module_config("proto/b").unwrap();
        assert!(!b.lint_config().disabled());
        assert!(!b.breaking_config().disabled());
    }

    #[test]
    fn test_parse_v2_plugins_reach_every_module() {
        let data = b"version: v2
modules:
- path: a
- path: b
  lint:
    use:
    - MINIMAL
plugins:
- plugin: buf-plugin-timestamp
  options:
    timestamp_suffix: _time
";
        let file = BufYamlFile::parse(data).unwrap();
        assert_eq!(file.plugin_configs().len(), 1);
        for module in file.module_configs() {
            assert_eq!(module.lint_config().plugins().len(), 1);
        }
    }

    #[test]
    fn test_duplicate_deps() {
        let err = BufYamlFile::parse(
            b"version: v2\ndeps:\n- buf.build/acme/a:v1\n- buf.build/acme/a:v2\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("listed more than once"));
        let file =
            BufYamlFile::parse(b"version: v2\ndeps:\n- buf.build/acme/b\n- buf.build/acme/a\n- buf.build/acme/b\n")
                .unwrap();
        let deps: Vec<String> = file.config_deps().iter().map(|d| d.to_string()).collect();
        assert_eq!(deps, vec!["buf.build/acme/a", "buf.build/acme/b"]);
    }
}
