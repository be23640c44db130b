//! # buf.policy.yaml
//!
//! A policy is a named, shareable lint and breaking configuration. It is
//! applied to modules from the outside, so its check blocks carry rule
//! selections and options but never paths.

use crate::buf_yaml::{
    breaking_config_from_v2, check_plugin_configs_from_v2, check_plugins_to_v2,
    lint_config_from_v2, ExternalBreakingConfigV2, ExternalCheckPluginV2, ExternalLintConfigV2,
};
use crate::check::{BreakingConfig, CheckPluginConfig, CheckSettings, LintConfig};
use crate::encoding;
use crate::error::{Error, Result};
use crate::file_version::{FileType, FileVersion};
use crate::module_name::ModuleFullName;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufPolicyYamlFileV2 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lint: Option<ExternalPolicyLintConfigV2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    breaking: Option<ExternalPolicyBreakingConfigV2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    plugins: Vec<ExternalCheckPluginV2>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalPolicyLintConfigV2 {
    #[serde(default, rename = "use", skip_serializing_if = "Vec::is_empty")]
    use_ids: Vec<String>,
    #[serde(default, rename = "except", skip_serializing_if = "Vec::is_empty")]
    except_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    enum_zero_value_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    rpc_allow_same_request_response: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    rpc_allow_google_protobuf_empty_requests: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    rpc_allow_google_protobuf_empty_responses: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    service_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    disable_builtin: bool,
}

impl From<ExternalPolicyLintConfigV2> for ExternalLintConfigV2 {
    fn from(policy: ExternalPolicyLintConfigV2) -> Self {
        ExternalLintConfigV2 {
            use_ids: policy.use_ids,
            except_ids: policy.except_ids,
            enum_zero_value_suffix: policy.enum_zero_value_suffix,
            rpc_allow_same_request_response: policy.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: policy.rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: policy
                .rpc_allow_google_protobuf_empty_responses,
            service_suffix: policy.service_suffix,
            disable_builtin: policy.disable_builtin,
            ..Default::default()
        }
    }
}

impl From<ExternalLintConfigV2> for ExternalPolicyLintConfigV2 {
    fn from(block: ExternalLintConfigV2) -> Self {
        ExternalPolicyLintConfigV2 {
            use_ids: block.use_ids,
            except_ids: block.except_ids,
            enum_zero_value_suffix: block.enum_zero_value_suffix,
            rpc_allow_same_request_response: block.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: block.rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: block
                .rpc_allow_google_protobuf_empty_responses,
            service_suffix: block.service_suffix,
            disable_builtin: block.disable_builtin,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalPolicyBreakingConfigV2 {
    #[serde(default, rename = "use", skip_serializing_if = "Vec::is_empty")]
    use_ids: Vec<String>,
    #[serde(default, rename = "except", skip_serializing_if = "Vec::is_empty")]
    except_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    ignore_unstable_packages: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    disable_builtin: bool,
}

impl From<ExternalPolicyBreakingConfigV2> for ExternalBreakingConfigV2 {
    fn from(policy: ExternalPolicyBreakingConfigV2) -> Self {
        ExternalBreakingConfigV2 {
            use_ids: policy.use_ids,
            except_ids: policy.except_ids,
            ignore_unstable_packages: policy.ignore_unstable_packages,
            disable_builtin: policy.disable_builtin,
            ..Default::default()
        }
    }
}

impl From<ExternalBreakingConfigV2> for ExternalPolicyBreakingConfigV2 {
    fn from(block: ExternalBreakingConfigV2) -> Self {
        ExternalPolicyBreakingConfigV2 {
            use_ids: block.use_ids,
            except_ids: block.except_ids,
            ignore_unstable_packages: block.ignore_unstable_packages,
            disable_builtin: block.disable_builtin,
        }
    }
}

/// A parsed `buf.policy.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct BufPolicyYamlFile {
    file_version: FileVersion,
    name: Option<ModuleFullName>,
    lint_config: LintConfig,
    breaking_config: BreakingConfig,
    plugin_configs: Vec<CheckPluginConfig>,
}

impl BufPolicyYamlFile {
    pub fn new(
        name: Option<ModuleFullName>,
        lint_config: LintConfig,
        breaking_config: BreakingConfig,
        plugin_configs: Vec<CheckPluginConfig>,
    ) -> Result<Self> {
        let file_version = FileVersion::V2;
        for (kind, version, has_paths) in [
            ("lint", lint_config.file_version(), has_paths(&lint_config)),
            ("breaking", breaking_config.file_version(), has_paths(&breaking_config)),
        ] {
            if version != file_version {
                return Err(Error::internal(format!(
                    "{} config has version {} in a {} buf.policy.yaml",
                    kind, version, file_version
                )));
            }
            if has_paths {
                return Err(Error::invalid_config(format!(
                    "{} config of a policy cannot ignore paths",
                    kind
                )));
            }
        }
        Ok(Self {
            file_version,
            name,
            lint_config: lint_config.with_plugins(plugin_configs.clone()),
            breaking_config,
            plugin_configs,
        })
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_named(FileType::BufPolicyYAML.canonical_file_name(), data)
    }

    pub fn parse_named(file_name: &str, data: &[u8]) -> Result<Self> {
        let raw_version = encoding::read_version(file_name, data, false)?;
        let file_version = FileType::BufPolicyYAML.resolve_version(raw_version.as_deref())?;
        FileType::BufPolicyYAML.check_file_name(file_name, file_version)?;
        debug!("reading {} as version {}", file_name, file_version);
        let external: ExternalBufPolicyYamlFileV2 =
            encoding::decode(file_name, Some(file_version), data, false)?;
        let plugin_configs = check_plugin_configs_from_v2(external.plugins)?;
        let lint_config = lint_config_from_v2(
            external.lint.map(Into::into).unwrap_or_default(),
            plugin_configs.clone(),
        )?;
        let breaking_config =
            breaking_config_from_v2(external.breaking.map(Into::into).unwrap_or_default())?;
        let name = if external.name.trim().is_empty() {
            None
        } else {
            Some(external.name.parse()?)
        };
        Self::new(name, lint_config, breaking_config, plugin_configs)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let lint = if self.lint_config.is_default() {
            None
        } else {
            Some(crate::buf_yaml::lint_block_v2(&self.lint_config).into())
        };
        let breaking = if self.breaking_config.is_default() {
            None
        } else {
            Some(crate::buf_yaml::breaking_block_v2(&self.breaking_config).into())
        };
        encoding::encode_yaml(&ExternalBufPolicyYamlFileV2 {
            version: self.file_version.to_string(),
            name: self.name.as_ref().map(|n| n.to_string()).unwrap_or_default(),
            lint,
            breaking,
            plugins: check_plugins_to_v2(&self.plugin_configs),
        })
    }

    pub fn header(&self) -> Option<&'static str> {
        Some("# For details on buf.policy.yaml configuration, visit https://buf.build/docs/configuration/v2/buf-policy-yaml\n")
    }

    pub fn file_type(&self) -> FileType {
        FileType::BufPolicyYAML
    }

    pub fn file_version(&self) -> FileVersion {
        self.file_version
    }

    pub fn name(&self) -> Option<&ModuleFullName> {
        self.name.as_ref()
    }

    pub fn lint_config(&self) -> &LintConfig {
        &self.lint_config
    }

    pub fn breaking_config(&self) -> &BreakingConfig {
        &self.breaking_config
    }

    pub fn plugin_configs(&self) -> &[CheckPluginConfig] {
        &self.plugin_configs
    }
}

fn has_paths<T: CheckSettings>(config: &T) -> bool {
    !config.ignore_paths().is_empty() || !config.ignore_id_or_category_to_paths().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_policy() {
        let data = b"version: v2
name: buf.build/acme/strict
lint:
  use:
  - STANDARD
  except:
  - FIELD_NOT_REQUIRED
  service_suffix: API
breaking:
  use:
  - WIRE_JSON
plugins:
- plugin: buf.build/acme/check-plugin
";
        let policy = BufPolicyYamlFile::parse(data).unwrap();
        assert_eq!(policy.name().unwrap().owner(), "acme");
        assert_eq!(policy.lint_config().except_ids(), &["FIELD_NOT_REQUIRED"]);
        assert_eq!(policy.lint_config().service_suffix(), "API");
        assert_eq!(policy.lint_config().plugins().len(), 1);
        assert_eq!(policy.breaking_config().use_ids(), &["WIRE_JSON"]);

        let reread = BufPolicyYamlFile::parse(&policy.to_bytes().unwrap()).unwrap();
        assert_eq!(reread, policy);
    }

    #[test]
    fn test_policy_blocks_have_no_paths() {
        let err = BufPolicyYamlFile::parse(b"version: v2\nlint:\n  ignore:\n  - proto\n").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_policy_requires_v2() {
        let err = BufPolicyYamlFile::parse(b"version: v1\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
        let err = BufPolicyYamlFile::parse(b"name: buf.build/acme/p\n").unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_default_policy_writes_only_version() {
        let policy = BufPolicyYamlFile::parse(b"version: v2\n").unwrap();
        assert_eq!(String::from_utf8(policy.to_bytes().unwrap()).unwrap(), "version: v2\n");
    }
}
