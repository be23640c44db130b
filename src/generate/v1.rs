//! Reading V1 `buf.gen.yaml` files
//!
//! V1 spelled managed mode as a fixed set of per-option settings, each with
//! an optional default, per-module exceptions and per-module overrides. They
//! are normalized here into the disable and override rules V2 uses, so the
//! rest of the crate only ever sees one model.

use super::managed::{
    FileOption, ManagedConfig, ManagedDisableRule, ManagedOption, ManagedOverrideRule,
    OverrideValue, ValueKind,
};
use super::plugin::{GeneratePluginConfig, PluginOutput, PluginSource, Strategy, PROTOC_BUILTIN_PLUGINS};
use super::GenerateConfig;
use crate::buf_yaml::StringOrList;
use crate::error::{Error, Result};
use crate::module_name::ModuleFullName;
use crate::path;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalBufGenYamlFileV1 {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub plugins: Vec<ExternalGeneratePluginConfigV1>,
    #[serde(default)]
    pub managed: Option<ExternalManagedConfigV1>,
    #[serde(default)]
    pub types: Option<ExternalTypesConfigV1>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalGeneratePluginConfigV1 {
    #[serde(default)]
    pub plugin: String,
    /// Older spelling of `plugin`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub remote: String,
    #[serde(default)]
    pub out: String,
    #[serde(default)]
    pub opt: Option<StringOrList>,
    #[serde(default)]
    pub path: Option<StringOrList>,
    #[serde(default)]
    pub protoc_path: String,
    #[serde(default)]
    pub strategy: String,
    #[serde(default)]
    pub revision: Option<u32>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalTypesConfigV1 {
    #[serde(default)]
    pub include: Vec<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalManagedConfigV1 {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub cc_enable_arenas: Option<bool>,
    #[serde(default)]
    pub java_multiple_files: Option<bool>,
    #[serde(default)]
    pub java_string_check_utf8: Option<bool>,
    #[serde(default)]
    pub java_package_prefix: Option<ExternalOptionConfigV1>,
    #[serde(default)]
    pub csharp_namespace: Option<ExternalOptionConfigV1>,
    #[serde(default)]
    pub go_package_prefix: Option<ExternalOptionConfigV1>,
    #[serde(default)]
    pub objc_class_prefix: Option<ExternalOptionConfigV1>,
    #[serde(default)]
    pub ruby_package: Option<ExternalOptionConfigV1>,
    #[serde(default)]
    pub optimize_for: Option<ExternalOptionConfigV1>,
    /// Per-file overrides: option name to file path to value.
    #[serde(default, rename = "override")]
    pub per_file_overrides: BTreeMap<String, BTreeMap<String, String>>,
}

impl ExternalManagedConfigV1 {
    fn has_settings(&self) -> bool {
        self.cc_enable_arenas.is_some()
            || self.java_multiple_files.is_some()
            || self.java_string_check_utf8.is_some()
            || self.java_package_prefix.is_some()
            || self.csharp_namespace.is_some()
            || self.go_package_prefix.is_some()
            || self.objc_class_prefix.is_some()
            || self.ruby_package.is_some()
            || self.optimize_for.is_some()
            || !self.per_file_overrides.is_empty()
    }
}

/// A V1 managed setting: a plain default, or a default with per-module
/// exceptions and overrides.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub(crate) enum ExternalOptionConfigV1 {
    Plain(String),
    Detailed(ExternalOptionDetailV1),
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ExternalOptionDetailV1 {
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub except: Vec<String>,
    #[serde(default, rename = "override")]
    pub module_overrides: BTreeMap<String, String>,
}

impl ExternalOptionConfigV1 {
    fn into_detail(self) -> ExternalOptionDetailV1 {
        match self {
            ExternalOptionConfigV1::Plain(default) => ExternalOptionDetailV1 {
                default,
                ..Default::default()
            },
            ExternalOptionConfigV1::Detailed(detail) => detail,
        }
    }
}

pub(crate) fn generate_config_from_v1(external: ExternalBufGenYamlFileV1) -> Result<GenerateConfig> {
    let types = external.types.map(|t| t.include).unwrap_or_default();
    let plugins = external
        .plugins
        .into_iter()
        .map(|plugin| plugin_from_v1(plugin, &types))
        .collect::<Result<Vec<_>>>()?;
    let managed = match external.managed {
        Some(managed) => managed_from_v1(managed)?,
        None => ManagedConfig::default(),
    };
    GenerateConfig::new(false, plugins, managed)
}

fn plugin_from_v1(external: ExternalGeneratePluginConfigV1, types: &[String]) -> Result<GeneratePluginConfig> {
    if !external.remote.is_empty() {
        return Err(Error::InvalidConfig {
            message: format!("the remote key of plugin {:?} is no longer supported", external.remote),
            hint: Some("name remote plugins with the plugin key instead".to_string()),
        });
    }
    let name = match (external.plugin.is_empty(), external.name.is_empty()) {
        (false, true) => external.plugin,
        (true, false) => external.name,
        (true, true) => return Err(Error::invalid_config("a plugin must set plugin or name")),
        (false, false) => {
            return Err(Error::invalid_config(format!(
                "plugin {:?} sets both plugin and name",
                external.plugin
            )))
        }
    };
    let path = external.path.map(StringOrList::into_vec).unwrap_or_default();
    let is_remote = name.contains('/');
    if external.revision.is_some() && !is_remote {
        return Err(Error::invalid_config(format!(
            "revision is only allowed for remote plugins, but {:?} is local",
            name
        )));
    }
    let source = if is_remote {
        if !path.is_empty() || !external.protoc_path.is_empty() {
            return Err(Error::invalid_config(format!(
                "path and protoc_path cannot be set for remote plugin {:?}",
                name
            )));
        }
        PluginSource::Remote {
            name,
            revision: external.revision,
        }
    } else if !path.is_empty() {
        if !external.protoc_path.is_empty() {
            return Err(Error::invalid_config(format!(
                "path and protoc_path cannot both be set for plugin {:?}",
                name
            )));
        }
        PluginSource::Local { command: path }
    } else if !external.protoc_path.is_empty() || PROTOC_BUILTIN_PLUGINS.contains(&name.as_str()) {
        PluginSource::ProtocBuiltin {
            name,
            protoc_path: if external.protoc_path.is_empty() {
                Vec::new()
            } else {
                vec![external.protoc_path]
            },
        }
    } else {
        PluginSource::Local {
            command: vec![format!("protoc-gen-{}", name)],
        }
    };
    let strategy = if external.strategy.is_empty() {
        None
    } else {
        Some(Strategy::parse(&external.strategy)?)
    };
    GeneratePluginConfig::new(
        source,
        PluginOutput {
            out: external.out,
            opt: external.opt.map(StringOrList::into_vec).unwrap_or_default(),
            strategy,
            types: types.to_vec(),
            ..Default::default()
        },
    )
}

fn managed_from_v1(external: ExternalManagedConfigV1) -> Result<ManagedConfig> {
    if !external.enabled {
        if external.has_settings() {
            warn!("managed mode settings are present but managed mode is not enabled; they are ignored");
        }
        return Ok(ManagedConfig::default());
    }
    let mut managed = ManagedConfig {
        enabled: true,
        ..Default::default()
    };
    for (option, value) in [
        (FileOption::CcEnableArenas, external.cc_enable_arenas),
        (FileOption::JavaMultipleFiles, external.java_multiple_files),
        (FileOption::JavaStringCheckUtf8, external.java_string_check_utf8),
    ] {
        if let Some(value) = value {
            managed.overrides.push(ManagedOverrideRule::new(
                ManagedOption::File(option),
                OverrideValue::Bool(value),
                None,
                None,
                None,
            )?);
        }
    }
    // (setting, option it overrides, option its exceptions disable)
    let settings = [
        (external.java_package_prefix, FileOption::JavaPackagePrefix, FileOption::JavaPackage),
        (external.csharp_namespace, FileOption::CsharpNamespace, FileOption::CsharpNamespace),
        (external.go_package_prefix, FileOption::GoPackagePrefix, FileOption::GoPackage),
        (external.objc_class_prefix, FileOption::ObjcClassPrefix, FileOption::ObjcClassPrefix),
        (external.ruby_package, FileOption::RubyPackage, FileOption::RubyPackage),
        (external.optimize_for, FileOption::OptimizeFor, FileOption::OptimizeFor),
    ];
    for (setting, option, disabled_option) in settings {
        let Some(setting) = setting else {
            continue;
        };
        let detail = setting.into_detail();
        if !detail.default.is_empty() {
            managed.overrides.push(override_from_v1(option, &detail.default, None, None)?);
        }
        for module in &detail.except {
            managed.disables.push(ManagedDisableRule::new(
                Some(ManagedOption::File(disabled_option)),
                Some(module.parse::<ModuleFullName>()?),
                None,
                None,
            )?);
        }
        for (module, value) in &detail.module_overrides {
            managed
                .overrides
                .push(override_from_v1(option, value, Some(module.parse()?), None)?);
        }
    }
    for (option_name, file_to_value) in &external.per_file_overrides {
        let option = FileOption::parse(option_name)?;
        for (file, value) in file_to_value {
            managed
                .overrides
                .push(override_from_v1(option, value, None, Some(path::normalize(file)?))?);
        }
    }
    Ok(managed)
}

/// V1 writes every value as a string; booleans are spelled `true`/`false`.
fn override_from_v1(
    option: FileOption,
    value: &str,
    module: Option<ModuleFullName>,
    file_path: Option<String>,
) -> Result<ManagedOverrideRule> {
    let raw = match (option.value_kind(), value) {
        (ValueKind::Bool, "true") => serde_yaml::Value::Bool(true),
        (ValueKind::Bool, "false") => serde_yaml::Value::Bool(false),
        _ => serde_yaml::Value::String(value.to_string()),
    };
    let value = OverrideValue::parse(option.as_str(), option.value_kind(), &raw)?;
    ManagedOverrideRule::new(ManagedOption::File(option), value, module, file_path, None)
}
