//! # buf.gen.yaml
//!
//! A generation file lists the plugins to run, where their output goes,
//! the managed mode rules that rewrite file and field options on the way,
//! and (in V2) the inputs to generate from.
//!
//! V2 files are read and written. V1 files are read and normalized into the
//! same model; writing one produces V2, which migrates it.
//!
//! ## Example
//!
//! ```
//! use bufconfig::generate::{BufGenYamlFile, OverrideValue, OptimizeMode};
//!
//! let data = b"version: v2
//! managed:
//!   enabled: true
//!   override:
//!   - file_option: optimize_for
//!     value: 3
//! plugins:
//! - local: protoc-gen-go
//!   out: gen/go
//! inputs:
//! - directory: proto
//! ";
//! let file = BufGenYamlFile::parse(data).unwrap();
//! let rule = &file.generate_config().managed().overrides[0];
//! assert_eq!(rule.value(), &OverrideValue::OptimizeMode(OptimizeMode::LiteRuntime));
//! ```

mod managed;
mod plugin;
mod v1;

pub use managed::{
    FieldOption, FileOption, JSType, ManagedConfig, ManagedDisableRule, ManagedOption,
    ManagedOverrideRule, OptimizeMode, OverrideValue, ValueKind,
};
pub use plugin::{GeneratePluginConfig, PluginOutput, PluginSource, Strategy};

use crate::encoding;
use crate::error::{Error, Result};
use crate::file_version::{FileType, FileVersion};
use crate::input_config::{ExternalInputConfigV2, InputConfig};
use log::{debug, warn};
use managed::{ExternalManagedDisableConfigV2, ExternalManagedOverrideConfigV2};
use plugin::ExternalGeneratePluginConfigV2;
use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalBufGenYamlFileV2 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    version: String,
    #[serde(default, skip_serializing_if = "is_false")]
    clean: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    managed: Option<ExternalManagedConfigV2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    plugins: Vec<ExternalGeneratePluginConfigV2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    inputs: Vec<ExternalInputConfigV2>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct ExternalManagedConfigV2 {
    #[serde(default, skip_serializing_if = "is_false")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    disable: Vec<ExternalManagedDisableConfigV2>,
    #[serde(default, rename = "override", skip_serializing_if = "Vec::is_empty")]
    overrides: Vec<ExternalManagedOverrideConfigV2>,
}

/// What to generate: plugins and managed mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateConfig {
    clean: bool,
    plugins: Vec<GeneratePluginConfig>,
    managed: ManagedConfig,
}

impl GenerateConfig {
    pub fn new(clean: bool, plugins: Vec<GeneratePluginConfig>, managed: ManagedConfig) -> Result<Self> {
        if plugins.is_empty() {
            return Err(Error::InvalidConfig {
                message: "no plugins are configured".to_string(),
                hint: Some("add at least one entry under plugins".to_string()),
            });
        }
        if !managed.enabled && (!managed.disables.is_empty() || !managed.overrides.is_empty()) {
            warn!("managed mode rules are present but managed mode is not enabled");
        }
        Ok(Self {
            clean,
            plugins,
            managed,
        })
    }

    /// Whether output directories are removed before generating.
    pub fn clean(&self) -> bool {
        self.clean
    }

    pub fn plugins(&self) -> &[GeneratePluginConfig] {
        &self.plugins
    }

    pub fn managed(&self) -> &ManagedConfig {
        &self.managed
    }
}

/// A parsed `buf.gen.yaml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufGenYamlFile {
    file_version: FileVersion,
    generate_config: GenerateConfig,
    inputs: Vec<InputConfig>,
}

impl BufGenYamlFile {
    pub fn new(
        file_version: FileVersion,
        generate_config: GenerateConfig,
        inputs: Vec<InputConfig>,
    ) -> Result<Self> {
        FileType::BufGenYAML.check_supported(file_version)?;
        if file_version < FileVersion::V2 && !inputs.is_empty() {
            return Err(Error::internal(format!(
                "inputs were set on a {} buf.gen.yaml",
                file_version
            )));
        }
        Ok(Self {
            file_version,
            generate_config,
            inputs,
        })
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::parse_named(FileType::BufGenYAML.canonical_file_name(), data)
    }

    pub fn parse_named(file_name: &str, data: &[u8]) -> Result<Self> {
        let raw_version = encoding::read_version(file_name, data, false)?;
        let file_version = FileType::BufGenYAML.resolve_version(raw_version.as_deref())?;
        FileType::BufGenYAML.check_file_name(file_name, file_version)?;
        debug!("reading {} as version {}", file_name, file_version);
        match file_version {
            FileVersion::V1 => {
                let external: v1::ExternalBufGenYamlFileV1 =
                    encoding::decode(file_name, Some(file_version), data, false)?;
                Self::new(file_version, v1::generate_config_from_v1(external)?, Vec::new())
            }
            _ => {
                let external: ExternalBufGenYamlFileV2 =
                    encoding::decode(file_name, Some(file_version), data, false)?;
                Self::from_v2(external)
            }
        }
    }

    fn from_v2(external: ExternalBufGenYamlFileV2) -> Result<Self> {
        let plugins = external
            .plugins
            .into_iter()
            .map(GeneratePluginConfig::from_external)
            .collect::<Result<Vec<_>>>()?;
        let managed = match external.managed {
            Some(managed) => ManagedConfig {
                enabled: managed.enabled,
                disables: managed
                    .disable
                    .into_iter()
                    .map(ManagedDisableRule::from_external)
                    .collect::<Result<Vec<_>>>()?,
                overrides: managed
                    .overrides
                    .into_iter()
                    .map(ManagedOverrideRule::from_external)
                    .collect::<Result<Vec<_>>>()?,
            },
            None => ManagedConfig::default(),
        };
        let inputs = external
            .inputs
            .into_iter()
            .map(InputConfig::from_external)
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            FileVersion::V2,
            GenerateConfig::new(external.clean, plugins, managed)?,
            inputs,
        )
    }

    /// The canonical form, always V2.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.file_version < FileVersion::V2 {
            warn!(
                "buf.gen.yaml was read as {} and is written as v2",
                self.file_version
            );
        }
        let config = &self.generate_config;
        let managed = if config.managed.is_empty() {
            None
        } else {
            Some(ExternalManagedConfigV2 {
                enabled: config.managed.enabled,
                disable: config.managed.disables.iter().map(|r| r.to_external()).collect(),
                overrides: config.managed.overrides.iter().map(|r| r.to_external()).collect(),
            })
        };
        encoding::encode_yaml(&ExternalBufGenYamlFileV2 {
            version: FileVersion::V2.to_string(),
            clean: config.clean,
            managed,
            plugins: config.plugins.iter().map(|p| p.to_external()).collect(),
            inputs: self.inputs.iter().map(|i| i.to_external()).collect(),
        })
    }

    pub fn header(&self) -> Option<&'static str> {
        Some("# For details on buf.gen.yaml configuration, visit https://buf.build/docs/configuration/v2/buf-gen-yaml\n")
    }

    pub fn file_type(&self) -> FileType {
        FileType::BufGenYAML
    }

    /// The version the file was read as.
    pub fn file_version(&self) -> FileVersion {
        self.file_version
    }

    pub fn generate_config(&self) -> &GenerateConfig {
        &self.generate_config
    }

    pub fn inputs(&self) -> &[InputConfig] {
        &self.inputs
    }
}
