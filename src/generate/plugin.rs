//! Code generation plugins
//!
//! A plugin is exactly one of a remote plugin, a local executable, or a
//! generator built into protoc. Options that only make sense for one source
//! are rejected on the others.

use crate::buf_yaml::StringOrList;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

fn is_false(value: &bool) -> bool {
    !*value
}

/// Generators that ship inside protoc.
pub(crate) const PROTOC_BUILTIN_PLUGINS: &[&str] = &[
    "cpp", "csharp", "java", "js", "kotlin", "objc", "php", "pyi", "python", "ruby", "rust",
];

/// How a plugin is invoked across the input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One invocation per directory.
    Directory,
    /// A single invocation for all files.
    All,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Directory => "directory",
            Strategy::All => "all",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "directory" => Ok(Strategy::Directory),
            "all" => Ok(Strategy::All),
            other => Err(Error::invalid_config(format!(
                "unknown strategy {:?}, must be \"directory\" or \"all\"",
                other
            ))),
        }
    }
}

/// Where a plugin comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    Remote {
        name: String,
        revision: Option<u32>,
    },
    /// An executable and its arguments.
    Local { command: Vec<String> },
    ProtocBuiltin {
        name: String,
        protoc_path: Vec<String>,
    },
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalGeneratePluginConfigV2 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<StringOrList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protoc_builtin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protoc_path: Option<StringOrList>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub out: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opt: Option<StringOrList>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_imports: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub include_wkt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_types: Vec<String>,
}

/// A validated generation plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratePluginConfig {
    source: PluginSource,
    out: String,
    opt: Vec<String>,
    include_imports: bool,
    include_wkt: bool,
    strategy: Option<Strategy>,
    types: Vec<String>,
    exclude_types: Vec<String>,
}

/// Everything about a plugin except where it comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginOutput {
    pub out: String,
    pub opt: Vec<String>,
    pub include_imports: bool,
    pub include_wkt: bool,
    pub strategy: Option<Strategy>,
    pub types: Vec<String>,
    pub exclude_types: Vec<String>,
}

impl GeneratePluginConfig {
    pub fn new(source: PluginSource, output: PluginOutput) -> Result<Self> {
        let display = source_name(&source);
        match &source {
            PluginSource::Remote { name, .. } | PluginSource::ProtocBuiltin { name, .. }
                if name.trim().is_empty() =>
            {
                return Err(Error::invalid_config("plugin name must not be empty"));
            }
            PluginSource::Local { command } if command.iter().all(|c| c.trim().is_empty()) => {
                return Err(Error::invalid_config("local plugin must name an executable"));
            }
            PluginSource::Remote { .. } if output.strategy.is_some() => {
                return Err(Error::invalid_config(format!(
                    "strategy cannot be set for remote plugin {}",
                    display
                )));
            }
            _ => {}
        }
        if output.out.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: format!("out is required for plugin {}", display),
                hint: Some("set out to the directory generated files are written to".to_string()),
            });
        }
        if output.include_wkt && !output.include_imports {
            return Err(Error::invalid_config(format!(
                "include_wkt requires include_imports for plugin {}",
                display
            )));
        }
        Ok(Self {
            source,
            out: output.out,
            opt: output.opt,
            include_imports: output.include_imports,
            include_wkt: output.include_wkt,
            strategy: output.strategy,
            types: output.types,
            exclude_types: output.exclude_types,
        })
    }

    pub fn from_external(external: ExternalGeneratePluginConfigV2) -> Result<Self> {
        let sources = [
            ("remote", external.remote.is_some()),
            ("local", external.local.is_some()),
            ("protoc_builtin", external.protoc_builtin.is_some()),
        ];
        let set: Vec<&str> = sources
            .iter()
            .filter_map(|(key, is_set)| is_set.then_some(*key))
            .collect();
        if set.len() != 1 {
            return Err(Error::InvalidConfig {
                message: format!(
                    "exactly one of remote, local or protoc_builtin must be set for a plugin, found {}",
                    if set.is_empty() { "none".to_string() } else { set.join(", ") }
                ),
                hint: None,
            });
        }
        if external.revision.is_some() && external.remote.is_none() {
            return Err(Error::invalid_config("revision is only allowed for remote plugins"));
        }
        if external.protoc_path.is_some() && external.protoc_builtin.is_none() {
            return Err(Error::invalid_config(
                "protoc_path is only allowed for protoc_builtin plugins",
            ));
        }
        let source = if let Some(name) = external.remote {
            PluginSource::Remote {
                name,
                revision: external.revision,
            }
        } else if let Some(local) = external.local {
            PluginSource::Local {
                command: local.into_vec(),
            }
        } else {
            PluginSource::ProtocBuiltin {
                name: external.protoc_builtin.unwrap_or_default(),
                protoc_path: external.protoc_path.map(StringOrList::into_vec).unwrap_or_default(),
            }
        };
        let output = PluginOutput {
            out: external.out,
            opt: external.opt.map(StringOrList::into_vec).unwrap_or_default(),
            include_imports: external.include_imports,
            include_wkt: external.include_wkt,
            strategy: external.strategy.as_deref().map(Strategy::parse).transpose()?,
            types: external.types,
            exclude_types: external.exclude_types,
        };
        Self::new(source, output)
    }

    pub fn to_external(&self) -> ExternalGeneratePluginConfigV2 {
        let mut external = ExternalGeneratePluginConfigV2 {
            out: self.out.clone(),
            opt: (!self.opt.is_empty()).then(|| StringOrList::from_vec(self.opt.clone())),
            include_imports: self.include_imports,
            include_wkt: self.include_wkt,
            strategy: self.strategy.map(|s| s.as_str().to_string()),
            types: self.types.clone(),
            exclude_types: self.exclude_types.clone(),
            ..Default::default()
        };
        match &self.source {
            PluginSource::Remote { name, revision } => {
                external.remote = Some(name.clone());
                external.revision = *revision;
            }
            PluginSource::Local { command } => {
                external.local = Some(StringOrList::from_vec(command.clone()));
            }
            PluginSource::ProtocBuiltin { name, protoc_path } => {
                external.protoc_builtin = Some(name.clone());
                external.protoc_path =
                    (!protoc_path.is_empty()).then(|| StringOrList::from_vec(protoc_path.clone()));
            }
        }
        external
    }

    pub fn source(&self) -> &PluginSource {
        &self.source
    }

    /// A short name for messages.
    pub fn name(&self) -> String {
        source_name(&self.source)
    }

    pub fn out(&self) -> &str {
        &self.out
    }

    pub fn opt(&self) -> &[String] {
        &self.opt
    }

    pub fn include_imports(&self) -> bool {
        self.include_imports
    }

    pub fn include_wkt(&self) -> bool {
        self.include_wkt
    }

    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn exclude_types(&self) -> &[String] {
        &self.exclude_types
    }
}

fn source_name(source: &PluginSource) -> String {
    match source {
        PluginSource::Remote { name, .. } | PluginSource::ProtocBuiltin { name, .. } => name.clone(),
        PluginSource::Local { command } => command.first().cloned().unwrap_or_default(),
    }
}
