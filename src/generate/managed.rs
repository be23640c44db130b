//! Managed mode: disable and override rules for file and field options
//!
//! Every override names exactly one option and carries a value of that
//! option's kind. String and bool options take YAML strings and booleans;
//! enum options accept either the enum's name or its number and are always
//! stored as the enum, so they are written back by name.

use crate::error::{Error, Result};
use crate::module_name::ModuleFullName;
use crate::path;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of value an option takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Bool,
    OptimizeMode,
    JSType,
}

/// A file option that managed mode can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileOption {
    JavaPackage,
    JavaPackagePrefix,
    JavaPackageSuffix,
    JavaOuterClassname,
    JavaMultipleFiles,
    JavaStringCheckUtf8,
    OptimizeFor,
    GoPackage,
    GoPackagePrefix,
    CcEnableArenas,
    ObjcClassPrefix,
    CsharpNamespace,
    CsharpNamespacePrefix,
    SwiftPrefix,
    PhpNamespace,
    PhpMetadataNamespace,
    PhpMetadataNamespaceSuffix,
    RubyPackage,
    RubyPackageSuffix,
}

impl FileOption {
    pub const ALL: [FileOption; 19] = [
        FileOption::JavaPackage,
        FileOption::JavaPackagePrefix,
        FileOption::JavaPackageSuffix,
        FileOption::JavaOuterClassname,
        FileOption::JavaMultipleFiles,
        FileOption::JavaStringCheckUtf8,
        FileOption::OptimizeFor,
        FileOption::GoPackage,
        FileOption::GoPackagePrefix,
        FileOption::CcEnableArenas,
        FileOption::ObjcClassPrefix,
        FileOption::CsharpNamespace,
        FileOption::CsharpNamespacePrefix,
        FileOption::SwiftPrefix,
        FileOption::PhpNamespace,
        FileOption::PhpMetadataNamespace,
        FileOption::PhpMetadataNamespaceSuffix,
        FileOption::RubyPackage,
        FileOption::RubyPackageSuffix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileOption::JavaPackage => "java_package",
            FileOption::JavaPackagePrefix => "java_package_prefix",
            FileOption::JavaPackageSuffix => "java_package_suffix",
            FileOption::JavaOuterClassname => "java_outer_classname",
            FileOption::JavaMultipleFiles => "java_multiple_files",
            FileOption::JavaStringCheckUtf8 => "java_string_check_utf8",
            FileOption::OptimizeFor => "optimize_for",
            FileOption::GoPackage => "go_package",
            FileOption::GoPackagePrefix => "go_package_prefix",
            FileOption::CcEnableArenas => "cc_enable_arenas",
            FileOption::ObjcClassPrefix => "objc_class_prefix",
            FileOption::CsharpNamespace => "csharp_namespace",
            FileOption::CsharpNamespacePrefix => "csharp_namespace_prefix",
            FileOption::SwiftPrefix => "swift_prefix",
            FileOption::PhpNamespace => "php_namespace",
            FileOption::PhpMetadataNamespace => "php_metadata_namespace",
            FileOption::PhpMetadataNamespaceSuffix => "php_metadata_namespace_suffix",
            FileOption::RubyPackage => "ruby_package",
            FileOption::RubyPackageSuffix => "ruby_package_suffix",
        }
    }

    /// Look up a file option by its wire name. Names are case-insensitive
    /// so the upper-case spelling of V1 per-file overrides is accepted.
    pub fn parse(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        FileOption::ALL
            .iter()
            .copied()
            .find(|option| option.as_str() == lower)
            .ok_or_else(|| Error::invalid_config(format!("unknown file option {:?}", s)))
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            FileOption::JavaMultipleFiles
            | FileOption::JavaStringCheckUtf8
            | FileOption::CcEnableArenas => ValueKind::Bool,
            FileOption::OptimizeFor => ValueKind::OptimizeMode,
            _ => ValueKind::String,
        }
    }
}

impl fmt::Display for FileOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field option that managed mode can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldOption {
    Jstype,
}

impl FieldOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOption::Jstype => "jstype",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "jstype" => Ok(FieldOption::Jstype),
            _ => Err(Error::invalid_config(format!("unknown field option {:?}", s))),
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            FieldOption::Jstype => ValueKind::JSType,
        }
    }
}

impl fmt::Display for FieldOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values of `optimize_for`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizeMode {
    Speed,
    CodeSize,
    LiteRuntime,
}

impl OptimizeMode {
    const VALUES: [(OptimizeMode, &'static str, i64); 3] = [
        (OptimizeMode::Speed, "SPEED", 1),
        (OptimizeMode::CodeSize, "CODE_SIZE", 2),
        (OptimizeMode::LiteRuntime, "LITE_RUNTIME", 3),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizeMode::Speed => "SPEED",
            OptimizeMode::CodeSize => "CODE_SIZE",
            OptimizeMode::LiteRuntime => "LITE_RUNTIME",
        }
    }
}

/// Values of the `jstype` field option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JSType {
    JsNormal,
    JsString,
    JsNumber,
}

impl JSType {
    const VALUES: [(JSType, &'static str, i64); 3] = [
        (JSType::JsNormal, "JS_NORMAL", 0),
        (JSType::JsString, "JS_STRING", 1),
        (JSType::JsNumber, "JS_NUMBER", 2),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JSType::JsNormal => "JS_NORMAL",
            JSType::JsString => "JS_STRING",
            JSType::JsNumber => "JS_NUMBER",
        }
    }
}

/// Find an enum value by name or number.
fn enum_value<E: Copy>(
    option: &str,
    values: &[(E, &'static str, i64)],
    value: &serde_yaml::Value,
) -> Result<E> {
    let found = match value {
        serde_yaml::Value::String(s) => values.iter().find(|entry| entry.1 == s.as_str()),
        serde_yaml::Value::Number(n) => n
            .as_i64()
            .and_then(|n| values.iter().find(|entry| entry.2 == n)),
        _ => None,
    };
    found.map(|(e, _, _)| *e).ok_or_else(|| {
        let names: Vec<&str> = values.iter().map(|(_, name, _)| *name).collect();
        Error::invalid_config(format!(
            "invalid value {} for {}, must be one of {}",
            display_value(value),
            option,
            names.join(", ")
        ))
    })
}

fn display_value(value: &serde_yaml::Value) -> String {
    serde_yaml::to_string(value)
        .map(|s| s.trim_end().to_string())
        .unwrap_or_else(|_| format!("{:?}", value))
}

/// The value of an override, typed by the option it sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideValue {
    String(String),
    Bool(bool),
    OptimizeMode(OptimizeMode),
    JSType(JSType),
}

impl OverrideValue {
    /// Check a raw value against the kind the option expects.
    pub fn parse(option: &str, kind: ValueKind, value: &serde_yaml::Value) -> Result<Self> {
        match (kind, value) {
            (ValueKind::String, serde_yaml::Value::String(s)) => Ok(OverrideValue::String(s.clone())),
            (ValueKind::Bool, serde_yaml::Value::Bool(b)) => Ok(OverrideValue::Bool(*b)),
            (ValueKind::OptimizeMode, _) => {
                enum_value(option, &OptimizeMode::VALUES, value).map(OverrideValue::OptimizeMode)
            }
            (ValueKind::JSType, _) => {
                enum_value(option, &JSType::VALUES, value).map(OverrideValue::JSType)
            }
            (ValueKind::String, _) => Err(Error::invalid_config(format!(
                "{} takes a string value, got {}",
                option,
                display_value(value)
            ))),
            (ValueKind::Bool, _) => Err(Error::invalid_config(format!(
                "{} takes a boolean value, got {}",
                option,
                display_value(value)
            ))),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            OverrideValue::String(_) => ValueKind::String,
            OverrideValue::Bool(_) => ValueKind::Bool,
            OverrideValue::OptimizeMode(_) => ValueKind::OptimizeMode,
            OverrideValue::JSType(_) => ValueKind::JSType,
        }
    }

    /// The wire form. Enums are written by name.
    pub fn to_yaml(&self) -> serde_yaml::Value {
        match self {
            OverrideValue::String(s) => serde_yaml::Value::String(s.clone()),
            OverrideValue::Bool(b) => serde_yaml::Value::Bool(*b),
            OverrideValue::OptimizeMode(mode) => serde_yaml::Value::String(mode.as_str().to_string()),
            OverrideValue::JSType(jstype) => serde_yaml::Value::String(jstype.as_str().to_string()),
        }
    }
}

/// The option a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedOption {
    File(FileOption),
    Field(FieldOption),
}

impl ManagedOption {
    pub fn value_kind(&self) -> ValueKind {
        match self {
            ManagedOption::File(option) => option.value_kind(),
            ManagedOption::Field(option) => option.value_kind(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ManagedOption::File(option) => option.as_str(),
            ManagedOption::Field(option) => option.as_str(),
        }
    }
}

/// Resolve the option of a rule from its two wire keys. Setting both is an
/// error; setting neither yields `None`.
fn managed_option(file_option: &str, field_option: &str) -> Result<Option<ManagedOption>> {
    match (file_option.is_empty(), field_option.is_empty()) {
        (true, true) => Ok(None),
        (false, true) => FileOption::parse(file_option).map(|o| Some(ManagedOption::File(o))),
        (true, false) => FieldOption::parse(field_option).map(|o| Some(ManagedOption::Field(o))),
        (false, false) => Err(Error::invalid_config(format!(
            "file_option {:?} and field_option {:?} cannot both be set on the same rule",
            file_option, field_option
        ))),
    }
}

fn parse_module(module: &str) -> Result<Option<ModuleFullName>> {
    if module.is_empty() {
        return Ok(None);
    }
    module.parse().map(Some)
}

fn parse_path(value: &str) -> Result<Option<String>> {
    if value.is_empty() {
        return Ok(None);
    }
    path::normalize(value).map(Some)
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalManagedDisableConfigV2 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_option: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field_option: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalManagedOverrideConfigV2 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_option: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field_option: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub module: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_yaml::Value>,
}

/// Turns managed mode off for the matching files, fields or options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedDisableRule {
    option: Option<ManagedOption>,
    module: Option<ModuleFullName>,
    path: Option<String>,
    field: Option<String>,
}

impl ManagedDisableRule {
    pub fn new(
        option: Option<ManagedOption>,
        module: Option<ModuleFullName>,
        path: Option<String>,
        field: Option<String>,
    ) -> Result<Self> {
        if option.is_none() && module.is_none() && path.is_none() && field.is_none() {
            return Err(Error::InvalidConfig {
                message: "a disable rule must set at least one of file_option, field_option, module, path or field".to_string(),
                hint: None,
            });
        }
        if field.is_some() && matches!(option, Some(ManagedOption::File(_))) {
            return Err(Error::invalid_config(
                "field cannot be set together with file_option on a disable rule",
            ));
        }
        Ok(Self {
            option,
            module,
            path,
            field,
        })
    }

    pub fn from_external(external: ExternalManagedDisableConfigV2) -> Result<Self> {
        Self::new(
            managed_option(&external.file_option, &external.field_option)?,
            parse_module(&external.module)?,
            parse_path(&external.path)?,
            (!external.field.is_empty()).then_some(external.field),
        )
    }

    pub fn to_external(&self) -> ExternalManagedDisableConfigV2 {
        let (file_option, field_option) = option_keys(self.option);
        ExternalManagedDisableConfigV2 {
            file_option,
            field_option,
            module: self.module.as_ref().map(|m| m.to_string()).unwrap_or_default(),
            path: self.path.clone().unwrap_or_default(),
            field: self.field.clone().unwrap_or_default(),
        }
    }

    pub fn option(&self) -> Option<ManagedOption> {
        self.option
    }

    pub fn module(&self) -> Option<&ModuleFullName> {
        self.module.as_ref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

/// Sets one option to a value for the matching files or fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedOverrideRule {
    option: ManagedOption,
    value: OverrideValue,
    module: Option<ModuleFullName>,
    path: Option<String>,
    field: Option<String>,
}

impl ManagedOverrideRule {
    pub fn new(
        option: ManagedOption,
        value: OverrideValue,
        module: Option<ModuleFullName>,
        path: Option<String>,
        field: Option<String>,
    ) -> Result<Self> {
        if value.kind() != option.value_kind() {
            return Err(Error::internal(format!(
                "override of {} was built with a {:?} value",
                option.as_str(),
                value.kind()
            )));
        }
        if field.is_some() && matches!(option, ManagedOption::File(_)) {
            return Err(Error::invalid_config(format!(
                "field cannot be set on an override of file option {}",
                option.as_str()
            )));
        }
        Ok(Self {
            option,
            value,
            module,
            path,
            field,
        })
    }

    pub fn from_external(external: ExternalManagedOverrideConfigV2) -> Result<Self> {
        let option = managed_option(&external.file_option, &external.field_option)?
            .ok_or_else(|| {
                Error::invalid_config("an override rule must set exactly one of file_option or field_option")
            })?;
        let raw = external.value.ok_or_else(|| {
            Error::invalid_config(format!("override of {} has no value", option.as_str()))
        })?;
        let value = OverrideValue::parse(option.as_str(), option.value_kind(), &raw)?;
        Self::new(
            option,
            value,
            parse_module(&external.module)?,
            parse_path(&external.path)?,
            (!external.field.is_empty()).then_some(external.field),
        )
    }

    pub fn to_external(&self) -> ExternalManagedOverrideConfigV2 {
        let (file_option, field_option) = option_keys(Some(self.option));
        ExternalManagedOverrideConfigV2 {
            file_option,
            field_option,
            module: self.module.as_ref().map(|m| m.to_string()).unwrap_or_default(),
            path: self.path.clone().unwrap_or_default(),
            field: self.field.clone().unwrap_or_default(),
            value: Some(self.value.to_yaml()),
        }
    }

    pub fn option(&self) -> ManagedOption {
        self.option
    }

    pub fn value(&self) -> &OverrideValue {
        &self.value
    }

    pub fn module(&self) -> Option<&ModuleFullName> {
        self.module.as_ref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }
}

fn option_keys(option: Option<ManagedOption>) -> (String, String) {
    match option {
        Some(ManagedOption::File(option)) => (option.as_str().to_string(), String::new()),
        Some(ManagedOption::Field(option)) => (String::new(), option.as_str().to_string()),
        None => (String::new(), String::new()),
    }
}

/// Managed mode settings of a generation file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagedConfig {
    pub enabled: bool,
    pub disables: Vec<ManagedDisableRule>,
    pub overrides: Vec<ManagedOverrideRule>,
}

impl ManagedConfig {
    pub fn is_empty(&self) -> bool {
        !self.enabled && self.disables.is_empty() && self.overrides.is_empty()
    }
}
