//! # Check Configuration
//!
//! Lint and breaking-change checks share one shape: which rules or categories
//! run (`use`), which are subtracted (`except`), which paths are ignored for
//! every rule, and which paths are ignored only for specific rules. This
//! module holds that shared shape (`CheckConfig`), its two specializations
//! (`LintConfig`, `BreakingConfig`), and the per-version default tables.
//!
//! All constructors validate and normalize: identifiers must be well formed,
//! paths are normalized, and every list is stored sorted and deduplicated.
//! Values are immutable once built; the `with_*` methods return new values.
//!
//! A check config may be *disabled*, meaning that its whole scope has been
//! excluded from checking. Disabled is distinct from an empty `use` list and
//! is never undone on the same value.

use crate::error::{Error, Result};
use crate::file_version::FileVersion;
use crate::path;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// Default suffix for the zero value of enums.
pub const DEFAULT_ENUM_ZERO_VALUE_SUFFIX: &str = "_UNSPECIFIED";
/// Default suffix for service names.
pub const DEFAULT_SERVICE_SUFFIX: &str = "Service";

static ID_OR_CATEGORY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z0-9_]+$").expect("static regex is valid")
});

static DEFAULT_LINT_CONFIGS: LazyLock<HashMap<FileVersion, LintConfig>> = LazyLock::new(|| {
    FileVersion::ALL
        .iter()
        .map(|v| (*v, LintConfig::default_for(*v)))
        .collect()
});

static DEFAULT_BREAKING_CONFIGS: LazyLock<HashMap<FileVersion, BreakingConfig>> =
    LazyLock::new(|| {
        FileVersion::ALL
            .iter()
            .map(|v| (*v, BreakingConfig::default_for(*v)))
            .collect()
    });

/// The two kinds of checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Lint,
    Breaking,
}

impl CheckKind {
    /// The rule set used when `use` is empty.
    pub fn default_use(&self, file_version: FileVersion) -> &'static [&'static str] {
        match (self, file_version) {
            (CheckKind::Lint, FileVersion::V1Beta1 | FileVersion::V1) => &["DEFAULT"],
            (CheckKind::Lint, FileVersion::V2) => &["STANDARD"],
            (CheckKind::Breaking, _) => &["FILE"],
        }
    }

    /// The key used for this check in configuration files.
    pub fn key(&self) -> &'static str {
        match self {
            CheckKind::Lint => "lint",
            CheckKind::Breaking => "breaking",
        }
    }
}

/// Raw inputs for building a `CheckConfig`.
#[derive(Debug, Clone, Default)]
pub struct CheckParams {
    pub use_ids: Vec<String>,
    pub except_ids: Vec<String>,
    pub ignore_paths: Vec<String>,
    pub ignore_id_or_category_to_paths: BTreeMap<String, Vec<String>>,
    pub disable_builtin: bool,
}

/// The shape shared by lint and breaking configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    file_version: FileVersion,
    disabled: bool,
    use_ids: Vec<String>,
    except_ids: Vec<String>,
    ignore_paths: Vec<String>,
    ignore_id_or_category_to_paths: BTreeMap<String, Vec<String>>,
    disable_builtin: bool,
}

impl CheckConfig {
    /// Build and validate a check config.
    ///
    /// `use_ids` is stored as given; an empty list is resolved to the
    /// version default by `LintConfig::new` and `BreakingConfig::new`.
    pub fn new(file_version: FileVersion, params: CheckParams) -> Result<Self> {
        if params.disable_builtin && file_version < FileVersion::V2 {
            return Err(Error::invalid_config(format!(
                "disable_builtin is not available in version {}",
                file_version
            )));
        }
        let use_ids = validate_ids(params.use_ids, "use")?;
        let except_ids = validate_ids(params.except_ids, "except")?;
        let ignore_paths = path::normalize_all(&params.ignore_paths)?;
        let mut ignore_id_or_category_to_paths = BTreeMap::new();
        for (id, paths) in params.ignore_id_or_category_to_paths {
            let id = validate_id(&id, "ignore_only")?;
            let paths = path::normalize_all(&paths)?;
            if paths.is_empty() {
                continue;
            }
            ignore_id_or_category_to_paths
                .entry(id)
                .or_insert_with(Vec::new)
                .extend(paths);
        }
        for paths in ignore_id_or_category_to_paths.values_mut() {
            *paths = path::sort_dedup(std::mem::take(paths));
        }
        Ok(Self {
            file_version,
            disabled: false,
            use_ids,
            except_ids,
            ignore_paths,
            ignore_id_or_category_to_paths,
            disable_builtin: params.disable_builtin,
        })
    }

    /// A check config whose whole scope is excluded.
    pub fn new_disabled(file_version: FileVersion) -> Self {
        Self {
            file_version,
            disabled: true,
            use_ids: Vec::new(),
            except_ids: Vec::new(),
            ignore_paths: Vec::new(),
            ignore_id_or_category_to_paths: BTreeMap::new(),
            disable_builtin: false,
        }
    }

    fn empty(file_version: FileVersion) -> Self {
        Self {
            disabled: false,
            ..Self::new_disabled(file_version)
        }
    }

    pub fn file_version(&self) -> FileVersion {
        self.file_version
    }

    /// True when this check must not run for its scope.
    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn use_ids(&self) -> &[String] {
        &self.use_ids
    }

    pub fn except_ids(&self) -> &[String] {
        &self.except_ids
    }

    pub fn ignore_paths(&self) -> &[String] {
        &self.ignore_paths
    }

    pub fn ignore_id_or_category_to_paths(&self) -> &BTreeMap<String, Vec<String>> {
        &self.ignore_id_or_category_to_paths
    }

    pub fn disable_builtin(&self) -> bool {
        self.disable_builtin
    }

    /// A copy of this config with the given ignore settings.
    ///
    /// The inputs are expected to be normalized already.
    pub(crate) fn with_ignores(
        &self,
        ignore_paths: Vec<String>,
        ignore_id_or_category_to_paths: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            ignore_paths: path::sort_dedup(ignore_paths),
            ignore_id_or_category_to_paths: ignore_id_or_category_to_paths
                .into_iter()
                .filter(|(_, paths)| !paths.is_empty())
                .map(|(id, paths)| (id, path::sort_dedup(paths)))
                .collect(),
            ..self.clone()
        }
    }

    fn with_default_use(mut self, kind: CheckKind) -> Self {
        if self.use_ids.is_empty() && !self.disabled {
            self.use_ids = kind
                .default_use(self.file_version)
                .iter()
                .map(|s| s.to_string())
                .collect();
        }
        self
    }
}

/// Read access to the shared check fields of lint and breaking configs.
pub trait CheckSettings {
    fn check(&self) -> &CheckConfig;

    fn file_version(&self) -> FileVersion {
        self.check().file_version()
    }

    fn disabled(&self) -> bool {
        self.check().disabled()
    }

    fn use_ids(&self) -> &[String] {
        self.check().use_ids()
    }

    fn except_ids(&self) -> &[String] {
        self.check().except_ids()
    }

    fn ignore_paths(&self) -> &[String] {
        self.check().ignore_paths()
    }

    fn ignore_id_or_category_to_paths(&self) -> &BTreeMap<String, Vec<String>> {
        self.check().ignore_id_or_category_to_paths()
    }

    /// A copy with the check portion replaced.
    fn with_check(&self, check: CheckConfig) -> Self
    where
        Self: Sized;

    /// A disabled copy. Only the file version and file-level plugin
    /// configs survive.
    fn to_disabled(&self) -> Self
    where
        Self: Sized;
}

impl CheckSettings for CheckConfig {
    fn check(&self) -> &CheckConfig {
        self
    }

    fn with_check(&self, check: CheckConfig) -> Self {
        check
    }

    fn to_disabled(&self) -> Self {
        CheckConfig::new_disabled(self.file_version)
    }
}

/// A lint plugin referenced from the top-level `plugins` list of a V2
/// `buf.yaml` or `buf.policy.yaml`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckPluginConfig {
    kind: CheckPluginKind,
    name: String,
    args: Vec<String>,
    options: BTreeMap<String, serde_yaml::Value>,
}

/// Where a check plugin comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckPluginKind {
    /// A binary on the local filesystem or `$PATH`.
    Local,
    /// A local WebAssembly module.
    LocalWasm,
    /// A plugin hosted on a registry, `registry/owner/name[:ref]`.
    Remote,
}

impl CheckPluginConfig {
    /// Build a plugin config from its `plugin` value (path followed by
    /// arguments) and its options.
    pub fn new(plugin: Vec<String>, options: BTreeMap<String, serde_yaml::Value>) -> Result<Self> {
        let mut parts = plugin.into_iter();
        let name = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::invalid_config("plugin must have a non-empty name or path"))?;
        let args: Vec<String> = parts.collect();
        let kind = if name.ends_with(".wasm") {
            CheckPluginKind::LocalWasm
        } else if looks_remote(&name) {
            CheckPluginKind::Remote
        } else {
            CheckPluginKind::Local
        };
        if kind == CheckPluginKind::Remote && !args.is_empty() {
            return Err(Error::invalid_config(format!(
                "remote plugin {:?} cannot take arguments",
                name
            )));
        }
        for key in options.keys() {
            if key.trim().is_empty() {
                return Err(Error::invalid_config(format!(
                    "plugin {:?} has an option with an empty name",
                    name
                )));
            }
        }
        Ok(Self {
            kind,
            name,
            args,
            options,
        })
    }

    pub fn kind(&self) -> CheckPluginKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn options(&self) -> &BTreeMap<String, serde_yaml::Value> {
        &self.options
    }

    /// The `plugin` value as written: the name followed by any arguments.
    pub fn plugin_with_args(&self) -> Vec<String> {
        std::iter::once(self.name.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

fn looks_remote(name: &str) -> bool {
    let without_ref = name.split(':').next().unwrap_or(name);
    let segments: Vec<&str> = without_ref.split('/').collect();
    segments.len() == 3
        && segments[0].contains('.')
        && segments.iter().all(|s| !s.is_empty())
}

/// Raw lint-specific options. `None` selects the default.
#[derive(Debug, Clone, Default)]
pub struct LintOptions {
    pub enum_zero_value_suffix: Option<String>,
    pub rpc_allow_same_request_response: bool,
    pub rpc_allow_google_protobuf_empty_requests: bool,
    pub rpc_allow_google_protobuf_empty_responses: bool,
    pub service_suffix: Option<String>,
    pub allow_comment_ignores: Option<bool>,
}

/// Lint configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LintConfig {
    check: CheckConfig,
    enum_zero_value_suffix: String,
    rpc_allow_same_request_response: bool,
    rpc_allow_google_protobuf_empty_requests: bool,
    rpc_allow_google_protobuf_empty_responses: bool,
    service_suffix: String,
    allow_comment_ignores: bool,
    plugins: Vec<CheckPluginConfig>,
}

impl LintConfig {
    /// Build a lint config. An empty `use` list selects the version default.
    ///
    /// Plugins only exist in V2. A non-empty plugin list for an older version
    /// cannot come from a decoded file, so it is reported as an internal
    /// error.
    pub fn new(
        check: CheckConfig,
        options: LintOptions,
        plugins: Vec<CheckPluginConfig>,
    ) -> Result<Self> {
        let file_version = check.file_version();
        if !plugins.is_empty() && file_version < FileVersion::V2 {
            return Err(Error::internal(format!(
                "lint plugins were set for a {} configuration",
                file_version
            )));
        }
        Ok(Self {
            check: check.with_default_use(CheckKind::Lint),
            enum_zero_value_suffix: options
                .enum_zero_value_suffix
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_ENUM_ZERO_VALUE_SUFFIX.to_string()),
            rpc_allow_same_request_response: options.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: options
                .rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: options
                .rpc_allow_google_protobuf_empty_responses,
            service_suffix: options
                .service_suffix
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE_SUFFIX.to_string()),
            allow_comment_ignores: options
                .allow_comment_ignores
                .unwrap_or(file_version >= FileVersion::V2),
            plugins,
        })
    }

    /// The default lint configuration for a version, from the static table.
    pub fn default_config(file_version: FileVersion) -> &'static LintConfig {
        &DEFAULT_LINT_CONFIGS[&file_version]
    }

    fn default_for(file_version: FileVersion) -> Self {
        Self {
            check: CheckConfig::empty(file_version).with_default_use(CheckKind::Lint),
            enum_zero_value_suffix: DEFAULT_ENUM_ZERO_VALUE_SUFFIX.to_string(),
            rpc_allow_same_request_response: false,
            rpc_allow_google_protobuf_empty_requests: false,
            rpc_allow_google_protobuf_empty_responses: false,
            service_suffix: DEFAULT_SERVICE_SUFFIX.to_string(),
            allow_comment_ignores: file_version >= FileVersion::V2,
            plugins: Vec::new(),
        }
    }

    pub fn enum_zero_value_suffix(&self) -> &str {
        &self.enum_zero_value_suffix
    }

    pub fn rpc_allow_same_request_response(&self) -> bool {
        self.rpc_allow_same_request_response
    }

    pub fn rpc_allow_google_protobuf_empty_requests(&self) -> bool {
        self.rpc_allow_google_protobuf_empty_requests
    }

    pub fn rpc_allow_google_protobuf_empty_responses(&self) -> bool {
        self.rpc_allow_google_protobuf_empty_responses
    }

    pub fn service_suffix(&self) -> &str {
        &self.service_suffix
    }

    pub fn allow_comment_ignores(&self) -> bool {
        self.allow_comment_ignores
    }

    pub fn plugins(&self) -> &[CheckPluginConfig] {
        &self.plugins
    }

    /// A copy carrying the given file-level plugins.
    pub(crate) fn with_plugins(&self, plugins: Vec<CheckPluginConfig>) -> Self {
        Self {
            plugins,
            ..self.clone()
        }
    }

    /// True when everything except plugins matches the version default.
    pub fn is_default(&self) -> bool {
        let default = Self::default_config(self.file_version());
        *self == default.with_plugins(self.plugins.clone())
    }
}

impl CheckSettings for LintConfig {
    fn check(&self) -> &CheckConfig {
        &self.check
    }

    fn with_check(&self, check: CheckConfig) -> Self {
        Self {
            check,
            ..self.clone()
        }
    }

    fn to_disabled(&self) -> Self {
        Self {
            check: CheckConfig::new_disabled(self.file_version()),
            ..Self::default_for(self.file_version()).with_plugins(self.plugins.clone())
        }
    }
}

/// Breaking change configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakingConfig {
    check: CheckConfig,
    ignore_unstable_packages: bool,
}

impl BreakingConfig {
    /// Build a breaking config. An empty `use` list selects the version
    /// default.
    pub fn new(check: CheckConfig, ignore_unstable_packages: bool) -> Self {
        Self {
            check: check.with_default_use(CheckKind::Breaking),
            ignore_unstable_packages,
        }
    }

    /// The default breaking configuration for a version, from the static
    /// table.
    pub fn default_config(file_version: FileVersion) -> &'static BreakingConfig {
        &DEFAULT_BREAKING_CONFIGS[&file_version]
    }

    fn default_for(file_version: FileVersion) -> Self {
        Self::new(CheckConfig::empty(file_version), false)
    }

    pub fn ignore_unstable_packages(&self) -> bool {
        self.ignore_unstable_packages
    }

    pub fn is_default(&self) -> bool {
        self == Self::default_config(self.file_version())
    }
}

impl CheckSettings for BreakingConfig {
    fn check(&self) -> &CheckConfig {
        &self.check
    }

    fn with_check(&self, check: CheckConfig) -> Self {
        Self {
            check,
            ..self.clone()
        }
    }

    fn to_disabled(&self) -> Self {
        Self {
            check: CheckConfig::new_disabled(self.file_version()),
            ignore_unstable_packages: false,
        }
    }
}

fn validate_id(id: &str, field: &str) -> Result<String> {
    let id = id.trim();
    if !ID_OR_CATEGORY.is_match(id) {
        return Err(Error::InvalidConfig {
            message: format!("{:?} in {} is not a valid rule or category ID", id, field),
            hint: Some("IDs are upper snake case, for example FIELD_LOWER_SNAKE_CASE".to_string()),
        });
    }
    Ok(id.to_string())
}

fn validate_ids(ids: Vec<String>, field: &str) -> Result<Vec<String>> {
    let ids = ids
        .iter()
        .map(|id| validate_id(id, field))
        .collect::<Result<Vec<_>>>()?;
    Ok(path::sort_dedup(ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(use_ids: &[&str], ignore: &[&str]) -> CheckParams {
        CheckParams {
            use_ids: use_ids.iter().map(|s| s.to_string()).collect(),
            ignore_paths: ignore.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_check_config_sorts_and_dedups() {
        let check = CheckConfig::new(
            FileVersion::V2,
            CheckParams {
                use_ids: vec!["STANDARD".into(), "COMMENTS".into(), "STANDARD".into()],
                except_ids: vec!["ENUM_ZERO_VALUE_SUFFIX".into()],
                ignore_paths: vec!["b/".into(), "a".into(), "./a".into()],
                ignore_id_or_category_to_paths: BTreeMap::from([
                    ("FIELD_LOWER_SNAKE_CASE".to_string(), vec!["z".into(), "y".into()]),
                    ("EMPTY".to_string(), vec![]),
                ]),
                disable_builtin: false,
            },
        )
        .unwrap();
        assert_eq!(check.use_ids(), &["COMMENTS", "STANDARD"]);
        assert_eq!(check.ignore_paths(), &["a", "b"]);
        assert_eq!(
            check.ignore_id_or_category_to_paths()["FIELD_LOWER_SNAKE_CASE"],
            vec!["y", "z"]
        );
        assert!(!check.ignore_id_or_category_to_paths().contains_key("EMPTY"));
        assert!(!check.disabled());
    }

    #[test]
    fn test_ids_may_start_with_underscore_or_digit() {
        let check = CheckConfig::new(FileVersion::V2, params(&["_CUSTOM", "2_RULE"], &[])).unwrap();
        assert_eq!(check.use_ids(), &["2_RULE", "_CUSTOM"]);
    }

    #[test]
    fn test_check_config_rejects_bad_ids_and_paths() {
        assert!(CheckConfig::new(FileVersion::V1, params(&["lower"], &[])).is_err());
        assert!(CheckConfig::new(FileVersion::V1, params(&["A-B"], &[])).is_err());
        assert!(CheckConfig::new(FileVersion::V1, params(&[""], &[])).is_err());
        assert!(CheckConfig::new(FileVersion::V1, params(&["OK"], &["../x"])).is_err());
        let err = CheckConfig::new(
            FileVersion::V1,
            CheckParams {
                disable_builtin: true,
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("disable_builtin"));
    }

    #[test]
    fn test_lint_defaults_per_version() {
        let v1 = LintConfig::default_config(FileVersion::V1);
        assert_eq!(v1.use_ids(), &["DEFAULT"]);
        assert!(!v1.allow_comment_ignores());
        let v2 = LintConfig::default_config(FileVersion::V2);
        assert_eq!(v2.use_ids(), &["STANDARD"]);
        assert!(v2.allow_comment_ignores());
        assert_eq!(v2.enum_zero_value_suffix(), "_UNSPECIFIED");
        assert_eq!(v2.service_suffix(), "Service");
        assert!(v2.is_default());
        assert!(!v2.disabled());
    }

    #[test]
    fn test_empty_use_selects_default() {
        let check = CheckConfig::new(FileVersion::V2, CheckParams::default()).unwrap();
        let lint = LintConfig::new(check.clone(), LintOptions::default(), vec![]).unwrap();
        assert_eq!(&lint, LintConfig::default_config(FileVersion::V2));
        let breaking = BreakingConfig::new(check, false);
        assert_eq!(breaking.use_ids(), &["FILE"]);
        assert!(breaking.is_default());
    }

    #[test]
    fn test_plugins_rejected_before_v2() {
        let plugin = CheckPluginConfig::new(vec!["buf-plugin-foo".into()], BTreeMap::new()).unwrap();
        let check = CheckConfig::new(FileVersion::V1, CheckParams::default()).unwrap();
        let err = LintConfig::new(check, LintOptions::default(), vec![plugin]).unwrap_err();
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_disabled_is_distinct_from_empty() {
        let lint = LintConfig::default_config(FileVersion::V2).to_disabled();
        assert!(lint.disabled());
        assert!(lint.use_ids().is_empty());
        assert_ne!(&lint, LintConfig::default_config(FileVersion::V2));
        let breaking = BreakingConfig::default_config(FileVersion::V1).to_disabled();
        assert!(breaking.disabled());
        assert!(!breaking.is_default());
    }

    #[test]
    fn test_check_plugin_kinds() {
        let local = CheckPluginConfig::new(
            vec!["buf-plugin-timestamp".into(), "--strict".into()],
            BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(local.kind(), CheckPluginKind::Local);
        assert_eq!(local.args(), &["--strict"]);
        assert_eq!(local.plugin_with_args(), vec!["buf-plugin-timestamp", "--strict"]);

        let wasm = CheckPluginConfig::new(vec!["plugins/lint.wasm".into()], BTreeMap::new()).unwrap();
        assert_eq!(wasm.kind(), CheckPluginKind::LocalWasm);

        let remote =
            CheckPluginConfig::new(vec!["buf.build/acme/lint:v1".into()], BTreeMap::new()).unwrap();
        assert_eq!(remote.kind(), CheckPluginKind::Remote);
        assert!(CheckPluginConfig::new(
            vec!["buf.build/acme/lint".into(), "--arg".into()],
            BTreeMap::new()
        )
        .is_err());
        assert!(CheckPluginConfig::new(vec![], BTreeMap::new()).is_err());
    }
}
