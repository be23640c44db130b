//! Wire structs for every `buf.yaml` version
//!
//! Field names and order here are the wire contract. Every struct rejects
//! unknown fields, and every optional field is skipped on output when empty
//! so written documents stay minimal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value that may be written either as a single string or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s],
            StringOrList::Many(v) => v,
        }
    }

    /// A single string when there is one element, a list otherwise.
    pub fn from_vec(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            StringOrList::One(values.remove(0))
        } else {
            StringOrList::Many(values)
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBufYamlFileV1Beta1 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "ExternalBuildV1Beta1::is_empty")]
    pub build: ExternalBuildV1Beta1,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<ExternalLintConfigV1>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking: Option<ExternalBreakingConfigV1>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBuildV1Beta1 {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roots: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

impl ExternalBuildV1Beta1 {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.excludes.is_empty()
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBufYamlFileV1 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "ExternalBuildV1::is_empty")]
    pub build: ExternalBuildV1,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<ExternalLintConfigV1>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking: Option<ExternalBreakingConfigV1>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBuildV1 {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

impl ExternalBuildV1 {
    pub fn is_empty(&self) -> bool {
        self.excludes.is_empty()
    }
}

/// Lint block shared by V1Beta1 and V1.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalLintConfigV1 {
    #[serde(default, rename = "use", skip_serializing_if = "Vec::is_empty")]
    pub use_ids: Vec<String>,
    #[serde(default, rename = "except", skip_serializing_if = "Vec::is_empty")]
    pub except_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ignore_only: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub enum_zero_value_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_same_request_response: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_google_protobuf_empty_requests: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_google_protobuf_empty_responses: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub allow_comment_ignores: bool,
}

/// Breaking block shared by V1Beta1 and V1.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBreakingConfigV1 {
    #[serde(default, rename = "use", skip_serializing_if = "Vec::is_empty")]
    pub use_ids: Vec<String>,
    #[serde(default, rename = "except", skip_serializing_if = "Vec::is_empty")]
    pub except_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ignore_only: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_unstable_packages: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBufYamlFileV2 {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ExternalModuleV2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<ExternalLintConfigV2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking: Option<ExternalBreakingConfigV2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<ExternalCheckPluginV2>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalModuleV2 {
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<ExternalLintConfigV2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breaking: Option<ExternalBreakingConfigV2>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalLintConfigV2 {
    #[serde(default, rename = "use", skip_serializing_if = "Vec::is_empty")]
    pub use_ids: Vec<String>,
    #[serde(default, rename = "except", skip_serializing_if = "Vec::is_empty")]
    pub except_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ignore_only: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub enum_zero_value_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_same_request_response: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_google_protobuf_empty_requests: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub rpc_allow_google_protobuf_empty_responses: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_suffix: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disallow_comment_ignores: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_builtin: bool,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalBreakingConfigV2 {
    #[serde(default, rename = "use", skip_serializing_if = "Vec::is_empty")]
    pub use_ids: Vec<String>,
    #[serde(default, rename = "except", skip_serializing_if = "Vec::is_empty")]
    pub except_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ignore_only: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_unstable_packages: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_builtin: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalCheckPluginV2 {
    pub plugin: StringOrList,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_yaml::Value>,
}
