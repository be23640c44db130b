//! Writing the canonical form of a `buf.yaml`

use super::external::{
    ExternalBreakingConfigV1, ExternalBreakingConfigV2, ExternalBufYamlFileV1,
    ExternalBufYamlFileV1Beta1, ExternalBufYamlFileV2, ExternalBuildV1, ExternalBuildV1Beta1,
    ExternalCheckPluginV2, ExternalLintConfigV1, ExternalLintConfigV2, ExternalModuleV2,
    StringOrList,
};
use super::BufYamlFile;
use crate::check::{
    BreakingConfig, CheckPluginConfig, CheckSettings, LintConfig, DEFAULT_ENUM_ZERO_VALUE_SUFFIX,
    DEFAULT_SERVICE_SUFFIX,
};
use crate::encoding;
use crate::error::{Error, Result};
use crate::factor::{factor, Factored};
use crate::file_version::FileVersion;
use crate::module_config::ModuleConfig;
use crate::path;
use serde::Serialize;
use std::collections::BTreeMap;

pub(crate) fn write_buf_yaml_file(file: &BufYamlFile) -> Result<Vec<u8>> {
    write_as(file, Format::Yaml)
}

pub(crate) fn write_buf_yaml_file_json(file: &BufYamlFile) -> Result<Vec<u8>> {
    write_as(file, Format::Json)
}

#[derive(Clone, Copy)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>> {
        match self {
            Format::Yaml => encoding::encode_yaml(value),
            Format::Json => encoding::encode_json(value),
        }
    }
}

fn write_as(file: &BufYamlFile, format: Format) -> Result<Vec<u8>> {
    match file.file_version() {
        FileVersion::V1Beta1 => format.encode(&external_v1beta1(file)?),
        FileVersion::V1 => format.encode(&external_v1(file)?),
        FileVersion::V2 => format.encode(&external_v2(file)?),
    }
}

fn single_module(file: &BufYamlFile) -> Result<&ModuleConfig> {
    match file.module_configs() {
        [module] => Ok(module),
        modules => Err(Error::internal(format!(
            "a {} buf.yaml must hold exactly one module, found {}",
            file.file_version(),
            modules.len()
        ))),
    }
}

fn external_v1beta1(file: &BufYamlFile) -> Result<ExternalBufYamlFileV1Beta1> {
    let module = single_module(file)?;
    let root_to_excludes = module.root_to_excludes();
    let roots: Vec<String> = if root_to_excludes.keys().map(String::as_str).eq(["."]) {
        Vec::new()
    } else {
        root_to_excludes.keys().cloned().collect()
    };
    let excludes = path::sort_dedup(
        root_to_excludes
            .iter()
            .flat_map(|(root, excludes)| excludes.iter().map(move |e| path::join(root, e)))
            .collect(),
    );
    Ok(ExternalBufYamlFileV1Beta1 {
        version: FileVersion::V1Beta1.to_string(),
        name: module.full_name().map(|n| n.to_string()).unwrap_or_default(),
        deps: file.config_deps().iter().map(|d| d.to_string()).collect(),
        build: ExternalBuildV1Beta1 { roots, excludes },
        lint: optional_block(module.lint_config(), LintConfig::is_default, lint_block_v1),
        breaking: optional_block(
            module.breaking_config(),
            BreakingConfig::is_default,
            breaking_block_v1,
        ),
    })
}

fn external_v1(file: &BufYamlFile) -> Result<ExternalBufYamlFileV1> {
    let module = single_module(file)?;
    Ok(ExternalBufYamlFileV1 {
        version: FileVersion::V1.to_string(),
        name: module.full_name().map(|n| n.to_string()).unwrap_or_default(),
        deps: file.config_deps().iter().map(|d| d.to_string()).collect(),
        build: ExternalBuildV1 {
            excludes: module.excludes().to_vec(),
        },
        lint: optional_block(module.lint_config(), LintConfig::is_default, lint_block_v1),
        breaking: optional_block(
            module.breaking_config(),
            BreakingConfig::is_default,
            breaking_block_v1,
        ),
    })
}

fn external_v2(file: &BufYamlFile) -> Result<ExternalBufYamlFileV2> {
    let modules = file.module_configs();
    let lint_inputs: Vec<(String, LintConfig)> = modules
        .iter()
        .map(|m| (m.dir_path().to_string(), m.lint_config().clone()))
        .collect();
    let breaking_inputs: Vec<(String, BreakingConfig)> = modules
        .iter()
        .map(|m| (m.dir_path().to_string(), m.breaking_config().clone()))
        .collect();
    let lint = factor(
        &lint_inputs,
        &LintConfig::default_config(FileVersion::V2).with_plugins(file.plugin_configs().to_vec()),
    );
    let breaking = factor(&breaking_inputs, BreakingConfig::default_config(FileVersion::V2));

    let (shared_lint, mut local_lints) = split(lint, LintConfig::is_default, lint_block_v2);
    let (shared_breaking, mut local_breakings) =
        split(breaking, BreakingConfig::is_default, breaking_block_v2);

    let mut external = ExternalBufYamlFileV2 {
        version: FileVersion::V2.to_string(),
        deps: file.config_deps().iter().map(|d| d.to_string()).collect(),
        lint: shared_lint,
        breaking: shared_breaking,
        plugins: check_plugins_to_v2(file.plugin_configs()),
        ..Default::default()
    };

    let shorthand = matches!(modules, [module] if module.dir_path() == "."
        && module.includes().is_empty()
        && module.excludes().is_empty()
        && local_lints.is_empty()
        && local_breakings.is_empty());
    if shorthand {
        external.name = modules[0]
            .full_name()
            .map(|n| n.to_string())
            .unwrap_or_default();
        return Ok(external);
    }

    external.modules = modules
        .iter()
        .map(|module| {
            let dir = module.dir_path();
            ExternalModuleV2 {
                path: dir.to_string(),
                name: module.full_name().map(|n| n.to_string()).unwrap_or_default(),
                includes: module.includes().iter().map(|p| path::join(dir, p)).collect(),
                excludes: module.excludes().iter().map(|p| path::join(dir, p)).collect(),
                lint: local_lints.remove(dir),
                breaking: local_breakings.remove(dir),
            }
        })
        .collect();
    Ok(external)
}

/// Turn a factoring result into the optional shared block and the local
/// block of every module.
fn split<T, B>(
    factored: Factored<T>,
    is_default: fn(&T) -> bool,
    to_block: fn(&T) -> B,
) -> (Option<B>, BTreeMap<String, B>) {
    match factored {
        Factored::Shared(shared) => (optional_block(&shared, is_default, to_block), BTreeMap::new()),
        Factored::PerModule(per_module) => (
            None,
            per_module
                .into_iter()
                .map(|(dir, config)| (dir, to_block(&config)))
                .collect(),
        ),
    }
}

fn optional_block<T, B>(config: &T, is_default: fn(&T) -> bool, to_block: fn(&T) -> B) -> Option<B> {
    if is_default(config) {
        None
    } else {
        Some(to_block(config))
    }
}

/// A disabled config is written as a block that ignores its whole scope.
fn disabled_ignore() -> Vec<String> {
    vec![".".to_string()]
}

fn lint_block_v1(config: &LintConfig) -> ExternalLintConfigV1 {
    if config.disabled() {
        return ExternalLintConfigV1 {
            ignore: disabled_ignore(),
            ..Default::default()
        };
    }
    ExternalLintConfigV1 {
        use_ids: config.use_ids().to_vec(),
        except_ids: config.except_ids().to_vec(),
        ignore: config.ignore_paths().to_vec(),
        ignore_only: config.ignore_id_or_category_to_paths().clone(),
        enum_zero_value_suffix: non_default(
            config.enum_zero_value_suffix(),
            DEFAULT_ENUM_ZERO_VALUE_SUFFIX,
        ),
        rpc_allow_same_request_response: config.rpc_allow_same_request_response(),
        rpc_allow_google_protobuf_empty_requests: config
            .rpc_allow_google_protobuf_empty_requests(),
        rpc_allow_google_protobuf_empty_responses: config
            .rpc_allow_google_protobuf_empty_responses(),
        service_suffix: non_default(config.service_suffix(), DEFAULT_SERVICE_SUFFIX),
        allow_comment_ignores: config.allow_comment_ignores(),
    }
}

fn breaking_block_v1(config: &BreakingConfig) -> ExternalBreakingConfigV1 {
    if config.disabled() {
        return ExternalBreakingConfigV1 {
            ignore: disabled_ignore(),
            ..Default::default()
        };
    }
    ExternalBreakingConfigV1 {
        use_ids: config.use_ids().to_vec(),
        except_ids: config.except_ids().to_vec(),
        ignore: config.ignore_paths().to_vec(),
        ignore_only: config.ignore_id_or_category_to_paths().clone(),
        ignore_unstable_packages: config.ignore_unstable_packages(),
    }
}

pub(crate) fn lint_block_v2(config: &LintConfig) -> ExternalLintConfigV2 {
    if config.disabled() {
        return ExternalLintConfigV2 {
            ignore: disabled_ignore(),
            ..Default::default()
        };
    }
    ExternalLintConfigV2 {
        use_ids: config.use_ids().to_vec(),
        except_ids: config.except_ids().to_vec(),
        ignore: config.ignore_paths().to_vec(),
        ignore_only: config.ignore_id_or_category_to_paths().clone(),
        enum_zero_value_suffix: non_default(
            config.enum_zero_value_suffix(),
            DEFAULT_ENUM_ZERO_VALUE_SUFFIX,
        ),
        rpc_allow_same_request_response: config.rpc_allow_same_request_response(),
        rpc_allow_google_protobuf_empty_requests: config
            .rpc_allow_google_protobuf_empty_requests(),
        rpc_allow_google_protobuf_empty_responses: config
            .rpc_allow_google_protobuf_empty_responses(),
        service_suffix: non_default(config.service_suffix(), DEFAULT_SERVICE_SUFFIX),
        disallow_comment_ignores: !config.allow_comment_ignores(),
        disable_builtin: config.check().disable_builtin(),
    }
}

pub(crate) fn breaking_block_v2(config: &BreakingConfig) -> ExternalBreakingConfigV2 {
    if config.disabled() {
        return ExternalBreakingConfigV2 {
            ignore: disabled_ignore(),
            ..Default::default()
        };
    }
    ExternalBreakingConfigV2 {
        use_ids: config.use_ids().to_vec(),
        except_ids: config.except_ids().to_vec(),
        ignore: config.ignore_paths().to_vec(),
        ignore_only: config.ignore_id_or_category_to_paths().clone(),
        ignore_unstable_packages: config.ignore_unstable_packages(),
        disable_builtin: config.check().disable_builtin(),
    }
}

pub(crate) fn check_plugins_to_v2(plugins: &[CheckPluginConfig]) -> Vec<ExternalCheckPluginV2> {
    plugins
        .iter()
        .map(|plugin| ExternalCheckPluginV2 {
            plugin: StringOrList::from_vec(plugin.plugin_with_args()),
            options: plugin.options().clone(),
        })
        .collect()
}

fn non_default(value: &str, default: &str) -> String {
    if value == default {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(data: &str) -> (BufYamlFile, String) {
        let file = BufYamlFile::parse(data.as_bytes()).unwrap();
        let written = String::from_utf8(file.to_bytes().unwrap()).unwrap();
        let reread = BufYamlFile::parse(written.as_bytes()).unwrap();
        assert_eq!(reread, file, "written form:\n{}", written);
        (file, written)
    }

    #[test]
    fn test_default_blocks_are_omitted() {
        let (_, written) = roundtrip("version: v2\nmodules:\n- path: a\nlint:\n  use: [STANDARD]\n");
        assert_eq!(written, "version: v2\nmodules:\n- path: a\n");
    }

    #[test]
    fn test_single_root_module_uses_name_shorthand() {
        let (_, written) = roundtrip("version: v2\nmodules:\n- path: .\n  name: buf.build/acme/weather\n");
        assert_eq!(written, "version: v2\nname: buf.build/acme/weather\n");
    }

    #[test]
    fn test_shared_block_is_hoisted() {
        let data = "version: v2
modules:
- path: proto/b
- path: proto/a
lint:
  use:
  - MINIMAL
  ignore:
  - vendor
";
        let (file, written) = roundtrip(data);
        let external: ExternalBufYamlFileV2 = serde_yaml::from_str(&written).unwrap();
        let lint = external.lint.unwrap();
        assert_eq!(lint.use_ids, vec!["MINIMAL"]);
        assert!(lint.ignore.is_empty());
        assert!(external.modules.iter().all(|m| m.lint.is_none()));
        let paths: Vec<&str> = external.modules.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["proto/a", "proto/b"]);
        assert!(file.module_configs().iter().all(|m| m.lint_config().ignore_paths().is_empty()));
    }

    #[test]
    fn test_ignore_under_one_module_is_not_hoisted() {
        let data = "version: v2
modules:
- path: proto/b
- path: proto/a
lint:
  use:
  - MINIMAL
  ignore:
  - proto/a/gen
";
        let (_, written) = roundtrip(data);
        let external: ExternalBufYamlFileV2 = serde_yaml::from_str(&written).unwrap();
        assert!(external.lint.is_none());
        let ignores: Vec<Vec<String>> = external
            .modules
            .iter()
            .map(|m| m.lint.as_ref().unwrap().ignore.clone())
            .collect();
        assert_eq!(ignores, vec![vec!["gen".to_string()], vec![]]);
    }

    #[test]
    fn test_one_local_block_distributes_all() {
        let data = "version: v2
modules:
- path: a
  lint:
    use:
    - MINIMAL
- path: b
- path: c
";
        let (_, written) = roundtrip(data);
        let external: ExternalBufYamlFileV2 = serde_yaml::from_str(&written).unwrap();
        assert!(external.lint.is_none());
        let uses: Vec<Vec<String>> = external
            .modules
            .iter()
            .map(|m| m.lint.as_ref().unwrap().use_ids.clone())
            .collect();
        assert_eq!(uses, vec![vec!["MINIMAL"], vec!["STANDARD"], vec!["STANDARD"]]);
        assert!(external.breaking.is_none());
    }

    #[test]
    fn test_disabled_module_round_trips() {
        let data = "version: v2
modules:
- path: a
- path: a/b
breaking:
  use:
  - WIRE
  ignore:
  - a/b
";
        let (file, _) = roundtrip(data);
        assert!(file.module_config("a/b").unwrap().breaking_config().disabled());
        assert_eq!(file.module_config("a").unwrap().breaking_config().ignore_paths(), &["b"]);
    }

    #[test]
    fn test_output_is_independent_of_module_order() {
        let first = BufYamlFile::parse(b"version: v2\nmodules:\n- path: x\n- path: y\n  excludes: [y/gen]\n")
            .unwrap();
        let second = BufYamlFile::parse(b"version: v2\nmodules:\n- path: y\n  excludes: [y/gen]\n- path: x\n")
            .unwrap();
        assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
    }

    #[test]
    fn test_v1beta1_and_v1_round_trip() {
        roundtrip("version: v1beta1\nbuild:\n  roots: [proto, vendor]\n  excludes: [proto/gen]\n");
        let (_, written) = roundtrip("version: v1\nbuild:\n  excludes: [gen]\nlint:\n  except: [ENUM_PASCAL_CASE]\n");
        assert!(written.starts_with("version: v1\n"));
        assert!(written.contains("ENUM_PASCAL_CASE"));
    }

    #[test]
    fn test_plugins_round_trip() {
        let data = "version: v2
plugins:
- plugin: [buf-plugin-suffix, --strict]
  options:
    suffix: _id
";
        let (file, written) = roundtrip(data);
        assert_eq!(file.plugin_configs()[0].args(), &["--strict"]);
        assert!(written.contains("buf-plugin-suffix"));
    }

    #[test]
    fn test_json_round_trip() {
        let file = BufYamlFile::parse(b"version: v2\nmodules:\n- path: a\n  name: buf.build/acme/a\n")
            .unwrap();
        let json = file.to_json().unwrap();
        let reread = BufYamlFile::parse_named("buf.yaml", &json, true).unwrap();
        assert_eq!(reread, file);
    }
}
