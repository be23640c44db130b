//! Reading `buf.yaml` documents of every version into one model

use super::external::{
    ExternalBreakingConfigV1, ExternalBreakingConfigV2, ExternalBufYamlFileV1,
    ExternalBufYamlFileV1Beta1, ExternalBufYamlFileV2, ExternalCheckPluginV2,
    ExternalLintConfigV1, ExternalLintConfigV2, ExternalModuleV2,
};
use super::BufYamlFile;
use crate::check::{
    BreakingConfig, CheckConfig, CheckParams, CheckPluginConfig, LintConfig, LintOptions,
};
use crate::encoding;
use crate::error::{Error, Result};
use crate::file_version::{FileType, FileVersion};
use crate::module_config::ModuleConfig;
use crate::module_name::{ModuleFullName, ModuleRef};
use crate::path;
use crate::path_validation::validate_includes_and_excludes;
use crate::resolve::resolve;
use log::{debug, warn};
use std::collections::BTreeMap;

/// Read a `buf.yaml` of any version.
pub(crate) fn read_buf_yaml_file(
    file_name: &str,
    data: &[u8],
    allow_json: bool,
) -> Result<BufYamlFile> {
    let raw_version = encoding::read_version(file_name, data, allow_json)?;
    let file_version = FileType::BufYAML.resolve_version(raw_version.as_deref())?;
    FileType::BufYAML.check_file_name(file_name, file_version)?;
    debug!("reading {} as version {}", file_name, file_version);
    match file_version {
        FileVersion::V1Beta1 => {
            warn!(
                "{} uses version v1beta1, which is deprecated; consider migrating to v2",
                file_name
            );
            let external: ExternalBufYamlFileV1Beta1 =
                encoding::decode(file_name, Some(file_version), data, allow_json)?;
            read_v1beta1(external)
        }
        FileVersion::V1 => {
            let external: ExternalBufYamlFileV1 =
                encoding::decode(file_name, Some(file_version), data, allow_json)?;
            read_v1(external)
        }
        FileVersion::V2 => {
            let external: ExternalBufYamlFileV2 =
                encoding::decode(file_name, Some(file_version), data, allow_json)?;
            read_v2(external)
        }
    }
}

fn read_v1beta1(external: ExternalBufYamlFileV1Beta1) -> Result<BufYamlFile> {
    let file_version = FileVersion::V1Beta1;
    let roots = if external.build.roots.is_empty() {
        vec![".".to_string()]
    } else {
        external
            .build
            .roots
            .iter()
            .map(|root| path::normalize(root))
            .collect::<Result<Vec<_>>>()?
    };
    let mut root_to_excludes: BTreeMap<String, Vec<String>> = roots
        .iter()
        .map(|root| (root.clone(), Vec::new()))
        .collect();
    if root_to_excludes.len() != roots.len() {
        return Err(Error::invalid_path(format!("duplicate root in {:?}", roots)));
    }
    for exclude in &external.build.excludes {
        let exclude = path::normalize(exclude)?;
        let containing: Vec<&String> = roots
            .iter()
            .filter(|root| path::contains(root, &exclude))
            .collect();
        match containing.as_slice() {
            [root] => {
                let relative = path::rel(root, &exclude).ok_or_else(|| {
                    Error::internal(format!("exclude {:?} escaped root {:?}", exclude, root))
                })?;
                if let Some(excludes) = root_to_excludes.get_mut(root.as_str()) {
                    excludes.push(relative);
                }
            }
            [] => {
                return Err(Error::invalid_path(format!(
                    "exclude path {:?} is not contained in any root of {:?}",
                    exclude, roots
                )))
            }
            _ => {
                return Err(Error::invalid_path(format!(
                    "exclude path {:?} is contained in more than one root",
                    exclude
                )))
            }
        }
    }

    let lint = lint_config_from_v1(file_version, external.lint.unwrap_or_default())?;
    let breaking = breaking_config_from_v1(file_version, external.breaking.unwrap_or_default())?;
    let module = ModuleConfig::new(
        ".",
        parse_optional_name(&external.name)?,
        BTreeMap::new(),
        root_to_excludes,
        resolve(&lint, None, "."),
        resolve(&breaking, None, "."),
    )?;
    BufYamlFile::new(file_version, vec![module], parse_deps(&external.deps)?, Vec::new())
}

fn read_v1(external: ExternalBufYamlFileV1) -> Result<BufYamlFile> {
    let file_version = FileVersion::V1;
    let lint = lint_config_from_v1(file_version, external.lint.unwrap_or_default())?;
    let breaking = breaking_config_from_v1(file_version, external.breaking.unwrap_or_default())?;
    let root_to_excludes = BTreeMap::from([(".".to_string(), external.build.excludes)]);
    let module = ModuleConfig::new(
        ".",
        parse_optional_name(&external.name)?,
        BTreeMap::new(),
        root_to_excludes,
        resolve(&lint, None, "."),
        resolve(&breaking, None, "."),
    )?;
    BufYamlFile::new(file_version, vec![module], parse_deps(&external.deps)?, Vec::new())
}

fn read_v2(external: ExternalBufYamlFileV2) -> Result<BufYamlFile> {
    let plugins = check_plugin_configs_from_v2(external.plugins)?;
    let shared_lint = lint_config_from_v2(external.lint.unwrap_or_default(), plugins.clone())?;
    let shared_breaking = breaking_config_from_v2(external.breaking.unwrap_or_default())?;

    let external_modules = if external.modules.is_empty() {
        vec![ExternalModuleV2 {
            path: ".".to_string(),
            name: external.name,
            ..Default::default()
        }]
    } else {
        if !external.name.is_empty() {
            return Err(Error::InvalidConfig {
                message: "top-level name cannot be set when modules are listed".to_string(),
                hint: Some("set name on the module entry instead".to_string()),
            });
        }
        external.modules
    };

    let mut module_configs = Vec::with_capacity(external_modules.len());
    for external_module in external_modules {
        let dir_path = if external_module.path.trim().is_empty() {
            ".".to_string()
        } else {
            path::normalize(&external_module.path)?
        };
        let paths = validate_includes_and_excludes(
            &dir_path,
            &external_module.includes,
            &external_module.excludes,
        )?;
        let local_lint = external_module
            .lint
            .map(|block| lint_config_from_v2(block, plugins.clone()))
            .transpose()?;
        let local_breaking = external_module
            .breaking
            .map(breaking_config_from_v2)
            .transpose()?;
        debug!(
            "module {:?}: lint {:?}, breaking {:?}",
            dir_path,
            crate::resolve::Inheritance::of(local_lint.as_ref()),
            crate::resolve::Inheritance::of(local_breaking.as_ref())
        );
        module_configs.push(ModuleConfig::new(
            &dir_path,
            parse_optional_name(&external_module.name)?,
            BTreeMap::from([(".".to_string(), paths.includes)]),
            BTreeMap::from([(".".to_string(), paths.excludes)]),
            resolve(&shared_lint, local_lint.as_ref(), &dir_path),
            resolve(&shared_breaking, local_breaking.as_ref(), &dir_path),
        )?);
    }
    BufYamlFile::new(
        FileVersion::V2,
        module_configs,
        parse_deps(&external.deps)?,
        plugins,
    )
}

pub(crate) fn lint_config_from_v1(
    file_version: FileVersion,
    block: ExternalLintConfigV1,
) -> Result<LintConfig> {
    let check = CheckConfig::new(
        file_version,
        CheckParams {
            use_ids: block.use_ids,
            except_ids: block.except_ids,
            ignore_paths: block.ignore,
            ignore_id_or_category_to_paths: block.ignore_only,
            disable_builtin: false,
        },
    )?;
    LintConfig::new(
        check,
        LintOptions {
            enum_zero_value_suffix: Some(block.enum_zero_value_suffix),
            rpc_allow_same_request_response: block.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: block
                .rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: block
                .rpc_allow_google_protobuf_empty_responses,
            service_suffix: Some(block.service_suffix),
            allow_comment_ignores: Some(block.allow_comment_ignores),
        },
        Vec::new(),
    )
}

pub(crate) fn breaking_config_from_v1(
    file_version: FileVersion,
    block: ExternalBreakingConfigV1,
) -> Result<BreakingConfig> {
    let check = CheckConfig::new(
        file_version,
        CheckParams {
            use_ids: block.use_ids,
            except_ids: block.except_ids,
            ignore_paths: block.ignore,
            ignore_id_or_category_to_paths: block.ignore_only,
            disable_builtin: false,
        },
    )?;
    Ok(BreakingConfig::new(check, block.ignore_unstable_packages))
}

pub(crate) fn lint_config_from_v2(
    block: ExternalLintConfigV2,
    plugins: Vec<CheckPluginConfig>,
) -> Result<LintConfig> {
    let check = CheckConfig::new(
        FileVersion::V2,
        CheckParams {
            use_ids: block.use_ids,
            except_ids: block.except_ids,
            ignore_paths: block.ignore,
            ignore_id_or_category_to_paths: block.ignore_only,
            disable_builtin: block.disable_builtin,
        },
    )?;
    LintConfig::new(
        check,
        LintOptions {
            enum_zero_value_suffix: Some(block.enum_zero_value_suffix),
            rpc_allow_same_request_response: block.rpc_allow_same_request_response,
            rpc_allow_google_protobuf_empty_requests: block
                .rpc_allow_google_protobuf_empty_requests,
            rpc_allow_google_protobuf_empty_responses: block
                .rpc_allow_google_protobuf_empty_responses,
            service_suffix: Some(block.service_suffix),
            allow_comment_ignores: Some(!block.disallow_comment_ignores),
        },
        plugins,
    )
}

pub(crate) fn breaking_config_from_v2(block: ExternalBreakingConfigV2) -> Result<BreakingConfig> {
    let check = CheckConfig::new(
        FileVersion::V2,
        CheckParams {
            use_ids: block.use_ids,
            except_ids: block.except_ids,
            ignore_paths: block.ignore,
            ignore_id_or_category_to_paths: block.ignore_only,
            disable_builtin: block.disable_builtin,
        },
    )?;
    Ok(BreakingConfig::new(check, block.ignore_unstable_packages))
}

pub(crate) fn check_plugin_configs_from_v2(
    external: Vec<ExternalCheckPluginV2>,
) -> Result<Vec<CheckPluginConfig>> {
    let plugins = external
        .into_iter()
        .map(|plugin| CheckPluginConfig::new(plugin.plugin.into_vec(), plugin.options))
        .collect::<Result<Vec<_>>>()?;
    for (i, plugin) in plugins.iter().enumerate() {
        if plugins[..i].iter().any(|other| other.name() == plugin.name()) {
            return Err(Error::invalid_config(format!(
                "plugin {:?} is listed more than once",
                plugin.name()
            )));
        }
    }
    Ok(plugins)
}

pub(crate) fn parse_optional_name(name: &str) -> Result<Option<ModuleFullName>> {
    if name.trim().is_empty() {
        return Ok(None);
    }
    name.parse().map(Some)
}

fn parse_deps(deps: &[String]) -> Result<Vec<ModuleRef>> {
    deps.iter().map(|dep| dep.parse()).collect()
}
