//! # Factoring Check Configs for Output
//!
//! Given the effective config of every module for one check kind, decide what
//! a document must contain so that reading it back reproduces exactly those
//! effective configs:
//!
//! - If every effective config is the same once its paths are made relative
//!   to the document root, emit that config as one block at file scope and
//!   no local blocks.
//! - Otherwise emit no shared block and give every module a full local block
//!   equal to its own effective config.
//!
//! Local blocks replace the shared block wholesale when read, so a partial
//! "difference" block would not read back correctly. Switching one module
//! away from the common config therefore moves every module to a local
//! block.
//!
//! Modules are handled in directory order so output never depends on the
//! order of the input.

use crate::check::CheckSettings;
use crate::path;
use crate::resolve::resolve;

/// The result of factoring one check kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Factored<T> {
    /// One block at file scope, with paths relative to the document root.
    Shared(T),
    /// One block per module, sorted by module directory, with paths
    /// relative to each module.
    PerModule(Vec<(String, T)>),
}

/// Factor the effective configs of a set of modules.
///
/// `modules` pairs each module directory with its effective config.
/// `default` is the shared block of a document without modules.
pub fn factor<T>(modules: &[(String, T)], default: &T) -> Factored<T>
where
    T: CheckSettings + Clone + PartialEq,
{
    let mut sorted: Vec<(String, T)> = modules.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(shared) = hoist(&sorted, default) {
        return Factored::Shared(shared);
    }
    Factored::PerModule(sorted)
}

/// The shared block, if every module's config is the same once its paths
/// are made relative to the document root and inheriting that block gives
/// each module back its config.
fn hoist<T>(sorted: &[(String, T)], default: &T) -> Option<T>
where
    T: CheckSettings + Clone + PartialEq,
{
    let mut rooted = sorted
        .iter()
        .map(|(dir, config)| to_document_root(config, dir));
    let candidate = match rooted.next() {
        Some(first) => {
            if rooted.any(|other| other != first) {
                return None;
            }
            first
        }
        None => default.clone(),
    };
    sorted
        .iter()
        .all(|(dir, config)| resolve(&candidate, None, dir) == *config)
        .then_some(candidate)
}

/// Express a module-relative config with paths relative to the document
/// root.
pub fn to_document_root<T: CheckSettings>(config: &T, module_dir: &str) -> T {
    let ignore_paths = config
        .ignore_paths()
        .iter()
        .map(|p| path::join(module_dir, p))
        .collect();
    let ignore_map = config
        .ignore_id_or_category_to_paths()
        .iter()
        .map(|(id, paths)| {
            (
                id.clone(),
                paths.iter().map(|p| path::join(module_dir, p)).collect(),
            )
        })
        .collect();
    config.with_check(config.check().with_ignores(ignore_paths, ignore_map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{CheckConfig, CheckParams, LintConfig, LintOptions};
    use crate::file_version::FileVersion;

    fn lint(use_ids: &[&str], ignore: &[&str]) -> LintConfig {
        let check = CheckConfig::new(
            FileVersion::V2,
            CheckParams {
                use_ids: use_ids.iter().map(|s| s.to_string()).collect(),
                ignore_paths: ignore.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        )
        .unwrap();
        LintConfig::new(check, LintOptions::default(), vec![]).unwrap()
    }

    fn default() -> LintConfig {
        LintConfig::default_config(FileVersion::V2).clone()
    }

    #[test]
    fn test_identical_configs_are_hoisted() {
        let modules = vec![
            ("b".to_string(), lint(&["STANDARD"], &[])),
            ("a".to_string(), lint(&["STANDARD"], &[])),
        ];
        assert_eq!(
            factor(&modules, &default()),
            Factored::Shared(lint(&["STANDARD"], &[]))
        );
    }

    #[test]
    fn test_module_ignores_that_differ_are_distributed() {
        let modules = vec![
            ("proto/a".to_string(), lint(&["STANDARD"], &["gen"])),
            ("proto/b".to_string(), lint(&["STANDARD"], &[])),
        ];
        match factor(&modules, &default()) {
            Factored::PerModule(per_module) => {
                assert_eq!(per_module[0].1.ignore_paths(), &["gen"]);
                assert!(per_module[1].1.ignore_paths().is_empty());
            }
            other => panic!("expected per-module, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_modules_with_equal_rooted_ignores_are_hoisted() {
        let modules = vec![
            ("a".to_string(), lint(&["STANDARD"], &["b/gen"])),
            ("a/b".to_string(), lint(&["STANDARD"], &["gen"])),
        ];
        match factor(&modules, &default()) {
            Factored::Shared(shared) => assert_eq!(shared.ignore_paths(), &["a/b/gen"]),
            other => panic!("expected shared, got {:?}", other),
        }
    }

    #[test]
    fn test_one_difference_distributes_everything() {
        let modules = vec![
            ("c".to_string(), lint(&["STANDARD"], &[])),
            ("a".to_string(), lint(&["STANDARD"], &[])),
            ("b".to_string(), lint(&["MINIMAL"], &[])),
        ];
        match factor(&modules, &default()) {
            Factored::PerModule(per_module) => {
                let dirs: Vec<&str> = per_module.iter().map(|(d, _)| d.as_str()).collect();
                assert_eq!(dirs, vec!["a", "b", "c"]);
                assert_eq!(per_module[1].1.use_ids(), &["MINIMAL"]);
            }
            other => panic!("expected per-module, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_module_is_distributed() {
        let modules = vec![
            ("a".to_string(), lint(&["STANDARD"], &[])),
            ("b".to_string(), lint(&["STANDARD"], &[]).to_disabled()),
        ];
        match factor(&modules, &default()) {
            Factored::PerModule(per_module) => {
                assert!(!per_module[0].1.disabled());
                assert!(per_module[1].1.disabled());
            }
            other => panic!("expected per-module, got {:?}", other),
        }
    }

    #[test]
    fn test_all_disabled_modules_share_a_disabled_block() {
        let modules = vec![
            ("a".to_string(), lint(&["STANDARD"], &[]).to_disabled()),
            ("b".to_string(), lint(&["MINIMAL"], &[]).to_disabled()),
        ];
        match factor(&modules, &default()) {
            Factored::Shared(shared) => assert!(shared.disabled()),
            other => panic!("expected shared, got {:?}", other),
        }
    }

    #[test]
    fn test_no_modules_uses_default() {
        assert_eq!(factor::<LintConfig>(&[], &default()), Factored::Shared(default()));
    }

    #[test]
    fn test_nested_modules_that_cannot_share_are_distributed() {
        let modules = vec![
            ("a".to_string(), lint(&["STANDARD"], &[])),
            ("a/b".to_string(), lint(&["STANDARD"], &[]).to_disabled()),
        ];
        assert!(matches!(factor(&modules, &default()), Factored::PerModule(_)));
    }

    #[test]
    fn test_to_document_root() {
        let config = lint(&["STANDARD"], &["gen", "legacy/x"]);
        let rooted = to_document_root(&config, "proto");
        assert_eq!(rooted.ignore_paths(), &["proto/gen", "proto/legacy/x"]);
        assert_eq!(to_document_root(&config, "."), config);
    }
}
