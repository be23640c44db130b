//! Property-based tests for paths and canonical writing.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::buf_yaml::BufYamlFile;
    use crate::check::{CheckSettings, LintConfig};
    use crate::factor::to_document_root;
    use crate::path::{contains, join, normalize, rel};
    use crate::path_validation::validate_includes_and_excludes;
    use proptest::prelude::*;

    fn raw_path() -> impl Strategy<Value = String> {
        prop::collection::vec(prop_oneof!["[a-c]{1,2}", Just(".".to_string()), Just("..".to_string()), Just(String::new())], 1..6)
            .prop_map(|parts| parts.join("/"))
    }

    fn clean_path() -> impl Strategy<Value = String> {
        prop::collection::vec("[a-c]{1,2}", 1..4).prop_map(|parts| parts.join("/"))
    }

    // ============================================================================
    // normalize property tests
    // ============================================================================

    proptest! {
        /// Property: normalizing a normalized path changes nothing
        #[test]
        fn normalize_is_idempotent(input in raw_path()) {
            if let Ok(normalized) = normalize(&input) {
                prop_assert_eq!(normalize(&normalized).unwrap(), normalized.clone());
                prop_assert!(!normalized.starts_with('/'));
                prop_assert!(!normalized.ends_with('/'));
                prop_assert!(normalized == "." || !normalized.split('/').any(|c| c == "." || c == ".." || c.is_empty()));
            }
        }

        /// Property: clean relative paths are never rejected and never change
        #[test]
        fn normalize_keeps_clean_paths(input in clean_path()) {
            prop_assert_eq!(normalize(&input).unwrap(), input);
        }

        /// Property: absolute paths are always rejected
        #[test]
        fn normalize_rejects_absolute(input in clean_path()) {
            let absolute = format!("/{}", input);
            prop_assert!(normalize(&absolute).is_err());
        }
    }

    // ============================================================================
    // join / rel / contains property tests
    // ============================================================================

    proptest! {
        /// Property: rel undoes join
        #[test]
        fn rel_inverts_join(base in clean_path(), relative in clean_path()) {
            let joined = join(&base, &relative);
            prop_assert!(contains(&base, &joined));
            prop_assert_eq!(rel(&base, &joined), Some(relative));
        }

        /// Property: the root contains every other path
        #[test]
        fn root_contains_everything(input in clean_path()) {
            prop_assert!(contains(".", &input));
            prop_assert!(!contains(&input, "."));
            prop_assert!(!contains(&input, &input));
        }
    }

    // ============================================================================
    // include / exclude validation property tests
    // ============================================================================

    proptest! {
        /// Property: validated paths come back relative to the module, sorted
        #[test]
        fn validated_paths_are_module_relative(
            module in clean_path(),
            includes in prop::collection::btree_set("[d-f]{1,2}", 0..4),
        ) {
            let rooted: Vec<String> = includes.iter().map(|i| join(&module, i)).collect();
            let validated = validate_includes_and_excludes::<String>(&module, &rooted, &[]).unwrap();
            let expected: Vec<String> = includes.into_iter().collect();
            prop_assert_eq!(validated.includes, expected);
            prop_assert!(validated.excludes.is_empty());
        }
    }

    // ============================================================================
    // buf.yaml canonical writing property tests
    // ============================================================================

    const CATEGORIES: &[&str] = &["MINIMAL", "BASIC", "STANDARD"];

    fn modules() -> impl Strategy<Value = Vec<(String, Option<usize>)>> {
        prop::collection::btree_map("[a-d]{1,3}", prop::option::of(0..CATEGORIES.len()), 1..5)
            .prop_map(|m| m.into_iter().collect())
    }

    fn render(modules: &[(String, Option<usize>)]) -> String {
        let mut yaml = String::from("version: v2\nmodules:\n");
        for (dir, lint) in modules {
            yaml.push_str(&format!("- path: proto/{}\n", dir));
            if let Some(index) = lint {
                yaml.push_str(&format!("  lint:\n    use: [{}]\n", CATEGORIES[*index]));
            }
        }
        yaml
    }

    proptest! {
        /// Property: module order in the input does not change the output
        #[test]
        fn write_is_order_independent(modules in modules()) {
            let forward = BufYamlFile::parse(render(&modules).as_bytes()).unwrap();
            let mut reversed_modules = modules.clone();
            reversed_modules.reverse();
            let reversed = BufYamlFile::parse(render(&reversed_modules).as_bytes()).unwrap();
            prop_assert_eq!(forward.to_bytes().unwrap(), reversed.to_bytes().unwrap());
        }

        /// Property: writing then reading gives back the same model
        #[test]
        fn write_then_read_is_stable(modules in modules()) {
            let file = BufYamlFile::parse(render(&modules).as_bytes()).unwrap();
            let written = file.to_bytes().unwrap();
            let reread = BufYamlFile::parse(&written).unwrap();
            prop_assert_eq!(&reread, &file);
            prop_assert_eq!(reread.to_bytes().unwrap(), written);
        }
    }

    // ============================================================================
    // hoisting with ignores, nested modules and disabled modules
    // ============================================================================

    const DIRS: &[&str] = &["a", "a/b", "c", "c/d/e", "f"];
    const SHARED_IGNORES: &[&str] = &["a", "a/b", "a/gen", "c/d", "f/legacy", "vendor"];

    #[derive(Debug, Clone)]
    enum LocalLint {
        Use(usize),
        IgnoreGen(usize),
        Disabled,
    }

    type Workspace = (Vec<(String, Option<LocalLint>)>, Vec<String>);

    fn workspace() -> impl Strategy<Value = Workspace> {
        let local = prop_oneof![
            (0..CATEGORIES.len()).prop_map(LocalLint::Use),
            (0..CATEGORIES.len()).prop_map(LocalLint::IgnoreGen),
            Just(LocalLint::Disabled),
        ]
        .boxed();
        let modules = prop::sample::subsequence(DIRS.to_vec(), 1..=DIRS.len()).prop_flat_map(
            move |dirs| {
                let count = dirs.len();
                (
                    Just(dirs),
                    prop::collection::vec(prop::option::weighted(0.3, local.clone()), count),
                )
            },
        );
        let ignores = prop::sample::subsequence(SHARED_IGNORES.to_vec(), 0..=SHARED_IGNORES.len());
        (modules, ignores).prop_map(|((dirs, locals), ignores)| {
            (
                dirs.into_iter().map(String::from).zip(locals).collect(),
                ignores.into_iter().map(String::from).collect(),
            )
        })
    }

    fn render_workspace((modules, ignores): &Workspace) -> String {
        let mut yaml = String::from("version: v2\nmodules:\n");
        for (dir, local) in modules {
            yaml.push_str(&format!("- path: {}\n", dir));
            match local {
                Some(LocalLint::Use(index)) => {
                    yaml.push_str(&format!("  lint:\n    use: [{}]\n", CATEGORIES[*index]));
                }
                Some(LocalLint::IgnoreGen(index)) => {
                    yaml.push_str(&format!(
                        "  lint:\n    use: [{}]\n    ignore: [gen]\n",
                        CATEGORIES[*index]
                    ));
                }
                Some(LocalLint::Disabled) => yaml.push_str("  lint:\n    ignore: [\".\"]\n"),
                None => {}
            }
        }
        yaml.push_str("lint:\n  use: [STANDARD]\n");
        if !ignores.is_empty() {
            yaml.push_str(&format!("  ignore: [{}]\n", ignores.join(", ")));
        }
        yaml
    }

    /// Whether the written document has a file-scope lint block, and whether
    /// each module entry has its own.
    fn lint_blocks(written: &[u8]) -> (bool, Vec<bool>) {
        let doc: serde_yaml::Value = serde_yaml::from_slice(written).unwrap();
        let modules = doc
            .get("modules")
            .and_then(|m| m.as_sequence())
            .map(|entries| entries.iter().map(|m| m.get("lint").is_some()).collect())
            .unwrap_or_default();
        (doc.get("lint").is_some(), modules)
    }

    fn rooted_lint_configs(file: &BufYamlFile) -> Vec<LintConfig> {
        file.module_configs()
            .iter()
            .map(|m| to_document_root(m.lint_config(), m.dir_path()))
            .collect()
    }

    proptest! {
        /// Property: a shared block is written exactly when every module's
        /// config is the same relative to the document root
        #[test]
        fn hoist_only_when_rooted_configs_are_equal(workspace in workspace()) {
            let file = BufYamlFile::parse(render_workspace(&workspace).as_bytes()).unwrap();
            let rooted = rooted_lint_configs(&file);
            let all_equal = rooted.windows(2).all(|pair| pair[0] == pair[1]);
            let (shared, locals) = lint_blocks(&file.to_bytes().unwrap());
            prop_assert_eq!(locals.len(), file.module_configs().len());
            if all_equal {
                prop_assert!(locals.iter().all(|local| !local));
            } else {
                prop_assert!(!shared);
                prop_assert!(locals.iter().all(|local| *local));
            }
        }

        /// Property: when configs differ, each module's own block reads back
        /// as its full effective config
        #[test]
        fn differing_modules_get_full_blocks(workspace in workspace()) {
            let file = BufYamlFile::parse(render_workspace(&workspace).as_bytes()).unwrap();
            let rooted = rooted_lint_configs(&file);
            prop_assume!(rooted.windows(2).any(|pair| pair[0] != pair[1]));
            let written = file.to_bytes().unwrap();
            let reread = BufYamlFile::parse(&written).unwrap();
            for module in file.module_configs() {
                let reread_module = reread.module_config(module.dir_path()).unwrap();
                prop_assert_eq!(reread_module.lint_config(), module.lint_config());
            }
            prop_assert_eq!(reread.to_bytes().unwrap(), written);
        }

        /// Property: disabled modules stay disabled, and enabled ones stay
        /// enabled, across a write and a read
        #[test]
        fn disabled_modules_survive_round_trip(workspace in workspace()) {
            let file = BufYamlFile::parse(render_workspace(&workspace).as_bytes()).unwrap();
            let reread = BufYamlFile::parse(&file.to_bytes().unwrap()).unwrap();
            for module in file.module_configs() {
                let reread_module = reread.module_config(module.dir_path()).unwrap();
                prop_assert_eq!(
                    reread_module.lint_config().disabled(),
                    module.lint_config().disabled(),
                    "module {}",
                    module.dir_path()
                );
            }
            prop_assert_eq!(&reread, &file);
        }
    }
}
