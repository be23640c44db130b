//! # Effective Configuration
//!
//! Each module of a `buf.yaml` is governed by exactly one lint config and one
//! breaking config. Per check kind, a module is in one of two states, fixed
//! when the document is read:
//!
//! - **Inherited**: the module has no local block. The effective config is
//!   the shared, file-level config with its ignore paths narrowed to the ones
//!   under the module directory and rewritten relative to it. Rule lists are
//!   copied as they are. If a shared ignore path covers the whole module
//!   directory, the effective config is disabled.
//! - **Overridden**: the module has a local block. The effective config is
//!   exactly that block. Nothing is merged in from the shared config; a
//!   field missing from the local block is empty, not inherited. A local
//!   ignore path of `.` covers the whole module and disables the check.

use crate::check::CheckSettings;
use crate::path;
use std::collections::BTreeMap;

/// Whether a module supplied its own check block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inheritance {
    Inherited,
    Overridden,
}

impl Inheritance {
    pub fn of<T>(local: Option<&T>) -> Self {
        match local {
            Some(_) => Inheritance::Overridden,
            None => Inheritance::Inherited,
        }
    }
}

/// Compute the effective check config for the module at `module_dir`.
///
/// `shared` holds paths relative to the document root; `local` holds paths
/// relative to the module.
pub fn resolve<T: CheckSettings + Clone>(shared: &T, local: Option<&T>, module_dir: &str) -> T {
    match local {
        Some(local) => resolve_overridden(local),
        None => resolve_inherited(shared, module_dir),
    }
}

fn resolve_overridden<T: CheckSettings + Clone>(local: &T) -> T {
    if local.disabled() || local.ignore_paths().iter().any(|p| p == ".") {
        return local.to_disabled();
    }
    local.clone()
}

fn resolve_inherited<T: CheckSettings + Clone>(shared: &T, module_dir: &str) -> T {
    if shared.disabled() {
        return shared.to_disabled();
    }
    let mut ignore_paths = Vec::new();
    for ignore in shared.ignore_paths() {
        if path::equals_or_contains(ignore, module_dir) {
            return shared.to_disabled();
        }
        if let Some(relative) = path::rel(module_dir, ignore) {
            ignore_paths.push(relative);
        }
    }
    let mut ignore_map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (id, paths) in shared.ignore_id_or_category_to_paths() {
        let relative: Vec<String> = paths
            .iter()
            .filter_map(|ignore| {
                if path::equals_or_contains(ignore, module_dir) {
                    Some(".".to_string())
                } else {
                    path::rel(module_dir, ignore)
                }
            })
            .collect();
        if !relative.is_empty() {
            ignore_map.insert(id.clone(), relative);
        }
    }
    shared.with_check(shared.check().with_ignores(ignore_paths, ignore_map))
}
