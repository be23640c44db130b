//! Include and exclude path validation for a module
//!
//! A module may narrow the files it compiles with `includes` and `excludes`.
//! The rules are applied in a fixed order and each violation has its own
//! message naming the offending paths:
//!
//! 1. no include equals the module directory,
//! 2. no duplicate includes,
//! 3. no include is a subdirectory of another include,
//! 4. no path is both an include and an exclude,
//! 5. no include is a subdirectory of an exclude,
//! 6. with includes present, every exclude lies under some include.

use crate::error::{Error, Result};
use crate::path;

/// Validated include and exclude paths, relative to the module directory,
/// each sorted and deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedPaths {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

/// Validate include and exclude paths for the module at `module_dir`.
///
/// The given paths are relative to the document root, as written in a
/// configuration file. The returned paths are relative to the module.
pub fn validate_includes_and_excludes<S: AsRef<str>>(
    module_dir: &str,
    includes: &[S],
    excludes: &[S],
) -> Result<ValidatedPaths> {
    let includes = includes
        .iter()
        .map(|p| normalize_in_module(module_dir, p.as_ref(), "include"))
        .collect::<Result<Vec<_>>>()?;
    let excludes = excludes
        .iter()
        .map(|p| normalize_in_module(module_dir, p.as_ref(), "exclude"))
        .collect::<Result<Vec<_>>>()?;

    for include in &includes {
        if include == module_dir {
            return Err(Error::invalid_path(format!(
                "include path {:?} is equal to module directory {:?}",
                include, module_dir
            )));
        }
    }
    check_no_duplicates(&includes, "include")?;
    check_no_duplicates(&excludes, "exclude")?;
    for include in &includes {
        if let Some(parent) = includes.iter().find(|other| path::contains(other, include)) {
            return Err(Error::invalid_path(format!(
                "include path {:?} is a subdirectory of include path {:?}",
                include, parent
            )));
        }
    }
    for include in &includes {
        if excludes.contains(include) {
            return Err(Error::invalid_path(format!(
                "{:?} is both an include path and an exclude path",
                include
            )));
        }
    }
    for include in &includes {
        if let Some(exclude) = excludes.iter().find(|exclude| path::contains(exclude, include)) {
            return Err(Error::invalid_path(format!(
                "include path {:?} is a subdirectory of {:?} (an exclude path)",
                include, exclude
            )));
        }
    }
    if !includes.is_empty() {
        for exclude in &excludes {
            if !includes.iter().any(|include| path::contains(include, exclude)) {
                return Err(Error::invalid_path(format!(
                    "include paths {:?} are specified, but exclude path {:?} is not contained within any of them",
                    includes, exclude
                )));
            }
        }
    }

    Ok(ValidatedPaths {
        includes: relative_to_module(module_dir, includes)?,
        excludes: relative_to_module(module_dir, excludes)?,
    })
}

/// Normalize a document-root-relative path and require it to lie within
/// the module directory.
fn normalize_in_module(module_dir: &str, raw: &str, kind: &str) -> Result<String> {
    let normalized = path::normalize(raw)?;
    if kind == "exclude" && normalized == module_dir {
        return Err(Error::invalid_path(format!(
            "exclude path {:?} is equal to module directory {:?}",
            normalized, module_dir
        )));
    }
    if !path::equals_or_contains(module_dir, &normalized) {
        return Err(Error::invalid_path(format!(
            "{} path {:?} is not contained within module directory {:?}",
            kind, normalized, module_dir
        )));
    }
    Ok(normalized)
}

fn check_no_duplicates(paths: &[String], kind: &str) -> Result<()> {
    let mut seen: Vec<&String> = Vec::with_capacity(paths.len());
    for p in paths {
        if seen.contains(&p) {
            return Err(Error::invalid_path(format!("duplicate {} path {:?}", kind, p)));
        }
        seen.push(p);
    }
    Ok(())
}

fn relative_to_module(module_dir: &str, paths: Vec<String>) -> Result<Vec<String>> {
    let relative = paths
        .iter()
        .map(|p| {
            path::rel(module_dir, p).ok_or_else(|| {
                Error::internal(format!(
                    "path {:?} escaped validation for module directory {:?}",
                    p, module_dir
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(path::sort_dedup(relative))
}
