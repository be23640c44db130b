//! Relative path utilities for configuration files
//!
//! Every path stored in the configuration model is normalized: relative,
//! `/`-separated, no `.` or empty components, no trailing slash, and no `..`
//! component that escapes the root. The root itself is spelled `.`.

use crate::error::{Error, Result};

/// Normalize and validate a relative path.
///
/// Interior `..` components are resolved. A path that is absolute, or that
/// escapes its root, is an error.
pub fn normalize(path: &str) -> Result<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_path("path is empty"));
    }
    if trimmed.starts_with('/') || trimmed.contains('\\') || has_windows_volume(trimmed) {
        return Err(Error::invalid_path(format!(
            "{:?} must be a relative path using / as separator",
            path
        )));
    }
    let mut components: Vec<&str> = Vec::new();
    for component in trimmed.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if components.pop().is_none() {
                    return Err(Error::invalid_path(format!(
                        "{:?} is outside the context directory",
                        path
                    )));
                }
            }
            other => components.push(other),
        }
    }
    if components.is_empty() {
        return Ok(".".to_string());
    }
    Ok(components.join("/"))
}

/// Normalize a list of paths and return them sorted and deduplicated.
pub fn normalize_all<S: AsRef<str>>(paths: &[S]) -> Result<Vec<String>> {
    let normalized = paths
        .iter()
        .map(|p| normalize(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(sort_dedup(normalized))
}

/// Sort a list of strings and remove duplicates.
pub fn sort_dedup(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values.dedup();
    values
}

/// Returns true if `parent` strictly contains `child`.
///
/// Both paths must already be normalized.
pub fn contains(parent: &str, child: &str) -> bool {
    if parent == child {
        return false;
    }
    if parent == "." {
        return child != ".";
    }
    child.len() > parent.len()
        && child.starts_with(parent)
        && child.as_bytes()[parent.len()] == b'/'
}

/// Returns true if `parent` is equal to or contains `child`.
pub fn equals_or_contains(parent: &str, child: &str) -> bool {
    parent == child || contains(parent, child)
}

/// Express `target` relative to `base`, if `target` lies at or under `base`.
pub fn rel(base: &str, target: &str) -> Option<String> {
    if base == target {
        return Some(".".to_string());
    }
    if !contains(base, target) {
        return None;
    }
    if base == "." {
        return Some(target.to_string());
    }
    Some(target[base.len() + 1..].to_string())
}

/// Join a normalized relative path onto a normalized base.
pub fn join(base: &str, relative: &str) -> String {
    match (base, relative) {
        (".", r) => r.to_string(),
        (b, ".") => b.to_string(),
        (b, r) => format!("{}/{}", b, r),
    }
}

fn has_windows_volume(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
