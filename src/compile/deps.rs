//! Dependency lists reported by the compile worker, and hash reuse between builds.

use super::BuildResult;
use crate::hashes::DependencyHash;
use serde_json::Value;
use std::collections::HashSet;

/// Strips surrounding whitespace and a leading `./`.
fn normalize(path: &str) -> &str {
    let path = path.trim();
    path.strip_prefix("./").unwrap_or(path)
}

/// Parses the `X-Dependencies` header: a JSON array of repository-relative paths.
///
/// A missing or malformed header yields an empty list; non-string and empty
/// entries are skipped.
pub fn parse_dependency_header(value: Option<&str>) -> Vec<String> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(normalize)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect(),
        Ok(other) => {
            log::warn!("Ignoring dependency header that is not a JSON array: {}", other);
            Vec::new()
        }
        Err(e) => {
            log::warn!("Ignoring malformed dependency header: {}", e);
            Vec::new()
        }
    }
}

/// Removes duplicates, keeping the first occurrence of each path.
pub fn dedup_preserving_order(paths: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// The final dependency list for a build: the header's paths, deduplicated,
/// with the compile target appended when the worker did not report it.
///
/// # Examples
/// ```
/// use papersync::compile::dependency_paths;
///
/// let paths = dependency_paths(Some(r#"["intro.tex","refs.bib","intro.tex"]"#), "main.tex");
/// assert_eq!(paths, vec!["intro.tex", "refs.bib", "main.tex"]);
/// ```
pub fn dependency_paths(header: Option<&str>, target: &str) -> Vec<String> {
    let mut paths = dedup_preserving_order(parse_dependency_header(header));
    let target = normalize(target);
    if !target.is_empty() && !paths.iter().any(|p| p == target) {
        paths.push(target.to_string());
    }
    paths
}

/// Whether two dependency lists name the same non-empty set of paths.
pub fn same_dependency_set(previous: &[String], current: &[String]) -> bool {
    if previous.is_empty() || previous.len() != current.len() {
        return false;
    }
    let mut previous: Vec<&str> = previous.iter().map(String::as_str).collect();
    let mut current: Vec<&str> = current.iter().map(String::as_str).collect();
    previous.sort_unstable();
    current.sort_unstable();
    previous == current
}

/// Hashes from `previous` that can be carried over to a build whose
/// dependencies are `current`, or `None` if they must be refetched.
///
/// Reuse is keyed on the path set only. A force-push that keeps the same
/// paths with different content is not detected here.
pub fn reusable_hashes<'a>(
    previous: Option<&'a BuildResult>,
    current: &[String],
) -> Option<&'a [DependencyHash]> {
    let previous = previous?;
    if previous.dependencies.is_empty() {
        return None;
    }
    same_dependency_set(&previous.dependency_paths, current)
        .then_some(previous.dependencies.as_slice())
}
