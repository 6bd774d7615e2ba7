// SPDX-License-Identifier: AGPL-3.0
// Copyright (C) 2026 LFSD Contributors

//! `.gitattributes` handling
//!
//! Only lines carrying `filter=lfsd` matter here. Patterns follow the
//! gitignore rules Git applies to attributes, minus the parts attributes do
//! not support (negation and directory-only patterns).

use crate::error::{GitError, GitResult};
use crate::filter::FILTER_DRIVER_NAME;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Attribute files consulted, relative to the working tree root
pub const ATTRIBUTE_FILES: [&str; 2] = [".gitattributes", ".git/info/attributes"];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// The attribute suffix written by `track`
pub fn track_line(pattern: &str) -> String {
    format!(
        "{} filter={name} diff={name} merge={name} -text",
        pattern,
        name = FILTER_DRIVER_NAME
    )
}

/// Decides whether a repository path is tracked by the lfsd filter
#[derive(Debug, Clone, Default)]
pub struct AttributesMatcher {
    rules: Vec<Pattern>,
}

impl AttributesMatcher {
    /// Build a matcher from attribute file contents
    pub fn parse(content: &str) -> Self {
        let rules = tracked_patterns(content)
            .into_iter()
            .filter_map(|raw| {
                let normalized = normalize(&raw)?;
                match Pattern::new(&normalized) {
                    Ok(pattern) => Some(pattern),
                    Err(e) => {
                        warn!(pattern = %raw, error = %e, "ignoring invalid attributes pattern");
                        None
                    }
                }
            })
            .collect();
        Self { rules }
    }

    /// Matcher over every attribute file of the working tree at `root`
    pub fn load(root: &Path) -> GitResult<Self> {
        let mut content = String::new();
        for name in ATTRIBUTE_FILES {
            let path = root.join(name);
            if path.exists() {
                content.push_str(&fs::read_to_string(&path)?);
                content.push('\n');
            }
        }
        Ok(Self::parse(&content))
    }

    /// Whether `path` (relative to the working tree root) uses the lfsd filter
    pub fn matches(&self, path: &str) -> bool {
        let path = path.replace('\\', "/");
        let path = path.trim_start_matches('/');
        self.rules
            .iter()
            .any(|rule| rule.matches_with(path, MATCH_OPTIONS))
    }

    /// True when no pattern uses the lfsd filter
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Patterns of the lines in `content` that set `filter=lfsd`
pub fn tracked_patterns(content: &str) -> Vec<String> {
    let filter_attr = format!("filter={}", FILTER_DRIVER_NAME);
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let pattern = tokens.next()?;
            tokens
                .any(|attr| attr == filter_attr)
                .then(|| pattern.to_string())
        })
        .collect()
}

/// Turn a gitattributes pattern into a glob rooted at the working tree
fn normalize(pattern: &str) -> Option<String> {
    if pattern.starts_with('!') || pattern.ends_with('/') {
        return None;
    }
    if let Some(anchored) = pattern.strip_prefix('/') {
        return Some(anchored.to_string());
    }
    if pattern.contains('/') {
        Some(pattern.to_string())
    } else {
        Some(format!("**/{}", pattern))
    }
}

/// Add a `track` line for `pattern` to `<root>/.gitattributes`
///
/// Returns `false` if the pattern was already tracked.
pub fn track(root: &Path, pattern: &str) -> GitResult<bool> {
    let pattern = pattern.trim();
    if pattern.is_empty() || pattern.contains(char::is_whitespace) {
        return Err(GitError::GitattributesConfig(format!(
            "invalid pattern '{}'",
            pattern
        )));
    }

    let path = root.join(".gitattributes");
    let mut content = read_or_empty(&path)?;

    if tracked_patterns(&content).iter().any(|p| p == pattern) {
        debug!("Pattern {} already tracked", pattern);
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&track_line(pattern));
    content.push('\n');

    fs::write(&path, content).map_err(|e| GitError::GitattributesConfig(e.to_string()))?;
    info!("Pattern {} added to .gitattributes", pattern);
    Ok(true)
}

/// Remove the lfsd lines for `pattern` from `<root>/.gitattributes`
///
/// Returns `false` if no line was removed.
pub fn untrack(root: &Path, pattern: &str) -> GitResult<bool> {
    let path = root.join(".gitattributes");
    if !path.exists() {
        debug!(".gitattributes does not exist");
        return Ok(false);
    }

    let content = read_or_empty(&path)?;
    let pattern = pattern.trim();
    let kept: Vec<&str> = content
        .lines()
        .filter(|line| tracked_patterns(line).first().map(String::as_str) != Some(pattern))
        .collect();

    let removed = kept.len() != content.lines().count();
    if removed {
        let mut new_content = kept.join("\n");
        if !new_content.is_empty() {
            new_content.push('\n');
        }
        fs::write(&path, new_content).map_err(|e| GitError::GitattributesConfig(e.to_string()))?;
        info!("Pattern {} removed from .gitattributes", pattern);
    }
    Ok(removed)
}

/// Tracked patterns per attribute file, for display
pub fn list_tracked(root: &Path) -> GitResult<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for name in ATTRIBUTE_FILES {
        let content = read_or_empty(&root.join(name))?;
        for pattern in tracked_patterns(&content) {
            found.push((pattern, PathBuf::from(name)));
        }
    }
    Ok(found)
}

fn read_or_empty(path: &Path) -> GitResult<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(GitError::GitattributesConfig(format!(
            "{}: {}",
            path.display(),
            e
        ))),
    }
}
