//! Eligibility rules for documents.
//!
//! Two layers of filtering: structural exclusions that always apply (hidden
//! configuration directories, trash, version-control internals, temp/swap
//! files), and configured include/exclude rules on path prefixes and tags.

use serde::{Deserialize, Serialize};

/// Temp/swap name endings that editors leave behind.
const TEMP_SUFFIXES: &[&str] = &["~", ".tmp", ".swp", ".swx", ".part"];

/// Configured include/exclude rules.
///
/// Empty include lists mean "include everything"; exclude rules always win
/// over include rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncFilters {
    /// Path prefixes to include (empty = all).
    #[serde(default)]
    pub include_paths: Vec<String>,
    /// Path prefixes to exclude.
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    /// Tags to include (empty = all).
    #[serde(default)]
    pub include_tags: Vec<String>,
    /// Tags to exclude.
    #[serde(default)]
    pub exclude_tags: Vec<String>,
}

impl SyncFilters {
    /// Returns whether a path passes structural exclusions and the
    /// configured prefix rules.
    pub fn allows_path(&self, path: &str) -> bool {
        if is_structurally_excluded(path) {
            return false;
        }
        if self.exclude_paths.iter().any(|p| path.starts_with(p)) {
            return false;
        }
        if !self.include_paths.is_empty()
            && !self.include_paths.iter().any(|p| path.starts_with(p))
        {
            return false;
        }
        true
    }

    /// Returns whether a document with the given tags passes the tag rules.
    pub fn allows_tags(&self, tags: &[String]) -> bool {
        if self.exclude_tags.iter().any(|t| tags.contains(t)) {
            return false;
        }
        if !self.include_tags.is_empty() && !self.include_tags.iter().any(|t| tags.contains(t)) {
            return false;
        }
        true
    }

    /// Returns whether any tag rules are configured at all.
    pub fn has_tag_rules(&self) -> bool {
        !self.include_tags.is_empty() || !self.exclude_tags.is_empty()
    }
}

/// Structural exclusions that apply regardless of configuration: dot
/// entries anywhere in the path (`.obsidian`, `.git`, `.trash`, lock files),
/// trash directories, and temp/swap file names.
pub fn is_structurally_excluded(path: &str) -> bool {
    for component in path.split('/') {
        if component.starts_with('.') {
            return true;
        }
        if component.eq_ignore_ascii_case("trash") {
            return true;
        }
    }
    let name = path.rsplit('/').next().unwrap_or(path);
    TEMP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}
