//! Three-way merge and conflict resolution.
//!
//! The merge is positional and line-oriented: the three texts are compared
//! line by line, changes on one side only are taken, and genuine two-sided
//! divergence is rendered as a marked conflict block. No semantic awareness,
//! no line-ending normalization — a CRLF/LF difference is a real difference.

use crate::error::{SyncError, SyncResult};
use crate::metadata::extract_metadata;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Opening marker of a conflict block (local side).
pub const MARKER_LOCAL: &str = "<<<<<<< Local";
/// Separator between the two sides of a conflict block.
pub const MARKER_SEPARATOR: &str = "=======";
/// Closing marker of a conflict block (remote side).
pub const MARKER_REMOTE: &str = ">>>>>>> Remote";

/// Which side contributed content to a conflict block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSide {
    Local,
    Remote,
    Both,
}

/// One conflict block in the merge output.
///
/// Markers span contiguous line ranges and never overlap or nest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictMarker {
    /// Zero-based line index of the opening marker in the merge output.
    pub start_line: usize,
    /// Zero-based line index of the closing marker in the merge output.
    pub end_line: usize,
    pub side: ConflictSide,
    pub description: String,
}

/// The material a manual resolution is made from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictData {
    /// Common ancestor, when one was available.
    pub base: Option<String>,
    pub local: String,
    pub remote: String,
    pub markers: Vec<ConflictMarker>,
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Merged cleanly (or a policy chose a side); `content` is final.
    Auto { content: String },
    /// Divergence needs a human; suggestions describe what to look at.
    Manual {
        conflict: ConflictData,
        suggestions: Vec<String>,
    },
}

/// How conflicting merges are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPolicy {
    /// Leave conflicts for manual resolution.
    #[default]
    Ask,
    /// The local document wins verbatim.
    Local,
    /// The remote document wins verbatim.
    Remote,
    /// The newer side wins. Not resolvable from checksums and content
    /// alone; currently falls through to manual.
    Newest,
}

/// A conflict resolution strategy.
///
/// Trait object so the engine can be handed alternative strategies (tests
/// inject forcing resolvers the same way).
pub trait Resolve: Send + Sync {
    fn resolve(&self, base: Option<&str>, local: &str, remote: &str) -> Resolution;
}

/// Compares three texts position by position and produces the merge output
/// together with the conflict markers embedded in it.
pub fn three_way_merge(base: &str, local: &str, remote: &str) -> (String, Vec<ConflictMarker>) {
    let base_lines: Vec<&str> = base.lines().collect();
    let local_lines: Vec<&str> = local.lines().collect();
    let remote_lines: Vec<&str> = remote.lines().collect();
    let positions = base_lines.len().max(local_lines.len()).max(remote_lines.len());

    let mut out: Vec<String> = Vec::with_capacity(positions);
    let mut markers = Vec::new();

    for i in 0..positions {
        let b = base_lines.get(i).copied();
        let l = local_lines.get(i).copied();
        let r = remote_lines.get(i).copied();

        if l == r {
            if let Some(line) = l {
                out.push(line.to_string());
            }
            continue;
        }
        if l == b {
            // Only remote changed this position.
            if let Some(line) = r {
                out.push(line.to_string());
            }
            continue;
        }
        if r == b {
            // Only local changed this position.
            if let Some(line) = l {
                out.push(line.to_string());
            }
            continue;
        }

        // Both sides changed the same position.
        let side = match (l, r) {
            (None, Some(_)) => ConflictSide::Remote,
            (Some(_), None) => ConflictSide::Local,
            _ => ConflictSide::Both,
        };
        let start_line = out.len();
        out.push(MARKER_LOCAL.to_string());
        if let Some(line) = l {
            out.push(line.to_string());
        }
        out.push(MARKER_SEPARATOR.to_string());
        if let Some(line) = r {
            out.push(line.to_string());
        }
        out.push(MARKER_REMOTE.to_string());
        let end_line = out.len() - 1;

        markers.push(ConflictMarker {
            start_line,
            end_line,
            side,
            description: format!("line {}: local and remote diverge", i + 1),
        });
    }

    let mut merged = out.join("\n");
    if (local.ends_with('\n') || remote.ends_with('\n')) && !merged.is_empty() {
        merged.push('\n');
    }
    (merged, markers)
}

/// Rejects content that still contains conflict-marker sentinels, anywhere
/// in the text including inside the metadata block.
pub fn validate_resolution(content: &str) -> SyncResult<()> {
    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim_end();
        if trimmed.starts_with("<<<<<<<")
            || trimmed == MARKER_SEPARATOR
            || trimmed.starts_with(">>>>>>>")
        {
            return Err(SyncError::Validation(format!(
                "resolution still contains a conflict marker at line {}",
                i + 1
            )));
        }
    }
    Ok(())
}

/// The production resolver: three-way merge plus configured policy.
pub struct ThreeWayResolver {
    policy: ResolutionPolicy,
}

impl ThreeWayResolver {
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    fn manual(
        &self,
        base: Option<&str>,
        local: &str,
        remote: &str,
        markers: Vec<ConflictMarker>,
    ) -> Resolution {
        let conflict = ConflictData {
            base: base.map(str::to_string),
            local: local.to_string(),
            remote: remote.to_string(),
            markers,
        };
        let suggestions = suggest(&conflict);
        Resolution::Manual {
            conflict,
            suggestions,
        }
    }
}

impl Resolve for ThreeWayResolver {
    fn resolve(&self, base: Option<&str>, local: &str, remote: &str) -> Resolution {
        // With no recorded ancestor the local text stands in as the base.
        // Precision drops: local-only edits cannot be told apart from shared
        // history, so divergent lines read as remote changes and merge clean.
        let effective_base = base.unwrap_or(local);
        let (merged, markers) = three_way_merge(effective_base, local, remote);

        if markers.is_empty() {
            debug!("merge clean, {} lines", merged.lines().count());
            return Resolution::Auto { content: merged };
        }

        match self.policy {
            ResolutionPolicy::Local => Resolution::Auto {
                content: local.to_string(),
            },
            ResolutionPolicy::Remote => Resolution::Auto {
                content: remote.to_string(),
            },
            ResolutionPolicy::Newest => {
                warn!(
                    "newest-wins policy cannot be applied from content alone; \
                     leaving {} conflicts for manual resolution",
                    markers.len()
                );
                self.manual(base, local, remote, markers)
            }
            ResolutionPolicy::Ask => self.manual(base, local, remote, markers),
        }
    }
}

/// Builds human-readable pointers for a manual resolution.
fn suggest(conflict: &ConflictData) -> Vec<String> {
    let mut suggestions = Vec::new();

    if conflict.markers.len() > 1 {
        suggestions.push(format!(
            "{} separate regions diverge; review each conflict block on its own",
            conflict.markers.len()
        ));
    }

    let local_lines = conflict.local.lines().count();
    let remote_lines = conflict.remote.lines().count();
    if local_lines.abs_diff(remote_lines) > 5 {
        let longer = if local_lines > remote_lines {
            "local"
        } else {
            "remote"
        };
        suggestions.push(format!(
            "the {} version is {} lines longer ({} vs {}); one side may contain additions the other is missing",
            longer,
            local_lines.abs_diff(remote_lines),
            local_lines,
            remote_lines
        ));
    }

    let local_meta = extract_metadata(&conflict.local);
    let remote_meta = extract_metadata(&conflict.remote);
    if let (Some(lm), Some(rm)) = (&local_meta, &remote_meta) {
        if lm.layer != rm.layer {
            suggestions.push(format!(
                "metadata field `layer` differs (local: {}, remote: {})",
                lm.layer, rm.layer
            ));
        }
        if lm.framework != rm.framework {
            suggestions.push(format!(
                "metadata field `framework` differs (local: {}, remote: {})",
                lm.framework, rm.framework
            ));
        }
        if lm.core_message != rm.core_message {
            suggestions.push("metadata field `core_message` differs between the two sides".to_string());
        }
        if lm.connections.len() != rm.connections.len() {
            suggestions.push(format!(
                "cross-document references differ (local has {}, remote has {})",
                lm.connections.len(),
                rm.connections.len()
            ));
        }
    }

    suggestions
}
