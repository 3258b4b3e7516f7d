//! Content checksums for divergence detection.
//!
//! The checksum covers the document text with the `sync:` sub-block of the
//! metadata stripped out. Stamping a sync block (which happens on every
//! write-back) therefore never changes the checksum that block records; two
//! stores holding the same body compare equal no matter when each was last
//! stamped.

use sha2::{Digest, Sha256};

const SENTINEL: &str = "---";
const SYNC_KEY: &str = "sync:";

/// Hashes a document to a lowercase hex SHA-256 digest, excluding the sync
/// sub-block of its metadata.
pub fn document_checksum(content: &str) -> String {
    let stripped = strip_sync_block(content);
    let mut hasher = Sha256::new();
    hasher.update(stripped.as_bytes());
    hex::encode(hasher.finalize())
}

/// Removes the `sync:` mapping (key line plus indented continuation lines)
/// from the front-matter block, leaving everything else untouched.
///
/// Documents without a front-matter block are returned as-is; a `sync:` line
/// in the body is body text, not metadata, and is never stripped.
pub(crate) fn strip_sync_block(content: &str) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.first().map(|l| l.trim_end()) != Some(SENTINEL) {
        return content.to_string();
    }
    let Some(close) = lines
        .iter()
        .skip(1)
        .position(|l| l.trim_end() == SENTINEL)
        .map(|i| i + 1)
    else {
        return content.to_string();
    };

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    let mut in_sync = false;
    for (i, line) in lines.iter().enumerate() {
        let inside_block = i > 0 && i < close;
        if inside_block {
            if line.starts_with(SYNC_KEY) {
                in_sync = true;
                continue;
            }
            if in_sync {
                // Continuation lines of the sync mapping are indented.
                if line.starts_with(' ') || line.starts_with('\t') {
                    continue;
                }
                in_sync = false;
            }
        }
        out.push(line);
    }

    let mut result = out.join("\n");
    if content.ends_with('\n') {
        result.push('\n');
    }
    result
}
