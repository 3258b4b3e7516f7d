//! Embedded metadata block codec.
//!
//! The metadata block is YAML front matter between `---` sentinel lines at
//! the very top of a document. Documents without a block are valid,
//! untracked documents — extraction reports absence, never an error.

use crate::checksum::document_checksum;
use chrono::{DateTime, Utc};
use quill_types::{NoteMetadata, SyncSource, SyncStamp};

const SENTINEL: &str = "---";

/// Splits a document into its front-matter text (without sentinels) and the
/// body that follows the closing sentinel.
fn split_front_matter(content: &str) -> Option<(String, String)> {
    let mut lines = content.lines();
    if lines.next().map(|l| l.trim_end()) != Some(SENTINEL) {
        return None;
    }

    let mut block_lines = Vec::new();
    let mut body_lines = Vec::new();
    let mut closed = false;
    for line in lines {
        if !closed && line.trim_end() == SENTINEL {
            closed = true;
            continue;
        }
        if closed {
            body_lines.push(line);
        } else {
            block_lines.push(line);
        }
    }
    if !closed {
        return None;
    }

    let mut body = body_lines.join("\n");
    if content.ends_with('\n') && !body.is_empty() {
        body.push('\n');
    }
    Some((block_lines.join("\n"), body))
}

/// Extracts the metadata block from a document.
///
/// Returns `None` when the block is missing or malformed (no closing
/// sentinel, invalid YAML, unknown enum values).
pub fn extract_metadata(content: &str) -> Option<NoteMetadata> {
    let (block, _) = split_front_matter(content)?;
    serde_yaml::from_str(&block).ok()
}

/// Embeds `meta` into a document, replacing an existing block in place or
/// prepending a new one before the body.
pub fn update_metadata(content: &str, meta: &NoteMetadata) -> String {
    // NoteMetadata serializes infallibly: string/enum/timestamp fields only.
    let yaml = serde_yaml::to_string(meta).expect("metadata serialization");

    match split_front_matter(content) {
        Some((_, body)) => {
            if body.is_empty() {
                format!("{SENTINEL}\n{yaml}{SENTINEL}\n")
            } else {
                format!("{SENTINEL}\n{yaml}{SENTINEL}\n{body}")
            }
        }
        None => {
            if content.is_empty() {
                format!("{SENTINEL}\n{yaml}{SENTINEL}\n")
            } else {
                format!("{SENTINEL}\n{yaml}{SENTINEL}\n\n{content}")
            }
        }
    }
}

/// Stamps the sync sub-block: `last_sync`, the originating side, and the
/// content checksum.
///
/// The checksum is computed on the re-embedded text (sync sub-block
/// excluded), so the stored value always matches what a later
/// [`document_checksum`] of the written bytes reports. Documents without a
/// metadata block are returned unchanged; they stay untracked.
pub fn update_for_sync(content: &str, source: SyncSource, now: DateTime<Utc>) -> String {
    let Some(mut meta) = extract_metadata(content) else {
        return content.to_string();
    };

    // First pass settles the serialized shape of the block, second pass
    // records the checksum of that settled shape.
    meta.sync = Some(SyncStamp {
        last_sync: now,
        sync_source: source,
        checksum: String::new(),
    });
    let updated = update_metadata(content, &meta);

    meta.sync = Some(SyncStamp {
        last_sync: now,
        sync_source: source,
        checksum: document_checksum(&updated),
    });
    update_metadata(&updated, &meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_types::Layer;

    fn sample_meta() -> NoteMetadata {
        NoteMetadata::new(Layer::Synthesis, "zettel", "sess-42")
            .with_tags(vec!["deep".into(), "draft".into()])
            .with_connections(vec!["note-17".into()])
    }

    #[test]
    fn absent_block_is_none() {
        assert!(extract_metadata("just a note\n").is_none());
        assert!(extract_metadata("").is_none());
    }

    #[test]
    fn unclosed_block_is_none() {
        assert!(extract_metadata("---\nversion: '1'\nno closing sentinel\n").is_none());
    }

    #[test]
    fn malformed_yaml_is_none() {
        assert!(extract_metadata("---\n[not: valid: yaml\n---\nbody\n").is_none());
    }

    #[test]
    fn prepends_block_to_plain_document() {
        let updated = update_metadata("The body.\n", &sample_meta());
        assert!(updated.starts_with("---\n"));
        assert!(updated.ends_with("\nThe body.\n"));
        let meta = extract_metadata(&updated).expect("block present");
        assert_eq!(meta.framework, "zettel");
    }

    #[test]
    fn replaces_block_in_place() {
        let original = update_metadata("The body.\n", &sample_meta());
        let mut changed = sample_meta();
        changed.framework = "atomic".to_string();
        let updated = update_metadata(&original, &changed);

        let meta = extract_metadata(&updated).expect("block present");
        assert_eq!(meta.framework, "atomic");
        assert!(updated.ends_with("The body.\n"));
        // Still exactly one block.
        assert_eq!(updated.matches("---\n").count(), 2);
    }

    #[test]
    fn metadata_round_trips_through_a_document() {
        let meta = sample_meta();
        let content = update_metadata("Body.\n", &meta);
        let extracted = extract_metadata(&content).expect("block present");
        assert_eq!(extracted, meta);
    }

    #[test]
    fn update_for_sync_stamps_matching_checksum() {
        let content = update_metadata("The body.\n", &sample_meta());
        let stamped = update_for_sync(&content, SyncSource::Local, Utc::now());

        let meta = extract_metadata(&stamped).expect("block present");
        let stamp = meta.sync.expect("sync stamp present");
        assert_eq!(stamp.sync_source, SyncSource::Local);
        assert_eq!(stamp.checksum, document_checksum(&stamped));
    }

    #[test]
    fn update_for_sync_is_stable_modulo_stamp() {
        let content = update_metadata("The body.\n", &sample_meta());
        let first = update_for_sync(&content, SyncSource::Local, Utc::now());
        let second = update_for_sync(&first, SyncSource::Remote, Utc::now());
        assert_eq!(document_checksum(&first), document_checksum(&second));
    }

    #[test]
    fn untracked_document_left_unchanged() {
        let content = "no metadata here\n";
        assert_eq!(update_for_sync(content, SyncSource::Local, Utc::now()), content);
    }
}
