//! The note metadata model.
//!
//! Every tracked document carries a structured metadata block at the top of
//! its text (front matter between `---` sentinel lines). The fields here
//! mirror that block one-to-one; parsing and re-embedding are the sync
//! crate's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a note within the authoring pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Raw captured material.
    Capture,
    /// Material distilled from one or more captures.
    Synthesis,
    /// Content prepared for an audience.
    Teaching,
    /// Long-lived lookup material.
    Reference,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Layer::Capture => "capture",
            Layer::Synthesis => "synthesis",
            Layer::Teaching => "teaching",
            Layer::Reference => "reference",
        };
        write!(f, "{s}")
    }
}

/// Which side a sync stamp originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncSource {
    Local,
    Remote,
}

impl fmt::Display for SyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncSource::Local => write!(f, "local"),
            SyncSource::Remote => write!(f, "remote"),
        }
    }
}

/// Sync bookkeeping embedded in the metadata block.
///
/// `checksum` covers the document text *excluding* this sub-block, so
/// re-stamping never changes the checksum it records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStamp {
    /// When the document was last reconciled.
    pub last_sync: DateTime<Utc>,
    /// Which store provided the content at that reconciliation.
    pub sync_source: SyncSource,
    /// Lowercase hex SHA-256 of the document body (sync sub-block excluded).
    pub checksum: String,
}

/// The structured metadata block embedded at the top of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteMetadata {
    /// Schema version of the block.
    #[serde(default = "default_version")]
    pub version: String,
    /// Pipeline layer classification.
    pub layer: Layer,
    /// Authoring framework the note was produced under.
    pub framework: String,
    /// When the note was authored.
    pub timestamp: DateTime<Utc>,
    /// Authoring session identifier.
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_objective: Option<String>,
    /// Cross-document reference ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Sync bookkeeping; absent until the first reconciliation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncStamp>,
}

fn default_version() -> String {
    "1".to_string()
}

impl NoteMetadata {
    /// Creates a metadata block with the required fields and the current time.
    pub fn new(layer: Layer, framework: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            version: default_version(),
            layer,
            framework: framework.into(),
            timestamp: Utc::now(),
            session_id: session_id.into(),
            depth_level: None,
            voice_profile: None,
            audience: None,
            core_message: None,
            learning_objective: None,
            connections: Vec::new(),
            tags: Vec::new(),
            sync: None,
        }
    }

    /// Sets the tag list.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the cross-document references.
    pub fn with_connections(mut self, connections: Vec<String>) -> Self {
        self.connections = connections;
        self
    }

    /// Sets the core message.
    pub fn with_core_message(mut self, message: impl Into<String>) -> Self {
        self.core_message = Some(message.into());
        self
    }

    /// Sets the sync stamp.
    pub fn with_sync(mut self, stamp: SyncStamp) -> Self {
        self.sync = Some(stamp);
        self
    }
}
