//! Remote object and listing entry types.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One leaf file in the source tree.
///
/// Created by the enumerator for the duration of a run, read-only
/// thereafter, discarded at run end. `path` uniquely identifies the object
/// within one run; folders are never represented as objects.
#[derive(Debug, Clone)]
pub struct RemoteObject {
    /// Slash-separated path relative to the account root.
    pub path: String,

    /// Size in bytes.
    pub size: u64,

    /// Creation timestamp, when the service reports one.
    pub created_at: Option<DateTime<Utc>>,

    /// Last-modified timestamp, when the service reports one.
    pub updated_at: Option<DateTime<Utc>>,

    /// Opaque provider metadata, forwarded verbatim to destination writes.
    pub metadata: HashMap<String, String>,
}

/// One entry returned by a folder listing.
#[derive(Debug, Clone)]
pub struct RemoteEntry {
    /// Entry name within its parent folder.
    pub name: String,

    /// File metadata; folder entries have none.
    pub metadata: Option<EntryMetadata>,
}

/// File metadata attached to a listing entry.
#[derive(Debug, Clone)]
pub struct EntryMetadata {
    /// Size in bytes, when the service reports one.
    pub size: Option<u64>,

    /// Creation timestamp.
    pub created_at: Option<DateTime<Utc>>,

    /// Last-modified timestamp.
    pub updated_at: Option<DateTime<Utc>>,

    /// Additional provider fields (content hashes, revisions, ...).
    pub extra: HashMap<String, String>,
}

impl RemoteEntry {
    /// Folder classification rule: an entry with no file metadata, or
    /// metadata lacking a size, is a folder.
    ///
    /// This shape-based rule is a behavioral contract relied on by the
    /// enumerator; the listing clients never classify entries themselves.
    pub fn is_folder(&self) -> bool {
        match &self.metadata {
            None => true,
            Some(meta) => meta.size.is_none(),
        }
    }
}

/// Derive a MIME content type from a file name's extension.
///
/// The mapping is a fixed local table; the storage service is never asked.
/// Unknown extensions fall back to a generic binary type.
pub fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit('/')
        .next()
        .and_then(|base| base.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .unwrap_or("");

    match extension.to_ascii_lowercase().as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "aif" | "aiff" => "audio/aiff",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
