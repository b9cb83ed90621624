//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
///
/// Owned by the orchestrator, read-only everywhere else, loaded once per
/// process lifetime.
#[derive(Debug, Clone)]
pub struct Config {
    /// Source service (Dropbox) configuration.
    pub source: SourceConfig,

    /// Destination bucket (S3) configuration.
    pub target: TargetConfig,

    /// Backup behavior configuration.
    pub backup: BackupConfig,
}

/// Source service configuration.
#[derive(Clone)]
pub struct SourceConfig {
    /// OAuth access token.
    pub access_token: String,

    /// Folder to mirror, relative to the account root ("" = everything).
    pub root_path: String,
}

// Manual Debug so the token can never leak into logs.
impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("access_token", &"[REDACTED]")
            .field("root_path", &self.root_path)
            .finish()
    }
}

/// Destination bucket configuration.
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// Bucket name.
    pub bucket: String,

    /// Bucket region.
    pub region: String,

    /// Optional key prefix prepended to every uploaded object.
    pub key_prefix: Option<String>,
}

/// Backup behavior configuration.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    /// Five-field schedule expression, evaluated once per minute.
    pub schedule: String,

    /// Concurrency width per batch.
    pub batch_size: usize,

    /// Directory for staged uploads.
    pub staging_dir: PathBuf,

    /// Lowercase extensions to back up; empty allows everything.
    pub allowed_extensions: Vec<String>,

    /// Webhook endpoint for run summaries; None disables notification.
    pub webhook_url: Option<String>,
}

impl BackupConfig {
    /// Check a path against the extension allow-list.
    pub fn allows(&self, path: &str) -> bool {
        if self.allowed_extensions.is_empty() {
            return true;
        }

        let name = path.rsplit('/').next().unwrap_or(path);
        match name.rsplit_once('.') {
            Some((_, extension)) => {
                let extension = extension.to_ascii_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == extension)
            }
            None => false,
        }
    }
}
