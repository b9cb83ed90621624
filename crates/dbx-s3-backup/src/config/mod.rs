//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{BackupError, Result};

/// Default schedule: daily at 03:00.
pub const DEFAULT_SCHEDULE: &str = "0 3 * * *";

/// Default per-batch concurrency width.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Environment variable names, in one place.
mod keys {
    pub const ACCESS_TOKEN: &str = "DROPBOX_ACCESS_TOKEN";
    pub const ROOT_PATH: &str = "DROPBOX_ROOT_PATH";
    pub const BUCKET: &str = "S3_BUCKET";
    pub const REGION: &str = "S3_REGION";
    pub const KEY_PREFIX: &str = "S3_KEY_PREFIX";
    pub const SCHEDULE: &str = "BACKUP_SCHEDULE";
    pub const BATCH_SIZE: &str = "BACKUP_BATCH_SIZE";
    pub const STAGING_DIR: &str = "BACKUP_STAGING_DIR";
    pub const ALLOWED_EXTENSIONS: &str = "BACKUP_ALLOWED_EXTENSIONS";
    pub const WEBHOOK_URL: &str = "NOTIFY_WEBHOOK_URL";
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Build configuration from an explicit variable map.
    ///
    /// Blank values count as missing. A missing required variable is a
    /// fatal configuration error; nothing is re-read during a run.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| BackupError::Config(format!("{} is required", key)))
        };

        let batch_size = match get(keys::BATCH_SIZE) {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                BackupError::Config(format!(
                    "{} must be a positive integer, got '{}'",
                    keys::BATCH_SIZE,
                    raw
                ))
            })?,
            None => DEFAULT_BATCH_SIZE,
        };

        let allowed_extensions = get(keys::ALLOWED_EXTENSIONS)
            .map(|raw| {
                raw.split(',')
                    .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = Config {
            source: SourceConfig {
                access_token: require(keys::ACCESS_TOKEN)?,
                root_path: get(keys::ROOT_PATH).unwrap_or_default(),
            },
            target: TargetConfig {
                bucket: require(keys::BUCKET)?,
                region: require(keys::REGION)?,
                key_prefix: get(keys::KEY_PREFIX),
            },
            backup: BackupConfig {
                schedule: get(keys::SCHEDULE).unwrap_or_else(|| DEFAULT_SCHEDULE.to_string()),
                batch_size,
                staging_dir: get(keys::STAGING_DIR)
                    .map(PathBuf::from)
                    .unwrap_or_else(default_staging_dir),
                allowed_extensions,
                webhook_url: get(keys::WEBHOOK_URL),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("dbx-s3-backup")
}
