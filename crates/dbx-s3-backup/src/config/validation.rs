//! Configuration validation.

use super::Config;
use crate::error::{BackupError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.backup.batch_size == 0 {
        return Err(BackupError::Config(
            "BACKUP_BATCH_SIZE must be at least 1".into(),
        ));
    }

    if config.backup.staging_dir.as_os_str().is_empty() {
        return Err(BackupError::Config(
            "BACKUP_STAGING_DIR must not be empty".into(),
        ));
    }

    if config.source.root_path.starts_with('/') {
        return Err(BackupError::Config(
            "DROPBOX_ROOT_PATH must be relative (no leading slash)".into(),
        ));
    }

    if let Some(prefix) = &config.target.key_prefix {
        if prefix.starts_with('/') {
            return Err(BackupError::Config(
                "S3_KEY_PREFIX must not start with '/'".into(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackupConfig, SourceConfig, TargetConfig};
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            source: SourceConfig {
                access_token: "token".to_string(),
                root_path: String::new(),
            },
            target: TargetConfig {
                bucket: "bucket".to_string(),
                region: "us-east-1".to_string(),
                key_prefix: None,
            },
            backup: BackupConfig {
                schedule: "0 3 * * *".to_string(),
                batch_size: 10,
                staging_dir: PathBuf::from("/tmp/stage"),
                allowed_extensions: Vec::new(),
                webhook_url: None,
            },
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = valid_config();
        config.backup.batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_absolute_key_prefix() {
        let mut config = valid_config();
        config.target.key_prefix = Some("/vault".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_staging_dir() {
        let mut config = valid_config();
        config.backup.staging_dir = PathBuf::new();
        assert!(validate(&config).is_err());
    }
}
