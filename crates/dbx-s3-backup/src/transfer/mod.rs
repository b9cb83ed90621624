//! Object transfer strategies.
//!
//! One object at a time: probe the destination, skip what is already
//! there, and copy the rest either straight from memory or through a
//! staged file for large payloads. The staged path doubles as the
//! fallback when a buffered write fails, which keeps retry cost bounded
//! to a single extra attempt per object.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{BackupError, Result};
use crate::source::{content_type_for, RemoteObject, SourceStore};
use crate::target::DestinationStore;

/// Files at or above this size always stream through the staging directory.
pub const BUFFER_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Hard deadline on the destination existence probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Hard deadline on a full source read.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of copying one object.
#[derive(Debug, Clone)]
pub enum TransferOutcome {
    /// The object was written to the destination.
    Copied {
        /// Payload size in bytes.
        bytes: u64,
    },

    /// Nothing was transferred for this object.
    Skipped {
        /// Why the object was skipped.
        reason: String,
    },

    /// The object could not be copied. Counted by the caller, never
    /// retried within the same run.
    Failed {
        /// Human-readable failure description.
        message: String,
    },
}

/// Transfer engine configuration.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Directory holding staged uploads for the current run.
    pub staging_dir: PathBuf,

    /// Key prefix prepended to every destination key.
    pub key_prefix: Option<String>,

    /// Size threshold above which uploads go through the staged strategy.
    pub buffer_threshold: u64,

    /// Existence probe deadline.
    pub probe_timeout: Duration,

    /// Source read deadline.
    pub read_timeout: Duration,
}

impl TransferConfig {
    /// Config with production thresholds and timeouts.
    pub fn new(staging_dir: PathBuf, key_prefix: Option<String>) -> Self {
        Self {
            staging_dir,
            key_prefix,
            buffer_threshold: BUFFER_THRESHOLD,
            probe_timeout: PROBE_TIMEOUT,
            read_timeout: READ_TIMEOUT,
        }
    }
}

/// Copies single objects from the source store to the destination store.
pub struct TransferEngine {
    source: Arc<dyn SourceStore>,
    destination: Arc<dyn DestinationStore>,
    config: TransferConfig,
}

impl TransferEngine {
    /// Create a new transfer engine.
    pub fn new(
        source: Arc<dyn SourceStore>,
        destination: Arc<dyn DestinationStore>,
        config: TransferConfig,
    ) -> Self {
        Self {
            source,
            destination,
            config,
        }
    }

    /// Destination key for an object path.
    fn destination_key(&self, path: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }

    /// Copy one object, choosing a strategy by size.
    ///
    /// The existence probe always runs before any source read. A probe
    /// error or timeout is treated as "missing" so a flaky destination
    /// degrades into a harmless re-upload instead of stalling the batch.
    pub async fn copy(&self, object: &RemoteObject) -> TransferOutcome {
        let key = self.destination_key(&object.path);

        match timeout(self.config.probe_timeout, self.destination.exists(&key)).await {
            Ok(Ok(true)) => {
                debug!("{}: already exists, skipping", key);
                return TransferOutcome::Skipped {
                    reason: "already exists".to_string(),
                };
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                warn!("{}: existence probe failed, treating as missing: {}", key, e);
            }
            Err(_) => {
                warn!(
                    "{}: existence probe timed out after {}s, treating as missing",
                    key,
                    self.config.probe_timeout.as_secs()
                );
            }
        }

        match self.upload(object, &key).await {
            Ok(bytes) => TransferOutcome::Copied { bytes },
            Err(e) => TransferOutcome::Failed {
                message: e.to_string(),
            },
        }
    }

    /// Read the payload and upload it: buffered when small, staged when
    /// large or when the buffered write fails.
    async fn upload(&self, object: &RemoteObject, key: &str) -> Result<u64> {
        let bytes = match timeout(self.config.read_timeout, self.source.read(&object.path)).await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(BackupError::timeout(
                    format!("source read of '{}'", object.path),
                    self.config.read_timeout.as_secs(),
                ))
            }
        };

        let content_type = content_type_for(&object.path);
        let total = bytes.len() as u64;

        if object.size < self.config.buffer_threshold {
            match self
                .destination
                .write_buffer(key, &bytes, content_type, &object.metadata)
                .await
            {
                Ok(()) => {
                    debug!("{}: buffered upload complete ({} bytes)", key, total);
                    return Ok(total);
                }
                Err(e) => {
                    warn!(
                        "{}: buffered upload failed, falling back to staged upload: {}",
                        key, e
                    );
                }
            }
        }

        self.upload_staged(key, object, bytes, content_type).await?;
        Ok(total)
    }

    /// Stage the payload to disk, then stream it to the destination.
    ///
    /// The staging file is removed on every exit path, success or failure.
    async fn upload_staged(
        &self,
        key: &str,
        object: &RemoteObject,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        // Flatten separators so nested paths cannot collide inside the
        // flat staging directory.
        let staged = self.config.staging_dir.join(object.path.replace('/', "_"));
        let total = bytes.len() as u64;

        tokio::fs::write(&staged, &bytes).await?;
        drop(bytes);

        let progress_key = key.to_string();
        let result = self
            .destination
            .write_stream(
                key,
                &staged,
                content_type,
                &object.metadata,
                Box::new(move |sent, total| {
                    debug!("{}: uploaded {}/{} bytes", progress_key, sent, total);
                }),
            )
            .await;

        if let Err(e) = tokio::fs::remove_file(&staged).await {
            warn!("Failed to remove staging file {:?}: {}", staged, e);
        }

        match result {
            Ok(()) => {
                debug!("{}: staged upload complete ({} bytes)", key, total);
                Ok(())
            }
            Err(e) => Err(BackupError::transfer(
                object.path.as_str(),
                format!("staged upload failed: {}", e),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{object, FakeDestination, FakeSource};

    fn engine_with(
        source: Arc<FakeSource>,
        destination: Arc<FakeDestination>,
        staging: &std::path::Path,
    ) -> TransferEngine {
        let mut config = TransferConfig::new(staging.to_path_buf(), None);
        config.probe_timeout = Duration::from_millis(100);
        config.read_timeout = Duration::from_millis(200);
        TransferEngine::new(source, destination, config)
    }

    #[tokio::test]
    async fn test_existing_key_is_skipped_without_source_read() {
        let staging = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::default().with_file("a.mp3", b"audio"));
        let destination = Arc::new(FakeDestination::default().with_existing("a.mp3"));

        let engine = engine_with(source.clone(), destination.clone(), staging.path());
        let outcome = engine.copy(&object("a.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Skipped { .. }));
        assert!(source.read_calls.lock().unwrap().is_empty());
        assert!(destination.buffered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_small_object_goes_buffered() {
        let staging = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::default().with_file("a.mp3", b"audio"));
        let destination = Arc::new(FakeDestination::default());

        let engine = engine_with(source, destination.clone(), staging.path());
        let outcome = engine.copy(&object("a.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Copied { bytes: 5 }));
        let buffered = destination.buffered.lock().unwrap();
        assert_eq!(buffered.len(), 1);
        assert_eq!(buffered[0].0, "a.mp3");
        assert_eq!(buffered[0].1, "audio/mpeg");
        assert!(destination.streamed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_large_object_goes_staged_directly() {
        let staging = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::default().with_file("big.wav", b"0123456789"));
        let destination = Arc::new(FakeDestination::default());

        let mut config = TransferConfig::new(staging.path().to_path_buf(), None);
        config.buffer_threshold = 10;
        let engine = TransferEngine::new(source, destination.clone(), config);

        let outcome = engine.copy(&object("big.wav", 10)).await;

        assert!(matches!(outcome, TransferOutcome::Copied { bytes: 10 }));
        assert!(destination.buffered.lock().unwrap().is_empty());
        assert_eq!(destination.streamed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_buffered_failure_falls_back_to_staged() {
        let staging = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::default().with_file("a/b.mp3", b"audio"));
        let mut destination = FakeDestination::default();
        destination.fail_buffer = true;
        let destination = Arc::new(destination);

        let engine = engine_with(source, destination.clone(), staging.path());
        let outcome = engine.copy(&object("a/b.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Copied { bytes: 5 }));
        assert_eq!(destination.streamed.lock().unwrap().len(), 1);
        // Cleanup on success: the flattened staging file is gone.
        assert!(!staging.path().join("a_b.mp3").exists());
    }

    #[tokio::test]
    async fn test_staging_file_removed_when_both_strategies_fail() {
        let staging = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::default().with_file("a/b.mp3", b"audio"));
        let mut destination = FakeDestination::default();
        destination.fail_buffer = true;
        destination.fail_stream = true;
        let destination = Arc::new(destination);

        let engine = engine_with(source, destination.clone(), staging.path());
        let outcome = engine.copy(&object("a/b.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Failed { .. }));
        assert!(!staging.path().join("a_b.mp3").exists());
    }

    #[tokio::test]
    async fn test_probe_error_degrades_to_upload() {
        let staging = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::default().with_file("a.mp3", b"audio"));
        let mut destination = FakeDestination::default();
        destination.fail_probes = true;
        let destination = Arc::new(destination);

        let engine = engine_with(source, destination.clone(), staging.path());
        let outcome = engine.copy(&object("a.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Copied { .. }));
    }

    #[tokio::test]
    async fn test_probe_timeout_degrades_to_upload() {
        let staging = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::default().with_file("a.mp3", b"audio"));
        let mut destination = FakeDestination::default();
        destination.probe_delay = Some(Duration::from_millis(500));
        let destination = Arc::new(destination);

        let engine = engine_with(source, destination.clone(), staging.path());
        let outcome = engine.copy(&object("a.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Copied { .. }));
        assert_eq!(destination.buffered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_source_read_failure_is_failed_outcome() {
        let staging = tempfile::tempdir().unwrap();
        let mut source = FakeSource::default();
        source.fail_reads.insert("a.mp3".to_string());
        let source = Arc::new(source);
        let destination = Arc::new(FakeDestination::default());

        let engine = engine_with(source, destination, staging.path());
        let outcome = engine.copy(&object("a.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_source_read_timeout_is_failed_outcome() {
        let staging = tempfile::tempdir().unwrap();
        let mut source = FakeSource::default().with_file("a.mp3", b"audio");
        source.read_delay = Some(Duration::from_millis(500));
        let source = Arc::new(source);
        let destination = Arc::new(FakeDestination::default());

        let engine = engine_with(source, destination, staging.path());
        let outcome = engine.copy(&object("a.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Failed { message } if message.contains("timed out")));
    }

    #[tokio::test]
    async fn test_key_prefix_is_prepended() {
        let staging = tempfile::tempdir().unwrap();
        let source = Arc::new(FakeSource::default().with_file("a.mp3", b"audio"));
        let destination = Arc::new(FakeDestination::default());

        let mut config = TransferConfig::new(staging.path().to_path_buf(), Some("vault/".to_string()));
        config.probe_timeout = Duration::from_millis(100);
        config.read_timeout = Duration::from_millis(200);
        let engine = TransferEngine::new(source, destination.clone(), config);

        let outcome = engine.copy(&object("a.mp3", 5)).await;

        assert!(matches!(outcome, TransferOutcome::Copied { .. }));
        assert_eq!(destination.buffered.lock().unwrap()[0].0, "vault/a.mp3");
    }
}
