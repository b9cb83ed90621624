//! In-memory recording fakes for the capability traits.
//!
//! Shared by the module tests so the orchestration core is exercised
//! without touching a real storage service.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{BackupError, Result};
use crate::notify::Notifier;
use crate::orchestrator::RunMetrics;
use crate::source::{EntryMetadata, RemoteEntry, RemoteObject, SourceStore};
use crate::target::{DestinationStore, ProgressFn};

/// Build a file listing entry with the given size.
pub fn file_entry(name: &str, size: u64) -> RemoteEntry {
    RemoteEntry {
        name: name.to_string(),
        metadata: Some(EntryMetadata {
            size: Some(size),
            created_at: None,
            updated_at: None,
            extra: HashMap::new(),
        }),
    }
}

/// Build a folder listing entry (no file metadata).
pub fn folder_entry(name: &str) -> RemoteEntry {
    RemoteEntry {
        name: name.to_string(),
        metadata: None,
    }
}

/// Build a remote object with the given path and size.
pub fn object(path: &str, size: u64) -> RemoteObject {
    RemoteObject {
        path: path.to_string(),
        size,
        created_at: None,
        updated_at: None,
        metadata: HashMap::new(),
    }
}

/// Recording in-memory source store.
#[derive(Default)]
pub struct FakeSource {
    pub folders: HashMap<String, Vec<RemoteEntry>>,
    pub files: HashMap<String, Vec<u8>>,
    pub fail_lists: HashSet<String>,
    pub fail_reads: HashSet<String>,
    pub read_delay: Option<Duration>,
    pub list_calls: Mutex<Vec<String>>,
    pub read_calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_folder(mut self, path: &str, entries: Vec<RemoteEntry>) -> Self {
        self.folders.insert(path.to_string(), entries);
        self
    }

    pub fn with_file(mut self, path: &str, bytes: &[u8]) -> Self {
        self.files.insert(path.to_string(), bytes.to_vec());
        self
    }
}

#[async_trait]
impl SourceStore for FakeSource {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.list_calls.lock().unwrap().push(path.to_string());
        if self.fail_lists.contains(path) {
            return Err(BackupError::source(path, "listing refused"));
        }
        Ok(self.folders.get(path).cloned().unwrap_or_default())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.read_calls.lock().unwrap().push(path.to_string());
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_reads.contains(path) {
            return Err(BackupError::source(path, "download refused"));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| BackupError::source(path, "no such file"))
    }
}

/// Recording in-memory destination store.
///
/// Tracks how many calls are in flight at once so tests can assert the
/// per-batch concurrency bound.
#[derive(Default)]
pub struct FakeDestination {
    pub existing: HashSet<String>,
    pub fail_probes: bool,
    pub probe_delay: Option<Duration>,
    pub fail_buffer: bool,
    pub fail_stream: bool,
    /// (key, content type, payload length) per buffered write.
    pub buffered: Mutex<Vec<(String, String, usize)>>,
    /// (key, content type, staged file length) per streamed write.
    pub streamed: Mutex<Vec<(String, String, u64)>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeDestination {
    pub fn with_existing(mut self, key: &str) -> Self {
        self.existing.insert(key.to_string());
        self
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DestinationStore for FakeDestination {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.enter();
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        // Yield so transfers of the same batch overlap and the width
        // counter observes them together.
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.exit();

        if self.fail_probes {
            return Err(BackupError::destination(key, "probe refused"));
        }
        Ok(self.existing.contains(key))
    }

    async fn write_buffer(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        _metadata: &HashMap<String, String>,
    ) -> Result<()> {
        if self.fail_buffer {
            return Err(BackupError::destination(key, "buffered write refused"));
        }
        self.buffered
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), bytes.len()));
        Ok(())
    }

    async fn write_stream(
        &self,
        key: &str,
        staged: &Path,
        content_type: &str,
        _metadata: &HashMap<String, String>,
        on_progress: ProgressFn,
    ) -> Result<()> {
        let len = tokio::fs::metadata(staged).await?.len();
        if self.fail_stream {
            return Err(BackupError::destination(key, "streamed write refused"));
        }
        on_progress(len, len);
        self.streamed
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), len));
        Ok(())
    }
}

/// Notifier that records every payload it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    pub delivered: Mutex<Vec<RunMetrics>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, metrics: &RunMetrics) -> Result<()> {
        if self.fail {
            return Err(BackupError::Notify("delivery refused".to_string()));
        }
        self.delivered.lock().unwrap().push(metrics.clone());
        Ok(())
    }
}
