//! Backup orchestrator - batching, aggregation and scheduling.
//!
//! One run is: enumerate the source tree, partition the objects into
//! fixed-size batches, fan each batch out concurrently and fan back in
//! before the next one starts. Concurrency is bounded by the batch width;
//! there is no global worker pool. The poll loop re-evaluates the
//! schedule once per minute and never interrupts an in-flight run.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::notify::Notifier;
use crate::schedule;
use crate::source::{SourceStore, TreeEnumerator};
use crate::target::DestinationStore;
use crate::transfer::{TransferConfig, TransferEngine, TransferOutcome};

/// Seconds between schedule evaluations in recurring mode.
const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Aggregate counters for one backup run.
///
/// Built incrementally across all batches, immutable once the run ends,
/// handed to the notifier and then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Unique run identifier.
    pub run_id: String,

    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Wall-clock duration in seconds (enumeration plus all batches).
    pub duration_seconds: f64,

    /// Objects considered for transfer.
    pub objects_total: usize,

    /// Objects copied to the destination.
    pub objects_copied: usize,

    /// Objects already present and skipped.
    pub objects_skipped: usize,

    /// Objects that failed to copy.
    pub objects_failed: usize,

    /// Payload bytes written to the destination.
    pub bytes_copied: u64,

    /// Paths of the objects that failed.
    pub failed_paths: Vec<String>,
}

impl RunMetrics {
    fn start(run_id: String, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            completed_at: started_at,
            duration_seconds: 0.0,
            objects_total: 0,
            objects_copied: 0,
            objects_skipped: 0,
            objects_failed: 0,
            bytes_copied: 0,
            failed_paths: Vec::new(),
        }
    }

    /// Fold one transfer outcome into the counters. Every outcome
    /// increments exactly one of the three.
    fn record(&mut self, path: &str, outcome: &TransferOutcome) {
        match outcome {
            TransferOutcome::Copied { bytes } => {
                self.objects_copied += 1;
                self.bytes_copied += bytes;
            }
            TransferOutcome::Skipped { .. } => {
                self.objects_skipped += 1;
            }
            TransferOutcome::Failed { message } => {
                error!("{}: {}", path, message);
                self.objects_failed += 1;
                self.failed_paths.push(path.to_string());
            }
        }
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Backup orchestrator.
pub struct Orchestrator {
    config: Config,
    source: Arc<dyn SourceStore>,
    destination: Arc<dyn DestinationStore>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: Config,
        source: Arc<dyn SourceStore>,
        destination: Arc<dyn DestinationStore>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            config,
            source,
            destination,
            notifier,
        }
    }

    /// Run one full backup: enumerate, batch, transfer, notify.
    ///
    /// Per-object failures are counted, never propagated; the returned
    /// error covers only failures outside the per-object recovery paths
    /// (e.g. the staging directory cannot be created).
    pub async fn run_once(&self) -> Result<RunMetrics> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        info!("Starting backup run {}", run_id);

        let enumerator = TreeEnumerator::new(self.source.clone());
        let mut objects = enumerator.list_all(&self.config.source.root_path).await;

        let enumerated = objects.len();
        objects.retain(|o| self.config.backup.allows(&o.path));
        if objects.len() < enumerated {
            info!(
                "Filtered {} objects outside the extension allow-list",
                enumerated - objects.len()
            );
        }
        info!("Found {} objects to consider", objects.len());

        let mut metrics = RunMetrics::start(run_id, started_at);
        metrics.objects_total = objects.len();

        if objects.is_empty() {
            info!("Nothing to do");
        } else {
            self.run_batches(&objects, &mut metrics).await?;
        }

        let completed_at = Utc::now();
        metrics.completed_at = completed_at;
        metrics.duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        info!(
            "Backup {}: {} objects, {} copied, {} skipped, {} failed, {} bytes in {:.1}s",
            metrics.run_id,
            metrics.objects_total,
            metrics.objects_copied,
            metrics.objects_skipped,
            metrics.objects_failed,
            metrics.bytes_copied,
            metrics.duration_seconds
        );

        self.notify(&metrics).await;
        Ok(metrics)
    }

    /// Process the object list in contiguous batches, each one fan-out /
    /// fan-in, and tear down the staging directory afterwards.
    async fn run_batches(
        &self,
        objects: &[crate::source::RemoteObject],
        metrics: &mut RunMetrics,
    ) -> Result<()> {
        let staging_dir = &self.config.backup.staging_dir;
        tokio::fs::create_dir_all(staging_dir).await?;

        let engine = Arc::new(TransferEngine::new(
            self.source.clone(),
            self.destination.clone(),
            TransferConfig::new(staging_dir.clone(), self.config.target.key_prefix.clone()),
        ));

        let batch_size = self.config.backup.batch_size.max(1);
        let total_batches = (objects.len() + batch_size - 1) / batch_size;

        for (index, batch) in objects.chunks(batch_size).enumerate() {
            info!(
                "Processing batch {}/{} ({} objects)",
                index + 1,
                total_batches,
                batch.len()
            );

            let mut handles = Vec::with_capacity(batch.len());
            for object in batch {
                let engine = engine.clone();
                let object = object.clone();
                handles.push((
                    object.path.clone(),
                    tokio::spawn(async move { engine.copy(&object).await }),
                ));
            }

            // The batch completes only when every transfer has settled.
            for (path, handle) in handles {
                match handle.await {
                    Ok(outcome) => metrics.record(&path, &outcome),
                    Err(e) => {
                        let outcome = TransferOutcome::Failed {
                            message: format!("transfer task panicked: {}", e),
                        };
                        metrics.record(&path, &outcome);
                    }
                }
            }
        }

        if let Err(e) = tokio::fs::remove_dir_all(staging_dir).await {
            warn!("Failed to remove staging directory {:?}: {}", staging_dir, e);
        }

        Ok(())
    }

    /// Hand the run summary to the notifier, swallowing any failure.
    async fn notify(&self, metrics: &RunMetrics) {
        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(metrics).await {
                warn!("Notification failed: {}", e);
            }
        }
    }

    /// Run once immediately, then poll the schedule every minute until
    /// cancelled.
    ///
    /// Cancellation stops the scheduling of future runs; an in-flight run
    /// is allowed to finish. A failed run is logged and the loop keeps
    /// polling.
    pub async fn run_scheduled(&self, cancel: CancellationToken) -> Result<()> {
        if let Err(e) = self.run_once().await {
            error!("Backup run failed: {}", e.format_detailed());
        }

        info!(
            "Polling schedule '{}' every {}s",
            self.config.backup.schedule,
            POLL_INTERVAL.as_secs()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Shutdown requested, no further runs will be scheduled");
                    break;
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {
                    if schedule::should_run(&self.config.backup.schedule, &Local::now()) {
                        if let Err(e) = self.run_once().await {
                            error!("Backup run failed: {}", e.format_detailed());
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
