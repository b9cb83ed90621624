//! # dbx-s3-backup
//!
//! Scheduled mirroring of a Dropbox file tree into an S3 bucket.
//!
//! The engine enumerates the full remote tree, skips objects the bucket
//! already holds, copies the rest in fixed-size concurrent batches, and
//! re-evaluates a cron-style schedule once per minute to decide when to
//! run again:
//!
//! - **Idempotent copies** via destination existence probes (no persisted
//!   manifest; the bucket is the source of truth)
//! - **Bounded concurrency** per batch, batches strictly in order
//! - **Two-tier transfers**: buffered uploads for small files, staged
//!   streaming uploads for large ones, with a buffered→staged fallback
//! - **Best-effort notifications** after every run
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dbx_s3_backup::{Config, DropboxClient, Orchestrator, S3Store};
//!
//! #[tokio::main]
//! async fn main() -> dbx_s3_backup::Result<()> {
//!     let config = Config::from_env()?;
//!     let source = Arc::new(DropboxClient::new(&config.source)?);
//!     let destination = Arc::new(S3Store::connect(&config.target).await);
//!     let orchestrator = Orchestrator::new(config, source, destination, None);
//!     let metrics = orchestrator.run_once().await?;
//!     println!("Copied {} objects", metrics.objects_copied);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod schedule;
pub mod source;
pub mod target;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_util;

// Re-exports for convenient access
pub use config::{BackupConfig, Config, SourceConfig, TargetConfig};
pub use error::{BackupError, Result};
pub use notify::{Notifier, WebhookNotifier};
pub use orchestrator::{Orchestrator, RunMetrics};
pub use schedule::{should_run, ScheduleExpression};
pub use source::{DropboxClient, RemoteEntry, RemoteObject, SourceStore, TreeEnumerator};
pub use target::{DestinationStore, S3Store};
pub use transfer::{TransferConfig, TransferEngine, TransferOutcome};
