//! Destination storage capability.

mod s3;

pub use s3::S3Store;

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Incremental progress callback: (bytes sent so far, total bytes).
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Capability interface over the destination storage service.
///
/// Writes overwrite by key. That idempotence is what makes the transfer
/// engine's "probe failure means missing" degradation safe.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Check whether an object already exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Write a whole in-memory buffer in one call.
    async fn write_buffer(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()>;

    /// Stream a staged file to the destination, reporting progress along
    /// the way.
    async fn write_stream(
        &self,
        key: &str,
        staged: &Path,
        content_type: &str,
        metadata: &HashMap<String, String>,
        on_progress: ProgressFn,
    ) -> Result<()>;
}
