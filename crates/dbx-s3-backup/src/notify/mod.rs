//! Run summary notification.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::{BackupError, Result};
use crate::orchestrator::RunMetrics;

/// Capability interface for run-summary delivery.
///
/// Delivery is best-effort: the orchestrator logs and drops any error
/// instead of letting it cross into run control flow.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one run summary.
    async fn notify(&self, metrics: &RunMetrics) -> Result<()>;
}

/// Posts run summaries to a webhook endpoint as JSON.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier for the given endpoint.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, metrics: &RunMetrics) -> Result<()> {
        let text = format!(
            "Backup {}: {} objects, {} copied, {} skipped, {} failed, {} bytes in {:.1}s",
            metrics.run_id,
            metrics.objects_total,
            metrics.objects_copied,
            metrics.objects_skipped,
            metrics.objects_failed,
            metrics.bytes_copied,
            metrics.duration_seconds
        );
        let payload = json!({ "text": text, "metrics": metrics });

        let response = self.client.post(&self.url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(BackupError::Notify(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        debug!("Delivered run summary for {}", metrics.run_id);
        Ok(())
    }
}
