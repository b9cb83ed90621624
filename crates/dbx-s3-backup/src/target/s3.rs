//! Amazon S3 destination client.

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use super::{DestinationStore, ProgressFn};
use crate::config::TargetConfig;
use crate::error::{BackupError, Result};

/// Part size for multipart streaming uploads.
const PART_SIZE: usize = 8 * 1024 * 1024;

/// S3-backed destination store.
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from the standard AWS environment/profile chain.
    pub async fn connect(config: &TargetConfig) -> Self {
        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        Self {
            client: Client::new(&shared),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl DestinationStore for S3Store {
    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().map(|se| se.is_not_found()).unwrap_or(false) => {
                Ok(false)
            }
            Err(e) => Err(BackupError::destination(key, e)),
        }
    }

    async fn write_buffer(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes.to_vec()));

        for (name, value) in metadata {
            request = request.metadata(name.clone(), value.clone());
        }

        request
            .send()
            .await
            .map_err(|e| BackupError::destination(key, e))?;

        debug!("put s3://{}/{} ({} bytes)", self.bucket, key, bytes.len());
        Ok(())
    }

    async fn write_stream(
        &self,
        key: &str,
        staged: &Path,
        content_type: &str,
        metadata: &HashMap<String, String>,
        on_progress: ProgressFn,
    ) -> Result<()> {
        let total = tokio::fs::metadata(staged).await?.len();

        let mut create = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type);
        for (name, value) in metadata {
            create = create.metadata(name.clone(), value.clone());
        }

        let upload = create
            .send()
            .await
            .map_err(|e| BackupError::destination(key, e))?;
        let upload_id = upload
            .upload_id()
            .map(|id| id.to_string())
            .ok_or_else(|| BackupError::destination(key, "multipart upload id missing"))?;

        match self
            .upload_parts(key, staged, total, &upload_id, &on_progress)
            .await
        {
            Ok(parts) => {
                let completed = CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build();
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .multipart_upload(completed)
                    .send()
                    .await
                    .map_err(|e| BackupError::destination(key, e))?;

                debug!("streamed s3://{}/{} ({} bytes)", self.bucket, key, total);
                Ok(())
            }
            Err(e) => {
                // Leave no orphaned parts behind; the abort itself is best-effort.
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!("{}: failed to abort multipart upload: {}", key, abort_err);
                }
                Err(e)
            }
        }
    }
}

impl S3Store {
    async fn upload_parts(
        &self,
        key: &str,
        staged: &Path,
        total: u64,
        upload_id: &str,
        on_progress: &ProgressFn,
    ) -> Result<Vec<CompletedPart>> {
        let mut file = tokio::fs::File::open(staged).await?;
        let mut parts: Vec<CompletedPart> = Vec::new();
        let mut sent: u64 = 0;
        let mut part_number: i32 = 1;

        loop {
            let mut buf = vec![0u8; PART_SIZE];
            let mut filled = 0;
            while filled < buf.len() {
                let n = file.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }

            if filled == 0 && !parts.is_empty() {
                break;
            }
            buf.truncate(filled);

            let uploaded = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(buf))
                .send()
                .await
                .map_err(|e| BackupError::destination(key, e))?;

            sent += filled as u64;
            on_progress(sent, total);

            parts.push(
                CompletedPart::builder()
                    .set_e_tag(uploaded.e_tag().map(|t| t.to_string()))
                    .part_number(part_number)
                    .build(),
            );

            part_number += 1;
            if filled < PART_SIZE {
                break;
            }
        }

        Ok(parts)
    }
}
