//! Dropbox source client.
//!
//! Thin wrapper over the HTTP API: folder listing with cursor pagination
//! and whole-file download. Folder entries carry no file metadata, which
//! is what the enumerator's classification rule keys on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::{EntryMetadata, RemoteEntry, SourceStore};
use crate::config::SourceConfig;
use crate::error::{BackupError, Result};

const API_BASE: &str = "https://api.dropboxapi.com/2";
const CONTENT_BASE: &str = "https://content.dropboxapi.com/2";

/// HTTP client for the Dropbox API.
pub struct DropboxClient {
    http: reqwest::Client,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ListFolderResponse {
    entries: Vec<ListFolderEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct ListFolderEntry {
    #[serde(rename = ".tag")]
    tag: String,
    name: String,
    size: Option<u64>,
    client_modified: Option<String>,
    server_modified: Option<String>,
    content_hash: Option<String>,
}

impl DropboxClient {
    /// Build a client from the source configuration.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            http,
            access_token: config.access_token.clone(),
        })
    }

    /// The API wants "" for the root and a leading slash everywhere else.
    fn api_path(path: &str) -> String {
        if path.is_empty() {
            String::new()
        } else {
            format!("/{}", path)
        }
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: serde_json::Value,
        path: &str,
    ) -> Result<T> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackupError::source(path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(BackupError::source(path, format!("{}: {}", status, detail)));
        }

        response.json::<T>().await.map_err(|e| BackupError::source(path, e))
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn to_entry(entry: ListFolderEntry) -> RemoteEntry {
    let metadata = if entry.tag == "file" {
        let mut extra = HashMap::new();
        if let Some(hash) = entry.content_hash {
            extra.insert("content_hash".to_string(), hash);
        }
        Some(EntryMetadata {
            size: entry.size,
            created_at: parse_timestamp(entry.client_modified.as_deref()),
            updated_at: parse_timestamp(entry.server_modified.as_deref()),
            extra,
        })
    } else {
        None
    };

    RemoteEntry {
        name: entry.name,
        metadata,
    }
}

#[async_trait]
impl SourceStore for DropboxClient {
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let mut entries: Vec<RemoteEntry> = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page: ListFolderResponse = match &cursor {
                None => {
                    self.post_json(
                        &format!("{}/files/list_folder", API_BASE),
                        json!({ "path": Self::api_path(path), "recursive": false }),
                        path,
                    )
                    .await?
                }
                Some(cursor) => {
                    self.post_json(
                        &format!("{}/files/list_folder/continue", API_BASE),
                        json!({ "cursor": cursor }),
                        path,
                    )
                    .await?
                }
            };

            let ListFolderResponse {
                entries: page_entries,
                cursor: next_cursor,
                has_more,
            } = page;

            entries.extend(page_entries.into_iter().map(to_entry));

            if !has_more {
                break;
            }
            cursor = Some(next_cursor);
        }

        debug!("Listed {} entries under '{}'", entries.len(), path);
        Ok(entries)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let arg = json!({ "path": Self::api_path(path) }).to_string();

        let response = self
            .http
            .post(format!("{}/files/download", CONTENT_BASE))
            .bearer_auth(&self.access_token)
            .header("Dropbox-API-Arg", arg)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .send()
            .await
            .map_err(|e| BackupError::source(path, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(BackupError::source(path, format!("{}: {}", status, detail)));
        }

        let bytes = response.bytes().await.map_err(|e| BackupError::source(path, e))?;
        Ok(bytes.to_vec())
    }
}
