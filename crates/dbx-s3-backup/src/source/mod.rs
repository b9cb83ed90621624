//! Source storage capability and tree enumeration.

mod dropbox;
mod enumerator;
mod types;

pub use dropbox::DropboxClient;
pub use enumerator::TreeEnumerator;
pub use types::{content_type_for, EntryMetadata, RemoteEntry, RemoteObject};

use async_trait::async_trait;

use crate::error::Result;

/// Capability interface over the source storage service.
///
/// The orchestration core only ever talks to this trait, so it can be
/// exercised with in-memory fakes.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// List the immediate children of a folder path ("" is the root).
    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Download the full contents of a file.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
}
