//! Remote content listing abstraction

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Kind of a remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child returned by a listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    /// Full path from the repository root
    pub path: String,
    pub kind: EntryKind,
    /// Present for files only
    pub download_url: Option<String>,
}

impl RemoteEntry {
    #[must_use]
    pub fn file(path: &str, download_url: impl Into<String>) -> Self {
        Self {
            name: crate::utils::remote_name(path).to_owned(),
            path: path.to_owned(),
            kind: EntryKind::File,
            download_url: Some(download_url.into()),
        }
    }

    #[must_use]
    pub fn directory(path: &str) -> Self {
        Self {
            name: crate::utils::remote_name(path).to_owned(),
            path: path.to_owned(),
            kind: EntryKind::Directory,
            download_url: None,
        }
    }
}

/// Read-only access to a remote repository tree
///
/// Implementations report failures as `PullError::RemoteListing` and
/// `PullError::Download` so the engine can surface them unchanged.
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// List the immediate children of `path` at `reference`
    async fn list(&self, path: &str, reference: &str) -> Result<Vec<RemoteEntry>>;

    /// Fetch the raw bytes of a file entry
    async fn download(&self, entry: &RemoteEntry) -> Result<Bytes>;
}
