//! API fetch engine
//!
//! Walks a remote folder through a [`ContentApi`], mirroring every
//! directory under the destination root and downloading files concurrently.
//!
//! Each directory is listed, created locally, then every entry becomes its
//! own task: files are downloaded and written, subdirectories are walked
//! the same way. All network calls and file writes share one semaphore, so
//! at most `max_concurrency` of them are in flight no matter how wide or
//! deep the tree is. Permits are never held while waiting on children.

pub mod github;
pub mod remote;
pub mod tree;

pub use github::{DEFAULT_API_URL, GitHubApi};
pub use remote::{ContentApi, EntryKind, RemoteEntry};
pub use tree::FolderNode;

use crate::error::PullError;
use crate::progress::{EventSink, ProgressEvent, ProgressKind};
use crate::request::{FetchMode, FetchRequest};
use crate::system::System;
use crate::utils::local_path;
use anyhow::{Result, anyhow};
use bytes::Bytes;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::debug;

/// Tuning for one API fetch
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Upper bound on concurrent listing calls, downloads and writes
    pub max_concurrency: usize,
    /// Deadline for each listing call and each download
    pub timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            timeout: Duration::from_secs(300),
        }
    }
}

/// Result of a successful API fetch
#[derive(Debug)]
pub struct ApiFetchOutcome {
    pub tree: FolderNode,
    pub events: Vec<ProgressEvent>,
}

/// Fetches a remote folder through the contents API
pub struct ApiFetch {
    api: Arc<dyn ContentApi>,
    system: Arc<dyn System>,
    options: FetchOptions,
}

impl ApiFetch {
    #[must_use]
    pub fn new(api: Arc<dyn ContentApi>, system: Arc<dyn System>, options: FetchOptions) -> Self {
        Self {
            api,
            system,
            options,
        }
    }

    /// Materialise `request.folder_path` under `request.destination_root`
    ///
    /// Any listing, download or filesystem failure aborts the whole fetch:
    /// outstanding tasks are cancelled, an `Error` event is emitted and the
    /// error is returned. Files already written stay where they are.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request is invalid or not in api mode (`PullError::Validation`)
    /// - A listing call fails (`PullError::RemoteListing`)
    /// - A download fails (`PullError::Download`)
    /// - A directory or file cannot be written (`PullError::Filesystem`)
    pub async fn fetch_folder(
        &self,
        request: &FetchRequest,
        sink: &EventSink,
    ) -> Result<ApiFetchOutcome> {
        request.validate()?;
        if request.mode != FetchMode::Api {
            return Err(PullError::validation(format!(
                "The API fetch cannot run a request in {} mode",
                request.mode
            ))
            .into());
        }

        let first_event = sink.checkpoint();
        sink.status(format!(
            "Download with API has started: {}/{}@{} {}",
            request.repo_owner, request.repo_name, request.branch, request.folder_path
        ));

        let walker = Arc::new(Walker {
            api: Arc::clone(&self.api),
            system: Arc::clone(&self.system),
            gate: Semaphore::new(
                self.options
                    .max_concurrency
                    .clamp(1, Semaphore::MAX_PERMITS),
            ),
            sink: sink.clone(),
            destination: request.destination_root.clone(),
            reference: request.branch.clone(),
            timeout: self.options.timeout,
        });

        match walker.process_folder(request.folder_path.clone()).await {
            Ok(tree) => {
                sink.status(format!(
                    "Download finished: {} files in {} folders",
                    tree.file_count(),
                    tree.folder_count()
                ));
                Ok(ApiFetchOutcome {
                    tree,
                    events: sink.events_since(first_event),
                })
            }
            Err(err) => {
                sink.error(format!("{err:#}"));
                Err(err)
            }
        }
    }
}

type WalkFuture = Pin<Box<dyn Future<Output = Result<FolderNode>> + Send>>;

enum Child {
    File(String),
    Folder(FolderNode),
}

struct Walker {
    api: Arc<dyn ContentApi>,
    system: Arc<dyn System>,
    gate: Semaphore,
    sink: EventSink,
    destination: PathBuf,
    reference: String,
    timeout: Duration,
}

impl Walker {
    fn process_folder(self: Arc<Self>, path: String) -> WalkFuture {
        Box::pin(async move {
            let entries = self.list(&path).await?;
            debug!("Listed {} entries in '{path}'", entries.len());
            if entries
                .iter()
                .any(|entry| entry.kind == EntryKind::File && entry.path == path)
            {
                return Err(
                    PullError::remote_listing(path, "the path names a file, not a folder").into(),
                );
            }

            let directory = local_path(&self.destination, &path)?;
            self.blocking(move |system| system.create_dir_all(&directory), &path)
                .await?;

            let mut node = FolderNode::new(&path);
            let mut tasks = JoinSet::new();

            for entry in entries {
                let walker = Arc::clone(&self);
                match entry.kind {
                    EntryKind::File => {
                        tasks.spawn(async move { walker.download_file(entry).await });
                    }
                    EntryKind::Directory => {
                        tasks.spawn(async move {
                            walker.sink.emit(ProgressEvent::new(
                                ProgressKind::FolderEntered,
                                entry.path.clone(),
                            ));
                            walker.process_folder(entry.path).await.map(Child::Folder)
                        });
                    }
                }
            }

            // Returning early drops the set, which aborts the remaining siblings
            while let Some(joined) = tasks.join_next().await {
                match joined.map_err(|e| anyhow!("Fetch task for '{path}' failed: {e}"))?? {
                    Child::File(name) => node.files.push(name),
                    Child::Folder(folder) => node.folders.push(folder),
                }
            }

            Ok(node)
        })
    }

    async fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let _permit = self.permit().await?;
        timeout(self.timeout, self.api.list(path, &self.reference))
            .await
            .map_err(|_| {
                return PullError::remote_listing(
                    path,
                    format!("timed out after {}s", self.timeout.as_secs()),
                );
            })?
    }

    async fn download_file(&self, entry: RemoteEntry) -> Result<Child> {
        let target = local_path(&self.destination, &entry.path)?;

        let permit = self.permit().await?;
        let bytes: Bytes = timeout(self.timeout, self.api.download(&entry))
            .await
            .map_err(|_| {
                return PullError::download(
                    &entry.path,
                    format!("timed out after {}s", self.timeout.as_secs()),
                );
            })??;
        self.blocking(move |system| system.write(&target, &bytes), &entry.path)
            .await?;
        drop(permit);

        self.sink.emit(ProgressEvent::new(
            ProgressKind::FileDownloaded,
            entry.path.clone(),
        ));
        Ok(Child::File(entry.name))
    }

    async fn permit(&self) -> Result<SemaphorePermit<'_>> {
        self.gate
            .acquire()
            .await
            .map_err(|e| anyhow!("Concurrency gate closed: {e}"))
    }

    /// Run a filesystem call off the async workers
    async fn blocking<F>(&self, operation: F, remote_path: &str) -> Result<()>
    where
        F: FnOnce(&dyn System) -> std::io::Result<()> + Send + 'static,
    {
        let system = Arc::clone(&self.system);
        tokio::task::spawn_blocking(move || operation(system.as_ref()))
            .await
            .map_err(|e| anyhow!("Filesystem task failed: {e}"))?
            .map_err(|e| {
                return anyhow::Error::from(PullError::filesystem(format!(
                    "Cannot write '{remote_path}' under {}: {e}",
                    self.destination.display()
                )));
            })
    }
}
