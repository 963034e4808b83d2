//! Progress events shared by both fetch strategies
//!
//! Events are delivered in real time over an optional channel and also kept
//! in an in-memory record that is handed back with the final outcome. The
//! consumer decides how to present them; nothing here assumes a thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Kind of progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    StatusMessage,
    FileDownloaded,
    FolderEntered,
    Error,
}

/// A single progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    pub payload: String,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(kind: ProgressKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn status(payload: impl Into<String>) -> Self {
        Self::new(ProgressKind::StatusMessage, payload)
    }

    #[must_use]
    pub fn error(payload: impl Into<String>) -> Self {
        Self::new(ProgressKind::Error, payload)
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ProgressKind::StatusMessage => write!(f, "{}", self.payload),
            ProgressKind::FileDownloaded => write!(f, "Downloaded: {}", self.payload),
            ProgressKind::FolderEntered => write!(f, "Processing folder: {}", self.payload),
            ProgressKind::Error => write!(f, "Error: {}", self.payload),
        }
    }
}

/// Destination for progress events
///
/// Cheap to clone; all clones feed the same channel and record.
#[derive(Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<ProgressEvent>>,
    record: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl EventSink {
    /// A sink that only records events
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that records events and forwards each one to `sender`
    #[must_use]
    pub fn with_channel(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            sender: Some(sender),
            record: Arc::default(),
        }
    }

    /// Emit an event
    pub fn emit(&self, event: ProgressEvent) {
        debug!(kind = ?event.kind, "{}", event.payload);
        if let Some(sender) = &self.sender {
            // A dropped receiver only means nobody is watching anymore
            let _ = sender.send(event.clone());
        }
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn status(&self, payload: impl Into<String>) {
        self.emit(ProgressEvent::status(payload));
    }

    pub fn error(&self, payload: impl Into<String>) {
        self.emit(ProgressEvent::error(payload));
    }

    /// Copy of every event emitted so far, in emission order
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Position of the next event in the record
    #[must_use]
    pub fn checkpoint(&self) -> usize {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Events emitted since `checkpoint`, in emission order
    #[must_use]
    pub fn events_since(&self, checkpoint: usize) -> Vec<ProgressEvent> {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(checkpoint..)
            .map(<[ProgressEvent]>::to_vec)
            .unwrap_or_default()
    }
}
