//! Custom error types with exit codes

use thiserror::Error;

/// Main error type for subpull operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PullError {
    /// Configuration Error - missing or invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Validation Error - the fetch request is incomplete or unsafe
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Remote Listing Error - the content listing call failed
    #[error("Listing of '{path}' failed: {message}")]
    RemoteListing { path: String, message: String },

    /// Download Error - a file blob could not be fetched
    #[error("Download of '{path}' failed: {message}")]
    Download { path: String, message: String },

    /// Filesystem Error - file operation failed
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },

    /// External Process Error - the version-control client could not be started
    #[error("External process error: {message}")]
    ExternalProcess { message: String },

    /// Git Error - a git step failed while running in strict mode
    #[error("Git error: {message}")]
    Git { message: String },

    /// The fetch was interrupted by the user
    #[error("Interrupted")]
    Interrupted,
}

impl PullError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::Validation { .. } => 2,
            Self::RemoteListing { .. } => 3,
            Self::Download { .. } => 4,
            Self::Filesystem { .. } => 5,
            Self::ExternalProcess { .. } => 6,
            Self::Git { .. } => 7,
            Self::Interrupted => 130,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error
    #[inline]
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a remote listing error for `path`
    #[inline]
    pub fn remote_listing<P: Into<String>, S: Into<String>>(path: P, message: S) -> Self {
        Self::RemoteListing {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a download error for `path`
    #[inline]
    pub fn download<P: Into<String>, S: Into<String>>(path: P, message: S) -> Self {
        Self::Download {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }

    /// Create an external process error
    #[inline]
    pub fn external_process<S: Into<String>>(message: S) -> Self {
        Self::ExternalProcess {
            message: message.into(),
        }
    }

    /// Create a git error
    #[inline]
    pub fn git<S: Into<String>>(message: S) -> Self {
        Self::Git {
            message: message.into(),
        }
    }
}

/// Exit code for an `anyhow` error, falling back to 1 for foreign errors
#[must_use]
pub fn exit_code_of(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PullError>()
        .map_or(1, PullError::exit_code)
}
