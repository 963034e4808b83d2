//! Fetch request model shared by both strategies

use crate::error::PullError;
use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How the remote folder is materialised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// List and download files one by one through the contents API
    #[default]
    Api,
    /// Drive the local `git` client through a sparse checkout
    #[value(name = "sparse")]
    #[serde(rename = "sparse")]
    SparseCheckout,
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Api => f.write_str("api"),
            Self::SparseCheckout => f.write_str("sparse"),
        }
    }
}

/// Everything needed to fetch one remote folder
///
/// Constructed once by the caller and never mutated during a fetch.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct FetchRequest {
    pub repo_owner: String,
    pub repo_name: String,
    pub branch: String,
    /// Slash-separated, relative to the repository root
    pub folder_path: String,
    pub destination_root: PathBuf,
    pub mode: FetchMode,
    pub auth_token: Option<String>,
}

impl FetchRequest {
    /// Create a request; call [`FetchRequest::validate`] before fetching
    #[must_use]
    pub fn new(
        repo_owner: impl Into<String>,
        repo_name: impl Into<String>,
        branch: impl Into<String>,
        folder_path: impl Into<String>,
        destination_root: impl Into<PathBuf>,
        mode: FetchMode,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            repo_owner: repo_owner.into(),
            repo_name: repo_name.into(),
            branch: branch.into(),
            folder_path: folder_path.into(),
            destination_root: destination_root.into(),
            mode,
            auth_token,
        }
    }

    /// Check the request invariants
    ///
    /// # Errors
    ///
    /// Returns `PullError::Validation` if:
    /// - A required field is empty
    /// - The folder path starts with a slash
    /// - The token is missing in API mode, or present in sparse mode
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("repository owner", self.repo_owner.as_str()),
            ("repository name", self.repo_name.as_str()),
            ("branch", self.branch.as_str()),
            ("folder path", self.folder_path.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(PullError::validation(format!("The {field} cannot be empty")).into());
            }
        }

        if self.destination_root.as_os_str().is_empty() {
            return Err(PullError::validation("The destination directory cannot be empty").into());
        }

        if self.folder_path.starts_with('/') {
            return Err(PullError::validation(format!(
                "The folder path must be relative to the repository root: '{}'",
                self.folder_path
            ))
            .into());
        }

        let has_token = self
            .auth_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty());
        match self.mode {
            FetchMode::Api if !has_token => Err(PullError::validation(
                "A GitHub token is required in api mode (use --token or GITHUB_TOKEN)",
            )
            .into()),
            FetchMode::SparseCheckout if self.auth_token.is_some() => Err(PullError::validation(
                "A token must not be supplied in sparse mode",
            )
            .into()),
            _ => Ok(()),
        }
    }

    /// Bearer token, if any
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}

// Manual impl keeps the token out of logs
impl fmt::Debug for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchRequest")
            .field("repo_owner", &self.repo_owner)
            .field("repo_name", &self.repo_name)
            .field("branch", &self.branch)
            .field("folder_path", &self.folder_path)
            .field("destination_root", &self.destination_root)
            .field("mode", &self.mode)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
