//! Path mapping and validation utilities

use crate::error::PullError;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Map a slash-separated remote path to a location under `root`
///
/// # Errors
///
/// Returns `PullError::Filesystem` if the remote path is absolute, has an
/// empty component, or uses `.`/`..` to step outside the destination.
pub fn local_path(root: &Path, remote_path: &str) -> Result<PathBuf> {
    let mut resolved = root.to_path_buf();
    if remote_path.is_empty() {
        return Ok(resolved);
    }

    if remote_path.starts_with('/') || remote_path.contains('\\') {
        return Err(unsafe_path(remote_path));
    }

    for component in remote_path.split('/') {
        if component.is_empty() || component == "." || component == ".." {
            return Err(unsafe_path(remote_path));
        }
        resolved.push(component);
    }

    Ok(resolved)
}

fn unsafe_path(remote_path: &str) -> anyhow::Error {
    PullError::filesystem(format!(
        "Refusing to write outside the destination for remote path '{remote_path}'"
    ))
    .into()
}

/// Trim surrounding slashes and whitespace from a user-supplied folder path
#[must_use]
pub fn normalize_folder_path(path: &str) -> String {
    path.trim().trim_matches('/').to_owned()
}

/// Last component of a slash-separated remote path
#[must_use]
pub fn remote_name(remote_path: &str) -> &str {
    remote_path.rsplit('/').next().unwrap_or(remote_path)
}
