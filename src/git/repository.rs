//! Remote URL synthesis and local repository location

use std::path::{Path, PathBuf};

/// Default host prefix for cloning
pub const DEFAULT_GIT_BASE_URL: &str = "https://github.com";

/// Build the clone URL `<base>/<owner>/<repo>.git`
#[must_use]
pub fn remote_url(base_url: &str, owner: &str, repo: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    return format!("{base}/{owner}/{repo}.git");
}

/// Where the sparse clone of `repo` lives under the destination root
#[must_use]
pub fn local_repository_path(destination_root: &Path, repo: &str) -> PathBuf {
    destination_root.join(repo.strip_suffix(".git").unwrap_or(repo))
}
