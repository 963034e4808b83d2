//! Git sparse checkout orchestration

use crate::error::PullError;
use crate::git::repository::{DEFAULT_GIT_BASE_URL, local_repository_path, remote_url};
use crate::git::runner::{GitCommandResult, GitRunner};
use crate::progress::{EventSink, ProgressEvent};
use crate::request::{FetchMode, FetchRequest};
use crate::system::System;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// First git release whose `sparse-checkout set` accepts `--no-cone`
const MIN_GIT_VERSION: (u32, u32, u32) = (2, 35, 0);

/// Settings for the sparse checkout strategy
#[derive(Debug, Clone)]
pub struct SparseOptions {
    /// Prefix the clone URL is built from
    pub git_base_url: String,
    /// Stop at the first failed step instead of running the rest
    pub strict: bool,
}

impl Default for SparseOptions {
    fn default() -> Self {
        Self {
            git_base_url: DEFAULT_GIT_BASE_URL.to_owned(),
            strict: false,
        }
    }
}

/// One git invocation in the sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseStep {
    pub description: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl SparseStep {
    fn new(description: String, args: &[&str], working_dir: &Path) -> Self {
        Self {
            description,
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// The command line as a user would type it
    #[must_use]
    pub fn command_line(&self) -> String {
        format!("git {}", self.args.join(" "))
    }
}

/// Result of a completed sparse checkout sequence
#[derive(Debug)]
pub struct SparseCheckoutOutcome {
    pub repository_path: PathBuf,
    pub events: Vec<ProgressEvent>,
}

/// Drives the local git client through a sparse checkout of one folder
///
/// Every step runs with its own working directory; the process-wide current
/// directory is never changed. Steps run one at a time, each awaited before
/// the next starts. A step that fails is reported through the event sink and
/// the sequence carries on, unless `strict` is set.
#[non_exhaustive]
pub struct SparseCheckout {
    runner: Arc<dyn GitRunner>,
    system: Arc<dyn System>,
    options: SparseOptions,
}

impl SparseCheckout {
    #[must_use]
    pub fn new(runner: Arc<dyn GitRunner>, system: Arc<dyn System>, options: SparseOptions) -> Self {
        Self {
            runner,
            system,
            options,
        }
    }

    /// Plan the command sequence for `request`
    ///
    /// The clone step is left out when the local repository already exists.
    ///
    /// # Errors
    ///
    /// Returns `PullError::Filesystem` if the local repository path is not
    /// valid UTF-8.
    pub fn plan(&self, request: &FetchRequest) -> Result<Vec<SparseStep>> {
        let destination = &request.destination_root;
        let repo_path = local_repository_path(destination, &request.repo_name);
        let repo_path_str = repo_path.to_str().ok_or_else(|| {
            return PullError::filesystem(format!(
                "Repository path is not valid UTF-8: {}",
                repo_path.display()
            ));
        })?;
        let url = remote_url(
            &self.options.git_base_url,
            &request.repo_owner,
            &request.repo_name,
        );
        let include = format!("{}/*", request.folder_path);

        let mut steps = Vec::with_capacity(5);
        if self.system.exists(&repo_path) {
            debug!("Reusing existing repository at {}", repo_path.display());
        } else {
            steps.push(SparseStep::new(
                format!("Cloning Git repository: {url}"),
                &["clone", "--no-checkout", url.as_str(), repo_path_str],
                destination,
            ));
        }

        steps.push(SparseStep::new(
            format!("Checking out branch: {}", request.branch),
            &["checkout", request.branch.as_str()],
            &repo_path,
        ));
        steps.push(SparseStep::new(
            "Enabling sparse-checkout mode...".to_owned(),
            &["config", "core.sparseCheckout", "true"],
            &repo_path,
        ));
        steps.push(SparseStep::new(
            "Clearing sparse-checkout patterns...".to_owned(),
            &["sparse-checkout", "set", "--no-cone", "/*"],
            &repo_path,
        ));
        steps.push(SparseStep::new(
            format!("Setting sparse-checkout path: {}", request.folder_path),
            &["sparse-checkout", "set", "--no-cone", include.as_str()],
            &repo_path,
        ));

        Ok(steps)
    }

    /// Execute the sparse checkout sequence
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The request is invalid or not in sparse mode (`PullError::Validation`)
    /// - The destination directory cannot be created (`PullError::Filesystem`)
    /// - git cannot be started (`PullError::ExternalProcess`)
    /// - A step fails while `strict` is set (`PullError::Git`)
    pub async fn execute(
        &self,
        request: &FetchRequest,
        sink: &EventSink,
    ) -> Result<SparseCheckoutOutcome> {
        request.validate()?;
        if request.mode != FetchMode::SparseCheckout {
            return Err(PullError::validation(format!(
                "The sparse checkout cannot run a request in {} mode",
                request.mode
            ))
            .into());
        }

        let first_event = sink.checkpoint();
        sink.status("Download with No API has started (git sparse-checkout)...");

        match self.run_sequence(request, sink).await {
            Ok(repository_path) => {
                sink.status("Git sparse-checkout completed.");
                Ok(SparseCheckoutOutcome {
                    repository_path,
                    events: sink.events_since(first_event),
                })
            }
            Err(err) => {
                sink.error(format!("{err:#}"));
                Err(err)
            }
        }
    }

    async fn run_sequence(&self, request: &FetchRequest, sink: &EventSink) -> Result<PathBuf> {
        let destination = &request.destination_root;
        self.system.create_dir_all(destination).map_err(|e| {
            return PullError::filesystem(format!(
                "Cannot create destination {}: {e}",
                destination.display()
            ));
        })?;

        for step in self.plan(request)? {
            sink.status(step.description.as_str());

            let result = self
                .runner
                .run(&step.args, &step.working_dir)
                .await
                .map_err(|e| {
                    return PullError::external_process(format!(
                        "Cannot start `{}`: {e}",
                        step.command_line()
                    ));
                })?;

            report(&step, &result, sink);

            if !result.exit_success && self.options.strict {
                return Err(PullError::git(format!(
                    "`{}` failed: {}",
                    step.command_line(),
                    failure_reason(&result)
                ))
                .into());
            }
        }

        Ok(local_repository_path(destination, &request.repo_name))
    }
}

fn failure_reason(result: &GitCommandResult) -> String {
    let stderr = result.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_owned();
    }
    match result.exit_code {
        Some(code) => format!("exited with status {code}"),
        None => "terminated without an exit status".to_owned(),
    }
}

/// Turn captured output into events
fn report(step: &SparseStep, result: &GitCommandResult, sink: &EventSink) {
    let stdout = result.stdout.trim();
    if !stdout.is_empty() {
        sink.status(format!("Git Output: {stdout}"));
    }

    let stderr = result.stderr.trim();
    if result.exit_success {
        // git writes progress such as "Cloning into ..." to stderr
        if !stderr.is_empty() {
            sink.status(format!("Git Output: {stderr}"));
        }
    } else {
        debug!("`{}` failed", step.command_line());
        sink.error(format!(
            "Git Error ({}): {}",
            step.command_line(),
            failure_reason(result)
        ));
    }
}

/// Check that git can be started and is recent enough
///
/// An old version only produces a warning, since most steps still work.
///
/// # Errors
///
/// Returns `PullError::ExternalProcess` if git cannot be started or
/// `git --version` fails.
pub async fn check_git_availability(
    runner: &dyn GitRunner,
    working_dir: &Path,
) -> Result<Option<(u32, u32, u32)>> {
    let result = runner
        .run(&["--version".to_owned()], working_dir)
        .await
        .map_err(|e| {
            return PullError::external_process(format!(
                "Git command not found. Please ensure Git is installed and available in PATH ({e})"
            ));
        })?;

    if !result.exit_success {
        return Err(PullError::external_process(format!(
            "Git command failed to execute properly: {}",
            failure_reason(&result)
        ))
        .into());
    }

    let version = result
        .stdout
        .split_whitespace()
        .nth(2)
        .and_then(|part| parse_git_version(part).ok());

    if let Some(found) = version
        && found < MIN_GIT_VERSION
    {
        warn!(
            "Git {}.{}.{} is older than {}.{}.{}; `sparse-checkout set --no-cone` may fail",
            found.0, found.1, found.2, MIN_GIT_VERSION.0, MIN_GIT_VERSION.1, MIN_GIT_VERSION.2
        );
    }

    Ok(version)
}

/// Parse Git version string into tuple (major, minor, patch)
///
/// Vendor suffixes such as `2.39.2.windows.1` are ignored and a missing
/// patch component counts as 0.
///
/// # Errors
///
/// Returns an error if the major or minor component is missing or invalid
pub fn parse_git_version(version: &str) -> Result<(u32, u32, u32)> {
    let mut parts = version.split('.');
    let major = parts
        .next()
        .unwrap_or_default()
        .parse()
        .context("Invalid major version")?;
    let minor = parts
        .next()
        .unwrap_or_default()
        .parse()
        .context("Invalid minor version")?;
    let patch = parts
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    Ok((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_git_version() {
        assert_eq!(parse_git_version("2.39.2").unwrap(), (2, 39, 2));
        assert_eq!(parse_git_version("2.39.2.windows.1").unwrap(), (2, 39, 2));
        assert_eq!(parse_git_version("2.45").unwrap(), (2, 45, 0));
        assert!(parse_git_version("invalid").is_err());
        assert!(parse_git_version("").is_err());
    }

    #[test]
    fn test_failure_reason() {
        let mut result = GitCommandResult::failure("  fatal: not a git repository \n");
        assert_eq!(failure_reason(&result), "fatal: not a git repository");

        result.stderr.clear();
        result.exit_code = Some(128);
        assert_eq!(failure_reason(&result), "exited with status 128");
    }

    #[test]
    fn test_report_success_keeps_stderr_as_status() {
        let sink = EventSink::new();
        let step = SparseStep::new("clone".to_owned(), &["clone"], Path::new("/"));
        let result = GitCommandResult {
            exit_success: true,
            exit_code: Some(0),
            stdout: String::new(),
            stderr: "Cloning into 'hello'...".to_owned(),
        };

        report(&step, &result, &sink);
        assert_eq!(
            sink.events(),
            vec![ProgressEvent::status("Git Output: Cloning into 'hello'...")]
        );
    }

    #[test]
    fn test_report_failure_is_an_error_event() {
        let sink = EventSink::new();
        let step = SparseStep::new("checkout".to_owned(), &["checkout", "main"], Path::new("/"));
        let result = GitCommandResult {
            exit_success: false,
            exit_code: Some(1),
            stdout: "partial".to_owned(),
            stderr: String::new(),
        };

        report(&step, &result, &sink);
        assert_eq!(
            sink.events(),
            vec![
                ProgressEvent::status("Git Output: partial"),
                ProgressEvent::error("Git Error (git checkout main): exited with status 1"),
            ]
        );
    }
}
