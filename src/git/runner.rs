//! External `git` process execution

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Captured outcome of one git invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GitCommandResult {
    pub exit_success: bool,
    /// `None` when the process was killed or never ran
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl GitCommandResult {
    /// A failed result that did not come from a finished process
    #[must_use]
    pub fn failure(stderr: impl Into<String>) -> Self {
        Self {
            exit_success: false,
            exit_code: None,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs git with an explicit working directory
///
/// `Err` is reserved for a process that could not be started at all; a
/// process that ran and failed is an `Ok` result with `exit_success == false`.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[String], working_dir: &Path) -> io::Result<GitCommandResult>;
}

/// Production runner spawning the git executable
#[derive(Debug, Clone)]
pub struct ProcessGitRunner {
    program: PathBuf,
    timeout: Duration,
}

impl ProcessGitRunner {
    /// Runner for `git` on the `PATH`, killing commands that exceed `timeout`
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            program: PathBuf::from("git"),
            timeout,
        }
    }

    /// Use a different executable
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }
}

#[async_trait]
impl GitRunner for ProcessGitRunner {
    async fn run(&self, args: &[String], working_dir: &Path) -> io::Result<GitCommandResult> {
        // A missing directory is a failed step, not a missing tool
        if !working_dir.is_dir() {
            return Ok(GitCommandResult::failure(format!(
                "working directory does not exist: {}",
                working_dir.display()
            )));
        }

        debug!(
            "Running {} {} in {}",
            self.program.display(),
            args.join(" "),
            working_dir.display()
        );

        let child = Command::new(&self.program)
            .args(args)
            .current_dir(working_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the child on timeout kills it
        let Ok(output) = timeout(self.timeout, child.wait_with_output()).await else {
            return Ok(GitCommandResult::failure(format!(
                "timed out after {}s",
                self.timeout.as_secs()
            )));
        };
        let output = output?;

        Ok(GitCommandResult {
            exit_success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[tokio::test]
    async fn test_missing_program_is_a_start_failure() {
        let runner = ProcessGitRunner::new(Duration::from_secs(5))
            .with_program("definitely-not-a-real-git-binary");
        let temp_dir = TempDir::new().unwrap();

        let result = runner.run(&args(&["--version"]), temp_dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_missing_working_directory_is_a_failed_step() {
        let runner = ProcessGitRunner::new(Duration::from_secs(5));
        let result = runner
            .run(&args(&["status"]), Path::new("/definitely/not/here"))
            .await
            .unwrap();

        assert!(!result.exit_success);
        assert!(result.stderr.contains("does not exist"));
    }

    #[tokio::test]
    async fn test_captures_output_and_status() {
        let runner = ProcessGitRunner::new(Duration::from_secs(30));
        let temp_dir = TempDir::new().unwrap();

        let ok = runner.run(&args(&["--version"]), temp_dir.path()).await.unwrap();
        assert!(ok.exit_success);
        assert!(ok.stdout.starts_with("git version"));

        let failed = runner
            .run(&args(&["definitely-not-a-subcommand"]), temp_dir.path())
            .await
            .unwrap();
        assert!(!failed.exit_success);
        assert!(!failed.stderr.is_empty());
    }
}
