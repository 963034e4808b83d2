//! Pull operation coordination

use crate::cli::Args;
use crate::config::validation::{
    validate_branch, validate_folder_path, validate_repository_component,
};
use crate::config::{Config, Settings};
use crate::error::PullError;
use crate::fetch::{ApiFetch, ApiFetchOutcome, GitHubApi};
use crate::git::{ProcessGitRunner, SparseCheckout, SparseCheckoutOutcome, check_git_availability};
use crate::operations::report::{ReportStyle, spawn_reporter, write_tree_json_line};
use crate::progress::EventSink;
use crate::request::{FetchMode, FetchRequest};
use crate::system::System;
use crate::utils::normalize_folder_path;
use anyhow::{Context as _, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a finished pull produced
#[derive(Debug)]
pub enum PullOutcome {
    Api(ApiFetchOutcome),
    Sparse(SparseCheckoutOutcome),
}

/// Coordinates the complete pull operation
#[non_exhaustive]
pub struct PullOperation {
    request: FetchRequest,
    settings: Settings,
    report_style: ReportStyle,
    system: Arc<dyn System>,
}

impl PullOperation {
    /// Create a new pull operation from CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration file cannot be loaded or is invalid (`PullError::Configuration`)
    /// - An argument is unsafe or the token does not fit the mode (`PullError::Validation`)
    #[inline]
    pub fn new(args: &Args, system: Arc<dyn System>) -> Result<Self> {
        let mut config = if system.exists(Path::new(&args.config)) {
            Config::load_from_file(system.as_ref(), &args.config)?
        } else if args.has_explicit_config() {
            return Err(PullError::configuration(format!(
                "Configuration file not found: {}",
                args.config
            ))
            .into());
        } else {
            debug!("No {} found, using built-in defaults", args.config);
            Config::default()
        };

        merge_cli_args(&mut config, args);
        config
            .validate()
            .map_err(|e| anyhow::Error::from(PullError::configuration(format!("{e:#}"))))?;
        let settings = config.resolve();

        let request = build_request(args, &settings)?;
        debug!("Pull request: {:?}", request);

        Ok(Self {
            request,
            settings,
            report_style: if args.json {
                ReportStyle::JsonLines
            } else {
                ReportStyle::Spinner
            },
            system,
        })
    }

    #[must_use]
    #[inline]
    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    #[must_use]
    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Execute the pull operation
    ///
    /// Progress is presented while the fetch runs. Ctrl-C cancels the fetch:
    /// outstanding downloads are aborted and a running git child is killed.
    ///
    /// # Errors
    ///
    /// Returns the error of the selected strategy, or `PullError::Interrupted`
    #[inline]
    pub async fn execute(&self) -> Result<PullOutcome> {
        info!(
            "Fetching {}/{}@{} {} into {} ({} mode)",
            self.request.repo_owner,
            self.request.repo_name,
            self.request.branch,
            self.request.folder_path,
            self.request.destination_root.display(),
            self.request.mode
        );

        let (sender, receiver) = mpsc::unbounded_channel();
        let reporter = spawn_reporter(receiver, self.report_style);
        let sink = EventSink::with_channel(sender);

        let result = tokio::select! {
            result = self.run_strategy(&sink) => result,
            Ok(()) = tokio::signal::ctrl_c() => {
                sink.error("Interrupted");
                Err(PullError::Interrupted.into())
            }
        };

        // Closing the last sender lets the reporter drain and stop
        drop(sink);
        if let Err(e) = reporter.await {
            warn!("Progress reporter stopped early: {e}");
        }

        if let Ok(outcome) = result.as_ref() {
            self.summarize(outcome);
        }
        result
    }

    async fn run_strategy(&self, sink: &EventSink) -> Result<PullOutcome> {
        match self.request.mode {
            FetchMode::Api => {
                let api = GitHubApi::new(
                    &self.settings.api_url,
                    &self.request.repo_owner,
                    &self.request.repo_name,
                    self.request.token(),
                    self.settings.timeout,
                )?;
                let engine = ApiFetch::new(
                    Arc::new(api),
                    Arc::clone(&self.system),
                    self.settings.fetch_options(),
                );
                let outcome = engine.fetch_folder(&self.request, sink).await?;
                Ok(PullOutcome::Api(outcome))
            }
            FetchMode::SparseCheckout => {
                let runner = Arc::new(ProcessGitRunner::new(self.settings.timeout));
                let version = check_git_availability(runner.as_ref(), Path::new("."))
                    .await
                    .context("Git validation failed")?;
                debug!("Git version: {:?}", version);

                let orchestrator = SparseCheckout::new(
                    runner,
                    Arc::clone(&self.system),
                    self.settings.sparse_options(),
                );
                let outcome = orchestrator.execute(&self.request, sink).await?;
                Ok(PullOutcome::Sparse(outcome))
            }
        }
    }

    fn summarize(&self, outcome: &PullOutcome) {
        match outcome {
            PullOutcome::Api(api) => {
                let mut tree = api.tree.clone();
                tree.sort();
                match self.report_style {
                    ReportStyle::Spinner => print!("{}", tree.render()),
                    ReportStyle::JsonLines => write_tree_json_line(&tree),
                }
                info!(
                    "\u{2713} Downloaded {} files in {} folders to {}",
                    api.tree.file_count(),
                    api.tree.folder_count(),
                    self.request.destination_root.display()
                );
            }
            PullOutcome::Sparse(sparse) => {
                let failed = sparse
                    .events
                    .iter()
                    .filter(|event| event.kind == crate::progress::ProgressKind::Error)
                    .count();
                if failed > 0 {
                    warn!("{failed} git step(s) reported errors; the checkout may be incomplete");
                }
                info!(
                    "\u{2713} Sparse checkout of '{}' ready in {}",
                    self.request.folder_path,
                    sparse.repository_path.display()
                );
            }
        }
    }
}

/// Apply command-line overrides on top of the file configuration
fn merge_cli_args(config: &mut Config, args: &Args) {
    if let Some(dest) = args.dest.as_ref() {
        config.destination = Some(dest.clone());
    }
    if let Some(mode) = args.mode {
        config.mode = Some(mode);
    }
    if let Some(branch) = args.branch.as_ref() {
        config.branch = Some(branch.clone());
    }
    if let Some(url) = args.api_url.as_ref() {
        config.api_url = Some(url.clone());
    }
    if let Some(url) = args.git_base_url.as_ref() {
        config.git_base_url = Some(url.clone());
    }
    if let Some(limit) = args.max_concurrency {
        config.max_concurrency = Some(usize::try_from(limit).unwrap_or(usize::MAX));
    }
    if let Some(secs) = args.timeout {
        config.timeout_secs = Some(secs);
    }
    if args.strict {
        config.strict = Some(true);
    }
}

/// Validate caller input and build the request for the resolved mode
fn build_request(args: &Args, settings: &Settings) -> Result<FetchRequest> {
    validate_repository_component("owner", &args.owner)?;
    validate_repository_component("repository", &args.repo)?;
    validate_branch(&settings.branch)?;
    validate_folder_path(&args.folder)?;

    let token = match settings.mode {
        FetchMode::Api => args.token.clone().filter(|token| !token.trim().is_empty()),
        FetchMode::SparseCheckout => {
            if args.token.is_some() {
                debug!("Ignoring token: sparse mode clones anonymously");
            }
            None
        }
    };

    let request = FetchRequest::new(
        args.owner.as_str(),
        args.repo.as_str(),
        settings.branch.as_str(),
        normalize_folder_path(&args.folder),
        settings.destination.clone(),
        settings.mode,
        token,
    );
    request.validate()?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::exit_code_of;
    use crate::system::MockSystem;
    use clap::Parser as _;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "subpull", "--owner", "octo", "--repo", "hello", "--folder", "/src/lib/",
        ];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_api_request_from_args() {
        let system = Arc::new(MockSystem::new());
        let args = parse(&["--token", "abc", "--dest", "/out"]);

        let operation = PullOperation::new(&args, system).unwrap();
        let request = operation.request();
        assert_eq!(request.folder_path, "src/lib");
        assert_eq!(request.branch, "main");
        assert_eq!(request.mode, FetchMode::Api);
        assert_eq!(request.token(), Some("abc"));
        assert_eq!(request.destination_root, Path::new("/out"));
    }

    #[test]
    fn test_sparse_mode_drops_token() {
        let system = Arc::new(MockSystem::new());
        let args = parse(&["--token", "abc", "--mode", "sparse", "--dest", "/out"]);

        let operation = PullOperation::new(&args, system).unwrap();
        assert_eq!(operation.request().mode, FetchMode::SparseCheckout);
        assert_eq!(operation.request().token(), None);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let system = Arc::new(
            MockSystem::new()
                .with_file(
                    "/work/subpull.yaml",
                    b"destination: /from-file\nbranch: develop\nmode: sparse\nmax_concurrency: 3\n",
                )
                .unwrap(),
        );
        let args = parse(&["--config", "/work/subpull.yaml", "--branch", "release"]);

        let operation = PullOperation::new(&args, system).unwrap();
        assert_eq!(operation.request().branch, "release");
        assert_eq!(operation.request().destination_root, Path::new("/from-file"));
        assert_eq!(operation.settings().mode, FetchMode::SparseCheckout);
        assert_eq!(operation.settings().max_concurrency, 3);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let system = Arc::new(MockSystem::new());
        let args = parse(&["--config", "/nowhere.yaml", "--token", "abc"]);

        let err = PullOperation::new(&args, system).err().unwrap();
        assert_eq!(exit_code_of(&err), 1);
    }

    #[test]
    fn test_api_mode_requires_token() {
        let system = Arc::new(MockSystem::new());
        let mut args = parse(&["--dest", "/out"]);
        args.token = None;

        let err = PullOperation::new(&args, system).err().unwrap();
        assert_eq!(exit_code_of(&err), 2);
    }

    #[test]
    fn test_rejects_unsafe_arguments() {
        let system: Arc<dyn System> = Arc::new(MockSystem::new());

        let mut args = parse(&["--token", "abc", "--dest", "/out"]);
        args.owner = "octo/evil".to_owned();
        let err = PullOperation::new(&args, Arc::clone(&system)).err().unwrap();
        assert_eq!(exit_code_of(&err), 2);

        let mut args = parse(&["--token", "abc", "--dest", "/out"]);
        args.folder = "../etc".to_owned();
        let err = PullOperation::new(&args, Arc::clone(&system)).err().unwrap();
        assert_eq!(exit_code_of(&err), 2);

        let args = parse(&["--token", "abc", "--dest", "/out", "--branch=--orphan"]);
        let err = PullOperation::new(&args, system).err().unwrap();
        assert_eq!(exit_code_of(&err), 2);
    }

    #[test]
    fn test_bad_url_override_is_a_configuration_error() {
        let system = Arc::new(MockSystem::new());
        let args = parse(&["--token", "abc", "--dest", "/out", "--api-url", "nope"]);

        let err = PullOperation::new(&args, system).err().unwrap();
        assert_eq!(exit_code_of(&err), 1);
    }
}
