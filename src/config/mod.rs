//! Configuration management module
//!
//! Handles YAML configuration parsing, JSON schema validation, and resolving
//! file values against built-in defaults

pub mod schema;
pub mod validation;
pub mod yaml;

use crate::fetch::{DEFAULT_API_URL, FetchOptions};
use crate::git::{DEFAULT_GIT_BASE_URL, SparseOptions};
use crate::request::FetchMode;
use crate::system::System;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Branch used when neither the command line nor the file names one
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Optional defaults read from `subpull.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory the folder is materialised under
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<FetchMode>,

    /// Branch or other ref
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Base URL of the GitHub REST API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Prefix the clone URL is built from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Stop the sparse checkout at the first failed step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file(system: &dyn System, path: &str) -> anyhow::Result<Self> {
        yaml::load_config(system, path)
    }

    /// Validate configuration values beyond what the schema checks
    pub fn validate(&self) -> anyhow::Result<()> {
        validation::validate_config(self)
    }

    /// Fill every unset value with its built-in default
    #[must_use]
    pub fn resolve(self) -> Settings {
        Settings {
            destination: self
                .destination
                .as_deref()
                .map_or_else(default_destination, expand_home),
            mode: self.mode.unwrap_or_default(),
            branch: self.branch.unwrap_or_else(|| DEFAULT_BRANCH.to_owned()),
            api_url: self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            git_base_url: self
                .git_base_url
                .unwrap_or_else(|| DEFAULT_GIT_BASE_URL.to_owned()),
            max_concurrency: self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            strict: self.strict.unwrap_or(false),
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub destination: PathBuf,
    pub mode: FetchMode,
    pub branch: String,
    pub api_url: String,
    pub git_base_url: String,
    pub max_concurrency: usize,
    pub timeout: Duration,
    pub strict: bool,
}

impl Settings {
    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            max_concurrency: self.max_concurrency,
            timeout: self.timeout,
        }
    }

    #[must_use]
    pub fn sparse_options(&self) -> SparseOptions {
        SparseOptions {
            git_base_url: self.git_base_url.clone(),
            strict: self.strict,
        }
    }
}

/// The user's download directory, or `./Downloads` when there is none
#[must_use]
pub fn default_destination() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("Downloads"))
}

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}
