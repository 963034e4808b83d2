//! Configuration and argument validation logic

use crate::config::Config;
use crate::error::PullError;
use anyhow::{Result, anyhow};
use regex::Regex;

/// Validate configuration values the schema cannot express
///
/// # Errors
///
/// Returns an error if:
/// - `destination` or `branch` is blank
/// - `api_url` is not an http(s) URL
/// - `git_base_url` uses an unsupported scheme
#[inline]
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(destination) = config.destination.as_ref()
        && destination.trim().is_empty()
    {
        return Err(anyhow!("destination cannot be empty"));
    }

    if let Some(branch) = config.branch.as_ref() {
        validate_branch(branch).map_err(|e| anyhow!("branch: {e}"))?;
    }

    if let Some(url) = config.api_url.as_ref() {
        validate_url(url, r"^https?://[^\s/]+\S*$")
            .map_err(|e| anyhow!("api_url: {e}. Use an http:// or https:// URL"))?;
    }

    if let Some(url) = config.git_base_url.as_ref() {
        validate_url(url, r"^(https?|ssh|git|file)://\S+$").map_err(|e| {
            return anyhow!("git_base_url: {e}. Supported schemes: https, http, ssh, git, file");
        })?;
    }

    Ok(())
}

fn validate_url(url: &str, pattern: &str) -> Result<()> {
    let regex = Regex::new(pattern)?;
    if regex.is_match(url) {
        return Ok(());
    }
    Err(anyhow!("Invalid URL '{url}'"))
}

/// Validate an owner or repository name
///
/// # Errors
///
/// Returns `PullError::Validation` unless the name is made of ASCII letters,
/// digits, `.`, `_` and `-` only, and does not start with `-` or consist of dots.
#[inline]
pub fn validate_repository_component(kind: &str, value: &str) -> Result<()> {
    let regex = Regex::new(r"^[A-Za-z0-9._-]+$")?;
    if !regex.is_match(value) || value.starts_with('-') || value.chars().all(|c| c == '.') {
        return Err(PullError::validation(format!(
            "Invalid {kind} '{value}'. Use letters, digits, '.', '_' or '-'"
        ))
        .into());
    }
    Ok(())
}

/// Validate a branch or ref name
///
/// # Errors
///
/// Returns `PullError::Validation` if the name is empty, starts with `-`,
/// contains whitespace or control characters, or contains `..`.
#[inline]
pub fn validate_branch(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(PullError::validation("Branch cannot be empty").into());
    }
    if value.starts_with('-') {
        return Err(PullError::validation(format!(
            "Branch '{value}' cannot start with '-'"
        ))
        .into());
    }
    if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(PullError::validation(format!(
            "Branch '{value}' cannot contain whitespace or control characters"
        ))
        .into());
    }
    if value.contains("..") {
        return Err(PullError::validation(format!("Branch '{value}' cannot contain '..'")).into());
    }
    Ok(())
}

/// Validate a folder path inside the repository
///
/// Spaces are allowed; leading and trailing slashes are tolerated since they
/// are trimmed before the request is built.
///
/// # Errors
///
/// Returns `PullError::Validation` if the path is empty after trimming,
/// starts with `-`, contains control characters, or has a `.`/`..` segment.
#[inline]
pub fn validate_folder_path(value: &str) -> Result<()> {
    let trimmed = value.trim_matches('/');
    if trimmed.is_empty() {
        return Err(PullError::validation("Folder path cannot be empty").into());
    }
    if trimmed.starts_with('-') {
        return Err(PullError::validation(format!(
            "Folder path '{value}' cannot start with '-'"
        ))
        .into());
    }
    if trimmed.chars().any(char::is_control) {
        return Err(PullError::validation(format!(
            "Folder path '{value}' cannot contain control characters"
        ))
        .into());
    }
    validate_path_safety(trimmed)
}

/// Validate path safety (prevent directory traversal)
///
/// # Errors
///
/// Returns `PullError::Validation` if a segment is empty, `.` or `..`
#[inline]
pub fn validate_path_safety(path: &str) -> Result<()> {
    for segment in path.split('/') {
        if segment == ".." {
            return Err(PullError::validation(format!(
                "Path contains unsafe directory traversal: '{path}'"
            ))
            .into());
        }
        if segment.is_empty() || segment == "." {
            return Err(PullError::validation(format!(
                "Path contains an empty or '.' segment: '{path}'"
            ))
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::exit_code_of;

    #[test]
    fn test_repository_component() {
        assert!(validate_repository_component("owner", "rust-lang").is_ok());
        assert!(validate_repository_component("repo", "my.repo_2").is_ok());
        assert!(validate_repository_component("repo", "").is_err());
        assert!(validate_repository_component("repo", "a/b").is_err());
        assert!(validate_repository_component("repo", "-rf").is_err());
        assert!(validate_repository_component("repo", "..").is_err());

        let err = validate_repository_component("owner", "has space").unwrap_err();
        assert_eq!(exit_code_of(&err), 2);
    }

    #[test]
    fn test_branch() {
        assert!(validate_branch("main").is_ok());
        assert!(validate_branch("release/1.2").is_ok());
        assert!(validate_branch("").is_err());
        assert!(validate_branch("--upload-pack=evil").is_err());
        assert!(validate_branch("my branch").is_err());
        assert!(validate_branch("a..b").is_err());
    }

    #[test]
    fn test_folder_path() {
        assert!(validate_folder_path("src/lib").is_ok());
        assert!(validate_folder_path("/docs/").is_ok());
        assert!(validate_folder_path("My Documents/notes").is_ok());
        assert!(validate_folder_path("/").is_err());
        assert!(validate_folder_path("-x").is_err());
        assert!(validate_folder_path("src/../etc").is_err());
        assert!(validate_folder_path("src//lib").is_err());
        assert!(validate_folder_path("src/\tlib").is_err());
    }

    #[test]
    fn test_config_urls() {
        let mut config = Config {
            api_url: Some("https://ghe.example.com/api/v3".to_owned()),
            git_base_url: Some("file:///srv/git".to_owned()),
            ..Config::default()
        };
        assert!(validate_config(&config).is_ok());

        config.api_url = Some("api.github.com".to_owned());
        assert!(validate_config(&config).is_err());

        config.api_url = None;
        config.git_base_url = Some("ftp://example.com".to_owned());
        assert!(validate_config(&config).is_err());

        config.git_base_url = None;
        config.destination = Some("  ".to_owned());
        assert!(validate_config(&config).is_err());
    }
}
