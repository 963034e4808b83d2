//! YAML configuration loading and parsing

use crate::config::Config;
use crate::error::PullError;
use crate::system::System;
use anyhow::Result;
use serde_json::Value;
use std::path::Path;

/// Load, schema-check and validate a YAML configuration file
///
/// # Errors
///
/// Returns `PullError::Configuration` if the file is missing, unreadable,
/// not valid YAML, rejected by the schema, or fails the logic checks.
pub fn load_config(system: &dyn System, path: &str) -> Result<Config> {
    let path_obj = Path::new(path);

    if !system.exists(path_obj) {
        return Err(PullError::configuration(format!(
            "Configuration file not found: {path}\n\
            Create a subpull.yaml file or specify a different path with --config"
        ))
        .into());
    }

    let content = system.read_to_string(path_obj).map_err(|e| {
        return PullError::configuration(format!(
            "Failed to read configuration file {path}: {e}"
        ));
    })?;

    parse_config(&content)
        .map_err(|e| anyhow::Error::from(PullError::configuration(format!("{path}: {e:#}"))))
}

/// Parse configuration text
///
/// An empty document is an empty configuration.
///
/// # Errors
///
/// Returns an error if the text is not valid YAML, does not match the
/// schema, or fails the logic checks.
pub fn parse_config(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    // Checked as JSON first so schema errors name the offending field
    let value: Value = serde_yaml::from_str(content).map_err(|e| {
        return anyhow::anyhow!(
            "Failed to parse YAML configuration: {e}\n\
            Please check the syntax and structure of your configuration file"
        );
    })?;
    if value.is_null() {
        return Ok(Config::default());
    }

    crate::config::schema::validate_against_schema(&value)?;

    let config: Config = serde_json::from_value(value)
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    config.validate()?;

    Ok(config)
}
