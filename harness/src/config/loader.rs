//! Suite file loading
//!
//! A suite file is a JSON array of service configurations. A single object
//! is accepted as a one-suite file.

use super::ServiceConfig;
use serde::Deserialize;
use shared::{ConfigError, ConfigResult};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
#[serde(untagged)]
enum SuiteFile {
    Many(Vec<ServiceConfig>),
    One(Box<ServiceConfig>),
}

/// Read, parse and validate the suite definitions at `path`
pub fn load_suites(path: &Path) -> ConfigResult<Vec<ServiceConfig>> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.display().to_string(),
        source,
    })?;

    let suites = parse_suites(&contents)?;
    info!("📋 Loaded {} service test suites from {}", suites.len(), path.display());
    Ok(suites)
}

/// Parse and validate suite definitions from a JSON document
pub fn parse_suites(contents: &str) -> ConfigResult<Vec<ServiceConfig>> {
    let file: SuiteFile = serde_json::from_str(contents).map_err(|e| ConfigError::DeserializationError {
        message: e.to_string(),
    })?;

    let suites = match file {
        SuiteFile::Many(suites) => suites,
        SuiteFile::One(suite) => vec![*suite],
    };

    if suites.is_empty() {
        return Err(ConfigError::Empty);
    }

    let mut names = HashSet::new();
    for suite in &suites {
        suite.validate()?;
        if !names.insert(suite.name.as_str()) {
            return Err(ConfigError::invalid("name", format!("{} (duplicate)", suite.name)));
        }
    }

    Ok(suites)
}
