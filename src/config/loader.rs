//! Configuration loading, environment variable interpolation and overrides

use crate::error::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

pub const CONFIG_FILENAME: &str = "facility.toml";

pub const ENV_API_URL: &str = "FACILITY_API_URL";
pub const ENV_API_TIMEOUT: &str = "FACILITY_API_TIMEOUT";
pub const ENV_SESSION_FILE: &str = "FACILITY_SESSION_FILE";

/// Load configuration.
///
/// An explicit path must exist. Without one, `facility.toml` is searched for
/// upward from the current directory and defaults are used when none is found.
/// Environment overrides are applied last in both cases.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let config = match explicit {
        Some(path) => load_config_from_path(path)?,
        None => match find_config_file() {
            Some(path) => load_config_from_path(&path)?,
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILENAME);
                Config::default()
            }
        },
    };

    let config = apply_env_overrides(config, |key| env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Reject settings that would make every request fail
pub fn validate(config: &Config) -> Result<()> {
    if config.api.timeout_secs == 0 {
        return Err(Error::Config("api.timeout_secs must be at least 1".to_string()));
    }
    if !config.api.base_url.starts_with("http://") && !config.api.base_url.starts_with("https://") {
        return Err(Error::Config(format!(
            "api.base_url must start with http:// or https://, got {:?}",
            config.api.base_url
        )));
    }
    Ok(())
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|_| Error::ConfigNotFound(path.display().to_string()))?;
    let content = interpolate_env_vars(&content);
    let config: Config = toml::from_str(&content)?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Find the configuration file, searching upward from current directory
fn find_config_file() -> Option<PathBuf> {
    let mut current = env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_FILENAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Apply `FACILITY_*` overrides on top of a loaded configuration.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
        config.api.base_url = url;
    }

    if let Some(raw) = lookup(ENV_API_TIMEOUT) {
        match raw.trim().parse::<u64>() {
            Ok(secs) => config.api.timeout_secs = secs,
            Err(_) => tracing::warn!("Ignoring {}={:?}: not a number of seconds", ENV_API_TIMEOUT, raw),
        }
    }

    if let Some(file) = lookup(ENV_SESSION_FILE).filter(|v| !v.is_empty()) {
        config.session.file = Some(PathBuf::from(file));
    }

    config
}

/// Interpolate environment variables in the format ${VAR_NAME} or ${VAR_NAME:-default}
fn interpolate_env_vars(content: &str) -> String {
    // This regex is a compile-time constant, panicking is acceptable here
    // as it indicates a programming error in the codebase, not a runtime issue
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
        .expect("Invalid regex pattern - this is a bug in the codebase");

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");

        env::var(var_name).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}

/// Generate a default configuration file content
pub fn default_config_content() -> &'static str {
    r#"# Facility client configuration

[api]
# Base URL of the facility management backend
base_url = "${FACILITY_API_URL:-http://localhost:8000/api}"
# Request timeout in seconds
timeout_secs = 10

# [session]
# Where tokens and the cached user are stored between runs
# file = "~/.config/facility/session.json"
"#
}
