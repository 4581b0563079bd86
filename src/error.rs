//! Error types for the facility client

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Request rejected ({status}): {message}")]
    Validation { status: StatusCode, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Not logged in. Run 'facility login' first.")]
    NotAuthenticated,

    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classify a non-success HTTP response.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        if status == StatusCode::UNAUTHORIZED {
            Error::Unauthorized(message)
        } else if status.is_server_error() {
            Error::Server { status, message }
        } else {
            Error::Validation { status, message }
        }
    }

    /// The string shown next to the action that failed.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthorized(message)
            | Error::Validation { message, .. }
            | Error::Server { message, .. } => message.clone(),
            Error::Network(e) if e.is_timeout() => "The server took too long to respond".to_string(),
            Error::Network(_) => "Could not reach the server".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized(_))
    }

    /// Transport failures and 5xx: the server could not answer, it did not refuse
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Server { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            Error::Validation { status, .. } | Error::Server { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

/// Pull the backend's message out of a JSON error body.
///
/// Looks at `error`, `detail` and `message` in that order, then falls back to
/// DRF field errors such as `{"name": ["This field is required."]}`.
pub fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    match &value {
        Value::Object(map) => {
            for key in ["error", "detail", "message"] {
                if let Some(text) = map.get(key).and_then(flatten) {
                    return Some(text);
                }
            }

            let fields: Vec<String> = map
                .iter()
                .filter_map(|(field, v)| {
                    flatten(v).map(|msg| {
                        if field == "non_field_errors" {
                            msg
                        } else {
                            format!("{}: {}", field, msg)
                        }
                    })
                })
                .collect();

            if fields.is_empty() {
                None
            } else {
                Some(fields.join("; "))
            }
        }
        other => flatten(other),
    }
}

fn flatten(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        _ => None,
    }
}

pub type Result<T> = std::result::Result<T, Error>;
