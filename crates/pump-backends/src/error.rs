use std::path::{Path, PathBuf};

use pump_engine::InvalidIdentifier;
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("request failed with HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid URL `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),

    #[error("invalid JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("API error: {message}")]
    Api { message: String },

    #[error("missing required option --{option}")]
    MissingOption { option: &'static str },
}

impl BackendError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
