use std::path::PathBuf;

use thiserror::Error;

/// Failure of one backend call, before any envelope is interpreted.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// The request could not complete (connect, timeout, dropped connection).
    #[error("transport failure: {0}")]
    Transport(String),
    /// The call completed but its result could not be processed.
    #[error("{0}")]
    Processing(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() || e.is_body() {
            BackendError::Processing(format!("Parse error: {}", e))
        } else if e.is_status() {
            BackendError::Processing(format!("API error: {}", e))
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize conversation: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
