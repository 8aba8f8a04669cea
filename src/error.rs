//! Error types for drowsewatch

use thiserror::Error;

/// Errors that can occur while monitoring or persisting sessions
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Session history I/O error: {0}")]
    StoreIo(#[from] std::io::Error),

    #[error("Settings file error: {0}")]
    ConfigError(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
