//! Error types shared across ReelSync crates.

use std::path::PathBuf;

/// Top-level error type for ReelSync operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelsyncError {
    #[error("Telemetry error: {message}")]
    Telemetry { message: String },

    #[error("Loader error: {message}")]
    Loader { message: String },

    #[error("Timeline error: {message}")]
    Timeline { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelsyncError.
pub type ReelsyncResult<T> = Result<T, ReelsyncError>;

impl ReelsyncError {
    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::Telemetry {
            message: msg.into(),
        }
    }

    pub fn loader(msg: impl Into<String>) -> Self {
        Self::Loader {
            message: msg.into(),
        }
    }

    pub fn timeline(msg: impl Into<String>) -> Self {
        Self::Timeline {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
