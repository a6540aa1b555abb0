//! Loader errors.

use std::path::PathBuf;

use reelsync_common::ReelsyncError;

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("Unknown recording: {0}")]
    UnknownRecording(String),

    #[error("Failed to read telemetry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed telemetry in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Load task for {recording_id} did not complete: {message}")]
    Task {
        recording_id: String,
        message: String,
    },
}

impl LoaderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the failure means the telemetry file no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<LoaderError> for ReelsyncError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                ReelsyncError::FileNotFound { path }
            }
            other => ReelsyncError::loader(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_file_not_found() {
        let err = LoaderError::io(
            "/tmp/missing.jsonl",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.is_not_found());
        assert!(matches!(
            ReelsyncError::from(err),
            ReelsyncError::FileNotFound { .. }
        ));
    }

    #[test]
    fn test_other_errors_keep_message() {
        let err = LoaderError::UnknownRecording("rec-9".into());
        assert!(!err.is_not_found());
        assert_eq!(
            ReelsyncError::from(err).to_string(),
            "Loader error: Unknown recording: rec-9"
        );
    }
}
