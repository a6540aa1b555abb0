//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Engine defaults used by editing and export.
    pub engine: EngineDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default parameters for the timeline engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineDefaults {
    /// Frame rate used for frame layout when a project does not specify one.
    pub fps: f64,

    /// Distance (ms) within which a dragged clip edge snaps to a snap point.
    pub snap_threshold_ms: f64,

    /// Length of one export chunk (ms).
    pub export_chunk_ms: u64,

    /// Seed for the zoom-clustering random source.
    pub detector_seed: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelsync=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            fps: 30.0,
            snap_threshold_ms: 100.0,
            export_chunk_ms: 10_000,
            detector_seed: 42,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelsync").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.engine.fps, 30.0);
        assert_eq!(config.engine.export_chunk_ms, 10_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_engine_section_uses_defaults() {
        let raw = r#"{
            "engine": { "fps": 60.0 },
            "logging": { "level": "debug", "json": true, "file": null }
        }"#;
        let config: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.engine.fps, 60.0);
        assert_eq!(config.engine.snap_threshold_ms, 100.0);
        assert!(config.logging.json);
    }
}
