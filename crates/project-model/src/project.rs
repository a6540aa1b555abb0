//! Project, track, clip, and recording types.
//!
//! A project is the root aggregate: it owns the editable tracks and
//! references the recordings whose segments the clips place on the timeline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::event::{TelemetryEvent, TimestampMs};

/// Top-level project file (`project.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Unique project identifier.
    pub id: String,

    /// Human-readable project name.
    pub name: String,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Last modified timestamp (RFC 3339).
    pub modified_at: String,

    /// Timeline frame rate.
    pub fps: f64,

    /// Captured sources referenced by clips.
    #[serde(default)]
    pub recordings: Vec<Recording>,

    /// Editable tracks.
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// An ordered owner of clips. Clips on one track never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,

    #[serde(default)]
    pub clips: Vec<Clip>,
}

/// Placement of a recording segment on the timeline.
///
/// `start_time` and `duration` are timeline milliseconds; `source_in` and
/// `source_out` are milliseconds into the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: String,
    pub recording_id: String,
    pub start_time: f64,
    pub duration: f64,
    pub source_in: f64,
    pub source_out: f64,
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f64,
}

fn default_playback_rate() -> f64 {
    1.0
}

/// A captured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,

    /// Recorded display dimensions in pixels.
    pub screen_width: u32,
    pub screen_height: u32,

    /// Length of the recording (ms).
    pub duration_ms: f64,

    /// Telemetry already held in memory (e.g. a recording that just finished).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<Vec<TelemetryEvent>>,

    /// On-disk telemetry chunks, in recording order.
    #[serde(default)]
    pub telemetry_chunks: Vec<TelemetryChunkRef>,
}

/// Reference to one on-disk telemetry chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryChunkRef {
    /// Path to a JSONL file, relative to the project root or absolute.
    pub path: PathBuf,

    /// Time range covered by the chunk (ms since recording start).
    pub start_ms: TimestampMs,
    pub end_ms: TimestampMs,
}

impl Clip {
    /// Create a clip covering `[source_in, source_in + duration)` at normal speed.
    pub fn new(
        id: impl Into<String>,
        recording_id: impl Into<String>,
        start_time: f64,
        duration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            recording_id: recording_id.into(),
            start_time,
            duration,
            source_in: 0.0,
            source_out: duration,
            playback_rate: 1.0,
        }
    }

    /// Set the source range this clip plays.
    pub fn with_source(mut self, source_in: f64, source_out: f64) -> Self {
        self.source_in = source_in;
        self.source_out = source_out;
        self
    }

    /// Timeline end (exclusive).
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

impl Track {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            clips: vec![],
        }
    }

    pub fn clip(&self, clip_id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == clip_id)
    }

    pub fn clip_mut(&mut self, clip_id: &str) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == clip_id)
    }

    /// Clips sorted by start time.
    pub fn sorted_clips(&self) -> Vec<Clip> {
        let mut clips = self.clips.clone();
        clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        clips
    }

    /// End of the last clip, or 0 for an empty track.
    pub fn duration(&self) -> f64 {
        self.clips
            .iter()
            .map(Clip::end_time)
            .fold(0.0_f64, f64::max)
    }
}

impl Recording {
    pub fn new(id: impl Into<String>, screen_width: u32, screen_height: u32, duration_ms: f64) -> Self {
        Self {
            id: id.into(),
            screen_width,
            screen_height,
            duration_ms,
            telemetry: None,
            telemetry_chunks: vec![],
        }
    }

    /// Attach in-memory telemetry.
    pub fn with_telemetry(mut self, events: Vec<TelemetryEvent>) -> Self {
        self.telemetry = Some(events);
        self
    }
}

impl Project {
    /// Create an empty project.
    pub fn new(name: impl Into<String>, fps: f64) -> Self {
        let now = chrono::Utc::now();
        Self {
            version: "1.0".to_string(),
            id: format!("prj-{}", now.timestamp_nanos_opt().unwrap_or_default()),
            name: name.into(),
            created_at: now.to_rfc3339(),
            modified_at: now.to_rfc3339(),
            fps,
            recordings: vec![],
            tracks: vec![],
        }
    }

    pub fn recording(&self, id: &str) -> Option<&Recording> {
        self.recordings.iter().find(|r| r.id == id)
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Track containing the given clip.
    pub fn track_of_clip(&self, clip_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.clip(clip_id).is_some())
    }

    /// All clips across all tracks.
    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.iter().flat_map(|t| t.clips.iter())
    }

    /// Distinct recording ids referenced by clips, in first-use order.
    pub fn referenced_recording_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.clips()
            .filter(|c| seen.insert(c.recording_id.clone()))
            .map(|c| c.recording_id.clone())
            .collect()
    }

    /// Longest track end.
    pub fn duration(&self) -> f64 {
        self.tracks
            .iter()
            .map(Track::duration)
            .fold(0.0_f64, f64::max)
    }

    /// Check that every clip references a recording of this project and that
    /// clip ids are unique.
    pub fn validate_references(&self) -> Result<(), ProjectError> {
        let mut ids = HashSet::new();
        for clip in self.clips() {
            if !ids.insert(clip.id.as_str()) {
                return Err(ProjectError::ValidationError {
                    message: format!("duplicate clip id {}", clip.id),
                });
            }
            if self.recording(&clip.recording_id).is_none() {
                return Err(ProjectError::MissingRecording {
                    clip_id: clip.id.clone(),
                    recording_id: clip.recording_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Refresh `modified_at`.
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }

    /// Load a project file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&json).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Save the project file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ProjectError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ProjectError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| ProjectError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Clip {clip_id} references unknown recording {recording_id}")]
    MissingRecording {
        clip_id: String,
        recording_id: String,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}
