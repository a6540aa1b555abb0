//! Generated timeline effects and derived frame layout.
//!
//! Zoom blocks and typing periods are regenerated wholesale from telemetry
//! when suggestions are reset; they are never patched incrementally.

use serde::{Deserialize, Serialize};

use crate::project::Clip;

/// How a zoom block came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomMode {
    /// Produced by motion clustering.
    #[default]
    Auto,
    /// Authored or edited by the user.
    Manual,
}

/// A time-bounded automatic camera zoom.
///
/// Times are milliseconds relative to the owning clip's source; targets are
/// normalized to `[0.0, 1.0]` of the recorded screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomBlock {
    pub id: String,
    pub start_time: f64,
    pub end_time: f64,
    /// Ease-in transition length at the start of the block.
    pub intro_ms: f64,
    /// Ease-out transition length at the end of the block.
    pub outro_ms: f64,
    pub scale: f64,
    pub target_x: f64,
    pub target_y: f64,
    #[serde(default)]
    pub mode: ZoomMode,
}

impl ZoomBlock {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// A detected span of continuous typing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingPeriod {
    pub start_time: f64,
    pub end_time: f64,
    pub key_count: usize,
    pub average_wpm: f64,
    pub suggested_speed_multiplier: f64,
    pub confidence: f64,
}

impl TypingPeriod {
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Project-level typing speed-up suggestion aggregated over all periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingSuggestion {
    pub speed_multiplier: f64,
    pub average_wpm: f64,
    pub confidence: f64,
    pub total_typing_ms: f64,
    pub period_count: usize,
}

/// One clip's slot in the frame-indexed rendering sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLayoutItem {
    pub clip: Clip,
    pub start_frame: u64,
    pub duration_frames: u64,
    pub end_frame: u64,
}

impl FrameLayoutItem {
    /// Whether `frame` falls in `[start_frame, end_frame)`.
    pub fn contains_frame(&self, frame: u64) -> bool {
        frame >= self.start_frame && frame < self.end_frame
    }
}
