//! Per-recording effect suggestions and their session-owned cache.
//!
//! Suggestions are regenerated wholesale: a reset drops the cached result
//! and the next request reruns both detectors on the full stream.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use reelsync_project_model::event::TelemetryEvent;
use reelsync_project_model::timeline::{TypingPeriod, TypingSuggestion, ZoomBlock};

use crate::motion_cluster::{FrameGeometry, MotionClusterDetector};
use crate::typing::{aggregate_suggestion, TypingClusterDetector};

/// Everything the detectors suggest for one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSuggestions {
    pub zoom_blocks: Vec<ZoomBlock>,
    pub typing_periods: Vec<TypingPeriod>,
    pub typing: Option<TypingSuggestion>,
}

/// Runs both detectors with a fixed seed.
pub struct SuggestionEngine {
    motion: MotionClusterDetector,
    typing: TypingClusterDetector,
    seed: u64,
}

impl SuggestionEngine {
    pub fn new(motion: MotionClusterDetector, typing: TypingClusterDetector, seed: u64) -> Self {
        Self {
            motion,
            typing,
            seed,
        }
    }

    /// Default detectors with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::new(
            MotionClusterDetector::with_defaults(),
            TypingClusterDetector::with_defaults(),
            seed,
        )
    }

    /// Generate suggestions for one recording's telemetry.
    ///
    /// A fresh RNG is seeded per call, so the same input always yields the
    /// same suggestions regardless of call order.
    pub fn generate(
        &self,
        events: &[TelemetryEvent],
        geometry: &FrameGeometry,
        total_duration_ms: f64,
    ) -> RecordingSuggestions {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let zoom_blocks = self
            .motion
            .detect(events, geometry, total_duration_ms, &mut rng);
        let typing_periods = self.typing.detect(events);
        let typing = aggregate_suggestion(&typing_periods);

        RecordingSuggestions {
            zoom_blocks,
            typing_periods,
            typing,
        }
    }
}

struct CacheEntry {
    fingerprint: u64,
    suggestions: Arc<RecordingSuggestions>,
}

/// Suggestion results keyed by recording id, owned by one editing session.
///
/// An entry is reused only while the telemetry and geometry it was computed
/// from are unchanged.
#[derive(Default)]
pub struct SuggestionCache {
    entries: HashMap<String, CacheEntry>,
}

impl SuggestionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached suggestions for a recording, generating them on a miss.
    pub fn get_or_generate(
        &mut self,
        engine: &SuggestionEngine,
        recording_id: &str,
        events: &[TelemetryEvent],
        geometry: &FrameGeometry,
        total_duration_ms: f64,
    ) -> Arc<RecordingSuggestions> {
        let fingerprint = fingerprint(events, geometry, total_duration_ms);
        if let Some(entry) = self.entries.get(recording_id) {
            if entry.fingerprint == fingerprint {
                return Arc::clone(&entry.suggestions);
            }
            tracing::debug!(recording_id, "Telemetry changed, regenerating suggestions");
        }

        let suggestions = Arc::new(engine.generate(events, geometry, total_duration_ms));
        self.entries.insert(
            recording_id.to_string(),
            CacheEntry {
                fingerprint,
                suggestions: Arc::clone(&suggestions),
            },
        );
        suggestions
    }

    /// Drop a recording's suggestions so the next request regenerates them.
    pub fn reset(&mut self, recording_id: &str) -> bool {
        self.entries.remove(recording_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn fingerprint(events: &[TelemetryEvent], geometry: &FrameGeometry, total_duration_ms: f64) -> u64 {
    let mut hasher = DefaultHasher::new();
    events.len().hash(&mut hasher);
    for event in events {
        event.timestamp_ms.hash(&mut hasher);
        if let Some((x, y)) = event.position() {
            x.to_bits().hash(&mut hasher);
            y.to_bits().hash(&mut hasher);
        }
        if let Some((key, modifiers)) = event.key_press() {
            key.hash(&mut hasher);
            modifiers.hash(&mut hasher);
        }
    }
    geometry.screen_width.to_bits().hash(&mut hasher);
    geometry.screen_height.to_bits().hash(&mut hasher);
    geometry.video_width.to_bits().hash(&mut hasher);
    geometry.video_height.to_bits().hash(&mut hasher);
    total_duration_ms.to_bits().hash(&mut hasher);
    hasher.finish()
}
