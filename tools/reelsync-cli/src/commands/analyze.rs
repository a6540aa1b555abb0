//! Run the suggestion detectors on a telemetry file.

use std::path::PathBuf;

use reelsync_common::ReelsyncError;
use reelsync_processing_core::motion_cluster::FrameGeometry;
use reelsync_processing_core::SuggestionEngine;
use reelsync_project_model::event::parse_telemetry_file;

pub fn run(
    path: PathBuf,
    seed: u64,
    screen: (u32, u32),
    video: (Option<u32>, Option<u32>),
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ReelsyncError::FileNotFound { path: path.clone() },
        _ => ReelsyncError::Io(e),
    })?;
    let (header, events) = parse_telemetry_file(&content)
        .map_err(|e| ReelsyncError::telemetry(format!("{}: {e}", path.display())))?;

    let (screen_width, screen_height) = header
        .as_ref()
        .map(|h| (h.screen_width, h.screen_height))
        .unwrap_or(screen);
    let geometry = FrameGeometry {
        screen_width: f64::from(screen_width),
        screen_height: f64::from(screen_height),
        video_width: f64::from(video.0.unwrap_or(screen_width)),
        video_height: f64::from(video.1.unwrap_or(screen_height)),
    };
    let total_duration_ms = events.last().map_or(0.0, |e| e.timestamp_ms as f64);

    tracing::info!(
        events = events.len(),
        screen_width,
        screen_height,
        seed,
        "Analyzing telemetry"
    );

    let suggestions =
        SuggestionEngine::with_seed(seed).generate(&events, &geometry, total_duration_ms);

    tracing::info!(
        zoom_blocks = suggestions.zoom_blocks.len(),
        typing_periods = suggestions.typing_periods.len(),
        "Analysis complete"
    );
    super::print_json(&suggestions)
}
