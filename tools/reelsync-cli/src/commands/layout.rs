//! Print the frame layout of every track.

use std::path::PathBuf;

use reelsync_common::ReelsyncError;
use reelsync_metadata_loader::export::TrackLayout;
use reelsync_timeline_core::build_frame_layout;
use reelsync_timeline_core::frame_layout::total_frames;

pub fn run(path: PathBuf, fps: Option<f64>, default_fps: f64) -> anyhow::Result<()> {
    let project = super::load_project(&path)?;
    let fps = fps.unwrap_or(if project.fps > 0.0 { project.fps } else { default_fps });
    if fps.is_nan() || fps <= 0.0 {
        return Err(ReelsyncError::config(format!("frame rate must be positive, got {fps}")).into());
    }

    let layouts: Vec<TrackLayout> = project
        .tracks
        .iter()
        .map(|track| {
            let items = build_frame_layout(&track.clips, fps);
            TrackLayout {
                track_id: track.id.clone(),
                total_frames: total_frames(&items),
                items,
            }
        })
        .collect();

    tracing::info!(tracks = layouts.len(), fps, "Frame layout built");
    super::print_json(&layouts)
}
