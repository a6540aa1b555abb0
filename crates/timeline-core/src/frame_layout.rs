//! Gap-free frame layout for the renderer.
//!
//! Each clip's frame count is the distance to the next clip's start frame
//! rather than its own rounded duration, so independent rounding can never
//! leave a stray empty frame between neighbours.

use reelsync_project_model::project::Clip;
use reelsync_project_model::timeline::FrameLayoutItem;

use crate::time_convert::ms_to_frame;

/// Lay out `clips` at `fps`. Input order does not matter.
pub fn build_frame_layout(clips: &[Clip], fps: f64) -> Vec<FrameLayoutItem> {
    if clips.is_empty() || fps <= 0.0 {
        return vec![];
    }

    let mut sorted = clips.to_vec();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let starts: Vec<u64> = sorted
        .iter()
        .map(|c| ms_to_frame(c.start_time, fps))
        .collect();

    sorted
        .into_iter()
        .enumerate()
        .map(|(i, clip)| {
            let start_frame = starts[i];
            let duration_frames = match starts.get(i + 1) {
                Some(next) => next.saturating_sub(start_frame),
                // The extra frame keeps the final frame on screen at the end.
                None => ms_to_frame(clip.duration, fps) + 1,
            };
            FrameLayoutItem {
                clip,
                start_frame,
                duration_frames,
                end_frame: start_frame + duration_frames,
            }
        })
        .collect()
}

/// Frames spanned by the layout.
pub fn total_frames(layout: &[FrameLayoutItem]) -> u64 {
    layout.last().map(|item| item.end_frame).unwrap_or(0)
}

/// The item showing `frame`, if any.
pub fn item_at_frame(layout: &[FrameLayoutItem], frame: u64) -> Option<&FrameLayoutItem> {
    let idx = layout.partition_point(|item| item.end_frame <= frame);
    layout.get(idx).filter(|item| item.contains_frame(frame))
}
