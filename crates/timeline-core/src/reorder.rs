//! Structural track edits: reorder, split, ripple delete.
//!
//! Each function takes the track's clips and returns the edited list; the
//! input is never modified.

use reelsync_project_model::project::Clip;

use crate::time_convert::timeline_to_source;

fn sorted(clips: &[Clip]) -> Vec<Clip> {
    let mut clips = clips.to_vec();
    clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    clips
}

/// Move `clip_id` to `new_index` in start order and repack the track
/// contiguously from the original first start.
///
/// An unknown id returns the clips sorted and otherwise unchanged.
pub fn reorder_clips(clips: &[Clip], clip_id: &str, new_index: usize) -> Vec<Clip> {
    let mut ordered = sorted(clips);
    let Some(from) = ordered.iter().position(|c| c.id == clip_id) else {
        return ordered;
    };
    let origin = ordered.first().map(|c| c.start_time).unwrap_or(0.0);

    let clip = ordered.remove(from);
    ordered.insert(new_index.min(ordered.len()), clip);

    let mut cursor = origin;
    for clip in &mut ordered {
        clip.start_time = cursor;
        cursor += clip.duration;
    }
    ordered
}

/// Split a clip at a timeline time into two clips that share the source at
/// the cut. `None` unless `at_ms` is strictly inside the clip.
pub fn split_clip(clip: &Clip, at_ms: f64, new_id: impl Into<String>) -> Option<(Clip, Clip)> {
    if !(at_ms > clip.start_time && at_ms < clip.end_time()) {
        return None;
    }
    let cut = timeline_to_source(clip, at_ms);

    let left = Clip {
        duration: at_ms - clip.start_time,
        source_out: cut,
        ..clip.clone()
    };
    let right = Clip {
        id: new_id.into(),
        start_time: at_ms,
        duration: clip.end_time() - at_ms,
        source_in: cut,
        ..clip.clone()
    };
    Some((left, right))
}

/// Remove a clip and pull every later clip left by its duration.
///
/// Returns `None` when the id is unknown.
pub fn ripple_delete(clips: &[Clip], clip_id: &str) -> Option<Vec<Clip>> {
    let removed = clips.iter().find(|c| c.id == clip_id)?;
    let (start, shift) = (removed.start_time, removed.duration);

    Some(
        sorted(clips)
            .into_iter()
            .filter(|c| c.id != clip_id)
            .map(|mut c| {
                if c.start_time >= start {
                    c.start_time = (c.start_time - shift).max(start);
                }
                c
            })
            .collect(),
    )
}
