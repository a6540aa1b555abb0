//! Playhead resolution: which clip is active at a time, which comes next,
//! and where the playhead goes when the clip under it is edited.

use reelsync_project_model::project::Clip;

/// Distance from a clip boundary within which the previous clip is kept.
pub const BOUNDARY_HYSTERESIS_MS: f64 = 1.0;

/// How far ahead [`find_next_clip`] looks for an upcoming clip start.
pub const NEXT_CLIP_LOOKAHEAD_MS: f64 = 200.0;

/// The clip that owns time `t`.
///
/// A clip owns its start instant and `(start, start + duration]`. When one
/// clip ends exactly where the next starts, the start instant wins.
pub fn find_clip_at_time(clips: &[Clip], t: f64) -> Option<&Clip> {
    if !t.is_finite() {
        return None;
    }
    clips.iter().find(|c| c.start_time == t).or_else(|| {
        clips
            .iter()
            .filter(|c| c.start_time < t && t <= c.end_time())
            .max_by(|a, b| a.start_time.total_cmp(&b.start_time))
    })
}

/// The earliest clip starting after `t` but within the look-ahead window.
pub fn find_next_clip(clips: &[Clip], t: f64, lookahead_ms: f64) -> Option<&Clip> {
    clips
        .iter()
        .filter(|c| c.start_time > t && c.start_time - t <= lookahead_ms)
        .min_by(|a, b| a.start_time.total_cmp(&b.start_time))
}

/// Remap the playhead through an edit of the clip under it.
///
/// Progress through `before` is preserved on `after`. A playhead outside
/// `before` is returned unchanged.
pub fn track_playhead_during_clip_edit(playhead_ms: f64, before: &Clip, after: &Clip) -> f64 {
    if playhead_ms < before.start_time || playhead_ms > before.end_time() {
        return playhead_ms;
    }

    let progress = if before.duration > 0.0 {
        (playhead_ms - before.start_time) / before.duration
    } else {
        0.0
    };
    let remapped = after.start_time + progress * after.duration.max(0.0);

    // Stay inside the clip so it keeps owning the playhead.
    let last = (after.end_time() - BOUNDARY_HYSTERESIS_MS).max(after.start_time);
    remapped.clamp(after.start_time, last)
}

/// Clamp to `[0, max(0, total_duration - 1)]`.
pub fn clamp_to_timeline_bounds(t: f64, total_duration_ms: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    t.clamp(0.0, (total_duration_ms - 1.0).max(0.0))
}

/// Stateful active-clip tracking for playback ticks.
#[derive(Debug, Clone, Default)]
pub struct PlayheadResolver {
    active: Option<String>,
}

impl PlayheadResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the clip resolved on the previous tick.
    pub fn active_clip_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Resolve the active clip at `t`.
    ///
    /// When no clip owns `t` but `t` is within a millisecond of a clip
    /// boundary, the previously active clip is kept for this tick.
    pub fn resolve<'a>(&mut self, clips: &'a [Clip], t: f64) -> Option<&'a Clip> {
        if let Some(clip) = find_clip_at_time(clips, t) {
            self.active = Some(clip.id.clone());
            return Some(clip);
        }

        let near_boundary = clips.iter().any(|c| {
            (t - c.start_time).abs() <= BOUNDARY_HYSTERESIS_MS
                || (t - c.end_time()).abs() <= BOUNDARY_HYSTERESIS_MS
        });
        let retained = self
            .active
            .as_deref()
            .filter(|_| near_boundary)
            .and_then(|id| clips.iter().find(|c| c.id == id));

        if retained.is_none() {
            if let Some(previous) = self.active.take() {
                tracing::trace!(clip_id = %previous, t, "Playhead left clip");
            }
        }
        retained
    }

    pub fn reset(&mut self) {
        self.active = None;
    }
}
