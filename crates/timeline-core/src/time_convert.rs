//! Conversions between timeline milliseconds, viewport pixels, frames, and
//! clip-relative or source time.

use serde::{Deserialize, Serialize};

use reelsync_project_model::project::Clip;
use reelsync_project_model::timeline::ZoomBlock;

/// Width of the track-label column left of the time axis.
pub const LABEL_COLUMN_PX: f64 = 120.0;

/// Mapping between timeline time and horizontal viewport position.
///
/// At zoom 1.0 the full `duration_ms` fits the area right of the label column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeScale {
    pub viewport_width_px: f64,
    pub duration_ms: f64,
    pub zoom: f64,
}

impl TimeScale {
    pub fn new(viewport_width_px: f64, duration_ms: f64, zoom: f64) -> Self {
        Self {
            viewport_width_px,
            duration_ms,
            zoom,
        }
    }

    fn track_width(&self) -> f64 {
        (self.viewport_width_px - LABEL_COLUMN_PX).max(1.0)
    }

    pub fn pixels_per_ms(&self) -> f64 {
        let zoom = if self.zoom > 0.0 { self.zoom } else { 1.0 };
        self.track_width() / self.duration_ms.max(1.0) * zoom
    }

    /// Viewport x for a timeline time, label column included.
    pub fn ms_to_px(&self, ms: f64) -> f64 {
        LABEL_COLUMN_PX + ms * self.pixels_per_ms()
    }

    /// Timeline time under a viewport x; never negative.
    pub fn px_to_ms(&self, px: f64) -> f64 {
        ((px - LABEL_COLUMN_PX) / self.pixels_per_ms()).max(0.0)
    }

    /// Zoom at which `content_ms` exactly fills the track area.
    pub fn fit_zoom(&self, content_ms: f64) -> f64 {
        self.duration_ms.max(1.0) / content_ms.max(1.0)
    }
}

/// Nearest frame index for a time. Rounds so repeated conversions do not drift.
pub fn ms_to_frame(ms: f64, fps: f64) -> u64 {
    if fps <= 0.0 || !ms.is_finite() || ms <= 0.0 {
        return 0;
    }
    (ms / 1000.0 * fps).round() as u64
}

/// Start time of a frame.
pub fn frame_to_ms(frame: u64, fps: f64) -> f64 {
    if fps <= 0.0 {
        return 0.0;
    }
    frame as f64 * 1000.0 / fps
}

/// Timeline time relative to the clip start.
pub fn to_clip_relative(clip: &Clip, timeline_ms: f64) -> f64 {
    timeline_ms - clip.start_time
}

/// Clip-relative time back on the timeline.
pub fn to_absolute(clip: &Clip, relative_ms: f64) -> f64 {
    clip.start_time + relative_ms
}

fn rate(clip: &Clip) -> f64 {
    if clip.playback_rate > 0.0 && clip.playback_rate.is_finite() {
        clip.playback_rate
    } else {
        1.0
    }
}

fn source_bounds(clip: &Clip) -> (f64, f64) {
    (
        clip.source_in.min(clip.source_out),
        clip.source_in.max(clip.source_out),
    )
}

/// Recording time shown at a timeline time, clamped to the clip's source range.
pub fn timeline_to_source(clip: &Clip, timeline_ms: f64) -> f64 {
    let (lo, hi) = source_bounds(clip);
    (clip.source_in + to_clip_relative(clip, timeline_ms) * rate(clip)).clamp(lo, hi)
}

/// Timeline time at which a recording time plays.
pub fn source_to_timeline(clip: &Clip, source_ms: f64) -> f64 {
    let (lo, hi) = source_bounds(clip);
    to_absolute(clip, (source_ms.clamp(lo, hi) - clip.source_in) / rate(clip))
}

/// Place a zoom block authored in recording time onto the timeline.
///
/// The block is trimmed to the clip's source range; `None` when it lies
/// entirely outside it.
pub fn effect_to_absolute(clip: &Clip, block: &ZoomBlock) -> Option<ZoomBlock> {
    let (lo, hi) = source_bounds(clip);
    let start = block.start_time.max(lo);
    let end = block.end_time.min(hi);
    if end <= start {
        return None;
    }

    Some(ZoomBlock {
        start_time: source_to_timeline(clip, start),
        end_time: source_to_timeline(clip, end),
        ..block.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsync_project_model::timeline::ZoomMode;

    #[test]
    fn test_pixels_per_ms_uses_track_area() {
        let scale = TimeScale::new(1120.0, 10_000.0, 1.0);
        assert!((scale.pixels_per_ms() - 0.1).abs() < 1e-12);
        assert_eq!(scale.ms_to_px(0.0), LABEL_COLUMN_PX);
        assert!((scale.ms_to_px(10_000.0) - 1120.0).abs() < 1e-9);

        let zoomed = TimeScale::new(1120.0, 10_000.0, 2.0);
        assert!((zoomed.pixels_per_ms() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_px_to_ms_inverts_and_clamps() {
        let scale = TimeScale::new(1120.0, 10_000.0, 1.0);
        assert!((scale.px_to_ms(scale.ms_to_px(4321.0)) - 4321.0).abs() < 1e-6);
        assert_eq!(scale.px_to_ms(10.0), 0.0);
    }

    #[test]
    fn test_degenerate_scale_stays_finite() {
        let scale = TimeScale::new(50.0, 0.0, 0.0);
        assert!(scale.pixels_per_ms().is_finite());
        assert!(scale.pixels_per_ms() > 0.0);
    }

    #[test]
    fn test_fit_zoom() {
        let scale = TimeScale::new(1120.0, 10_000.0, 1.0);
        let zoom = scale.fit_zoom(2500.0);
        assert_eq!(zoom, 4.0);
        let fitted = TimeScale { zoom, ..scale };
        assert!((fitted.ms_to_px(2500.0) - 1120.0).abs() < 1e-9);
    }

    #[test]
    fn test_frame_conversion_rounds() {
        assert_eq!(ms_to_frame(1000.0, 30.0), 30);
        assert_eq!(ms_to_frame(1016.0, 30.0), 30);
        assert_eq!(ms_to_frame(1017.0, 30.0), 31);
        assert_eq!(ms_to_frame(500.0, 0.0), 0);
        assert_eq!(ms_to_frame(-5.0, 30.0), 0);
        assert!((frame_to_ms(45, 30.0) - 1500.0).abs() < 1e-9);
        assert_eq!(frame_to_ms(45, -1.0), 0.0);
    }

    #[test]
    fn test_source_remapping_honours_rate() {
        let clip = Clip {
            playback_rate: 2.0,
            ..Clip::new("c", "r", 1000.0, 500.0).with_source(2000.0, 3000.0)
        };
        assert_eq!(timeline_to_source(&clip, 1000.0), 2000.0);
        assert_eq!(timeline_to_source(&clip, 1250.0), 2500.0);
        assert_eq!(timeline_to_source(&clip, 9000.0), 3000.0);
        assert_eq!(source_to_timeline(&clip, 2500.0), 1250.0);
        assert_eq!(source_to_timeline(&clip, 0.0), 1000.0);
    }

    #[test]
    fn test_relative_round_trip() {
        let clip = Clip::new("c", "r", 750.0, 1000.0);
        assert_eq!(to_clip_relative(&clip, 1000.0), 250.0);
        assert_eq!(to_absolute(&clip, 250.0), 1000.0);
    }

    #[test]
    fn test_effect_to_absolute_trims_to_source() {
        let clip = Clip::new("c", "r", 5000.0, 2000.0).with_source(1000.0, 3000.0);
        let block = ZoomBlock {
            id: "z".into(),
            start_time: 500.0,
            end_time: 2000.0,
            intro_ms: 400.0,
            outro_ms: 400.0,
            scale: 2.0,
            target_x: 0.5,
            target_y: 0.5,
            mode: ZoomMode::Auto,
        };
        let placed = effect_to_absolute(&clip, &block).unwrap();
        assert_eq!(placed.start_time, 5000.0);
        assert_eq!(placed.end_time, 6000.0);
        assert_eq!(placed.scale, 2.0);

        let outside = ZoomBlock {
            start_time: 3500.0,
            end_time: 4000.0,
            ..block
        };
        assert!(effect_to_absolute(&clip, &outside).is_none());
    }
}
