//! Clip placement on a single track: overlap detection, magnetic snapping,
//! and automatic positioning.
//!
//! Every operation is total. Bad input produces a deterministic alternative
//! position instead of an error.

use serde::{Deserialize, Serialize};

use reelsync_project_model::project::Clip;

/// Snapping configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapConfig {
    /// Maximum distance (ms) at which an edge is pulled onto a snap point.
    pub threshold_ms: f64,
    pub enabled: bool,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            threshold_ms: 100.0,
            enabled: true,
        }
    }
}

/// Which clip edge was snapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapEdge {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// Resulting clip start.
    pub position: f64,
    /// The snap point and edge that matched, if any.
    pub snapped: Option<(f64, SnapEdge)>,
}

/// Why a requested position was replaced by an alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum Adjustment {
    /// Negative or non-finite start moved to 0.
    ClampedToZero,
    /// Start moved to the pinned leftmost clip.
    LeftmostFloor { floor: f64 },
    /// Start advanced past the clips it collided with.
    Overlap { conflicts: Vec<String> },
}

/// Result of [`validate_position`].
#[derive(Debug, Clone, PartialEq)]
pub struct PositionCheck {
    pub position: f64,
    pub snapped: Option<(f64, SnapEdge)>,
    /// Last corrective step applied, `None` when the (snapped) request stood.
    pub adjustment: Option<Adjustment>,
}

impl PositionCheck {
    pub fn is_valid(&self) -> bool {
        self.adjustment.is_none()
    }
}

/// Extra context for [`validate_position`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlacementContext<'a> {
    /// Clip being moved; excluded from collision and snap checks.
    pub exclude_id: Option<&'a str>,
    pub playhead_ms: Option<f64>,
    /// Keep the current leftmost clip anchored: nothing may start before it.
    pub pin_leftmost: bool,
}

/// Automatic placement strategy for new clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AutoPlacement {
    #[default]
    End,
    FirstGap,
    AfterPlayhead,
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn others<'a>(clips: &'a [Clip], exclude_id: Option<&'a str>) -> impl Iterator<Item = &'a Clip> {
    clips
        .iter()
        .filter(move |c| exclude_id.map_or(true, |id| c.id != id))
}

/// Clips whose half-open range intersects `[start, start + duration)`.
pub fn check_overlap<'a>(
    start: f64,
    duration: f64,
    clips: &'a [Clip],
    exclude_id: Option<&str>,
) -> Vec<&'a Clip> {
    let end = start + duration.max(0.0);
    clips
        .iter()
        .filter(|c| exclude_id.map_or(true, |id| c.id != id))
        .filter(|c| start < c.end_time() && c.start_time < end)
        .collect()
}

/// First position at or after `desired_start` (and never negative) where a
/// clip of `duration` collides with nothing.
pub fn find_next_valid_position(
    desired_start: f64,
    duration: f64,
    clips: &[Clip],
    exclude_id: Option<&str>,
) -> f64 {
    let duration = sanitize(duration).max(0.0);
    let mut sorted: Vec<&Clip> = others(clips, exclude_id).collect();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut position = sanitize(desired_start).max(0.0);
    loop {
        let mut moved = false;
        for clip in &sorted {
            if position < clip.end_time() && clip.start_time < position + duration {
                position = clip.end_time();
                moved = true;
            }
        }
        if !moved {
            return position;
        }
    }
}

/// Candidate snap points: 0, every clip edge, and the playhead. Sorted, deduplicated.
pub fn get_snap_points(
    clips: &[Clip],
    playhead_ms: Option<f64>,
    exclude_id: Option<&str>,
) -> Vec<f64> {
    let mut points = vec![0.0];
    for clip in others(clips, exclude_id) {
        points.push(clip.start_time);
        points.push(clip.end_time());
    }
    points.extend(playhead_ms);
    points.retain(|p| p.is_finite());
    points.sort_by(f64::total_cmp);
    points.dedup();
    points
}

/// Nearest point within `threshold_ms` of `time`; equidistant points resolve
/// to the earliest.
pub fn find_nearest_snap_point(time: f64, points: &[f64], threshold_ms: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for &point in points {
        let distance = (point - time).abs();
        if distance > threshold_ms {
            continue;
        }
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((point, distance));
        }
    }
    best.map(|(point, _)| point)
}

/// Snap the start edge, or failing that the end edge, of a moving clip.
pub fn apply_magnetic_snap(
    start: f64,
    duration: f64,
    points: &[f64],
    threshold_ms: f64,
) -> SnapResult {
    if let Some(point) = find_nearest_snap_point(start, points, threshold_ms) {
        return SnapResult {
            position: point,
            snapped: Some((point, SnapEdge::Start)),
        };
    }
    if let Some(point) = find_nearest_snap_point(start + duration, points, threshold_ms) {
        return SnapResult {
            position: point - duration,
            snapped: Some((point, SnapEdge::End)),
        };
    }
    SnapResult {
        position: start,
        snapped: None,
    }
}

/// Validate a requested start: snap, apply the leftmost floor, then resolve
/// overlaps. The returned position is always collision-free and non-negative.
pub fn validate_position(
    desired_start: f64,
    duration: f64,
    clips: &[Clip],
    ctx: PlacementContext<'_>,
    snap: &SnapConfig,
) -> PositionCheck {
    let duration = sanitize(duration).max(0.0);
    let mut adjustment = None;

    let mut position = if desired_start.is_finite() {
        desired_start
    } else {
        adjustment = Some(Adjustment::ClampedToZero);
        0.0
    };

    let mut snapped = None;
    if snap.enabled {
        let points = get_snap_points(clips, ctx.playhead_ms, ctx.exclude_id);
        let result = apply_magnetic_snap(position, duration, &points, snap.threshold_ms);
        position = result.position;
        snapped = result.snapped;
    }

    if position < 0.0 {
        position = 0.0;
        adjustment = Some(Adjustment::ClampedToZero);
    }

    if ctx.pin_leftmost {
        let leftmost = others(clips, ctx.exclude_id)
            .map(|c| c.start_time)
            .fold(f64::INFINITY, f64::min);
        let moving_is_leftmost = ctx
            .exclude_id
            .and_then(|id| clips.iter().find(|c| c.id == id))
            .is_some_and(|c| c.start_time <= leftmost);
        if leftmost.is_finite() && !moving_is_leftmost && position < leftmost {
            position = leftmost;
            adjustment = Some(Adjustment::LeftmostFloor { floor: leftmost });
        }
    }

    let conflicts: Vec<String> = check_overlap(position, duration, clips, ctx.exclude_id)
        .into_iter()
        .map(|c| c.id.clone())
        .collect();
    if !conflicts.is_empty() {
        position = find_next_valid_position(position, duration, clips, ctx.exclude_id);
        adjustment = Some(Adjustment::Overlap { conflicts });
    }

    PositionCheck {
        position,
        snapped,
        adjustment,
    }
}

/// Where a new clip of `duration` should go.
///
/// `AfterPlayhead` without a playhead falls back to `End`.
pub fn find_best_auto_position(
    duration: f64,
    clips: &[Clip],
    strategy: AutoPlacement,
    playhead_ms: Option<f64>,
) -> f64 {
    let duration = sanitize(duration).max(0.0);
    let end = clips.iter().map(Clip::end_time).fold(0.0_f64, f64::max);

    match (strategy, playhead_ms) {
        (AutoPlacement::End, _) | (AutoPlacement::AfterPlayhead, None) => end,
        (AutoPlacement::AfterPlayhead, Some(playhead)) => {
            find_next_valid_position(playhead, duration, clips, None)
        }
        (AutoPlacement::FirstGap, _) => {
            let mut sorted: Vec<&Clip> = clips.iter().collect();
            sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
            let mut cursor = 0.0_f64;
            for clip in sorted {
                if clip.start_time - cursor >= duration {
                    return cursor;
                }
                cursor = cursor.max(clip.end_time());
            }
            cursor
        }
    }
}

/// Positioning with a fixed snap configuration.
#[derive(Debug, Clone, Default)]
pub struct PositioningEngine {
    config: SnapConfig,
}

impl PositioningEngine {
    pub fn new(config: SnapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SnapConfig {
        &self.config
    }

    pub fn validate(
        &self,
        desired_start: f64,
        duration: f64,
        clips: &[Clip],
        ctx: PlacementContext<'_>,
    ) -> PositionCheck {
        validate_position(desired_start, duration, clips, ctx, &self.config)
    }

    pub fn auto_position(
        &self,
        duration: f64,
        clips: &[Clip],
        strategy: AutoPlacement,
        playhead_ms: Option<f64>,
    ) -> f64 {
        find_best_auto_position(duration, clips, strategy, playhead_ms)
    }
}
