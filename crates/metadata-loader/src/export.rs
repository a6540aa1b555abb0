//! Export assembly: the data handed to the external renderer.
//!
//! The timeline is cut into fixed-length chunks. For every clip and every
//! chunk it overlaps, the matching span of the clip's recording is sliced
//! out once, with timestamps made relative to the slice start.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;

use reelsync_processing_core::range_filter::{chunk_windows, filter_range, Rebase, TimeWindow};
use reelsync_project_model::event::TelemetryEvent;
use reelsync_project_model::project::{Clip, Project};
use reelsync_project_model::timeline::FrameLayoutItem;
use reelsync_timeline_core::frame_layout::{build_frame_layout, total_frames};
use reelsync_timeline_core::time_convert::timeline_to_source;

use crate::source::RecordingMetadata;

/// Telemetry for one clip during one export chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipChunkSlice {
    pub clip_id: String,
    pub recording_id: String,
    pub chunk_index: usize,
    /// Timeline span covered, inclusive.
    pub timeline: TimeWindow,
    /// Recording span the events came from, inclusive. Consecutive chunks
    /// of one clip tile its source range without gaps or overlap.
    pub source: TimeWindow,
    /// Events rebased to `source.start_ms`.
    pub events: Vec<TelemetryEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackLayout {
    pub track_id: String,
    pub items: Vec<FrameLayoutItem>,
    pub total_frames: u64,
}

/// Everything the renderer needs for one export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportPlan {
    pub fps: f64,
    pub chunks: Vec<TimeWindow>,
    pub tracks: Vec<TrackLayout>,
    pub slices: Vec<ClipChunkSlice>,
    /// Recordings referenced by clips but absent from the loaded metadata.
    pub missing_recordings: Vec<String>,
}

/// Build the export plan for a project from already loaded telemetry.
pub fn plan_export(
    project: &Project,
    metadata: &HashMap<String, Arc<RecordingMetadata>>,
    chunk_ms: u64,
) -> ExportPlan {
    let total_ms = project.duration().max(0.0).ceil() as u64;
    let chunks = if total_ms == 0 {
        vec![]
    } else {
        chunk_windows(0, total_ms - 1, chunk_ms)
    };

    let mut tracks = vec![];
    let mut slices = vec![];
    let mut missing = BTreeSet::new();

    for track in &project.tracks {
        let items = build_frame_layout(&track.clips, project.fps);
        tracks.push(TrackLayout {
            track_id: track.id.clone(),
            total_frames: total_frames(&items),
            items,
        });

        for clip in track.sorted_clips() {
            let Some(meta) = metadata.get(&clip.recording_id) else {
                missing.insert(clip.recording_id.clone());
                continue;
            };
            slices.extend(slice_clip(&clip, &meta.events, &chunks));
        }
    }

    tracing::debug!(
        chunks = chunks.len(),
        slices = slices.len(),
        missing = missing.len(),
        "Export plan assembled"
    );

    ExportPlan {
        fps: project.fps,
        chunks,
        tracks,
        slices,
        missing_recordings: missing.into_iter().collect(),
    }
}

fn slice_clip(
    clip: &Clip,
    events: &[TelemetryEvent],
    chunks: &[TimeWindow],
) -> Vec<ClipChunkSlice> {
    // Whole milliseconds covered by [start, end).
    let first = clip.start_time.max(0.0).ceil() as u64;
    let end = clip.end_time().max(0.0).ceil() as u64;
    if end <= first {
        return vec![];
    }
    let last = end - 1;

    // Chunk edges map to source edges with one rounding, so adjacent chunks
    // share a boundary and the clip's source range is covered exactly once.
    let source_edge = |t: u64| {
        let at = if t <= first { clip.start_time } else { t as f64 };
        timeline_to_source(clip, at).ceil() as u64
    };

    chunks
        .iter()
        .enumerate()
        .filter_map(|(chunk_index, chunk)| {
            let lo = chunk.start_ms.max(first);
            let hi = chunk.end_ms.min(last);
            if lo > hi {
                return None;
            }
            let (source_start, source_end) = (source_edge(lo), source_edge(hi + 1));
            if source_end <= source_start {
                return None;
            }
            let source = TimeWindow::new(source_start, source_end - 1);
            Some(ClipChunkSlice {
                clip_id: clip.id.clone(),
                recording_id: clip.recording_id.clone(),
                chunk_index,
                timeline: TimeWindow::new(lo, hi),
                source,
                events: filter_range(events, source, Rebase::ToWindowStart),
            })
        })
        .collect()
}
