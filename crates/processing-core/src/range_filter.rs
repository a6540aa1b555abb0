//! Binary-search range extraction over sorted telemetry.
//!
//! Export splits a timeline into chunks and hands each chunk the telemetry
//! that falls inside it. The stream is sorted ascending, so both window
//! edges are found in O(log n) and the slice is copied once per
//! (recording × chunk) instead of being scanned per rendered frame.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use reelsync_project_model::event::{TelemetryEvent, TimestampMs};

/// An inclusive time window `[start_ms, end_ms]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start_ms: TimestampMs,
    pub end_ms: TimestampMs,
}

impl TimeWindow {
    pub fn new(start_ms: TimestampMs, end_ms: TimestampMs) -> Self {
        Self { start_ms, end_ms }
    }

    /// An inverted window contains nothing.
    pub fn is_empty(&self) -> bool {
        self.start_ms > self.end_ms
    }

    pub fn contains(&self, t: TimestampMs) -> bool {
        t >= self.start_ms && t <= self.end_ms
    }
}

/// Whether sliced timestamps keep their recording time or are made
/// relative to the window start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebase {
    Keep,
    ToWindowStart,
}

/// Index of the first event with `timestamp >= start`.
pub fn lower_bound(events: &[TelemetryEvent], start: TimestampMs) -> usize {
    events.partition_point(|e| e.timestamp_ms < start)
}

/// One past the index of the last event with `timestamp <= end`.
pub fn upper_bound(events: &[TelemetryEvent], end: TimestampMs) -> usize {
    events.partition_point(|e| e.timestamp_ms <= end)
}

/// Index range of the events inside `window`.
pub fn range_indices(events: &[TelemetryEvent], window: TimeWindow) -> Range<usize> {
    if window.is_empty() {
        return 0..0;
    }
    let lo = lower_bound(events, window.start_ms);
    let hi = upper_bound(events, window.end_ms).max(lo);
    lo..hi
}

/// Borrow the events inside `window` without copying.
pub fn window_slice(events: &[TelemetryEvent], window: TimeWindow) -> &[TelemetryEvent] {
    &events[range_indices(events, window)]
}

/// Copy the events inside `window`, optionally rebasing timestamps.
pub fn filter_range(
    events: &[TelemetryEvent],
    window: TimeWindow,
    rebase: Rebase,
) -> Vec<TelemetryEvent> {
    let slice = window_slice(events, window);
    match rebase {
        Rebase::Keep => slice.to_vec(),
        Rebase::ToWindowStart => slice
            .iter()
            .map(|e| e.with_timestamp(e.timestamp_ms - window.start_ms))
            .collect(),
    }
}

/// Slice the stream once for each window.
pub fn slice_chunks(
    events: &[TelemetryEvent],
    windows: &[TimeWindow],
    rebase: Rebase,
) -> Vec<Vec<TelemetryEvent>> {
    windows
        .iter()
        .map(|w| filter_range(events, *w, rebase))
        .collect()
}

/// Split `[start_ms, end_ms]` into consecutive, non-overlapping inclusive
/// windows of `chunk_ms` milliseconds (the last may be shorter).
pub fn chunk_windows(start_ms: TimestampMs, end_ms: TimestampMs, chunk_ms: u64) -> Vec<TimeWindow> {
    if start_ms > end_ms || chunk_ms == 0 {
        return vec![];
    }
    let mut windows = vec![];
    let mut cursor = start_ms;
    loop {
        let last = cursor.saturating_add(chunk_ms - 1).min(end_ms);
        windows.push(TimeWindow::new(cursor, last));
        if last >= end_ms {
            break;
        }
        cursor = last + 1;
    }
    windows
}
