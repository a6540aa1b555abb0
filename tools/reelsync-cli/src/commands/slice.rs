//! Load telemetry for a project and assemble export slices.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use reelsync_common::ReelsyncError;
use reelsync_metadata_loader::{plan_export, FsMetadataSource, ParallelMetadataLoader};

#[derive(Serialize)]
struct SliceSummary<'a> {
    clip_id: &'a str,
    chunk_index: usize,
    timeline_start_ms: u64,
    timeline_end_ms: u64,
    events: usize,
}

pub async fn run(path: PathBuf, chunk_ms: u64, summary: bool) -> anyhow::Result<()> {
    if chunk_ms == 0 {
        return Err(ReelsyncError::config("chunk length must be at least 1 ms").into());
    }
    let project = super::load_project(&path)?;

    let source = FsMetadataSource::with_base_dir(super::project_dir(&path));
    let loader = ParallelMetadataLoader::new(Arc::new(source));
    let metadata = loader.load_project(&project).await;
    let plan = plan_export(&project, &metadata, chunk_ms);

    for id in &plan.missing_recordings {
        tracing::warn!(recording_id = %id, "No telemetry for recording, its clips are not sliced");
    }

    if summary {
        let rows: Vec<_> = plan
            .slices
            .iter()
            .map(|s| SliceSummary {
                clip_id: &s.clip_id,
                chunk_index: s.chunk_index,
                timeline_start_ms: s.timeline.start_ms,
                timeline_end_ms: s.timeline.end_ms,
                events: s.events.len(),
            })
            .collect();
        return super::print_json(&rows);
    }
    super::print_json(&plan)
}
