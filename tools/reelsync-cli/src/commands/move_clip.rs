//! Move a clip through the positioning engine and commit the edit.

use std::path::PathBuf;

use serde::Serialize;

use reelsync_timeline_core::positioning::{Adjustment, SnapEdge};
use reelsync_timeline_core::{PositioningEngine, SnapConfig, TimelineStore};

#[derive(Serialize)]
struct MoveReport {
    clip_id: String,
    requested_ms: f64,
    position_ms: f64,
    snapped_to_ms: Option<f64>,
    snapped_edge: Option<SnapEdge>,
    adjustment: Option<Adjustment>,
    version: u64,
}

pub struct MoveOptions {
    pub snap: SnapConfig,
    pub pin_leftmost: bool,
    pub write: bool,
}

pub fn run(
    path: PathBuf,
    clip_id: String,
    start_ms: f64,
    options: MoveOptions,
) -> anyhow::Result<()> {
    let project = super::load_project(&path)?;
    let store = TimelineStore::new(project);
    let engine = PositioningEngine::new(options.snap);

    let mut draft = store.begin();
    let check = draft.move_clip(&clip_id, start_ms, &engine, options.pin_leftmost)?;
    let snapshot = store.commit(draft)?;

    if options.write {
        snapshot.project.save(&path)?;
        tracing::info!(path = %path.display(), "Project saved");
    }

    super::print_json(&MoveReport {
        clip_id,
        requested_ms: start_ms,
        position_ms: check.position,
        snapped_to_ms: check.snapped.map(|(point, _)| point),
        snapped_edge: check.snapped.map(|(_, edge)| edge),
        adjustment: check.adjustment,
        version: snapshot.version,
    })
}
