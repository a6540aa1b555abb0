//! Validate a project file and the telemetry it references.

use std::path::PathBuf;

use reelsync_common::ReelsyncError;
use reelsync_metadata_loader::{FsMetadataSource, MetadataSource};
use reelsync_timeline_core::TimelineStore;

pub async fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = super::load_project(&path)?;

    println!("Validating project at: {}", path.display());
    println!("  Name: {}", project.name);
    println!("  FPS: {}", project.fps);
    println!("  Recordings: {}", project.recordings.len());
    println!("  Tracks: {}", project.tracks.len());
    println!("  Duration: {:.0} ms", project.duration());

    let mut issues = vec![];

    let source = FsMetadataSource::with_base_dir(super::project_dir(&path));
    for recording in &project.recordings {
        if let Err(e) = source.fingerprint(recording).await {
            let error = ReelsyncError::loader(format!("recording {}: {e}", recording.id));
            issues.push(error.to_string());
        }
    }

    // Same checks a timeline commit enforces.
    let store = TimelineStore::new(project);
    if let Err(e) = store.commit(store.begin()) {
        issues.push(ReelsyncError::timeline(e.to_string()).to_string());
    }

    if issues.is_empty() {
        println!("\nProject is valid.");
        return Ok(());
    }

    println!("\nValidation issues:");
    for issue in &issues {
        println!("  - {issue}");
    }
    anyhow::bail!("{} issue(s) found", issues.len())
}
