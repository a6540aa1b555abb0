//! Loader and export against real project files on disk.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reelsync_metadata_loader::{
    plan_export, FsMetadataSource, LoaderError, ParallelMetadataLoader,
};
use reelsync_project_model::event::{serialize_events, TelemetryEvent, TelemetryHeader};
use reelsync_project_model::project::{Clip, Project, Recording, TelemetryChunkRef, Track};

fn header() -> TelemetryHeader {
    TelemetryHeader {
        schema_version: "1".into(),
        screen_width: 1920,
        screen_height: 1080,
        sample_rate_hz: 100,
    }
}

fn write_events(path: &Path, events: &[TelemetryEvent]) {
    let h = header();
    std::fs::write(path, serialize_events(Some(&h), events).unwrap()).unwrap();
}

fn pointer_samples(from_ms: u64, to_ms: u64, step_ms: u64) -> Vec<TelemetryEvent> {
    (from_ms..to_ms)
        .step_by(step_ms as usize)
        .map(|t| TelemetryEvent::mouse(t, 100.0, 100.0))
        .collect()
}

/// A project with one chunked recording, saved under `dir`.
fn write_project(dir: &Path) -> Project {
    std::fs::create_dir_all(dir.join("meta")).unwrap();
    write_events(&dir.join("meta/rec-0.jsonl"), &pointer_samples(0, 2000, 10));
    write_events(&dir.join("meta/rec-1.jsonl"), &pointer_samples(2000, 4000, 10));

    let mut recording = Recording::new("rec", 1920, 1080, 4000.0);
    recording.telemetry_chunks = vec![
        TelemetryChunkRef {
            path: "meta/rec-0.jsonl".into(),
            start_ms: 0,
            end_ms: 1999,
        },
        TelemetryChunkRef {
            path: "meta/rec-1.jsonl".into(),
            start_ms: 2000,
            end_ms: 3999,
        },
    ];

    let mut project = Project::new("session", 30.0);
    project.recordings.push(recording);
    let mut track = Track::new("main");
    track
        .clips
        .push(Clip::new("intro", "rec", 0.0, 1500.0).with_source(500.0, 2000.0));
    track
        .clips
        .push(Clip::new("outro", "rec", 1500.0, 1500.0).with_source(2500.0, 4000.0));
    project.tracks.push(track);

    project.save(dir.join("project.json")).unwrap();
    project
}

#[tokio::test]
async fn test_project_round_trip_and_export() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let project = Project::load(dir.path().join("project.json")).unwrap();
    let loader =
        ParallelMetadataLoader::new(Arc::new(FsMetadataSource::with_base_dir(dir.path())));
    let metadata = loader.load_project(&project).await;
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata["rec"].events.len(), 400);
    assert_eq!(metadata["rec"].header, Some(header()));

    let plan = plan_export(&project, &metadata, 1000);
    assert_eq!(plan.chunks.len(), 3);
    assert!(plan.missing_recordings.is_empty());

    // Every slice's events sit inside its own source window once rebased.
    for slice in &plan.slices {
        let span = slice.source.end_ms - slice.source.start_ms;
        assert!(slice.events.iter().all(|e| e.timestamp_ms <= span));
        assert!(!slice.events.is_empty());
    }

    // intro covers timeline [0, 1500) from source [500, 2000).
    let first = &plan.slices[0];
    assert_eq!(first.clip_id, "intro");
    assert_eq!(first.source.start_ms, 500);
    assert_eq!(first.events.len(), 100);
}

#[tokio::test]
async fn test_rewritten_chunk_is_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let project = write_project(dir.path());
    let recording = project.recording("rec").unwrap().clone();
    let loader =
        ParallelMetadataLoader::new(Arc::new(FsMetadataSource::with_base_dir(dir.path())));

    let before = loader.load(&recording).await.unwrap();
    assert_eq!(before.events.len(), 400);

    // Coarse mtime resolution on some filesystems; the length change alone
    // is enough to alter the fingerprint.
    tokio::time::sleep(Duration::from_millis(20)).await;
    write_events(&dir.path().join("meta/rec-1.jsonl"), &pointer_samples(2000, 4000, 20));

    let after = loader.load(&recording).await.unwrap();
    assert_eq!(after.events.len(), 300);
    assert_ne!(before.fingerprint, after.fingerprint);
}

#[tokio::test]
async fn test_deleted_chunk_fails_and_evicts() {
    let dir = tempfile::tempdir().unwrap();
    let project = write_project(dir.path());
    let recording = project.recording("rec").unwrap().clone();
    let loader =
        ParallelMetadataLoader::new(Arc::new(FsMetadataSource::with_base_dir(dir.path())));

    loader.load(&recording).await.unwrap();
    assert!(loader.is_cached("rec"));

    std::fs::remove_file(dir.path().join("meta/rec-0.jsonl")).unwrap();
    let err = loader.load(&recording).await.unwrap_err();
    assert!(matches!(err.as_ref(), LoaderError::Io { .. }));
    assert!(err.is_not_found());
    assert!(!loader.is_cached("rec"));

    // The project still exports, reporting what could not be loaded.
    let metadata = loader.load_project(&project).await;
    let plan = plan_export(&project, &metadata, 1000);
    assert!(plan.slices.is_empty());
    assert_eq!(plan.missing_recordings, vec!["rec".to_string()]);
}
