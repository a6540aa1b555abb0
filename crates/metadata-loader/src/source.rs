//! Where recording telemetry comes from.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;

use reelsync_project_model::event::{
    enforce_strict_order, is_strictly_ordered, parse_telemetry_file, TelemetryEvent,
    TelemetryHeader,
};
use reelsync_project_model::project::Recording;

use crate::error::LoaderError;

/// Identity of the underlying telemetry at load time.
///
/// A cached entry is reused only while the current fingerprint still
/// matches the one it was loaded with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fingerprint(Vec<ChunkStamp>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStamp {
    /// A telemetry chunk file.
    File {
        len: u64,
        modified: Option<SystemTime>,
    },
    /// Telemetry embedded in the project.
    Inline { events: usize, last_ms: Option<u64> },
}

impl Fingerprint {
    pub fn new(stamps: Vec<ChunkStamp>) -> Self {
        Self(stamps)
    }

    pub fn inline(events: &[TelemetryEvent]) -> Self {
        Self(vec![ChunkStamp::Inline {
            events: events.len(),
            last_ms: events.last().map(|e| e.timestamp_ms),
        }])
    }

    pub fn stamps(&self) -> &[ChunkStamp] {
        &self.0
    }
}

/// One recording's telemetry, fully loaded and strictly ordered.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingMetadata {
    pub recording_id: String,
    pub header: Option<TelemetryHeader>,
    pub events: Vec<TelemetryEvent>,
    pub fingerprint: Fingerprint,
}

/// Loads telemetry for a recording.
#[async_trait]
pub trait MetadataSource: Send + Sync + 'static {
    /// Read the recording's full telemetry stream.
    async fn load(&self, recording: &Recording) -> Result<RecordingMetadata, LoaderError>;

    /// Cheap identity check of the recording's telemetry, without reading it.
    async fn fingerprint(&self, recording: &Recording) -> Result<Fingerprint, LoaderError>;
}

/// Reads JSONL telemetry chunks from disk.
///
/// Relative chunk paths resolve against `base_dir` (normally the project
/// directory). Recordings that carry inline telemetry never touch the disk.
#[derive(Debug, Clone, Default)]
pub struct FsMetadataSource {
    base_dir: Option<PathBuf>,
}

impl FsMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn chunk_paths(&self, recording: &Recording) -> Vec<PathBuf> {
        let mut chunks = recording.telemetry_chunks.clone();
        chunks.sort_by_key(|c| c.start_ms);
        chunks.iter().map(|c| self.resolve(&c.path)).collect()
    }
}

#[async_trait]
impl MetadataSource for FsMetadataSource {
    async fn load(&self, recording: &Recording) -> Result<RecordingMetadata, LoaderError> {
        if let Some(inline) = &recording.telemetry {
            let fingerprint = Fingerprint::inline(inline);
            let mut events = inline.clone();
            normalize_order(&recording.id, &mut events);
            return Ok(RecordingMetadata {
                recording_id: recording.id.clone(),
                header: None,
                events,
                fingerprint,
            });
        }

        let paths = self.chunk_paths(recording);
        let fingerprint = self.fingerprint(recording).await?;

        let mut header = None;
        let mut events = vec![];
        for path in &paths {
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LoaderError::io(path, e))?;
            let (chunk_header, chunk_events) =
                parse_telemetry_file(&content).map_err(|e| LoaderError::Parse {
                    path: path.clone(),
                    source: e,
                })?;
            header = header.or(chunk_header);
            events.extend(chunk_events);
        }
        normalize_order(&recording.id, &mut events);

        tracing::debug!(
            recording_id = %recording.id,
            chunks = paths.len(),
            events = events.len(),
            "Loaded telemetry"
        );

        Ok(RecordingMetadata {
            recording_id: recording.id.clone(),
            header,
            events,
            fingerprint,
        })
    }

    async fn fingerprint(&self, recording: &Recording) -> Result<Fingerprint, LoaderError> {
        if let Some(events) = &recording.telemetry {
            return Ok(Fingerprint::inline(events));
        }

        let mut stamps = vec![];
        for path in self.chunk_paths(recording) {
            let meta = tokio::fs::metadata(&path)
                .await
                .map_err(|e| LoaderError::io(&path, e))?;
            stamps.push(ChunkStamp::File {
                len: meta.len(),
                modified: meta.modified().ok(),
            });
        }
        Ok(Fingerprint::new(stamps))
    }
}

/// Restore strictly ascending timestamps if a producer broke the invariant.
fn normalize_order(recording_id: &str, events: &mut [TelemetryEvent]) {
    if is_strictly_ordered(events) {
        return;
    }
    let bumped = enforce_strict_order(events);
    tracing::warn!(
        recording_id,
        bumped,
        "Telemetry was not strictly ordered; timestamps adjusted"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelsync_project_model::event::serialize_events;
    use reelsync_project_model::project::TelemetryChunkRef;

    fn header() -> TelemetryHeader {
        TelemetryHeader {
            schema_version: "1".into(),
            screen_width: 1920,
            screen_height: 1080,
            sample_rate_hz: 60,
        }
    }

    fn write_chunk(dir: &Path, name: &str, with_header: bool, events: &[TelemetryEvent]) {
        let h = header();
        let content = serialize_events(with_header.then_some(&h), events).unwrap();
        std::fs::write(dir.join(name), content).unwrap();
    }

    fn chunked_recording() -> Recording {
        let mut recording = Recording::new("rec", 1920, 1080, 4000.0);
        // Listed out of order on purpose.
        recording.telemetry_chunks = vec![
            TelemetryChunkRef {
                path: "meta/part-1.jsonl".into(),
                start_ms: 2000,
                end_ms: 3999,
            },
            TelemetryChunkRef {
                path: "meta/part-0.jsonl".into(),
                start_ms: 0,
                end_ms: 1999,
            },
        ];
        recording
    }

    #[tokio::test]
    async fn test_chunks_load_in_time_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("meta")).unwrap();
        write_chunk(
            &dir.path().join("meta"),
            "part-0.jsonl",
            true,
            &[TelemetryEvent::mouse(0, 1.0, 1.0), TelemetryEvent::key(1500, "a")],
        );
        write_chunk(
            &dir.path().join("meta"),
            "part-1.jsonl",
            false,
            &[TelemetryEvent::mouse(2500, 2.0, 2.0)],
        );

        let source = FsMetadataSource::with_base_dir(dir.path());
        let meta = source.load(&chunked_recording()).await.unwrap();
        assert_eq!(meta.recording_id, "rec");
        assert_eq!(meta.header, Some(header()));
        let stamps: Vec<_> = meta.events.iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 1500, 2500]);
        assert_eq!(meta.fingerprint.stamps().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_chunk_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let source = FsMetadataSource::with_base_dir(dir.path());
        let err = source.load(&chunked_recording()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut recording = Recording::new("rec", 1920, 1080, 1000.0);
        recording.telemetry_chunks = vec![TelemetryChunkRef {
            path: "bad.jsonl".into(),
            start_ms: 0,
            end_ms: 999,
        }];
        std::fs::write(dir.path().join("bad.jsonl"), "{not json}\n").unwrap();

        let source = FsMetadataSource::with_base_dir(dir.path());
        let err = source.load(&recording).await.unwrap_err();
        assert!(matches!(err, LoaderError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_inline_telemetry_is_ordered() {
        let recording = Recording::new("inline", 800, 600, 1000.0).with_telemetry(vec![
            TelemetryEvent::mouse(10, 0.0, 0.0),
            TelemetryEvent::mouse(10, 1.0, 1.0),
            TelemetryEvent::mouse(5, 2.0, 2.0),
        ]);
        let meta = FsMetadataSource::new().load(&recording).await.unwrap();
        let stamps: Vec<_> = meta.events.iter().map(|e| e.timestamp_ms).collect();
        assert_eq!(stamps, vec![5, 10, 11]);
        assert_eq!(
            FsMetadataSource::new().fingerprint(&recording).await.unwrap(),
            meta.fingerprint
        );
    }
}
