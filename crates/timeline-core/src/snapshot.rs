//! Copy-on-write timeline state.
//!
//! Readers take an `Arc` of the current snapshot and never observe a
//! half-applied edit. Writers start a [`TimelineDraft`] from a snapshot,
//! edit the private copy, and [`TimelineStore::commit`] it atomically. A
//! commit is rejected if another commit landed since the draft was taken
//! or if the draft breaks a track invariant.

use std::sync::{Arc, PoisonError, RwLock};

use reelsync_project_model::project::{Clip, Project, ProjectError, Track};

use crate::playhead::{
    clamp_to_timeline_bounds, find_clip_at_time, track_playhead_during_clip_edit,
};
use crate::positioning::{
    find_best_auto_position, AutoPlacement, PlacementContext, PositionCheck, PositioningEngine,
};
use crate::reorder::{reorder_clips, ripple_delete, split_clip};

/// An immutable view of the timeline.
#[derive(Debug, Clone)]
pub struct TimelineSnapshot {
    pub version: u64,
    pub project: Arc<Project>,
    pub playhead_ms: f64,
}

/// Errors from draft edits.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EditError {
    #[error("Unknown clip: {0}")]
    UnknownClip(String),

    #[error("Unknown track: {0}")]
    UnknownTrack(String),

    #[error("Cannot split clip {clip_id} at {at_ms}ms")]
    InvalidSplit { clip_id: String, at_ms: f64 },

    #[error("Clip id already in use: {0}")]
    DuplicateClip(String),
}

/// Errors from [`TimelineStore::commit`].
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Draft is based on version {base}, current version is {current}")]
    VersionConflict { base: u64, current: u64 },

    #[error("Clips {first} and {second} overlap on track {track_id}")]
    Overlap {
        track_id: String,
        first: String,
        second: String,
    },

    #[error(transparent)]
    Project(#[from] ProjectError),
}

/// A private, editable copy of a snapshot.
#[derive(Debug, Clone)]
pub struct TimelineDraft {
    base_version: u64,
    project: Project,
    playhead_ms: f64,
}

impl TimelineDraft {
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn playhead_ms(&self) -> f64 {
        self.playhead_ms
    }

    pub fn set_playhead(&mut self, t: f64) {
        self.playhead_ms = clamp_to_timeline_bounds(t, self.project.duration());
    }

    fn track_of_clip_mut(&mut self, clip_id: &str) -> Result<&mut Track, EditError> {
        self.project
            .tracks
            .iter_mut()
            .find(|t| t.clip(clip_id).is_some())
            .ok_or_else(|| EditError::UnknownClip(clip_id.to_string()))
    }

    fn track_mut(&mut self, track_id: &str) -> Result<&mut Track, EditError> {
        self.project
            .track_mut(track_id)
            .ok_or_else(|| EditError::UnknownTrack(track_id.to_string()))
    }

    /// Whether the playhead currently sits on `clip_id`.
    fn playhead_on(&self, clip_id: &str) -> bool {
        self.project
            .track_of_clip(clip_id)
            .and_then(|t| find_clip_at_time(&t.clips, self.playhead_ms))
            .is_some_and(|c| c.id == clip_id)
    }

    /// Move a clip, snapping and resolving collisions on its track.
    pub fn move_clip(
        &mut self,
        clip_id: &str,
        desired_start: f64,
        engine: &PositioningEngine,
        pin_leftmost: bool,
    ) -> Result<PositionCheck, EditError> {
        let playhead = self.playhead_ms;
        let follow = self.playhead_on(clip_id);
        let track = self.track_of_clip_mut(clip_id)?;
        let before = track
            .clip(clip_id)
            .cloned()
            .ok_or_else(|| EditError::UnknownClip(clip_id.to_string()))?;

        let ctx = PlacementContext {
            exclude_id: Some(clip_id),
            playhead_ms: Some(playhead),
            pin_leftmost,
        };
        let check = engine.validate(desired_start, before.duration, &track.clips, ctx);

        let mut after = before.clone();
        after.start_time = check.position;
        if let Some(clip) = track.clip_mut(clip_id) {
            *clip = after.clone();
        }
        if follow {
            self.playhead_ms = track_playhead_during_clip_edit(playhead, &before, &after);
        }

        tracing::debug!(
            clip_id,
            from = before.start_time,
            to = check.position,
            adjusted = !check.is_valid(),
            "Moved clip"
        );
        Ok(check)
    }

    /// Change a clip's timeline duration, keeping its start.
    ///
    /// The duration is limited by the next clip on the track and the source
    /// range follows at the clip's playback rate. Returns the applied duration.
    pub fn resize_clip(&mut self, clip_id: &str, new_duration: f64) -> Result<f64, EditError> {
        let follow = self.playhead_on(clip_id);
        let track = self.track_of_clip_mut(clip_id)?;
        let before = track
            .clip(clip_id)
            .cloned()
            .ok_or_else(|| EditError::UnknownClip(clip_id.to_string()))?;

        let next_start = track
            .clips
            .iter()
            .filter(|c| c.id != clip_id && c.start_time >= before.end_time())
            .map(|c| c.start_time)
            .fold(f64::INFINITY, f64::min);
        let room = next_start - before.start_time;
        let rate = if before.playback_rate > 0.0 {
            before.playback_rate
        } else {
            1.0
        };
        let duration = if new_duration.is_finite() {
            new_duration.max(0.0).min(room)
        } else {
            before.duration
        };

        let mut after = before.clone();
        after.duration = duration;
        after.source_out = before.source_in + duration * rate;
        if let Some(clip) = track.clip_mut(clip_id) {
            *clip = after.clone();
        }
        if follow {
            self.playhead_ms = track_playhead_during_clip_edit(self.playhead_ms, &before, &after);
        }
        Ok(duration)
    }

    /// Add a clip to a track at an automatically chosen position.
    pub fn insert_clip(
        &mut self,
        track_id: &str,
        mut clip: Clip,
        strategy: AutoPlacement,
    ) -> Result<f64, EditError> {
        if self.project.clips().any(|c| c.id == clip.id) {
            return Err(EditError::DuplicateClip(clip.id));
        }
        let playhead = self.playhead_ms;
        let track = self.track_mut(track_id)?;
        clip.start_time =
            find_best_auto_position(clip.duration, &track.clips, strategy, Some(playhead));
        let position = clip.start_time;
        track.clips.push(clip);
        Ok(position)
    }

    /// Split a clip at a timeline time; the right half gets `new_id`.
    pub fn split_clip(&mut self, clip_id: &str, at_ms: f64, new_id: &str) -> Result<(), EditError> {
        if self.project.clips().any(|c| c.id == new_id) {
            return Err(EditError::DuplicateClip(new_id.to_string()));
        }
        let track = self.track_of_clip_mut(clip_id)?;
        let idx = track
            .clips
            .iter()
            .position(|c| c.id == clip_id)
            .ok_or_else(|| EditError::UnknownClip(clip_id.to_string()))?;
        let (left, right) =
            split_clip(&track.clips[idx], at_ms, new_id).ok_or_else(|| EditError::InvalidSplit {
                clip_id: clip_id.to_string(),
                at_ms,
            })?;
        track.clips[idx] = left;
        track.clips.insert(idx + 1, right);
        Ok(())
    }

    /// Remove a clip, optionally pulling later clips left to close the gap.
    pub fn delete_clip(&mut self, clip_id: &str, ripple: bool) -> Result<Clip, EditError> {
        let track = self.track_of_clip_mut(clip_id)?;
        let removed = track
            .clip(clip_id)
            .cloned()
            .ok_or_else(|| EditError::UnknownClip(clip_id.to_string()))?;
        if ripple {
            if let Some(clips) = ripple_delete(&track.clips, clip_id) {
                track.clips = clips;
            }
        } else {
            track.clips.retain(|c| c.id != clip_id);
        }
        let duration = self.project.duration();
        self.playhead_ms = clamp_to_timeline_bounds(self.playhead_ms, duration);
        Ok(removed)
    }

    /// Move a clip to `new_index` within its track and repack the track.
    pub fn reorder_clip(&mut self, clip_id: &str, new_index: usize) -> Result<(), EditError> {
        let track = self.track_of_clip_mut(clip_id)?;
        track.clips = reorder_clips(&track.clips, clip_id, new_index);
        Ok(())
    }
}

/// Holder of the current committed snapshot.
#[derive(Debug)]
pub struct TimelineStore {
    current: RwLock<Arc<TimelineSnapshot>>,
}

impl TimelineStore {
    pub fn new(project: Project) -> Self {
        Self {
            current: RwLock::new(Arc::new(TimelineSnapshot {
                version: 0,
                project: Arc::new(project),
                playhead_ms: 0.0,
            })),
        }
    }

    /// The current committed snapshot.
    pub fn snapshot(&self) -> Arc<TimelineSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Start a draft from the current snapshot.
    pub fn begin(&self) -> TimelineDraft {
        let snapshot = self.snapshot();
        TimelineDraft {
            base_version: snapshot.version,
            project: (*snapshot.project).clone(),
            playhead_ms: snapshot.playhead_ms,
        }
    }

    /// Validate a draft and publish it as the next snapshot.
    pub fn commit(&self, draft: TimelineDraft) -> Result<Arc<TimelineSnapshot>, CommitError> {
        let TimelineDraft {
            base_version,
            mut project,
            playhead_ms,
        } = draft;

        validate_tracks(&project)?;
        project.validate_references()?;

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.version != base_version {
            tracing::debug!(
                base = base_version,
                current = current.version,
                "Rejected stale timeline commit"
            );
            return Err(CommitError::VersionConflict {
                base: base_version,
                current: current.version,
            });
        }

        project.touch();
        let next = Arc::new(TimelineSnapshot {
            version: base_version + 1,
            playhead_ms: clamp_to_timeline_bounds(playhead_ms, project.duration()),
            project: Arc::new(project),
        });
        *current = Arc::clone(&next);
        tracing::debug!(version = next.version, "Committed timeline");
        Ok(next)
    }
}

/// Every track must be free of overlapping clips.
fn validate_tracks(project: &Project) -> Result<(), CommitError> {
    for track in &project.tracks {
        let clips = track.sorted_clips();
        for pair in clips.windows(2) {
            if pair[1].start_time < pair[0].end_time() {
                return Err(CommitError::Overlap {
                    track_id: track.id.clone(),
                    first: pair[0].id.clone(),
                    second: pair[1].id.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::positioning::SnapConfig;
    use reelsync_project_model::project::Recording;

    fn project() -> Project {
        let mut project = Project::new("Edit", 30.0);
        project.recordings.push(Recording::new("rec", 1920, 1080, 60_000.0));
        let mut track = Track::new("main");
        track.clips.push(Clip::new("a", "rec", 0.0, 1000.0));
        track.clips.push(Clip::new("b", "rec", 1000.0, 1000.0));
        track.clips.push(Clip::new("c", "rec", 3000.0, 500.0));
        project.tracks.push(track);
        project
    }

    fn starts(snapshot: &TimelineSnapshot) -> Vec<(String, f64)> {
        snapshot.project.tracks[0]
            .sorted_clips()
            .into_iter()
            .map(|c| (c.id, c.start_time))
            .collect()
    }

    #[test]
    fn test_readers_keep_their_snapshot() {
        let store = TimelineStore::new(project());
        let before = store.snapshot();

        let mut draft = store.begin();
        draft
            .move_clip("c", 2050.0, &PositioningEngine::default(), false)
            .unwrap();
        // Uncommitted edits are invisible.
        assert_eq!(store.snapshot().version, 0);

        let after = store.commit(draft).unwrap();
        assert_eq!(after.version, 1);
        assert_eq!(starts(&before)[2].1, 3000.0);
        assert_eq!(starts(&after)[2].1, 2000.0);
    }

    #[test]
    fn test_stale_draft_is_rejected() {
        let store = TimelineStore::new(project());
        let first = store.begin();
        let mut second = store.begin();
        second.set_playhead(500.0);

        store.commit(first).unwrap();
        let err = store.commit(second).unwrap_err();
        assert!(matches!(
            err,
            CommitError::VersionConflict {
                base: 0,
                current: 1
            }
        ));
    }

    #[test]
    fn test_overlap_rejected_at_commit() {
        let store = TimelineStore::new(project());
        let mut draft = store.begin();
        draft.project.tracks[0].clips[2].start_time = 1500.0;
        let err = store.commit(draft).unwrap_err();
        assert!(matches!(err, CommitError::Overlap { .. }));
        assert_eq!(store.snapshot().version, 0);
    }

    #[test]
    fn test_dangling_recording_rejected_at_commit() {
        let store = TimelineStore::new(project());
        let mut draft = store.begin();
        draft
            .insert_clip("main", Clip::new("d", "missing", 0.0, 100.0), AutoPlacement::End)
            .unwrap();
        let err = store.commit(draft).unwrap_err();
        assert!(matches!(
            err,
            CommitError::Project(ProjectError::MissingRecording { .. })
        ));
    }

    #[test]
    fn test_move_resolves_collision() {
        let store = TimelineStore::new(project());
        let mut draft = store.begin();
        let engine = PositioningEngine::new(SnapConfig {
            enabled: false,
            ..SnapConfig::default()
        });
        let check = draft.move_clip("c", 500.0, &engine, false).unwrap();
        assert_eq!(check.position, 2000.0);
        assert!(!check.is_valid());
        assert!(store.commit(draft).is_ok());
    }

    #[test]
    fn test_resize_keeps_playhead_progress_and_respects_neighbour() {
        let store = TimelineStore::new(project());
        let mut draft = store.begin();
        draft.set_playhead(1500.0);

        // b cannot grow past c at 3000; the playhead keeps its halfway mark.
        assert_eq!(draft.resize_clip("b", 5000.0).unwrap(), 2000.0);
        assert_eq!(draft.playhead_ms(), 2000.0);

        assert_eq!(draft.resize_clip("b", 400.0).unwrap(), 400.0);
        assert_eq!(draft.playhead_ms(), 1200.0);

        // The playhead is not on c, so resizing c leaves it alone.
        assert_eq!(draft.resize_clip("c", 100.0).unwrap(), 100.0);
        assert_eq!(draft.playhead_ms(), 1200.0);
        let b = draft.project().track("main").unwrap().clip("b").unwrap().clone();
        assert_eq!(b.source_out, 400.0);
        assert!(store.commit(draft).is_ok());
    }

    #[test]
    fn test_insert_split_delete_reorder() {
        let store = TimelineStore::new(project());
        let mut draft = store.begin();

        let at = draft
            .insert_clip("main", Clip::new("d", "rec", 0.0, 800.0), AutoPlacement::FirstGap)
            .unwrap();
        assert_eq!(at, 2000.0);
        assert_eq!(
            draft.insert_clip("main", Clip::new("d", "rec", 0.0, 1.0), AutoPlacement::End),
            Err(EditError::DuplicateClip("d".into()))
        );

        draft.split_clip("a", 400.0, "a2").unwrap();
        assert!(matches!(
            draft.split_clip("a", 900.0, "a3"),
            Err(EditError::InvalidSplit { .. })
        ));

        let removed = draft.delete_clip("b", true).unwrap();
        assert_eq!(removed.id, "b");
        draft.reorder_clip("c", 0).unwrap();
        assert_eq!(draft.reorder_clip("zzz", 0), Err(EditError::UnknownClip("zzz".into())));

        let snapshot = store.commit(draft).unwrap();
        let ids: Vec<_> = starts(&snapshot).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["c", "a", "a2", "d"]);
    }
}
