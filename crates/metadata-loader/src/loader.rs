//! Concurrent, cached telemetry loading.
//!
//! Every load runs as its own tokio task. A second request for a recording
//! that is already loading joins the running task instead of reading the
//! disk again. When the task settles its in-flight entry is removed, so a
//! failure is never reused and the next request retries. A load that was
//! invalidated while running settles without touching the cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;

use reelsync_project_model::project::{Project, Recording};

use crate::error::LoaderError;
use crate::source::{MetadataSource, RecordingMetadata};

/// Outcome of one load, cloneable so every joined caller gets it.
pub type LoadResult = Result<Arc<RecordingMetadata>, Arc<LoaderError>>;

type InFlight = Shared<BoxFuture<'static, LoadResult>>;

/// A running load, tagged with the generation that started it.
struct Running {
    generation: u64,
    load: InFlight,
}

#[derive(Default)]
struct LoaderState {
    cache: HashMap<String, Arc<RecordingMetadata>>,
    in_flight: HashMap<String, Running>,
    next_generation: u64,
}

impl LoaderState {
    /// Whether `generation` is still the registered load for `recording_id`.
    fn owns(&self, recording_id: &str, generation: u64) -> bool {
        self.in_flight
            .get(recording_id)
            .is_some_and(|running| running.generation == generation)
    }
}

struct Inner {
    source: Arc<dyn MetadataSource>,
    state: Mutex<LoaderState>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Session-owned telemetry loader.
///
/// Cloning is cheap and every clone shares the same cache.
#[derive(Clone)]
pub struct ParallelMetadataLoader {
    inner: Arc<Inner>,
}

impl ParallelMetadataLoader {
    pub fn new(source: Arc<dyn MetadataSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(LoaderState::default()),
            }),
        }
    }

    /// Load one recording's telemetry.
    ///
    /// A cached result is returned only if the recording's fingerprint is
    /// unchanged; otherwise the entry is evicted and reloaded. If the
    /// telemetry can no longer be read the entry is evicted and the error
    /// returned.
    pub async fn load(&self, recording: &Recording) -> LoadResult {
        let cached = self.inner.state().cache.get(&recording.id).cloned();
        if let Some(meta) = cached {
            match self.inner.source.fingerprint(recording).await {
                Ok(current) if current == meta.fingerprint => return Ok(meta),
                Ok(_) => {
                    tracing::debug!(
                        recording_id = %recording.id,
                        "Telemetry changed on disk, reloading"
                    );
                    self.evict(&recording.id, &meta);
                }
                Err(e) => {
                    tracing::warn!(
                        recording_id = %recording.id,
                        error = %e,
                        "Cached telemetry is no longer readable"
                    );
                    self.evict(&recording.id, &meta);
                    return Err(Arc::new(e));
                }
            }
        }

        self.join_or_start(recording).await
    }

    /// Load several recordings concurrently. Failures are logged and left
    /// out of the result.
    pub async fn load_many(
        &self,
        recordings: &[Recording],
    ) -> HashMap<String, Arc<RecordingMetadata>> {
        let results = join_all(recordings.iter().map(|r| self.load(r))).await;

        recordings
            .iter()
            .zip(results)
            .filter_map(|(recording, result)| match result {
                Ok(meta) => Some((recording.id.clone(), meta)),
                Err(e) => {
                    tracing::warn!(
                        recording_id = %recording.id,
                        error = %e,
                        "Failed to load telemetry, skipping recording"
                    );
                    None
                }
            })
            .collect()
    }

    /// Load every recording referenced by the project's clips.
    pub async fn load_project(
        &self,
        project: &Project,
    ) -> HashMap<String, Arc<RecordingMetadata>> {
        let mut recordings = vec![];
        for id in project.referenced_recording_ids() {
            match project.recording(&id) {
                Some(recording) => recordings.push(recording.clone()),
                None => tracing::warn!(
                    recording_id = %id,
                    error = %LoaderError::UnknownRecording(id.clone()),
                    "Failed to load telemetry, skipping recording"
                ),
            }
        }

        let loaded = self.load_many(&recordings).await;
        tracing::info!(
            requested = recordings.len(),
            loaded = loaded.len(),
            "Project telemetry loaded"
        );
        loaded
    }

    /// Start loading in the background. A later [`load`](Self::load) joins
    /// the running task or hits the cache.
    pub fn preload(&self, recordings: &[Recording]) {
        for recording in recordings {
            if self.is_cached(&recording.id) {
                continue;
            }
            let _ = self.join_or_start(recording);
        }
    }

    /// Drop a recording's cached telemetry and forget any running load.
    ///
    /// A forgotten load still answers the callers already joined to it, but
    /// its result is not cached.
    pub fn invalidate(&self, recording_id: &str) -> bool {
        let mut state = self.inner.state();
        let cached = state.cache.remove(recording_id).is_some();
        let running = state.in_flight.remove(recording_id).is_some();
        cached || running
    }

    pub fn clear(&self) {
        let mut state = self.inner.state();
        state.cache.clear();
        state.in_flight.clear();
    }

    pub fn is_cached(&self, recording_id: &str) -> bool {
        self.inner.state().cache.contains_key(recording_id)
    }

    /// Ids with cached telemetry, sorted.
    pub fn cached_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.state().cache.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Remove `meta` from the cache unless a newer load already replaced it.
    fn evict(&self, recording_id: &str, meta: &Arc<RecordingMetadata>) {
        let mut state = self.inner.state();
        if state
            .cache
            .get(recording_id)
            .is_some_and(|current| Arc::ptr_eq(current, meta))
        {
            state.cache.remove(recording_id);
        }
    }

    /// The running load for `recording`, starting one if there is none.
    fn join_or_start(&self, recording: &Recording) -> InFlight {
        let mut state = self.inner.state();
        if let Some(running) = state.in_flight.get(&recording.id) {
            tracing::trace!(recording_id = %recording.id, "Joining in-flight load");
            return running.load.clone();
        }

        let generation = state.next_generation;
        state.next_generation += 1;

        let inner = Arc::clone(&self.inner);
        let owned = recording.clone();
        let task = tokio::spawn(async move {
            let result = inner
                .source
                .load(&owned)
                .await
                .map(Arc::new)
                .map_err(Arc::new);

            let mut state = inner.state();
            if !state.owns(&owned.id, generation) {
                tracing::debug!(recording_id = %owned.id, "Discarding invalidated load");
                return result;
            }
            state.in_flight.remove(&owned.id);
            if let Ok(meta) = &result {
                state.cache.insert(owned.id.clone(), Arc::clone(meta));
            }
            result
        });

        let recording_id = recording.id.clone();
        let joined = async move {
            task.await.unwrap_or_else(|e| {
                Err(Arc::new(LoaderError::Task {
                    recording_id,
                    message: e.to_string(),
                }))
            })
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            recording.id.clone(),
            Running {
                generation,
                load: joined.clone(),
            },
        );
        joined
    }
}
