//! Multi-pipeline engine
//!
//! Routes update events to per-pipeline provenance state. Each pipeline
//! has exactly one logical writer: its state sits behind a mutex, so
//! events for one pipeline apply strictly sequentially while different
//! pipelines proceed independently.
//!
//! Lock poisoning cannot leave state half-applied: every handler stages
//! its validation before the first write and the writes themselves are
//! infallible, so a poisoned lock is recovered rather than propagated.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::builder::{EngineConfig, PipelineProvenance};
use crate::errors::{ApplyOutcome, ApplyResult};
use crate::event::{EventLogReader, UpdateEvent};
use crate::observability::{Event, Logger, Severity};

/// Outcome of replaying an event log against one pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Events applied to the graph
    pub applied: usize,
    /// Duplicate `uniqueID`s ignored
    pub duplicates: usize,
}

/// The provenance construction engine.
///
/// Owns one [`PipelineProvenance`] per pipeline id, created lazily on
/// first use with the engine's configuration.
pub struct ProvenanceEngine {
    config: EngineConfig,
    pipelines: RwLock<HashMap<u64, Arc<Mutex<PipelineProvenance>>>>,
}

impl ProvenanceEngine {
    /// Creates an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given configuration, applied to every
    /// pipeline it creates.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            pipelines: RwLock::new(HashMap::new()),
        }
    }

    /// Applies one update event to the given pipeline, creating its state
    /// on first use.
    pub fn apply(&self, pipeline_id: u64, event: &UpdateEvent) -> ApplyResult<ApplyOutcome> {
        let pipeline = self.pipeline(pipeline_id);
        let mut state = lock(&pipeline);
        state.apply(event)
    }

    /// Folds the given pipeline's live structure into a new version and
    /// returns its number.
    pub fn fold_version(&self, pipeline_id: u64) -> u64 {
        let pipeline = self.pipeline(pipeline_id);
        let mut state = lock(&pipeline);
        state.fold_version()
    }

    /// Replays an event log file against the given pipeline.
    ///
    /// Replay is strict: the first malformed line or rejected event aborts
    /// with its error, leaving everything applied so far in place.
    /// Duplicates are ignored as always, so replaying the same log twice
    /// is a no-op the second time.
    pub fn replay<P: AsRef<Path>>(
        &self,
        pipeline_id: u64,
        path: P,
    ) -> ApplyResult<ReplayStats> {
        let pipeline = self.pipeline(pipeline_id);
        let mut state = lock(&pipeline);

        if self.config.logging {
            Logger::log(
                Severity::Info,
                Event::ReplayStart.as_str(),
                &[
                    ("path", &path.as_ref().display().to_string()),
                    ("pipeline_id", &pipeline_id.to_string()),
                ],
            );
        }

        let mut reader = EventLogReader::open(path.as_ref())?;
        let mut stats = ReplayStats::default();
        while let Some(event) = reader.next_event()? {
            match state.apply(&event)? {
                ApplyOutcome::Applied => stats.applied += 1,
                ApplyOutcome::DuplicateIgnored => stats.duplicates += 1,
            }
        }

        if self.config.logging {
            Logger::log(
                Severity::Info,
                Event::ReplayComplete.as_str(),
                &[
                    ("applied", &stats.applied.to_string()),
                    ("duplicates", &stats.duplicates.to_string()),
                    ("pipeline_id", &pipeline_id.to_string()),
                ],
            );
        }

        Ok(stats)
    }

    /// Runs a read-only query against the given pipeline's state.
    ///
    /// Returns `None` if the pipeline has never seen an event.
    pub fn with_pipeline<R>(
        &self,
        pipeline_id: u64,
        f: impl FnOnce(&PipelineProvenance) -> R,
    ) -> Option<R> {
        let pipeline = {
            let pipelines = read_lock(&self.pipelines);
            pipelines.get(&pipeline_id).cloned()
        }?;
        let state = lock(&pipeline);
        Some(f(&state))
    }

    /// Returns the ids of all known pipelines, sorted.
    pub fn pipeline_ids(&self) -> Vec<u64> {
        let pipelines = read_lock(&self.pipelines);
        let mut ids: Vec<u64> = pipelines.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn pipeline(&self, pipeline_id: u64) -> Arc<Mutex<PipelineProvenance>> {
        {
            let pipelines = read_lock(&self.pipelines);
            if let Some(pipeline) = pipelines.get(&pipeline_id) {
                return Arc::clone(pipeline);
            }
        }
        let mut pipelines = write_lock(&self.pipelines);
        Arc::clone(pipelines.entry(pipeline_id).or_insert_with(|| {
            Arc::new(Mutex::new(PipelineProvenance::with_config(
                pipeline_id,
                self.config,
            )))
        }))
    }
}

impl Default for ProvenanceEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn lock(pipeline: &Mutex<PipelineProvenance>) -> MutexGuard<'_, PipelineProvenance> {
    pipeline.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
