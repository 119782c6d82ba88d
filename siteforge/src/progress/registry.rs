//! Run-scoped tracker registry.
//!
//! Trackers are keyed by the run id minted at pipeline start and
//! removed at pipeline end, so concurrent runs never observe each
//! other's progress.

use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::utils::new_run_id;

use super::tracker::ProgressTracker;

/// A concurrent map of run id → progress tracker.
#[derive(Debug, Default)]
pub struct ProgressRegistry {
    runs: DashMap<Uuid, Arc<ProgressTracker>>,
}

impl ProgressRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and registers a tracker for a fresh run id.
    pub fn create(
        &self,
        expected: impl IntoIterator<Item = impl Into<String>>,
    ) -> (Uuid, Arc<ProgressTracker>) {
        let run_id = new_run_id();
        let tracker = Arc::new(ProgressTracker::new(expected));
        self.runs.insert(run_id, tracker.clone());
        (run_id, tracker)
    }

    /// Registers an existing tracker under a run id.
    pub fn register(&self, run_id: Uuid, tracker: Arc<ProgressTracker>) {
        self.runs.insert(run_id, tracker);
    }

    /// Looks up the tracker for a run.
    #[must_use]
    pub fn get(&self, run_id: Uuid) -> Option<Arc<ProgressTracker>> {
        self.runs.get(&run_id).map(|entry| entry.value().clone())
    }

    /// Removes a run's tracker, marking it finished.
    pub fn remove(&self, run_id: Uuid) -> Option<Arc<ProgressTracker>> {
        let removed = self.runs.remove(&run_id).map(|(_, tracker)| tracker);
        if let Some(tracker) = &removed {
            tracker.finish();
        }
        removed
    }

    /// Number of registered runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// True when no runs are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
