//! Per-run progress tracking over a stage's output stream.

use parking_lot::RwLock;

use super::rules::{default_rules, ProgressRule};
use super::state::{ProgressItem, ProgressState, ProgressStatus};
use crate::invoke::LineObserver;

struct TrackerInner {
    items: Vec<(String, ProgressStatus)>,
    active: bool,
}

/// Tracks per-item progress for one running stage.
///
/// The expected item list is fixed at creation; observed lines can only
/// move known items forward (`pending → in_progress → completed`).
/// Lines matching no rule, naming unknown items, or naming already
/// completed items are ignored. [`ProgressTracker::snapshot`] is safe
/// to call concurrently with observation and returns an owned copy,
/// never a live reference.
pub struct ProgressTracker {
    inner: RwLock<TrackerInner>,
    rules: Vec<ProgressRule>,
}

impl ProgressTracker {
    /// Creates a tracker with the default structured-event rules.
    #[must_use]
    pub fn new(expected: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::with_rules(expected, default_rules())
    }

    /// Creates a tracker with custom rules.
    #[must_use]
    pub fn with_rules(
        expected: impl IntoIterator<Item = impl Into<String>>,
        rules: Vec<ProgressRule>,
    ) -> Self {
        Self {
            inner: RwLock::new(TrackerInner {
                items: expected
                    .into_iter()
                    .map(|key| (key.into(), ProgressStatus::Pending))
                    .collect(),
                active: true,
            }),
            rules,
        }
    }

    /// Applies the rule set to one output line. No-op when nothing
    /// matches.
    pub fn observe(&self, line: &str) {
        for rule in &self.rules {
            if let Some(key) = rule.key_from(line) {
                self.advance(&key, rule.status());
                return;
            }
        }
    }

    /// Moves an item forward to `status`, if that is an advance.
    pub fn advance(&self, key: &str, status: ProgressStatus) {
        let mut inner = self.inner.write();
        if let Some(item) = inner.items.iter_mut().find(|(k, _)| k == key) {
            if status > item.1 {
                item.1 = status;
            }
        }
    }

    /// Marks the tracked stage as no longer running.
    pub fn finish(&self) {
        self.inner.write().active = false;
    }

    /// An owned snapshot of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        let inner = self.inner.read();
        let items: Vec<ProgressItem> = inner
            .items
            .iter()
            .map(|(key, status)| ProgressItem {
                key: key.clone(),
                status: *status,
            })
            .collect();
        let completed = items
            .iter()
            .filter(|i| i.status == ProgressStatus::Completed)
            .count();
        ProgressState {
            active: inner.active,
            total: items.len(),
            completed,
            items,
        }
    }
}

impl LineObserver for ProgressTracker {
    fn observe_line(&self, line: &str) {
        self.observe(line);
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("ProgressTracker")
            .field("active", &snapshot.active)
            .field("completed", &snapshot.completed)
            .field("total", &snapshot.total)
            .finish()
    }
}
