//! Progress state snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-item progress status. Ordered: transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Not started.
    Pending,
    /// Work observed, not finished.
    InProgress,
    /// Finished.
    Completed,
}

impl Default for ProgressStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// One tracked item in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressItem {
    /// The item key (e.g. a service name).
    pub key: String,
    /// Current status.
    pub status: ProgressStatus,
}

/// An immutable snapshot of a run's progress, safe to hand to pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Whether the tracked stage is still running.
    pub active: bool,
    /// Number of expected items.
    pub total: usize,
    /// Number of completed items; never exceeds `total`.
    pub completed: usize,
    /// Per-item statuses, in expected-list order.
    pub items: Vec<ProgressItem>,
}
