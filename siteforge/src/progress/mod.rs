//! Progress tracking for long-running stages.
//!
//! A caller polls [`ProgressTracker::snapshot`] while a stage runs; the
//! tracker is fed by the invoker's line observer hook and keyed per run
//! in a [`ProgressRegistry`].

mod registry;
mod rules;
mod state;
mod tracker;

pub use registry::ProgressRegistry;
pub use rules::{default_rules, done_line, start_line, ProgressRule, EVENT_PREFIX};
pub use state::{ProgressItem, ProgressState, ProgressStatus};
pub use tracker::ProgressTracker;
