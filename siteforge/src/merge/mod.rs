//! Aggregate documents and partial-result merging.

mod document;
mod engine;

pub use document::{AggregateDocument, DocumentEntry, EntryKey};
pub use engine::{merge_subset, EntryFilter};
