//! Folding filtered re-runs back into the full document.
//!
//! Re-running one costly stage entry (say, regenerating a single
//! service's blocks) produces a single-entry subset document. The merge
//! engine replaces the matching entry of the previously-computed full
//! document with it, leaving every other entry and category untouched.
//! Merging is replace-only and all-or-nothing: a failed merge returns
//! the error and the full document is unchanged.

use serde::{Deserialize, Serialize};

use super::document::{AggregateDocument, EntryKey};
use crate::errors::MergeError;

/// Selects one entry of one category for a focused re-run and merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    /// The category partition.
    pub category: String,
    /// The identity key within the partition.
    pub key: EntryKey,
}

impl EntryFilter {
    /// Creates a filter.
    #[must_use]
    pub fn new(category: impl Into<String>, key: EntryKey) -> Self {
        Self {
            category: category.into(),
            key,
        }
    }
}

/// Merges a single-entry updated subset back into the full document.
///
/// The subset must contain exactly one entry, in exactly the filter's
/// category, matching the filter's key — the shape produced by
/// [`AggregateDocument::filter_subset`] followed by a stage re-run.
/// Re-merging the identical subset is idempotent.
///
/// # Errors
///
/// - [`MergeError::SubsetMismatch`] when the subset violates the
///   single-entry filtering contract.
/// - [`MergeError::Ambiguous`] when more than one subset entry matches
///   the filter key.
/// - [`MergeError::DuplicateKey`] when the full document itself holds
///   more than one entry with the filter key (invariant violation).
/// - [`MergeError::TargetNotFound`] when the full document has no
///   matching entry; a merge never inserts.
pub fn merge_subset(
    full: &AggregateDocument,
    filter: &EntryFilter,
    updated: &AggregateDocument,
) -> Result<AggregateDocument, MergeError> {
    if updated.categories.len() != 1 {
        return Err(MergeError::SubsetMismatch {
            message: format!(
                "expected exactly one category, found {}",
                updated.categories.len()
            ),
        });
    }

    let entries = updated
        .categories
        .get(&filter.category)
        .ok_or_else(|| MergeError::SubsetMismatch {
            message: format!("subset does not contain category '{}'", filter.category),
        })?;

    let matching: Vec<_> = entries.iter().filter(|e| filter.key.matches(e)).collect();
    match matching.len() {
        0 => {
            return Err(MergeError::SubsetMismatch {
                message: format!("no subset entry matches {}", filter.key),
            });
        }
        1 => {}
        count => {
            return Err(MergeError::Ambiguous {
                key: filter.key.to_string(),
                count,
            });
        }
    }
    if entries.len() != 1 {
        return Err(MergeError::SubsetMismatch {
            message: format!("expected exactly one entry, found {}", entries.len()),
        });
    }
    let replacement = matching[0];

    let full_entries =
        full.categories
            .get(&filter.category)
            .ok_or_else(|| MergeError::TargetNotFound {
                category: filter.category.clone(),
                key: filter.key.to_string(),
            })?;

    let positions: Vec<usize> = full_entries
        .iter()
        .enumerate()
        .filter(|(_, e)| filter.key.matches(e))
        .map(|(i, _)| i)
        .collect();

    let target = match positions.as_slice() {
        [] => {
            return Err(MergeError::TargetNotFound {
                category: filter.category.clone(),
                key: filter.key.to_string(),
            });
        }
        [index] => *index,
        _ => {
            return Err(MergeError::DuplicateKey {
                category: filter.category.clone(),
                key: filter.key.to_string(),
            });
        }
    };

    let mut merged = full.clone();
    if let Some(entries) = merged.categories.get_mut(&filter.category) {
        entries[target] = replacement.clone();
    }

    tracing::debug!(
        category = %filter.category,
        key = %filter.key,
        "merged updated entry into aggregate document"
    );

    Ok(merged)
}
