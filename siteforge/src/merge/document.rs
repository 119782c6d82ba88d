//! Keyed aggregate documents.
//!
//! An aggregate document is the full multi-entry result of one content
//! domain, e.g. every generated service page grouped by category:
//!
//! ```json
//! {
//!   "residential": [{"id": "asphalt-shingles", "name": "Asphalt Shingles", ...}],
//!   "commercial":  [{"id": "metal-roofing", "name": "Metal Roofing", ...}]
//! }
//! ```
//!
//! Entries are identified by their explicit id, or by trimmed name when
//! no id is present. Identity keys are unique within one category
//! partition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::MergeError;

/// The identity of one document entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKey {
    /// Explicit id (e.g. `metal-roofing`).
    Id(String),
    /// Trimmed name, used when an entry carries no id.
    Name(String),
}

impl EntryKey {
    /// Creates an id key.
    #[must_use]
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    /// Creates a name key; the name is trimmed.
    #[must_use]
    pub fn name(value: &str) -> Self {
        Self::Name(value.trim().to_string())
    }

    /// Whether this key addresses the given entry.
    ///
    /// An id key matches only an entry with that exact id. A name key
    /// matches by trimmed, case-sensitive name regardless of whether
    /// the entry also carries an id.
    #[must_use]
    pub fn matches(&self, entry: &DocumentEntry) -> bool {
        match self {
            Self::Id(id) => entry.id.as_deref() == Some(id),
            Self::Name(name) => entry.name.as_deref().map(str::trim) == Some(name),
        }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id '{id}'"),
            Self::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

/// One entry of an aggregate document.
///
/// Stage-specific content (blocks, icons, image paths) rides along in
/// `extra` untouched; the orchestrator only ever reads id and name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Explicit entry id, when assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// All remaining entry content, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DocumentEntry {
    /// Creates an entry with id and name.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            extra: serde_json::Map::new(),
        }
    }

    /// Adds an extra content field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// This entry's identity key: its id, or its trimmed name when no
    /// id is assigned.
    #[must_use]
    pub fn identity_key(&self) -> Option<EntryKey> {
        if let Some(id) = &self.id {
            Some(EntryKey::Id(id.clone()))
        } else {
            self.name.as_deref().map(EntryKey::name)
        }
    }
}

/// A keyed collection of entries grouped by category partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateDocument {
    /// Category name → entries, serialized as a flat JSON object.
    #[serde(flatten)]
    pub categories: BTreeMap<String, Vec<DocumentEntry>>,
}

impl AggregateDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a category with its entries.
    #[must_use]
    pub fn with_category(
        mut self,
        category: impl Into<String>,
        entries: Vec<DocumentEntry>,
    ) -> Self {
        self.categories.insert(category.into(), entries);
        self
    }

    /// The entries of one category.
    #[must_use]
    pub fn category(&self, name: &str) -> Option<&[DocumentEntry]> {
        self.categories.get(name).map(Vec::as_slice)
    }

    /// Total entry count across categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// True when no category has entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds the narrowed copy sent to a stage for a focused re-run:
    /// exactly the selected entry, in exactly the selected category.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::TargetNotFound`] when no entry matches.
    pub fn filter_subset(
        &self,
        category: &str,
        key: &EntryKey,
    ) -> Result<AggregateDocument, MergeError> {
        let entry = self
            .categories
            .get(category)
            .and_then(|entries| entries.iter().find(|e| key.matches(e)))
            .ok_or_else(|| MergeError::TargetNotFound {
                category: category.to_string(),
                key: key.to_string(),
            })?;

        Ok(AggregateDocument::new().with_category(category, vec![entry.clone()]))
    }

    /// Checks the per-partition identity key uniqueness invariant.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::DuplicateKey`] naming the first duplicate.
    pub fn ensure_unique_keys(&self) -> Result<(), MergeError> {
        for (category, entries) in &self.categories {
            let mut seen = std::collections::HashSet::new();
            for entry in entries {
                if let Some(key) = entry.identity_key() {
                    if !seen.insert(key.clone()) {
                        return Err(MergeError::DuplicateKey {
                            category: category.clone(),
                            key: key.to_string(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Parses a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns the underlying parse error when the value is not shaped
    /// category → entry array.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Serializes the document to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> AggregateDocument {
        AggregateDocument::new()
            .with_category(
                "residential",
                vec![
                    DocumentEntry::new("asphalt-shingles", "Asphalt Shingles"),
                    DocumentEntry::new("roof-repair", "Roof Repair"),
                ],
            )
            .with_category(
                "commercial",
                vec![DocumentEntry::new("metal-roofing", "Metal Roofing")],
            )
    }

    #[test]
    fn test_identity_key_prefers_id() {
        let entry = DocumentEntry::new("metal-roofing", "Metal Roofing");
        assert_eq!(entry.identity_key(), Some(EntryKey::id("metal-roofing")));

        let entry = DocumentEntry {
            id: None,
            name: Some("  Flat Roofing  ".to_string()),
            extra: serde_json::Map::new(),
        };
        assert_eq!(entry.identity_key(), Some(EntryKey::name("Flat Roofing")));
    }

    #[test]
    fn test_name_key_matches_trimmed_case_sensitive() {
        let entry = DocumentEntry {
            id: None,
            name: Some(" Metal Roofing ".to_string()),
            extra: serde_json::Map::new(),
        };
        assert!(EntryKey::name("Metal Roofing").matches(&entry));
        assert!(!EntryKey::name("metal roofing").matches(&entry));
    }

    #[test]
    fn test_id_key_never_matches_by_name() {
        let entry = DocumentEntry {
            id: None,
            name: Some("svc-3".to_string()),
            extra: serde_json::Map::new(),
        };
        assert!(!EntryKey::id("svc-3").matches(&entry));
    }

    #[test]
    fn test_serde_flat_shape() {
        let doc = sample();
        let value = doc.to_value();
        assert!(value.get("residential").is_some());
        assert!(value.get("commercial").is_some());
        assert_eq!(value["commercial"][0]["id"], "metal-roofing");

        let back = AggregateDocument::from_value(value).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_extra_fields_preserved() {
        let value = serde_json::json!({
            "commercial": [
                {"id": "metal-roofing", "name": "Metal Roofing", "blocks": [{"type": "Hero"}]}
            ]
        });
        let doc = AggregateDocument::from_value(value.clone()).unwrap();
        assert_eq!(
            doc.categories["commercial"][0].extra["blocks"],
            serde_json::json!([{"type": "Hero"}])
        );
        assert_eq!(doc.to_value(), value);
    }

    #[test]
    fn test_filter_subset_selects_exactly_one() {
        let doc = sample();
        let subset = doc
            .filter_subset("residential", &EntryKey::id("roof-repair"))
            .unwrap();

        assert_eq!(subset.len(), 1);
        assert_eq!(subset.categories.len(), 1);
        assert_eq!(
            subset.categories["residential"][0].id.as_deref(),
            Some("roof-repair")
        );
    }

    #[test]
    fn test_filter_subset_missing_entry() {
        let doc = sample();
        let err = doc
            .filter_subset("residential", &EntryKey::id("solar-panels"))
            .unwrap_err();
        assert!(matches!(err, MergeError::TargetNotFound { .. }));
    }

    #[test]
    fn test_ensure_unique_keys() {
        let ok = sample();
        assert!(ok.ensure_unique_keys().is_ok());

        let dup = AggregateDocument::new().with_category(
            "residential",
            vec![
                DocumentEntry::new("roof-repair", "Roof Repair"),
                DocumentEntry::new("roof-repair", "Roof Repair (again)"),
            ],
        );
        assert!(matches!(
            dup.ensure_unique_keys().unwrap_err(),
            MergeError::DuplicateKey { .. }
        ));
    }

    #[test]
    fn test_same_key_in_different_partitions_allowed() {
        let doc = AggregateDocument::new()
            .with_category("residential", vec![DocumentEntry::new("repair", "Repair")])
            .with_category("commercial", vec![DocumentEntry::new("repair", "Repair")]);
        assert!(doc.ensure_unique_keys().is_ok());
    }
}
