//! Shared fixtures for tests.

use crate::merge::{AggregateDocument, DocumentEntry};

/// A full services document: residential and commercial partitions with
/// block content, shaped like the generated `services.json`.
#[must_use]
pub fn services_document() -> AggregateDocument {
    AggregateDocument::new()
        .with_category(
            "residential",
            vec![
                DocumentEntry::new("asphalt-shingles", "Asphalt Shingles")
                    .with_field("blocks", serde_json::json!([{"type": "Hero"}, {"type": "FAQ"}])),
                DocumentEntry::new("roof-repair", "Roof Repair")
                    .with_field("blocks", serde_json::json!([{"type": "Hero"}])),
            ],
        )
        .with_category(
            "commercial",
            vec![
                DocumentEntry::new("metal-roofing", "Metal Roofing")
                    .with_field("blocks", serde_json::json!([{"type": "Hero"}])),
                DocumentEntry::new("roof-coatings", "Roof Coatings")
                    .with_field("blocks", serde_json::json!([{"type": "Hero"}])),
            ],
        )
}

/// Wraps a JSON value in the conventional marker frame for `token`,
/// surrounded by log noise on both sides.
#[must_use]
pub fn marker_stream(token: &str, value: &serde_json::Value) -> String {
    format!(
        "[{token}] generating\n{token}_START\n{value}\n{token}_END\n[{token}] emitted to stdout\n",
    )
}
