//! The value passed between pipeline stages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A stage's extracted output, and the next stage's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StagePayload {
    /// No payload (stages with no declared input, or degraded stages
    /// whose spec declares no fallback document).
    Null,
    /// A JSON document.
    Json(serde_json::Value),
    /// Files written to documented paths.
    Files(Vec<PathBuf>),
}

impl StagePayload {
    /// Returns the JSON document, if this payload is one.
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Null | Self::Files(_) => None,
        }
    }

    /// Returns the file paths, if this payload is a file set.
    #[must_use]
    pub fn as_files(&self) -> Option<&[PathBuf]> {
        match self {
            Self::Files(paths) => Some(paths),
            Self::Null | Self::Json(_) => None,
        }
    }

    /// Returns true for the null payload.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl Default for StagePayload {
    fn default() -> Self {
        Self::Null
    }
}

impl From<serde_json::Value> for StagePayload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}
