//! Caller-facing request/response shapes, independent of transport.

use crate::errors::StageError;
use crate::invoke::InvocationOutcome;
use crate::stage::StagePayload;
use serde::{Deserialize, Serialize};

/// A caller's request to run one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRequest {
    /// Which stage to run.
    pub stage_id: String,
    /// Input payload matching the stage's documented input schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Whether the caller wants the result persisted by its store.
    #[serde(default)]
    pub persist: bool,
}

/// Machine-readable error body in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Stable error kind (see [`StageError::kind`]).
    pub kind: String,
    /// Human-readable message with diagnostic context.
    pub message: String,
}

/// The response for one stage request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResponse {
    /// Whether the stage produced a usable payload.
    pub ok: bool,
    /// The payload, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// True when the payload came from a documented fallback rather
    /// than the primary generation path.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
    /// Error details when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl StageResponse {
    /// Builds a success response from an invocation outcome.
    #[must_use]
    pub fn from_outcome(outcome: &InvocationOutcome) -> Self {
        let payload = match &outcome.payload {
            StagePayload::Json(value) => Some(value.clone()),
            StagePayload::Files(paths) => Some(serde_json::json!({
                "files": paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            })),
            StagePayload::Null => None,
        };
        Self {
            ok: true,
            payload,
            degraded: outcome.used_fallback,
            error: None,
        }
    }

    /// Builds a failure response from a stage error.
    #[must_use]
    pub fn from_error(error: &StageError) -> Self {
        Self {
            ok: false,
            payload: None,
            degraded: false,
            error: Some(ResponseError {
                kind: error.kind().to_string(),
                message: error.to_string(),
            }),
        }
    }
}
