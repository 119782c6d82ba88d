//! Pipeline run results and per-stage traces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StageError;
use crate::stage::StagePayload;

/// Why a stage's payload came from a fallback instead of the primary
/// path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DegradeReason {
    /// The stage's required capability was unavailable; the process was
    /// never launched.
    CapabilityUnavailable {
        /// The missing capability.
        capability: String,
    },
    /// The process succeeded but its output yielded no payload.
    OutputUnparseable {
        /// Extraction failure detail.
        detail: String,
    },
}

/// How a stage concluded within a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum StageDisposition {
    /// The stage produced its payload through the primary path.
    Succeeded,
    /// A documented fallback payload was substituted.
    Degraded(DegradeReason),
}

impl StageDisposition {
    /// True when the stage was degraded.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// The record of one stage within a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTrace {
    /// The stage identifier.
    pub stage_id: String,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
    /// The payload this stage contributed to the pipeline.
    pub payload: StagePayload,
    /// How the stage concluded.
    pub disposition: StageDisposition,
}

/// The result of one pipeline run.
///
/// Either `output` holds the terminal payload (possibly degraded at the
/// stage level), or `error` holds the first fatal stage error; in both
/// cases `traces` carries everything produced up to that point.
#[derive(Debug)]
pub struct PipelineRunResult {
    /// The run identifier minted at pipeline start.
    pub run_id: Uuid,
    /// Per-stage records, in execution order.
    pub traces: Vec<StageTrace>,
    /// The final stage's payload, when the run completed.
    pub output: Option<StagePayload>,
    /// The first fatal error, when the run halted.
    pub error: Option<StageError>,
}

impl PipelineRunResult {
    /// True when every declared stage ran to a payload.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// True when any stage used a fallback.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.traces.iter().any(|t| t.disposition.is_degraded())
    }

    /// The payload a given stage contributed, if it ran.
    #[must_use]
    pub fn payload_of(&self, stage_id: &str) -> Option<&StagePayload> {
        self.traces
            .iter()
            .find(|t| t.stage_id == stage_id)
            .map(|t| &t.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_flags() {
        assert!(!StageDisposition::Succeeded.is_degraded());
        assert!(StageDisposition::Degraded(DegradeReason::OutputUnparseable {
            detail: "no markers".to_string(),
        })
        .is_degraded());
    }

    #[test]
    fn test_result_accessors() {
        let result = PipelineRunResult {
            run_id: Uuid::new_v4(),
            traces: vec![StageTrace {
                stage_id: "research".to_string(),
                started_at: Utc::now(),
                duration_ms: 12.0,
                payload: StagePayload::Json(serde_json::json!({"x": 1})),
                disposition: StageDisposition::Succeeded,
            }],
            output: None,
            error: Some(StageError::process_failed("services", 2, "boom")),
        };

        assert!(!result.is_complete());
        assert!(!result.is_degraded());
        assert_eq!(
            result.payload_of("research"),
            Some(&StagePayload::Json(serde_json::json!({"x": 1})))
        );
        assert!(result.payload_of("services").is_none());
    }
}
