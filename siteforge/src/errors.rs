//! Error types for the siteforge orchestration core.
//!
//! The taxonomy distinguishes fatal invocation failures (which halt a
//! pipeline run) from soft extraction failures (which degrade it), and
//! keeps merge failures separate so a failed merge can never be confused
//! with a failed stage.

use std::path::PathBuf;
use thiserror::Error;

use crate::marker::ExtractError;

/// The error type for a single stage invocation.
#[derive(Debug, Error)]
pub enum StageError {
    /// The external process exited non-zero. The exit code is
    /// authoritative: a payload printed before the failure is discarded.
    #[error("stage '{stage}' process failed with exit code {code}")]
    ProcessFailed {
        /// The stage identifier.
        stage: String,
        /// The process exit code.
        code: i32,
        /// Captured standard-error text for diagnosis.
        stderr: String,
    },

    /// The process exited zero but no payload could be extracted from
    /// its output. Soft by default: the sequencer substitutes the
    /// stage's fallback payload and continues.
    #[error("stage '{stage}' produced unparseable output")]
    OutputUnparseable {
        /// The stage identifier.
        stage: String,
        /// The extraction failure sub-kind.
        #[source]
        source: ExtractError,
    },

    /// The stage requires an external capability that is unavailable
    /// and declares no fallback payload.
    #[error("stage '{stage}' requires unavailable capability '{capability}'")]
    CapabilityUnavailable {
        /// The stage identifier.
        stage: String,
        /// The missing capability name.
        capability: String,
    },

    /// The invocation was cancelled before the process terminated on
    /// its own. Distinct from `ProcessFailed`.
    #[error("stage '{stage}' cancelled{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Cancelled {
        /// The stage identifier.
        stage: String,
        /// The cancellation reason, if one was given.
        reason: Option<String>,
    },

    /// The input handed to the stage does not satisfy its declared
    /// input contract.
    #[error("stage '{stage}' input contract violated: {message}")]
    ContractMismatch {
        /// The stage identifier.
        stage: String,
        /// What was violated.
        message: String,
    },

    /// Failure to launch or communicate with the stage process.
    #[error("stage '{stage}' I/O failure")]
    Io {
        /// The stage identifier.
        stage: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    /// Creates a process failure error.
    #[must_use]
    pub fn process_failed(stage: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        Self::ProcessFailed {
            stage: stage.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Creates an unparseable-output error.
    #[must_use]
    pub fn output_unparseable(stage: impl Into<String>, source: ExtractError) -> Self {
        Self::OutputUnparseable {
            stage: stage.into(),
            source,
        }
    }

    /// Creates a capability-unavailable error.
    #[must_use]
    pub fn capability_unavailable(stage: impl Into<String>, capability: impl Into<String>) -> Self {
        Self::CapabilityUnavailable {
            stage: stage.into(),
            capability: capability.into(),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(stage: impl Into<String>, reason: Option<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
            reason,
        }
    }

    /// Creates a contract mismatch error.
    #[must_use]
    pub fn contract_mismatch(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ContractMismatch {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    #[must_use]
    pub fn io(stage: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            stage: stage.into(),
            source,
        }
    }

    /// The stage this error belongs to.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::ProcessFailed { stage, .. }
            | Self::OutputUnparseable { stage, .. }
            | Self::CapabilityUnavailable { stage, .. }
            | Self::Cancelled { stage, .. }
            | Self::ContractMismatch { stage, .. }
            | Self::Io { stage, .. } => stage,
        }
    }

    /// A stable machine-readable kind string for caller-facing payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProcessFailed { .. } => "process_failed",
            Self::OutputUnparseable { .. } => "output_unparseable",
            Self::CapabilityUnavailable { .. } => "capability_unavailable",
            Self::Cancelled { .. } => "cancelled",
            Self::ContractMismatch { .. } => "contract_mismatch",
            Self::Io { .. } => "io",
        }
    }

    /// Whether the sequencer must halt on this error.
    ///
    /// Only `OutputUnparseable` is soft: the sequencer substitutes the
    /// stage's fallback payload and continues, flagging degradation.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::OutputUnparseable { .. })
    }
}

/// The error type for partial-merge operations.
///
/// A failed merge never mutates the full document; merging is
/// all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    /// No entry in the full document matches the filter key. A merge is
    /// a replace-only operation, never an insert.
    #[error("no entry matching {key} in category '{category}'")]
    TargetNotFound {
        /// The category searched.
        category: String,
        /// Display form of the identity key.
        key: String,
    },

    /// More than one entry in the updated subset matches the filter.
    #[error("updated subset has {count} entries matching {key}; expected exactly one")]
    Ambiguous {
        /// Display form of the identity key.
        key: String,
        /// How many entries matched.
        count: usize,
    },

    /// The updated subset violates the single-entry filtering contract
    /// (wrong category, empty, or no entry matching the filter).
    #[error("updated subset does not satisfy the filter contract: {message}")]
    SubsetMismatch {
        /// What was violated.
        message: String,
    },

    /// Duplicate identity keys within one category partition.
    #[error("duplicate identity key {key} in category '{category}'")]
    DuplicateKey {
        /// The category partition.
        category: String,
        /// Display form of the duplicated key.
        key: String,
    },
}

/// Error raised when a stage or pipeline specification is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SpecError {
    /// The error message.
    pub message: String,
    /// The stages involved in the error.
    pub stages: Vec<String>,
}

impl SpecError {
    /// Creates a new specification error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stages: Vec::new(),
        }
    }

    /// Sets the stages involved.
    #[must_use]
    pub fn with_stages(mut self, stages: Vec<String>) -> Self {
        self.stages = stages;
        self
    }
}

/// Error raised by document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("store I/O failure at {path}")]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The stored document is not valid JSON of the expected shape.
    #[error("stored document at {path} is corrupt: {message}")]
    Corrupt {
        /// The path involved.
        path: PathBuf,
        /// Parse failure detail.
        message: String,
    },
}
