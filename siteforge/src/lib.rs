//! # Siteforge
//!
//! The orchestration core of a staged website-content generation
//! pipeline: external stage processes (scrapers, AI generators,
//! combiners) are sequenced, their marker-delimited JSON payloads
//! extracted and passed along, partial re-runs merged back into full
//! aggregate documents, and per-item progress exposed for polling.
//!
//! Siteforge provides:
//!
//! - **Stage contracts**: declared input/output delivery modes with
//!   sentinel-framed stdout payloads
//! - **Invocation**: process launch, full output capture, exit-code
//!   classification, capability fallbacks
//! - **Partial merging**: folding one re-generated entry back into a
//!   previously-computed aggregate document by identity key
//! - **Sequencing**: ordered execution with per-stage halt or
//!   degrade-and-continue policy
//! - **Progress**: per-run trackers fed by structured output events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use siteforge::prelude::*;
//!
//! let stages = vec![
//!     StageSpec::new("research", StageCommand::new("python3").with_args(["research.py"]))
//!         .with_input(InputContract::StdinJson)
//!         .with_output(OutputContract::marker_token("RESEARCH_JSON")),
//!     StageSpec::new("services", StageCommand::new("python3").with_args(["services.py"]))
//!         .with_input(InputContract::StdinJson)
//!         .with_output(OutputContract::marker_token("SERVICE_JSON"))
//!         .with_required_capability("ai-completion")
//!         .with_fallback(serde_json::json!({"residential": [], "commercial": []})),
//! ];
//!
//! let invoker = StageInvoker::process()
//!     .with_capabilities(CapabilitySet::from_env([("ai-completion", "OPENAI_API_KEY")]));
//! let result = PipelineSequencer::new(invoker)
//!     .run(&stages, StagePayload::Json(lead_info))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancel;
pub mod capability;
pub mod errors;
pub mod invoke;
pub mod marker;
pub mod merge;
pub mod progress;
pub mod sequencer;
pub mod stage;
pub mod store;
pub mod telemetry;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::capability::CapabilitySet;
    pub use crate::errors::{MergeError, SpecError, StageError, StoreError};
    pub use crate::invoke::{
        InvocationOutcome, InvocationStatus, InvokeOptions, LineObserver, ProcessRunner,
        StageInvocation, StageInvoker, StageRunner,
    };
    pub use crate::marker::{extract, ExtractError, MarkerPair};
    pub use crate::merge::{merge_subset, AggregateDocument, DocumentEntry, EntryFilter, EntryKey};
    pub use crate::progress::{
        ProgressRegistry, ProgressRule, ProgressState, ProgressStatus, ProgressTracker,
    };
    pub use crate::sequencer::{
        DegradeReason, PipelineRunResult, PipelineSequencer, StageDisposition, StageTrace,
    };
    pub use crate::stage::{
        InputContract, OutputContract, StageCommand, StagePayload, StageRequest, StageResponse,
        StageSpec,
    };
    pub use crate::store::{DocumentStore, FsDocumentStore};
    pub use crate::utils::{iso_timestamp, new_run_id, Timestamp};
}
