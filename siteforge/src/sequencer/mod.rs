//! Pipeline sequencing.
//!
//! This module provides:
//! - The sequencer driving stages in declared order
//! - Per-stage traces and run results with degradation flags

mod pipeline;
mod result;

pub use pipeline::PipelineSequencer;
pub use result::{DegradeReason, PipelineRunResult, StageDisposition, StageTrace};
