//! Stage specifications and inter-stage data contracts.
//!
//! A stage is one unit of external work: a scraper, an AI content
//! generator, a combiner. This module declares what a stage looks like
//! to the orchestrator — how it is launched, how input reaches it, and
//! how its output is recovered.

mod contract;
mod payload;
mod request;
mod spec;

pub use contract::{InputContract, OutputContract};
pub use payload::StagePayload;
pub use request::{ResponseError, StageRequest, StageResponse};
pub use spec::{validate_sequence, StageCommand, StageSpec};
