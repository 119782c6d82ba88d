//! Test utilities: scripted runners and fixtures.

mod fixtures;
mod mocks;

pub use fixtures::{marker_stream, services_document};
pub use mocks::{ScriptedExchange, ScriptedRunner};
