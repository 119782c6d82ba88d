//! Stage specifications.
//!
//! A [`StageSpec`] is declared once at orchestrator-build time and is
//! immutable thereafter; the sequencer and invoker only ever read it.

use crate::errors::SpecError;
use crate::stage::{InputContract, OutputContract};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// The external command a stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCommand {
    /// Program to execute.
    pub program: PathBuf,
    /// Arguments, in order.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    #[serde(default)]
    pub envs: Vec<(String, String)>,
    /// Working directory for the child, if not inherited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_dir: Option<PathBuf>,
}

impl StageCommand {
    /// Creates a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            current_dir: None,
        }
    }

    /// Sets the argument list.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

/// Specification for a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Unique stage identifier.
    pub id: String,
    /// The external process to launch.
    pub command: StageCommand,
    /// Input delivery mode.
    pub input: InputContract,
    /// Output delivery mode.
    pub output: OutputContract,
    /// External capability this stage needs (e.g. an AI completion
    /// key). Absence triggers the fallback path instead of a launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_capability: Option<String>,
    /// Deterministic default payload substituted when the stage is
    /// degraded (capability missing, or output unparseable).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<serde_json::Value>,
}

impl StageSpec {
    /// Creates a stage spec with no input and marker output for the
    /// given token.
    #[must_use]
    pub fn new(id: impl Into<String>, command: StageCommand) -> Self {
        Self {
            id: id.into(),
            command,
            input: InputContract::None,
            output: OutputContract::file_paths(Vec::<PathBuf>::new()),
            required_capability: None,
            fallback: None,
        }
    }

    /// Sets the input contract.
    #[must_use]
    pub fn with_input(mut self, input: InputContract) -> Self {
        self.input = input;
        self
    }

    /// Sets the output contract.
    #[must_use]
    pub fn with_output(mut self, output: OutputContract) -> Self {
        self.output = output;
        self
    }

    /// Declares a required external capability.
    #[must_use]
    pub fn with_required_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capability = Some(capability.into());
        self
    }

    /// Declares the degraded-mode fallback payload.
    #[must_use]
    pub fn with_fallback(mut self, fallback: serde_json::Value) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Validates the stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or whitespace-only.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.id.trim().is_empty() {
            return Err(SpecError::new("stage id cannot be empty or whitespace-only"));
        }
        Ok(())
    }
}

/// Validates an ordered stage sequence: every member valid, ids unique.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate_sequence(stages: &[StageSpec]) -> Result<(), SpecError> {
    if stages.is_empty() {
        return Err(SpecError::new("pipeline must declare at least one stage"));
    }

    let mut seen = HashSet::new();
    for spec in stages {
        spec.validate()?;
        if !seen.insert(spec.id.as_str()) {
            return Err(
                SpecError::new(format!("duplicate stage id '{}'", spec.id))
                    .with_stages(vec![spec.id.clone()]),
            );
        }
    }
    Ok(())
}
