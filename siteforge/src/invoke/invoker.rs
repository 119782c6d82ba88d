//! Launching stages and classifying their results.

use std::sync::Arc;

use super::invocation::{InvocationStatus, StageInvocation};
use super::runner::{InvokeOptions, ProcessRunner, RunnerError, StageRunner};
use crate::capability::CapabilitySet;
use crate::errors::StageError;
use crate::marker::{self, ExtractError};
use crate::stage::{InputContract, OutputContract, StagePayload, StageSpec};

/// The result of one successful (or degraded) invocation.
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    /// The extracted or substituted payload.
    pub payload: StagePayload,
    /// True when the payload came from the stage's documented fallback
    /// instead of the process (capability unavailable).
    pub used_fallback: bool,
    /// The execution record; `None` when the process was never
    /// launched.
    pub invocation: Option<Arc<StageInvocation>>,
}

impl InvocationOutcome {
    /// Builds a degraded outcome around a fallback payload.
    #[must_use]
    pub fn fallback(payload: serde_json::Value) -> Self {
        Self {
            payload: StagePayload::Json(payload),
            used_fallback: true,
            invocation: None,
        }
    }
}

/// Launches stage processes and maps their results onto the error
/// taxonomy.
///
/// The invoker owns no state besides its runner and the capability set;
/// it persists nothing and holds nothing across invocations.
#[derive(Debug)]
pub struct StageInvoker<R> {
    runner: R,
    capabilities: CapabilitySet,
}

impl StageInvoker<ProcessRunner> {
    /// An invoker backed by external processes.
    #[must_use]
    pub fn process() -> Self {
        Self::new(ProcessRunner::new())
    }
}

impl<R: StageRunner> StageInvoker<R> {
    /// Creates an invoker with an empty capability set.
    #[must_use]
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            capabilities: CapabilitySet::new(),
        }
    }

    /// Sets the available capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// The configured capability set.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// The underlying runner.
    #[must_use]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Invokes a stage with default options.
    ///
    /// # Errors
    ///
    /// See [`StageError`] for the full taxonomy.
    pub async fn invoke(
        &self,
        spec: &StageSpec,
        input: &StagePayload,
    ) -> Result<InvocationOutcome, StageError> {
        self.invoke_with(spec, input, &InvokeOptions::default())
            .await
    }

    /// Invokes a stage with an observer and/or cancellation token.
    ///
    /// # Errors
    ///
    /// - [`StageError::CapabilityUnavailable`] when the required
    ///   capability is missing and the spec declares no fallback.
    /// - [`StageError::ContractMismatch`] when the input does not
    ///   satisfy the stage's input contract.
    /// - [`StageError::ProcessFailed`] on non-zero exit; the exit code
    ///   is authoritative even if a payload was printed first.
    /// - [`StageError::OutputUnparseable`] when a zero-exit process
    ///   yields no extractable payload (soft for the sequencer).
    /// - [`StageError::Cancelled`] / [`StageError::Io`].
    pub async fn invoke_with(
        &self,
        spec: &StageSpec,
        input: &StagePayload,
        opts: &InvokeOptions<'_>,
    ) -> Result<InvocationOutcome, StageError> {
        if let Some(capability) = &spec.required_capability {
            if !self.capabilities.contains(capability) {
                return match &spec.fallback {
                    Some(fallback) => {
                        tracing::info!(
                            stage = %spec.id,
                            capability = %capability,
                            "capability unavailable, substituting fallback payload"
                        );
                        Ok(InvocationOutcome::fallback(fallback.clone()))
                    }
                    None => Err(StageError::capability_unavailable(&spec.id, capability)),
                };
            }
        }

        let stdin = self.prepare_input(spec, input)?;

        let invocation = Arc::new(StageInvocation::new(&spec.id));
        tracing::debug!(stage = %spec.id, input = %spec.input, "launching stage");

        match self.runner.run(spec, stdin, opts, &invocation).await {
            Ok(()) => {}
            Err(RunnerError::Cancelled { reason }) => {
                return Err(StageError::cancelled(&spec.id, reason));
            }
            Err(RunnerError::Io(source)) => return Err(StageError::io(&spec.id, source)),
        }

        match invocation.status() {
            InvocationStatus::Failure(code) => {
                tracing::warn!(stage = %spec.id, code, "stage process failed");
                Err(StageError::process_failed(
                    &spec.id,
                    code,
                    invocation.stderr(),
                ))
            }
            InvocationStatus::Pending => Err(StageError::io(
                &spec.id,
                std::io::Error::other("runner returned without recording a terminal status"),
            )),
            InvocationStatus::Success => {
                let payload = self.extract_output(spec, &invocation)?;
                Ok(InvocationOutcome {
                    payload,
                    used_fallback: false,
                    invocation: Some(invocation),
                })
            }
        }
    }

    fn prepare_input(
        &self,
        spec: &StageSpec,
        input: &StagePayload,
    ) -> Result<Option<Vec<u8>>, StageError> {
        match &spec.input {
            InputContract::None => Ok(None),
            InputContract::StdinJson => {
                let value = input.as_json().ok_or_else(|| {
                    StageError::contract_mismatch(
                        &spec.id,
                        "stdin-json stage requires a JSON payload",
                    )
                })?;
                serde_json::to_vec(value).map(Some).map_err(|e| {
                    StageError::contract_mismatch(
                        &spec.id,
                        format!("input payload is not serializable: {e}"),
                    )
                })
            }
            InputContract::FilePaths { paths } => {
                // Materialization is the caller's job; absence here is a
                // caller bug, not a stage failure.
                for path in paths {
                    if !path.exists() {
                        return Err(StageError::contract_mismatch(
                            &spec.id,
                            format!("input file not materialized: {}", path.display()),
                        ));
                    }
                }
                Ok(None)
            }
        }
    }

    fn extract_output(
        &self,
        spec: &StageSpec,
        invocation: &StageInvocation,
    ) -> Result<StagePayload, StageError> {
        match &spec.output {
            OutputContract::MarkerStdoutJson { marker: pair } => {
                // Marker protocol applies to stdout only; stderr is
                // diagnostic.
                let stdout = invocation.stdout();
                marker::extract(&stdout, pair)
                    .map(StagePayload::Json)
                    .map_err(|e| StageError::output_unparseable(&spec.id, e))
            }
            OutputContract::FilePaths { paths } => {
                for path in paths {
                    if !path.exists() {
                        return Err(StageError::output_unparseable(
                            &spec.id,
                            ExtractError::MissingOutputFile { path: path.clone() },
                        ));
                    }
                }
                Ok(StagePayload::Files(paths.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{OutputContract, StageCommand};
    use crate::testing::{ScriptedExchange, ScriptedRunner};

    fn marker_spec(id: &str) -> StageSpec {
        StageSpec::new(id, StageCommand::new("python3"))
            .with_output(OutputContract::marker_token("SERVICE_JSON"))
    }

    #[tokio::test]
    async fn test_success_extracts_marker_payload() {
        let runner = ScriptedRunner::new().on(
            "services",
            ScriptedExchange::success(
                "[Services] working\nSERVICE_JSON_START\n{\"residential\": []}\nSERVICE_JSON_END\n",
            ),
        );
        let invoker = StageInvoker::new(runner);

        let outcome = invoker
            .invoke(&marker_spec("services"), &StagePayload::Null)
            .await
            .unwrap();

        assert!(!outcome.used_fallback);
        assert_eq!(
            outcome.payload,
            StagePayload::Json(serde_json::json!({"residential": []}))
        );
        assert!(outcome.invocation.is_some());
    }

    #[tokio::test]
    async fn test_exit_code_authoritative_over_payload() {
        // A payload was printed, but the process still failed.
        let runner = ScriptedRunner::new().on(
            "services",
            ScriptedExchange::failure(
                7,
                "SERVICE_JSON_START\n{\"residential\": []}\nSERVICE_JSON_END\n",
                "Traceback: template exhausted\n",
            ),
        );
        let invoker = StageInvoker::new(runner);

        let err = invoker
            .invoke(&marker_spec("services"), &StagePayload::Null)
            .await
            .unwrap_err();

        match err {
            StageError::ProcessFailed { code, stderr, .. } => {
                assert_eq!(code, 7);
                assert!(stderr.contains("template exhausted"));
            }
            other => panic!("expected ProcessFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparseable_output_is_soft_kind() {
        let runner = ScriptedRunner::new().on(
            "services",
            ScriptedExchange::success("just logs, no markers at all\n"),
        );
        let invoker = StageInvoker::new(runner);

        let err = invoker
            .invoke(&marker_spec("services"), &StagePayload::Null)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "output_unparseable");
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_capability_fallback_skips_launch() {
        let runner = ScriptedRunner::new();
        let invoker = StageInvoker::new(runner);

        let spec = marker_spec("services")
            .with_required_capability("ai-completion")
            .with_fallback(serde_json::json!({"residential": [], "commercial": []}));

        let outcome = invoker.invoke(&spec, &StagePayload::Null).await.unwrap();

        assert!(outcome.used_fallback);
        assert!(outcome.invocation.is_none());
        assert_eq!(invoker.runner().calls(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_capability_present_runs_normally() {
        let runner = ScriptedRunner::new().on(
            "services",
            ScriptedExchange::success("SERVICE_JSON_START\n{}\nSERVICE_JSON_END\n"),
        );
        let invoker =
            StageInvoker::new(runner).with_capabilities(CapabilitySet::from_names(["ai-completion"]));

        let spec = marker_spec("services").with_required_capability("ai-completion");
        let outcome = invoker.invoke(&spec, &StagePayload::Null).await.unwrap();

        assert!(!outcome.used_fallback);
        assert_eq!(invoker.runner().calls(), vec!["services".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_capability_without_fallback_errors() {
        let invoker = StageInvoker::new(ScriptedRunner::new());
        let spec = marker_spec("services").with_required_capability("ai-completion");

        let err = invoker.invoke(&spec, &StagePayload::Null).await.unwrap_err();
        assert_eq!(err.kind(), "capability_unavailable");
    }

    #[tokio::test]
    async fn test_stdin_contract_requires_json() {
        let invoker = StageInvoker::new(ScriptedRunner::new());
        let spec = marker_spec("research").with_input(InputContract::StdinJson);

        let err = invoker.invoke(&spec, &StagePayload::Null).await.unwrap_err();
        assert_eq!(err.kind(), "contract_mismatch");
    }

    #[tokio::test]
    async fn test_stdin_payload_reaches_runner() {
        let runner = ScriptedRunner::new().on(
            "research",
            ScriptedExchange::success("RESEARCH_JSON_START\n{}\nRESEARCH_JSON_END\n"),
        );
        let invoker = StageInvoker::new(runner);

        let spec = StageSpec::new("research", StageCommand::new("python3"))
            .with_input(InputContract::StdinJson)
            .with_output(OutputContract::marker_token("RESEARCH_JSON"));

        let input = StagePayload::Json(serde_json::json!({"serviceNames": ["Metal Roofing"]}));
        invoker.invoke(&spec, &input).await.unwrap();

        let stdins = invoker.runner().recorded_stdin();
        assert_eq!(stdins.len(), 1);
        let sent: serde_json::Value = serde_json::from_slice(stdins[0].as_ref().unwrap()).unwrap();
        assert_eq!(sent["serviceNames"][0], "Metal Roofing");
    }

    #[tokio::test]
    async fn test_missing_input_file_is_contract_mismatch() {
        let invoker = StageInvoker::new(ScriptedRunner::new());
        let spec = marker_spec("logo")
            .with_input(InputContract::file_paths(["/nonexistent/logo.png"]));

        let err = invoker.invoke(&spec, &StagePayload::Null).await.unwrap_err();
        assert_eq!(err.kind(), "contract_mismatch");
    }
}
