//! Ordered stage execution with per-stage failure policy.

use std::time::Instant;

use crate::utils::{new_run_id, now_utc};

use super::result::{DegradeReason, PipelineRunResult, StageDisposition, StageTrace};
use crate::errors::SpecError;
use crate::invoke::{InvokeOptions, StageInvoker, StageRunner};
use crate::stage::{validate_sequence, StagePayload, StageSpec};

/// Runs stages strictly in declared order, passing each stage's payload
/// to the next.
///
/// Failure policy per stage:
/// - fatal errors (process failure, I/O, cancellation, missing
///   capability without fallback) halt the run; traces already produced
///   are preserved in the result;
/// - unparseable output degrades: the stage's fallback payload (or JSON
///   null) is substituted and the run continues, with the degradation
///   recorded on the trace.
///
/// The sequencer keeps no state across runs beyond its invoker, so
/// re-running with the same input against the same external world
/// yields the same payloads.
#[derive(Debug)]
pub struct PipelineSequencer<R> {
    invoker: StageInvoker<R>,
}

impl<R: StageRunner> PipelineSequencer<R> {
    /// Creates a sequencer around an invoker.
    #[must_use]
    pub fn new(invoker: StageInvoker<R>) -> Self {
        Self { invoker }
    }

    /// The underlying invoker.
    #[must_use]
    pub fn invoker(&self) -> &StageInvoker<R> {
        &self.invoker
    }

    /// Runs the pipeline with default options.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when the stage sequence itself is invalid
    /// (empty, duplicate ids). Runtime stage failures are reported
    /// inside the [`PipelineRunResult`], not as an `Err`.
    pub async fn run(
        &self,
        stages: &[StageSpec],
        initial: StagePayload,
    ) -> Result<PipelineRunResult, SpecError> {
        self.run_with(stages, initial, &InvokeOptions::default())
            .await
    }

    /// Runs the pipeline with an observer and/or cancellation token.
    ///
    /// # Errors
    ///
    /// Returns [`SpecError`] when the stage sequence itself is invalid.
    pub async fn run_with(
        &self,
        stages: &[StageSpec],
        initial: StagePayload,
        opts: &InvokeOptions<'_>,
    ) -> Result<PipelineRunResult, SpecError> {
        validate_sequence(stages)?;

        let run_id = new_run_id();
        let mut traces: Vec<StageTrace> = Vec::with_capacity(stages.len());
        let mut current = initial;

        tracing::info!(%run_id, stages = stages.len(), "pipeline run started");

        for spec in stages {
            let started_at = now_utc();
            let timer = Instant::now();

            match self.invoker.invoke_with(spec, &current, opts).await {
                Ok(outcome) => {
                    let disposition = if outcome.used_fallback {
                        StageDisposition::Degraded(DegradeReason::CapabilityUnavailable {
                            capability: spec.required_capability.clone().unwrap_or_default(),
                        })
                    } else {
                        StageDisposition::Succeeded
                    };
                    traces.push(StageTrace {
                        stage_id: spec.id.clone(),
                        started_at,
                        duration_ms: timer.elapsed().as_secs_f64() * 1000.0,
                        payload: outcome.payload.clone(),
                        disposition,
                    });
                    current = outcome.payload;
                }
                Err(err) if !err.is_fatal() => {
                    tracing::warn!(
                        stage = %spec.id,
                        error = %err,
                        "stage output unparseable, substituting fallback payload"
                    );
                    let payload = spec
                        .fallback
                        .clone()
                        .map_or(StagePayload::Null, StagePayload::Json);
                    traces.push(StageTrace {
                        stage_id: spec.id.clone(),
                        started_at,
                        duration_ms: timer.elapsed().as_secs_f64() * 1000.0,
                        payload: payload.clone(),
                        disposition: StageDisposition::Degraded(DegradeReason::OutputUnparseable {
                            detail: err.to_string(),
                        }),
                    });
                    current = payload;
                }
                Err(err) => {
                    tracing::error!(
                        %run_id,
                        stage = %spec.id,
                        error = %err,
                        "stage failed, halting pipeline"
                    );
                    return Ok(PipelineRunResult {
                        run_id,
                        traces,
                        output: None,
                        error: Some(err),
                    });
                }
            }
        }

        tracing::info!(%run_id, "pipeline run completed");
        Ok(PipelineRunResult {
            run_id,
            traces,
            output: Some(current),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StageError;
    use crate::invoke::StageInvoker;
    use crate::stage::{InputContract, OutputContract, StageCommand};
    use crate::testing::{marker_stream, ScriptedExchange, ScriptedRunner};

    fn marker_spec(id: &str, token: &str) -> StageSpec {
        StageSpec::new(id, StageCommand::new("python3"))
            .with_output(OutputContract::marker_token(token))
    }

    fn sequencer(runner: ScriptedRunner) -> PipelineSequencer<ScriptedRunner> {
        PipelineSequencer::new(StageInvoker::new(runner))
    }

    #[tokio::test]
    async fn test_payload_passes_through_stages() {
        let runner = ScriptedRunner::new()
            .on(
                "research",
                ScriptedExchange::success(marker_stream(
                    "RESEARCH_JSON",
                    &serde_json::json!({"x": 1}),
                )),
            )
            .on(
                "services",
                ScriptedExchange::success(marker_stream(
                    "SERVICE_JSON",
                    &serde_json::json!({"y": 2}),
                )),
            );
        let sequencer = sequencer(runner);

        let stages = vec![
            marker_spec("research", "RESEARCH_JSON"),
            marker_spec("services", "SERVICE_JSON").with_input(InputContract::StdinJson),
        ];

        let result = sequencer
            .run(&stages, StagePayload::Null)
            .await
            .unwrap();

        assert!(result.is_complete());
        assert_eq!(
            result.output,
            Some(StagePayload::Json(serde_json::json!({"y": 2})))
        );

        // The second stage received the first stage's payload on stdin.
        let stdins = sequencer.invoker().runner().recorded_stdin();
        let sent: serde_json::Value = serde_json::from_slice(stdins[1].as_ref().unwrap()).unwrap();
        assert_eq!(sent, serde_json::json!({"x": 1}));
    }

    #[tokio::test]
    async fn test_process_failure_halts_with_partial_results() {
        let runner = ScriptedRunner::new()
            .on(
                "research",
                ScriptedExchange::success(marker_stream(
                    "RESEARCH_JSON",
                    &serde_json::json!({"x": 1}),
                )),
            )
            .on(
                "services",
                ScriptedExchange::failure(2, "", "Traceback: template exhausted\n"),
            )
            .on(
                "combine",
                ScriptedExchange::success(marker_stream("COMBINED_JSON", &serde_json::json!({}))),
            );
        let sequencer = sequencer(runner);

        let stages = vec![
            marker_spec("research", "RESEARCH_JSON"),
            marker_spec("services", "SERVICE_JSON"),
            marker_spec("combine", "COMBINED_JSON"),
        ];

        let result = sequencer.run(&stages, StagePayload::Null).await.unwrap();

        assert!(!result.is_complete());
        assert!(result.output.is_none());
        match result.error {
            Some(StageError::ProcessFailed {
                ref stage,
                code,
                ref stderr,
            }) => {
                assert_eq!(stage, "services");
                assert_eq!(code, 2);
                assert!(stderr.contains("template exhausted"));
            }
            ref other => panic!("expected ProcessFailed, got {other:?}"),
        }

        // Stage 1's output is preserved; stage 3 never ran.
        assert_eq!(
            result.payload_of("research"),
            Some(&StagePayload::Json(serde_json::json!({"x": 1})))
        );
        assert_eq!(result.traces.len(), 1);
        assert_eq!(
            sequencer.invoker().runner().calls(),
            vec!["research".to_string(), "services".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unparseable_output_degrades_and_continues() {
        let runner = ScriptedRunner::new()
            .on("nav", ScriptedExchange::success("log lines, no markers\n"))
            .on(
                "combine",
                ScriptedExchange::success(marker_stream(
                    "COMBINED_JSON",
                    &serde_json::json!({"done": true}),
                )),
            );
        let sequencer = sequencer(runner);

        let stages = vec![
            marker_spec("nav", "NAV_JSON").with_fallback(serde_json::json!({"nav": []})),
            marker_spec("combine", "COMBINED_JSON"),
        ];

        let result = sequencer.run(&stages, StagePayload::Null).await.unwrap();

        assert!(result.is_complete());
        assert!(result.is_degraded());
        assert_eq!(
            result.payload_of("nav"),
            Some(&StagePayload::Json(serde_json::json!({"nav": []})))
        );
        assert!(matches!(
            result.traces[0].disposition,
            StageDisposition::Degraded(DegradeReason::OutputUnparseable { .. })
        ));
        assert_eq!(
            result.output,
            Some(StagePayload::Json(serde_json::json!({"done": true})))
        );
    }

    #[tokio::test]
    async fn test_unparseable_without_fallback_substitutes_null() {
        let runner = ScriptedRunner::new()
            .on("nav", ScriptedExchange::success("no markers\n"))
            .on(
                "combine",
                ScriptedExchange::success(marker_stream("COMBINED_JSON", &serde_json::json!({}))),
            );
        let sequencer = sequencer(runner);

        let stages = vec![
            marker_spec("nav", "NAV_JSON"),
            marker_spec("combine", "COMBINED_JSON"),
        ];

        let result = sequencer.run(&stages, StagePayload::Null).await.unwrap();
        assert_eq!(result.payload_of("nav"), Some(&StagePayload::Null));
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn test_capability_fallback_end_to_end() {
        // A succeeds, B succeeds using A's output, C's capability is
        // unavailable: the pipeline completes with C's fallback and
        // both prior payloads in the trace.
        let runner = ScriptedRunner::new()
            .on(
                "a",
                ScriptedExchange::success(marker_stream("A_JSON", &serde_json::json!({"x": 1}))),
            )
            .on(
                "b",
                ScriptedExchange::success(marker_stream("B_JSON", &serde_json::json!({"y": 2}))),
            );
        let sequencer = sequencer(runner);

        let stages = vec![
            marker_spec("a", "A_JSON"),
            marker_spec("b", "B_JSON").with_input(InputContract::StdinJson),
            marker_spec("c", "C_JSON")
                .with_required_capability("ai-completion")
                .with_fallback(serde_json::json!({"z": "fallback"})),
        ];

        let result = sequencer.run(&stages, StagePayload::Null).await.unwrap();

        assert!(result.is_complete());
        assert!(result.is_degraded());
        assert_eq!(
            result.output,
            Some(StagePayload::Json(serde_json::json!({"z": "fallback"})))
        );
        assert_eq!(
            result.payload_of("a"),
            Some(&StagePayload::Json(serde_json::json!({"x": 1})))
        );
        assert_eq!(
            result.payload_of("b"),
            Some(&StagePayload::Json(serde_json::json!({"y": 2})))
        );
        assert!(matches!(
            result.traces[2].disposition,
            StageDisposition::Degraded(DegradeReason::CapabilityUnavailable { ref capability })
                if capability == "ai-completion"
        ));
        // C's process was never launched.
        assert_eq!(
            sequencer.invoker().runner().calls(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn test_rerun_produces_identical_payloads() {
        let stages = vec![marker_spec("research", "RESEARCH_JSON")];
        let make_runner = || {
            ScriptedRunner::new().on(
                "research",
                ScriptedExchange::success(marker_stream(
                    "RESEARCH_JSON",
                    &serde_json::json!({"x": 1}),
                )),
            )
        };

        let first = sequencer(make_runner())
            .run(&stages, StagePayload::Null)
            .await
            .unwrap();
        let second = sequencer(make_runner())
            .run(&stages, StagePayload::Null)
            .await
            .unwrap();

        assert_eq!(first.output, second.output);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_invalid_sequence_rejected() {
        let sequencer = sequencer(ScriptedRunner::new());
        let stages = vec![
            marker_spec("research", "RESEARCH_JSON"),
            marker_spec("research", "RESEARCH_JSON"),
        ];

        let err = sequencer.run(&stages, StagePayload::Null).await.unwrap_err();
        assert!(err.message.contains("duplicate"));
    }

    #[tokio::test]
    async fn test_progress_observer_sees_stage_output() {
        use crate::progress::{done_line, ProgressTracker};

        let stdout = format!(
            "{}\n{}\nSERVICE_JSON_START\n{{}}\nSERVICE_JSON_END\n",
            done_line("Asphalt Shingles"),
            done_line("Roof Repair"),
        );
        let runner = ScriptedRunner::new().on("services", ScriptedExchange::success(stdout));
        let sequencer = sequencer(runner);

        let tracker = ProgressTracker::new(["Asphalt Shingles", "Roof Repair"]);
        let stages = vec![marker_spec("services", "SERVICE_JSON")];
        let opts = InvokeOptions::observed(&tracker);

        let result = sequencer
            .run_with(&stages, StagePayload::Null, &opts)
            .await
            .unwrap();

        assert!(result.is_complete());
        let state = tracker.snapshot();
        assert_eq!(state.completed, 2);
    }
}
