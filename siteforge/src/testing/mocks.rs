//! Scripted stage runners for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::invoke::{InvocationStatus, InvokeOptions, RunnerError, StageInvocation, StageRunner};
use crate::stage::StageSpec;

/// One canned process exchange: stdout, stderr, exit code.
#[derive(Debug, Clone)]
pub struct ScriptedExchange {
    /// Text replayed line-by-line as the stage's stdout.
    pub stdout: String,
    /// Text recorded as the stage's stderr.
    pub stderr: String,
    /// The exit code to report.
    pub exit_code: i32,
}

impl ScriptedExchange {
    /// A zero-exit exchange with the given stdout.
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// A non-zero-exit exchange.
    #[must_use]
    pub fn failure(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}

/// A runner that replays canned exchanges instead of spawning
/// processes, recording every call.
///
/// Unscripted stages fail with an I/O error, mirroring a missing
/// program on disk.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    exchanges: Mutex<HashMap<String, ScriptedExchange>>,
    calls: Mutex<Vec<String>>,
    stdins: Mutex<Vec<Option<Vec<u8>>>>,
}

impl ScriptedRunner {
    /// Creates a runner with no scripted stages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the exchange for a stage.
    #[must_use]
    pub fn on(self, stage_id: impl Into<String>, exchange: ScriptedExchange) -> Self {
        self.exchanges.lock().insert(stage_id.into(), exchange);
        self
    }

    /// The stage ids invoked so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// The stdin bytes handed to each invocation, in call order.
    #[must_use]
    pub fn recorded_stdin(&self) -> Vec<Option<Vec<u8>>> {
        self.stdins.lock().clone()
    }
}

#[async_trait]
impl StageRunner for ScriptedRunner {
    async fn run(
        &self,
        spec: &StageSpec,
        stdin: Option<Vec<u8>>,
        opts: &InvokeOptions<'_>,
        invocation: &StageInvocation,
    ) -> Result<(), RunnerError> {
        self.calls.lock().push(spec.id.clone());
        self.stdins.lock().push(stdin);

        let exchange = self
            .exchanges
            .lock()
            .get(&spec.id)
            .cloned()
            .ok_or_else(|| {
                RunnerError::Io(std::io::Error::other(format!(
                    "no scripted exchange for stage '{}'",
                    spec.id
                )))
            })?;

        for line in exchange.stdout.lines() {
            invocation.append_stdout_line(line);
            if let Some(observer) = opts.observer {
                observer.observe_line(line);
            }
        }
        if !exchange.stderr.is_empty() {
            invocation.append_stderr(&exchange.stderr);
        }

        let status = if exchange.exit_code == 0 {
            InvocationStatus::Success
        } else {
            InvocationStatus::Failure(exchange.exit_code)
        };
        invocation.finish(status);
        Ok(())
    }
}
