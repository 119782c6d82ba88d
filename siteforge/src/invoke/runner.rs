//! Stage execution backends.
//!
//! [`StageRunner`] is the seam between the orchestrator and however a
//! stage actually executes. [`ProcessRunner`] launches the stage's
//! external command; test runners in [`crate::testing`] replay scripted
//! output through the same contract, and an in-process implementation
//! is equally valid as long as the input/output/error contract holds.

use async_trait::async_trait;
use futures::future;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use super::invocation::{InvocationStatus, StageInvocation};
use crate::cancel::CancelToken;
use crate::stage::StageSpec;

/// Observes stdout lines as they are emitted by a running stage.
pub trait LineObserver: Send + Sync {
    /// Called once per line, in emission order.
    fn observe_line(&self, line: &str);
}

/// Per-invocation options.
#[derive(Default, Clone, Copy)]
pub struct InvokeOptions<'a> {
    /// Receives each stdout line as it arrives (progress tracking).
    pub observer: Option<&'a dyn LineObserver>,
    /// Cancels the invocation, killing the child process.
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> InvokeOptions<'a> {
    /// Options with a line observer.
    #[must_use]
    pub fn observed(observer: &'a dyn LineObserver) -> Self {
        Self {
            observer: Some(observer),
            cancel: None,
        }
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl std::fmt::Debug for InvokeOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeOptions")
            .field("observer", &self.observer.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

/// Failures at the execution layer, below error classification.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Spawn or stream I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The invocation was cancelled mid-flight.
    #[error("invocation cancelled")]
    Cancelled {
        /// The cancellation reason, if one was given.
        reason: Option<String>,
    },
}

/// Executes one stage, feeding output into the invocation record.
///
/// Implementations must append every observed stdout line and all
/// stderr text to `invocation`, call the observer per stdout line in
/// emission order, and finish the invocation with its terminal status
/// before returning `Ok`.
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Runs the stage to completion.
    async fn run(
        &self,
        spec: &StageSpec,
        stdin: Option<Vec<u8>>,
        opts: &InvokeOptions<'_>,
        invocation: &StageInvocation,
    ) -> Result<(), RunnerError>;
}

/// Runs stages as external processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Creates a new process runner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StageRunner for ProcessRunner {
    async fn run(
        &self,
        spec: &StageSpec,
        stdin: Option<Vec<u8>>,
        opts: &InvokeOptions<'_>,
        invocation: &StageInvocation,
    ) -> Result<(), RunnerError> {
        let mut cmd = Command::new(&spec.command.program);
        cmd.args(&spec.command.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        for (key, value) in &spec.command.envs {
            cmd.env(key, value);
        }
        if let Some(dir) = &spec.command.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn()?;

        if let Some(bytes) = stdin {
            let mut handle = child
                .stdin
                .take()
                .ok_or_else(|| std::io::Error::other("child stdin not captured"))?;
            handle.write_all(&bytes).await?;
            handle.shutdown().await?;
            // Dropping the handle closes the channel: end-of-input.
            drop(handle);
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("child stderr not captured"))?;

        let observer = opts.observer;
        let stdout_fut = async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                invocation.append_stdout_line(&line);
                if let Some(obs) = observer {
                    obs.observe_line(&line);
                }
            }
            std::io::Result::Ok(())
        };
        let stderr_fut = async move {
            let mut buf = String::new();
            BufReader::new(stderr).read_to_string(&mut buf).await?;
            invocation.append_stderr(&buf);
            std::io::Result::Ok(())
        };
        // Streams must drain before wait() or a chatty child can fill
        // the pipe buffer and deadlock.
        let streams = future::try_join(stdout_fut, stderr_fut);

        let status = if let Some(token) = opts.cancel {
            let waited = {
                let mut done = Box::pin(async {
                    streams.await?;
                    child.wait().await
                });
                tokio::select! {
                    res = &mut done => Some(res),
                    () = token.cancelled() => None,
                }
            };
            match waited {
                Some(res) => res?,
                None => {
                    let _ = child.start_kill();
                    let killed = child.wait().await.ok();
                    invocation.finish(InvocationStatus::Failure(
                        killed.and_then(|s| s.code()).unwrap_or(-1),
                    ));
                    return Err(RunnerError::Cancelled {
                        reason: token.reason(),
                    });
                }
            }
        } else {
            streams.await?;
            child.wait().await?
        };

        if status.success() {
            invocation.finish(InvocationStatus::Success);
        } else {
            invocation.finish(InvocationStatus::Failure(status.code().unwrap_or(-1)));
        }
        Ok(())
    }
}
