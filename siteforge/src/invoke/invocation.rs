//! Execution record for one stage process attempt.

use chrono::{DateTime, Utc};

use crate::utils::now_utc;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// The exit classification of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "code", rename_all = "snake_case")]
pub enum InvocationStatus {
    /// The process has not terminated yet.
    Pending,
    /// The process exited zero.
    Success,
    /// The process exited non-zero (signal deaths are recorded as -1).
    Failure(i32),
}

impl InvocationStatus {
    /// True once the invocation has terminated.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One execution attempt of a stage.
///
/// Accumulators are append-only while the invocation is pending and
/// frozen once a terminal status is recorded; exactly one terminal
/// status is ever recorded (later attempts are ignored).
#[derive(Debug)]
pub struct StageInvocation {
    stage_id: String,
    started_at: DateTime<Utc>,
    status: RwLock<InvocationStatus>,
    stdout: Mutex<String>,
    stderr: Mutex<String>,
}

impl StageInvocation {
    /// Creates a pending invocation record.
    #[must_use]
    pub fn new(stage_id: impl Into<String>) -> Self {
        Self {
            stage_id: stage_id.into(),
            started_at: now_utc(),
            status: RwLock::new(InvocationStatus::Pending),
            stdout: Mutex::new(String::new()),
            stderr: Mutex::new(String::new()),
        }
    }

    /// The stage this invocation belongs to.
    #[must_use]
    pub fn stage_id(&self) -> &str {
        &self.stage_id
    }

    /// When the process was launched.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The current status.
    #[must_use]
    pub fn status(&self) -> InvocationStatus {
        *self.status.read()
    }

    /// Appends one stdout line. Ignored after termination.
    pub fn append_stdout_line(&self, line: &str) {
        if self.status().is_terminal() {
            return;
        }
        let mut buf = self.stdout.lock();
        buf.push_str(line);
        buf.push('\n');
    }

    /// Appends stderr text. Ignored after termination.
    pub fn append_stderr(&self, text: &str) {
        if self.status().is_terminal() {
            return;
        }
        self.stderr.lock().push_str(text);
    }

    /// Records the terminal status, freezing the accumulators.
    ///
    /// Returns false (and changes nothing) if the invocation already
    /// terminated.
    pub fn finish(&self, status: InvocationStatus) -> bool {
        if !status.is_terminal() {
            return false;
        }
        let mut current = self.status.write();
        if current.is_terminal() {
            return false;
        }
        *current = status;
        true
    }

    /// The captured stdout text.
    #[must_use]
    pub fn stdout(&self) -> String {
        self.stdout.lock().clone()
    }

    /// The captured stderr text.
    #[must_use]
    pub fn stderr(&self) -> String {
        self.stderr.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let inv = StageInvocation::new("services");
        assert_eq!(inv.status(), InvocationStatus::Pending);

        inv.append_stdout_line("SERVICE_JSON_START");
        inv.append_stdout_line("{}");
        inv.append_stdout_line("SERVICE_JSON_END");
        inv.append_stderr("warning: slow template\n");

        assert!(inv.finish(InvocationStatus::Success));
        assert_eq!(inv.status(), InvocationStatus::Success);
        assert_eq!(inv.stdout(), "SERVICE_JSON_START\n{}\nSERVICE_JSON_END\n");
        assert_eq!(inv.stderr(), "warning: slow template\n");
    }

    #[test]
    fn test_accumulators_frozen_after_termination() {
        let inv = StageInvocation::new("nav");
        inv.append_stdout_line("before");
        inv.finish(InvocationStatus::Failure(2));

        inv.append_stdout_line("after");
        inv.append_stderr("after");

        assert_eq!(inv.stdout(), "before\n");
        assert_eq!(inv.stderr(), "");
    }

    #[test]
    fn test_exactly_one_terminal_status() {
        let inv = StageInvocation::new("nav");
        assert!(inv.finish(InvocationStatus::Failure(1)));
        assert!(!inv.finish(InvocationStatus::Success));
        assert_eq!(inv.status(), InvocationStatus::Failure(1));
    }

    #[test]
    fn test_finish_rejects_pending() {
        let inv = StageInvocation::new("nav");
        assert!(!inv.finish(InvocationStatus::Pending));
        assert_eq!(inv.status(), InvocationStatus::Pending);
    }
}
