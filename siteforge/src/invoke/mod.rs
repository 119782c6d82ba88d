//! Stage invocation: process launch, capture, and classification.

mod invocation;
mod invoker;
mod runner;

pub use invocation::{InvocationStatus, StageInvocation};
pub use invoker::{InvocationOutcome, StageInvoker};
pub use runner::{InvokeOptions, LineObserver, ProcessRunner, RunnerError, StageRunner};
