//! Cross-cutting behaviors built on the dispatch layer.
//!
//! Each concern comes in three flavors that differ only in how the hook is
//! delivered:
//!
//! | Flavor | Sync call | Async call |
//! |--------|-----------|------------|
//! | `Sync*` | direct call | sync hook inside the continuation |
//! | `Async*` | bridge | awaited inside the continuation |
//! | mirroring | direct call to the sync hook | async hook awaited inside the continuation |
//!
//! Entry hooks of async flavors are delivered through the bridge, since the
//! interception point itself is synchronous and entry must strictly precede
//! `proceed`. On an async call this holds the calling thread for as long as
//! the entry hook runs. The hook itself is polled on a bridge worker, so it
//! never needs the caller's runtime and a current-thread caller cannot
//! deadlock on it; a long-running entry hook does stall that runtime.

mod exception;
mod execution;
mod execution_timing;
mod logging;
mod stopwatch;
#[cfg(test)]
pub(crate) mod test_support;
mod timing;

pub use exception::{AsyncException, AsyncExceptionHooks, Exception, ExceptionHooks, SyncException};
pub use execution::{AsyncExecution, AsyncExecutionHooks, Execution, ExecutionHooks, SyncExecution};
pub use execution_timing::{ExecutionTimingHooks, SyncExecutionTiming};
pub use logging::{LogException, LogExecution, LogTiming};
pub use stopwatch::Stopwatch;
pub use timing::{AsyncTiming, AsyncTimingHooks, SyncTiming, Timing, TimingHooks};

use std::future::Future;

use tracing::error;

use crate::error::{InterceptError, Result};
use crate::invocation::Invocation;
use crate::value::PendingResult;

/// State of the return cell right after `proceed`.
pub(crate) enum Outcome {
    /// A sync call completed successfully; the value is still in the cell.
    Succeeded,
    /// A sync call failed; the failure is still in the cell.
    Failed,
    /// The call settles later; the pending value was taken out of the cell.
    Pending(PendingResult),
    /// Nothing was produced.
    Missing,
}

/// Classify the cell for post-hook delivery.
///
/// Async-classified calls always take the continuation path, even when the
/// body completed synchronously. A sync call whose cell an inner behavior
/// replaced with a deferred value takes it too.
pub(crate) fn outcome(invocation: &mut Invocation) -> Outcome {
    let deferred = invocation
        .return_value()
        .map(PendingResult::is_deferred)
        .unwrap_or(false);

    if invocation.mode().is_async() || deferred {
        return match invocation.take_return_value() {
            Some(pending) => Outcome::Pending(pending),
            None => Outcome::Missing,
        };
    }

    match invocation.return_value() {
        Some(PendingResult::Ready(Ok(_))) => Outcome::Succeeded,
        Some(PendingResult::Ready(Err(_))) => Outcome::Failed,
        _ => Outcome::Missing,
    }
}

/// Deliver an async hook from the synchronous interception point.
pub(crate) fn bridge_hook<F, Fut>(invocation: &Invocation, hook: F) -> Result<()>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    invocation.bridge()?.block_on(hook)?;
    Ok(())
}

/// Replace the cell with a failure the caller will observe.
pub(crate) fn fail(invocation: &mut Invocation, error: InterceptError) {
    error!(
        call_id = %invocation.call().call_id(),
        method = %invocation.call().full_method_name(),
        error = %error,
        "Hook delivery failed"
    );
    invocation.replace_return_value(PendingResult::Ready(Err(error)));
}
