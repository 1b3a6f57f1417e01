//! Continuation wrapper.
//!
//! Attaches a post-hook to a pending result without blocking: the returned
//! deferred value settles only after the original has settled and the hook
//! has run. The void shape is the value shape over `Value::unit()`, so one
//! path serves both.

use std::future::Future;

use futures::FutureExt;

use crate::error::Result;
use crate::invocation::CallContext;
use crate::value::{DeferredValue, PendingResult, Value};

/// Run `hook` with the full outcome once `pending` settles.
///
/// The new deferred value settles with whatever the hook returns, which is
/// how failures get converted into values.
pub fn on_settled<H, Fut>(pending: PendingResult, hook: H) -> DeferredValue
where
    H: FnOnce(Result<Value>) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    let original = pending.into_future();
    async move {
        let outcome = original.await;
        hook(outcome).await
    }
    .boxed()
}

/// Run `hook` with the value once `pending` settles successfully.
///
/// Failures pass through untouched and the hook does not run.
pub fn on_success<H, Fut>(pending: PendingResult, hook: H) -> DeferredValue
where
    H: FnOnce(Value) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    on_settled(pending, move |outcome| async move {
        match outcome {
            Ok(value) => hook(value).await,
            Err(e) => Err(e),
        }
    })
}

/// Result an observing hook forwards: `value`, unless the hook overrode it.
pub fn forward(call: &CallContext, value: Value) -> Value {
    call.take_return_override().unwrap_or(value)
}
