//! Failure interception.
//!
//! The hook receives the unwrapped failure of the call and decides the
//! outcome: `Ok(value)` replaces the failure, `Err(_)` propagates (the hook
//! may hand back the same error). Successful calls pass through untouched.
//!
//! A synchronous hook on an async call runs inside the continuation, once
//! the pending result has settled; the caller gets its future back without
//! waiting. Only a sync-declared call whose cell an inner behavior deferred
//! is settled through the bridge.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::fail;
use crate::continuation::on_settled;
use crate::error::{InterceptError, Result};
use crate::invocation::{CallContext, Invocation};
use crate::pipeline::Interceptor;
use crate::value::{PendingResult, Value};

pub trait ExceptionHooks: Send + Sync + 'static {
    fn on_exception(&self, call: &CallContext, error: InterceptError) -> Result<Value>;
}

#[async_trait]
pub trait AsyncExceptionHooks: Send + Sync + 'static {
    async fn on_exception_async(&self, call: &CallContext, error: InterceptError) -> Result<Value>;
}

/// Failure handling with a synchronous hook regardless of call mode.
pub struct SyncException<H> {
    hooks: Arc<H>,
}

impl<H: ExceptionHooks> SyncException<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: ExceptionHooks> Interceptor for SyncException<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        invocation.proceed();
        recover_now(Arc::clone(&self.hooks), invocation);
    }
}

/// Failure handling with an asynchronous hook regardless of call mode.
pub struct AsyncException<H> {
    hooks: Arc<H>,
}

impl<H: AsyncExceptionHooks> AsyncException<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: AsyncExceptionHooks> Interceptor for AsyncException<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        invocation.proceed();
        if invocation.mode().is_async() {
            recover_later(Arc::clone(&self.hooks), invocation);
        } else {
            recover_bridged(Arc::clone(&self.hooks), invocation);
        }
    }
}

/// Failure handling whose hook mirrors the call's own mode.
pub struct Exception<H> {
    hooks: Arc<H>,
}

impl<H: ExceptionHooks + AsyncExceptionHooks> Exception<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: ExceptionHooks + AsyncExceptionHooks> Interceptor for Exception<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        invocation.proceed();
        if invocation.mode().is_async() {
            recover_later(Arc::clone(&self.hooks), invocation);
        } else {
            recover_now(Arc::clone(&self.hooks), invocation);
        }
    }
}

/// Hand any failure to a synchronous hook as soon as the call settles.
fn recover_now<H: ExceptionHooks>(hooks: Arc<H>, invocation: &mut Invocation) {
    let call = Arc::clone(invocation.call());
    let Some(pending) = invocation.take_return_value() else {
        return;
    };

    if invocation.mode().is_async() {
        let wrapped = on_settled(pending, move |outcome| {
            futures::future::ready(handle(hooks.as_ref(), &call, outcome))
        });
        invocation.replace_return_value(PendingResult::Deferred(wrapped));
        return;
    }

    let outcome = match pending {
        PendingResult::Ready(outcome) => outcome,
        PendingResult::Deferred(deferred) => {
            // Only a failure of the call itself reaches the hook.
            let settled = invocation
                .bridge()
                .and_then(|bridge| Ok(bridge.block_on(move || deferred)?));
            match settled {
                Ok(outcome) => outcome,
                Err(e) => {
                    fail(invocation, e);
                    return;
                }
            }
        }
    };
    let handled = handle(hooks.as_ref(), &call, outcome);
    invocation.replace_return_value(PendingResult::Ready(handled));
}

fn handle<H: ExceptionHooks>(
    hooks: &H,
    call: &CallContext,
    outcome: Result<Value>,
) -> Result<Value> {
    match outcome {
        Ok(value) => Ok(value),
        Err(error) => {
            caught(call, &error);
            let handled = hooks.on_exception(call, error);
            with_override(call, handled)
        }
    }
}

/// Attach an async hook to the pending result as a continuation.
fn recover_later<H: AsyncExceptionHooks>(hooks: Arc<H>, invocation: &mut Invocation) {
    let Some(pending) = invocation.take_return_value() else {
        return;
    };
    let wrapped = continuation(hooks, Arc::clone(invocation.call()), pending);
    invocation.replace_return_value(PendingResult::Deferred(wrapped));
}

/// Run the async hook continuation to completion from a sync call.
fn recover_bridged<H: AsyncExceptionHooks>(hooks: Arc<H>, invocation: &mut Invocation) {
    let Some(pending) = invocation.take_return_value() else {
        return;
    };
    if let PendingResult::Ready(Ok(_)) = pending {
        invocation.replace_return_value(pending);
        return;
    }

    let wrapped = continuation(hooks, Arc::clone(invocation.call()), pending);
    let outcome = invocation
        .bridge()
        .and_then(|bridge| bridge.run_to_completion(move || wrapped));
    invocation.replace_return_value(PendingResult::Ready(outcome));
}

fn continuation<H: AsyncExceptionHooks>(
    hooks: Arc<H>,
    call: Arc<CallContext>,
    pending: PendingResult,
) -> crate::value::DeferredValue {
    on_settled(pending, move |outcome| async move {
        match outcome {
            Ok(value) => Ok(value),
            Err(error) => {
                caught(&call, &error);
                let handled = hooks.on_exception_async(&call, error).await;
                with_override(&call, handled)
            }
        }
    })
}

fn caught(call: &CallContext, error: &InterceptError) {
    debug!(
        call_id = %call.call_id(),
        method = %call.full_method_name(),
        error = %error,
        "Intercepted failure"
    );
}

fn with_override(call: &CallContext, handled: Result<Value>) -> Result<Value> {
    match call.take_return_override() {
        Some(value) => Ok(value),
        None => handled,
    }
}
