//! Entry/exit notification.
//!
//! `on_entry` fires before `proceed`; `on_exit` fires once the call's
//! outcome (immediate or deferred) has settled successfully. A failure
//! propagates without `on_exit` firing.

use std::sync::Arc;

use async_trait::async_trait;

use super::{bridge_hook, fail, outcome, Outcome};
use crate::continuation::{forward, on_success};
use crate::invocation::{CallContext, Invocation};
use crate::pipeline::Interceptor;
use crate::return_value::apply_hook_override;
use crate::value::PendingResult;

/// Synchronous entry/exit hooks.
pub trait ExecutionHooks: Send + Sync + 'static {
    fn on_entry(&self, call: &CallContext);

    fn on_exit(&self, call: &CallContext);
}

/// Asynchronous entry/exit hooks.
#[async_trait]
pub trait AsyncExecutionHooks: Send + Sync + 'static {
    async fn on_entry_async(&self, call: &CallContext);

    async fn on_exit_async(&self, call: &CallContext);
}

/// Entry/exit with synchronous hooks regardless of call mode.
pub struct SyncExecution<H> {
    hooks: Arc<H>,
}

impl<H: ExecutionHooks> SyncExecution<H> {
    pub fn new(hooks: H) -> Self {
        Self::from_arc(Arc::new(hooks))
    }

    pub fn from_arc(hooks: Arc<H>) -> Self {
        Self { hooks }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: ExecutionHooks> Interceptor for SyncExecution<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        let call = Arc::clone(invocation.call());
        self.hooks.on_entry(&call);
        invocation.proceed();

        match outcome(invocation) {
            Outcome::Succeeded => {
                self.hooks.on_exit(&call);
                apply_hook_override(invocation);
            }
            Outcome::Pending(pending) => {
                let hooks = Arc::clone(&self.hooks);
                let wrapped = on_success(pending, move |value| async move {
                    hooks.on_exit(&call);
                    Ok(forward(&call, value))
                });
                invocation.replace_return_value(PendingResult::Deferred(wrapped));
            }
            Outcome::Failed | Outcome::Missing => {}
        }
    }
}

/// Entry/exit with asynchronous hooks regardless of call mode.
pub struct AsyncExecution<H> {
    hooks: Arc<H>,
}

impl<H: AsyncExecutionHooks> AsyncExecution<H> {
    pub fn new(hooks: H) -> Self {
        Self::from_arc(Arc::new(hooks))
    }

    pub fn from_arc(hooks: Arc<H>) -> Self {
        Self { hooks }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: AsyncExecutionHooks> Interceptor for AsyncExecution<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        let call = Arc::clone(invocation.call());
        if let Err(e) = bridge_entry(invocation, &self.hooks, &call) {
            fail(invocation, e);
            return;
        }
        invocation.proceed();

        match outcome(invocation) {
            Outcome::Succeeded => {
                let hooks = Arc::clone(&self.hooks);
                let exit_call = Arc::clone(&call);
                let delivered = bridge_hook(invocation, move || async move {
                    hooks.on_exit_async(&exit_call).await;
                });
                match delivered {
                    Ok(()) => apply_hook_override(invocation),
                    Err(e) => fail(invocation, e),
                }
            }
            Outcome::Pending(pending) => {
                let wrapped = exit_continuation(pending, Arc::clone(&self.hooks), call);
                invocation.replace_return_value(PendingResult::Deferred(wrapped));
            }
            Outcome::Failed | Outcome::Missing => {}
        }
    }
}

/// Entry/exit whose hooks mirror the call's own mode.
///
/// Sync calls get the synchronous hooks directly; async calls get the
/// asynchronous hooks, the exit hook awaited inside the continuation.
pub struct Execution<H> {
    hooks: Arc<H>,
}

impl<H: ExecutionHooks + AsyncExecutionHooks> Execution<H> {
    pub fn new(hooks: H) -> Self {
        Self::from_arc(Arc::new(hooks))
    }

    pub fn from_arc(hooks: Arc<H>) -> Self {
        Self { hooks }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: ExecutionHooks + AsyncExecutionHooks> Interceptor for Execution<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        let call = Arc::clone(invocation.call());

        if !invocation.mode().is_async() {
            ExecutionHooks::on_entry(self.hooks.as_ref(), &call);
            invocation.proceed();
            match outcome(invocation) {
                Outcome::Succeeded => {
                    ExecutionHooks::on_exit(self.hooks.as_ref(), &call);
                    apply_hook_override(invocation);
                }
                Outcome::Pending(pending) => {
                    let hooks = Arc::clone(&self.hooks);
                    let wrapped = on_success(pending, move |value| async move {
                        ExecutionHooks::on_exit(hooks.as_ref(), &call);
                        Ok(forward(&call, value))
                    });
                    invocation.replace_return_value(PendingResult::Deferred(wrapped));
                }
                Outcome::Failed | Outcome::Missing => {}
            }
            return;
        }

        if let Err(e) = bridge_entry(invocation, &self.hooks, &call) {
            fail(invocation, e);
            return;
        }
        invocation.proceed();
        if let Outcome::Pending(pending) = outcome(invocation) {
            let wrapped = exit_continuation(pending, Arc::clone(&self.hooks), call);
            invocation.replace_return_value(PendingResult::Deferred(wrapped));
        }
    }
}

fn bridge_entry<H: AsyncExecutionHooks>(
    invocation: &Invocation,
    hooks: &Arc<H>,
    call: &Arc<CallContext>,
) -> crate::error::Result<()> {
    let hooks = Arc::clone(hooks);
    let call = Arc::clone(call);
    bridge_hook(invocation, move || async move {
        hooks.on_entry_async(&call).await;
    })
}

fn exit_continuation<H: AsyncExecutionHooks>(
    pending: PendingResult,
    hooks: Arc<H>,
    call: Arc<CallContext>,
) -> crate::value::DeferredValue {
    on_success(pending, move |value| async move {
        hooks.on_exit_async(&call).await;
        Ok(forward(&call, value))
    })
}
