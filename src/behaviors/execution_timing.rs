//! Entry notification plus elapsed time on exit.
//!
//! The stopwatch starts before `on_entry`, so the reported duration includes
//! the entry hook itself.

use std::sync::Arc;
use std::time::Duration;

use super::{outcome, Outcome, Stopwatch};
use crate::continuation::{forward, on_success};
use crate::invocation::{CallContext, Invocation};
use crate::pipeline::Interceptor;
use crate::return_value::apply_hook_override;
use crate::value::PendingResult;

pub trait ExecutionTimingHooks: Send + Sync + 'static {
    fn on_entry(&self, call: &CallContext);

    fn on_exit(&self, call: &CallContext, elapsed: Duration);
}

pub struct SyncExecutionTiming<H> {
    hooks: Arc<H>,
}

impl<H: ExecutionTimingHooks> SyncExecutionTiming<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: ExecutionTimingHooks> Interceptor for SyncExecutionTiming<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        let call = Arc::clone(invocation.call());
        let stopwatch = Stopwatch::start_new();
        self.hooks.on_entry(&call);
        invocation.proceed();

        match outcome(invocation) {
            Outcome::Succeeded => {
                self.hooks.on_exit(&call, stopwatch.stop());
                apply_hook_override(invocation);
            }
            Outcome::Pending(pending) => {
                let hooks = Arc::clone(&self.hooks);
                let wrapped = on_success(pending, move |value| async move {
                    hooks.on_exit(&call, stopwatch.stop());
                    Ok(forward(&call, value))
                });
                invocation.replace_return_value(PendingResult::Deferred(wrapped));
            }
            Outcome::Failed | Outcome::Missing => {}
        }
    }
}
