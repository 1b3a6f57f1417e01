//! Elapsed-time reporting.
//!
//! The stopwatch starts immediately before `proceed` and stops when the
//! call's outcome settles. Failed calls are not reported.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{bridge_hook, fail, outcome, Outcome, Stopwatch};
use crate::continuation::{forward, on_success};
use crate::invocation::{CallContext, Invocation};
use crate::pipeline::Interceptor;
use crate::return_value::apply_hook_override;
use crate::value::PendingResult;

pub trait TimingHooks: Send + Sync + 'static {
    fn on_completed(&self, call: &CallContext, elapsed: Duration);
}

#[async_trait]
pub trait AsyncTimingHooks: Send + Sync + 'static {
    async fn on_completed_async(&self, call: &CallContext, elapsed: Duration);
}

/// Timing with a synchronous report regardless of call mode.
pub struct SyncTiming<H> {
    hooks: Arc<H>,
}

impl<H: TimingHooks> SyncTiming<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: TimingHooks> Interceptor for SyncTiming<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        let call = Arc::clone(invocation.call());
        let stopwatch = Stopwatch::start_new();
        invocation.proceed();

        match outcome(invocation) {
            Outcome::Succeeded => {
                self.hooks.on_completed(&call, stopwatch.stop());
                apply_hook_override(invocation);
            }
            Outcome::Pending(pending) => {
                let hooks = Arc::clone(&self.hooks);
                let wrapped = on_success(pending, move |value| async move {
                    hooks.on_completed(&call, stopwatch.stop());
                    Ok(forward(&call, value))
                });
                invocation.replace_return_value(PendingResult::Deferred(wrapped));
            }
            Outcome::Failed | Outcome::Missing => {}
        }
    }
}

/// Timing with an asynchronous report regardless of call mode.
pub struct AsyncTiming<H> {
    hooks: Arc<H>,
}

impl<H: AsyncTimingHooks> AsyncTiming<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: AsyncTimingHooks> Interceptor for AsyncTiming<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        let call = Arc::clone(invocation.call());
        let stopwatch = Stopwatch::start_new();
        invocation.proceed();

        match outcome(invocation) {
            Outcome::Succeeded => {
                let elapsed = stopwatch.stop();
                let hooks = Arc::clone(&self.hooks);
                let report_call = Arc::clone(&call);
                let delivered = bridge_hook(invocation, move || async move {
                    hooks.on_completed_async(&report_call, elapsed).await;
                });
                match delivered {
                    Ok(()) => apply_hook_override(invocation),
                    Err(e) => fail(invocation, e),
                }
            }
            Outcome::Pending(pending) => {
                let wrapped = report_async(pending, Arc::clone(&self.hooks), call, stopwatch);
                invocation.replace_return_value(PendingResult::Deferred(wrapped));
            }
            Outcome::Failed | Outcome::Missing => {}
        }
    }
}

/// Timing whose report mirrors the call's own mode.
pub struct Timing<H> {
    hooks: Arc<H>,
}

impl<H: TimingHooks + AsyncTimingHooks> Timing<H> {
    pub fn new(hooks: H) -> Self {
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }
}

impl<H: TimingHooks + AsyncTimingHooks> Interceptor for Timing<H> {
    fn intercept(&self, invocation: &mut Invocation) {
        let call = Arc::clone(invocation.call());
        let stopwatch = Stopwatch::start_new();
        invocation.proceed();

        match outcome(invocation) {
            Outcome::Succeeded => {
                TimingHooks::on_completed(self.hooks.as_ref(), &call, stopwatch.stop());
                apply_hook_override(invocation);
            }
            Outcome::Pending(pending) if invocation.mode().is_async() => {
                let wrapped = report_async(pending, Arc::clone(&self.hooks), call, stopwatch);
                invocation.replace_return_value(PendingResult::Deferred(wrapped));
            }
            // Sync call whose cell an inner behavior deferred.
            Outcome::Pending(pending) => {
                let hooks = Arc::clone(&self.hooks);
                let wrapped = on_success(pending, move |value| async move {
                    TimingHooks::on_completed(hooks.as_ref(), &call, stopwatch.stop());
                    Ok(forward(&call, value))
                });
                invocation.replace_return_value(PendingResult::Deferred(wrapped));
            }
            Outcome::Failed | Outcome::Missing => {}
        }
    }
}

fn report_async<H: AsyncTimingHooks>(
    pending: PendingResult,
    hooks: Arc<H>,
    call: Arc<CallContext>,
    stopwatch: Stopwatch,
) -> crate::value::DeferredValue {
    on_success(pending, move |value| async move {
        hooks.on_completed_async(&call, stopwatch.stop()).await;
        Ok(forward(&call, value))
    })
}
