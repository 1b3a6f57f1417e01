//! Ready-made hook sets that report through `tracing`.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::exception::{AsyncExceptionHooks, ExceptionHooks};
use super::execution::{AsyncExecutionHooks, ExecutionHooks};
use super::execution_timing::ExecutionTimingHooks;
use super::timing::{AsyncTimingHooks, TimingHooks};
use crate::error::{InterceptError, Result};
use crate::invocation::CallContext;
use crate::mode::ReturnShape;
use crate::value::Value;

/// Logs method entry and exit with the call's arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExecution;

impl LogExecution {
    fn entered(call: &CallContext) {
        info!(
            call_id = %call.call_id(),
            method = %call.full_method_name(),
            args = %call.arguments(),
            "Entering"
        );
    }

    fn exited(call: &CallContext) {
        info!(
            call_id = %call.call_id(),
            method = %call.full_method_name(),
            "Exited"
        );
    }
}

impl ExecutionHooks for LogExecution {
    fn on_entry(&self, call: &CallContext) {
        Self::entered(call);
    }

    fn on_exit(&self, call: &CallContext) {
        Self::exited(call);
    }
}

#[async_trait]
impl AsyncExecutionHooks for LogExecution {
    async fn on_entry_async(&self, call: &CallContext) {
        Self::entered(call);
    }

    async fn on_exit_async(&self, call: &CallContext) {
        Self::exited(call);
    }
}

impl ExecutionTimingHooks for LogExecution {
    fn on_entry(&self, call: &CallContext) {
        Self::entered(call);
    }

    fn on_exit(&self, call: &CallContext, elapsed: Duration) {
        LogTiming::completed(call, elapsed);
    }
}

/// Logs how long each successful call took.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTiming;

impl LogTiming {
    fn completed(call: &CallContext, elapsed: Duration) {
        info!(
            call_id = %call.call_id(),
            method = %call.full_method_name(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "Completed"
        );
    }
}

impl TimingHooks for LogTiming {
    fn on_completed(&self, call: &CallContext, elapsed: Duration) {
        Self::completed(call, elapsed);
    }
}

#[async_trait]
impl AsyncTimingHooks for LogTiming {
    async fn on_completed_async(&self, call: &CallContext, elapsed: Duration) {
        Self::completed(call, elapsed);
    }
}

type Fallback = Arc<dyn Fn(&CallContext) -> Value + Send + Sync>;

/// Logs failures and swallows them, substituting a fallback value.
///
/// Methods without a value (`()` or a future of `()`) get `()` whatever the
/// configured fallback.
#[derive(Clone)]
pub struct LogException {
    fallback: Fallback,
}

impl LogException {
    /// Substitute a clone of `value` for every failure.
    pub fn returning<T>(value: T) -> Self
    where
        T: Any + Clone + Send + Sync,
    {
        Self::with_fallback(move |_| Value::new(value.clone()))
    }

    /// Compute the substitute from the failed call.
    pub fn with_fallback<F>(fallback: F) -> Self
    where
        F: Fn(&CallContext) -> Value + Send + Sync + 'static,
    {
        Self {
            fallback: Arc::new(fallback),
        }
    }

    fn recover(&self, call: &CallContext, error: InterceptError) -> Value {
        warn!(
            call_id = %call.call_id(),
            method = %call.full_method_name(),
            error = %error,
            "Call failed, substituting fallback"
        );
        match call.method().shape() {
            ReturnShape::Unit | ReturnShape::DeferredUnit => Value::unit(),
            ReturnShape::Value | ReturnShape::DeferredValue => (self.fallback)(call),
        }
    }
}

impl std::fmt::Debug for LogException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogException").finish_non_exhaustive()
    }
}

impl ExceptionHooks for LogException {
    fn on_exception(&self, call: &CallContext, error: InterceptError) -> Result<Value> {
        Ok(self.recover(call, error))
    }
}

#[async_trait]
impl AsyncExceptionHooks for LogException {
    async fn on_exception_async(&self, call: &CallContext, error: InterceptError) -> Result<Value> {
        Ok(self.recover(call, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behaviors::{Exception, Execution, SyncExecutionTiming, Timing};
    use crate::invocation::{Arguments, MethodInfo, TargetInfo};
    use crate::pipeline::Pipeline;

    fn failing_call(method: MethodInfo) -> CallContext {
        CallContext::new(TargetInfo::named("Business"), method, Arguments::new())
    }

    #[test]
    fn test_returning_substitutes_value() {
        let hooks = LogException::returning(-1i32);
        let call = failing_call(MethodInfo::sync::<i32>("count"));

        let value = ExceptionHooks::on_exception(&hooks, &call, InterceptError::target("bad"))
            .unwrap();

        assert_eq!(value.downcast::<i32>().ok(), Some(-1));
    }

    #[test]
    fn test_void_methods_get_unit() {
        let hooks = LogException::returning(-1i32);

        for method in [MethodInfo::sync::<()>("do"), MethodInfo::deferred::<()>("do_async")] {
            let call = failing_call(method);
            let value = ExceptionHooks::on_exception(&hooks, &call, InterceptError::target("bad"))
                .unwrap();
            assert!(value.is::<()>());
        }
    }

    #[test]
    fn test_fallback_sees_call() {
        let hooks = LogException::with_fallback(|call| Value::new(call.full_method_name()));
        let call = failing_call(MethodInfo::sync::<String>("name"));

        let value = ExceptionHooks::on_exception(&hooks, &call, InterceptError::target("bad"))
            .unwrap();

        assert_eq!(value.downcast::<String>().ok().as_deref(), Some("Business.name()"));
    }

    #[tokio::test]
    async fn test_full_logging_stack() {
        crate::utils::bootstrap::try_init_tracing();
        let pipeline = Pipeline::builder()
            .with(Execution::new(LogExecution))
            .with(SyncExecutionTiming::new(LogExecution))
            .with(Timing::new(LogTiming))
            .with(Exception::new(LogException::returning(0u64)))
            .build();

        let n: u64 = pipeline
            .call(
                TargetInfo::named("Business"),
                "count",
                Arguments::new().with("msec", 5u64),
                |args: &Arguments| Ok::<_, InterceptError>(*args.get::<u64>(0).unwrap_or(&0)),
            )
            .unwrap();
        assert_eq!(n, 5);

        let n: u64 = pipeline
            .call_async(
                TargetInfo::named("Business"),
                "count_async",
                Arguments::new(),
                |_| async { Err::<u64, _>(InterceptError::target("boom")) },
            )
            .await
            .unwrap();
        assert_eq!(n, 0);
    }
}
