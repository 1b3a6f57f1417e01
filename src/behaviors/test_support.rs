//! Recording hooks and a small target for behavior tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{
    AsyncExecutionHooks, AsyncTimingHooks, ExecutionHooks, ExecutionTimingHooks, TimingHooks,
};
use crate::error::Result;
use crate::invocation::{Arguments, CallContext, TargetInfo};
use crate::pipeline::{Interceptor, Pipeline};

#[derive(Debug, thiserror::Error)]
#[error("failed")]
pub struct TestTargetError;

/// Records hook and body events in order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<&'static str>>>,
    elapsed: Arc<Mutex<Vec<Duration>>>,
    override_with: Option<&'static str>,
}

impl Recorder {
    /// A recorder whose exit hooks override the result with `value`.
    pub fn overriding(value: &'static str) -> Self {
        Self {
            override_with: Some(value),
            ..Self::default()
        }
    }

    pub fn push(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_elapsed(&self) -> Option<Duration> {
        self.elapsed.lock().unwrap().last().copied()
    }

    pub fn all_elapsed(&self) -> Vec<Duration> {
        self.elapsed.lock().unwrap().clone()
    }

    fn timed(&self, call: &CallContext, event: &'static str, elapsed: Duration) {
        self.elapsed.lock().unwrap().push(elapsed);
        self.exit(call, event);
    }

    fn exit(&self, call: &CallContext, event: &'static str) {
        self.push(event);
        if let Some(value) = self.override_with {
            call.set_return_value(value.to_string());
        }
    }
}

impl ExecutionHooks for Recorder {
    fn on_entry(&self, _call: &CallContext) {
        self.push("entry");
    }

    fn on_exit(&self, call: &CallContext) {
        self.exit(call, "exit");
    }
}

#[async_trait]
impl AsyncExecutionHooks for Recorder {
    async fn on_entry_async(&self, _call: &CallContext) {
        tokio::task::yield_now().await;
        self.push("entry_async");
    }

    async fn on_exit_async(&self, call: &CallContext) {
        tokio::task::yield_now().await;
        self.exit(call, "exit_async");
    }
}

impl TimingHooks for Recorder {
    fn on_completed(&self, call: &CallContext, elapsed: Duration) {
        self.timed(call, "completed", elapsed);
    }
}

#[async_trait]
impl AsyncTimingHooks for Recorder {
    async fn on_completed_async(&self, call: &CallContext, elapsed: Duration) {
        self.timed(call, "completed_async", elapsed);
    }
}

impl ExecutionTimingHooks for Recorder {
    fn on_entry(&self, _call: &CallContext) {
        self.push("entry");
    }

    fn on_exit(&self, call: &CallContext, elapsed: Duration) {
        self.timed(call, "exit_timed", elapsed);
    }
}

/// Target whose bodies record `body` when invoked and `settled` when a
/// deferred result completes.
#[derive(Clone, Default)]
pub struct TestTarget {
    recorder: Recorder,
}

impl TestTarget {
    pub fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
        }
    }

    pub fn pipeline<I: Interceptor + 'static>(interceptor: I) -> Pipeline {
        Pipeline::builder().with(interceptor).build()
    }

    pub fn method(&self, pipeline: &Pipeline) -> Result<String> {
        let recorder = self.recorder.clone();
        pipeline.call(
            TargetInfo::of::<Self>(),
            "method",
            Arguments::new(),
            move |_: &Arguments| {
                recorder.push("body");
                Ok::<_, TestTargetError>("set by method".to_string())
            },
        )
    }

    pub fn method_async(
        &self,
        pipeline: &Pipeline,
        delay: Duration,
    ) -> BoxFuture<'static, Result<String>> {
        let recorder = self.recorder.clone();
        pipeline.call_async(
            TargetInfo::of::<Self>(),
            "method_async",
            Arguments::new().with("delay", delay),
            move |_| {
                recorder.push("body");
                async move {
                    tokio::time::sleep(delay).await;
                    recorder.push("settled");
                    Ok::<_, TestTargetError>("set by method".to_string())
                }
            },
        )
    }

    pub fn failing(&self, pipeline: &Pipeline) -> Result<String> {
        pipeline.call(
            TargetInfo::of::<Self>(),
            "failing",
            Arguments::new(),
            |_: &Arguments| Err::<String, _>(TestTargetError),
        )
    }

    pub fn failing_async(&self, pipeline: &Pipeline) -> BoxFuture<'static, Result<String>> {
        pipeline.call_async(
            TargetInfo::of::<Self>(),
            "failing_async",
            Arguments::new(),
            |_| async { Err::<String, _>(TestTargetError) },
        )
    }
}
