//! Shared fixtures for integration tests.
//!
//! `Business` is a sample target with sync and deferred methods that wait
//! `msec` milliseconds; `BusinessProxy` routes its calls through a pipeline
//! the way a generated proxy would.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use interpose::behaviors::{AsyncExecutionHooks, AsyncTimingHooks, ExecutionHooks, TimingHooks};
use interpose::{Arguments, CallContext, Pipeline, TargetInfo};

#[derive(Debug, thiserror::Error)]
pub enum BusinessError {
    #[error("msec must be non-negative, got {0}")]
    ArgumentError(i64),
    #[error("business rule violated")]
    AlwaysFails,
}

/// Sample target.
#[derive(Clone, Default)]
pub struct Business {
    journal: Journal,
}

impl Business {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }

    fn delay(msec: i64) -> Result<Duration, BusinessError> {
        if msec < 0 {
            return Err(BusinessError::ArgumentError(msec));
        }
        Ok(Duration::from_millis(msec as u64))
    }

    pub fn do_work(&self, msec: i64) -> Result<(), BusinessError> {
        self.journal.record("body");
        std::thread::sleep(Self::delay(msec)?);
        Ok(())
    }

    pub fn count(&self, msec: i64) -> Result<i64, BusinessError> {
        self.journal.record("body");
        std::thread::sleep(Self::delay(msec)?);
        Ok(msec)
    }

    pub async fn do_async(&self, msec: i64) -> Result<(), BusinessError> {
        tokio::time::sleep(Self::delay(msec)?).await;
        self.journal.record("settled");
        Ok(())
    }

    pub async fn count_async(&self, msec: i64) -> Result<i64, BusinessError> {
        tokio::time::sleep(Self::delay(msec)?).await;
        self.journal.record("settled");
        Ok(msec)
    }

    pub fn broken(&self) -> Result<i64, BusinessError> {
        Err(BusinessError::AlwaysFails)
    }
}

/// Routes `Business` calls through a pipeline.
#[derive(Clone)]
pub struct BusinessProxy {
    pipeline: Pipeline,
    target: Arc<Business>,
}

impl BusinessProxy {
    pub fn new(pipeline: Pipeline, target: Business) -> Self {
        Self {
            pipeline,
            target: Arc::new(target),
        }
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn do_work(&self, msec: i64) -> interpose::Result<()> {
        let target = Arc::clone(&self.target);
        self.pipeline.call(
            TargetInfo::of::<Business>(),
            "do_work",
            Arguments::new().with("msec", msec),
            move |args: &Arguments| target.do_work(msec_of(args)),
        )
    }

    pub fn count(&self, msec: i64) -> interpose::Result<i64> {
        let target = Arc::clone(&self.target);
        self.pipeline.call(
            TargetInfo::of::<Business>(),
            "count",
            Arguments::new().with("msec", msec),
            move |args: &Arguments| target.count(msec_of(args)),
        )
    }

    pub fn broken(&self) -> interpose::Result<i64> {
        let target = Arc::clone(&self.target);
        self.pipeline.call(
            TargetInfo::of::<Business>(),
            "broken",
            Arguments::new(),
            move |_: &Arguments| target.broken(),
        )
    }

    pub fn do_async(&self, msec: i64) -> BoxFuture<'static, interpose::Result<()>> {
        let target = Arc::clone(&self.target);
        self.pipeline.call_async(
            TargetInfo::of::<Business>(),
            "do_async",
            Arguments::new().with("msec", msec),
            move |args| {
                target.journal.record("body");
                async move { target.do_async(msec_of(&args)).await }
            },
        )
    }

    pub fn count_async(&self, msec: i64) -> BoxFuture<'static, interpose::Result<i64>> {
        let target = Arc::clone(&self.target);
        self.pipeline.call_async(
            TargetInfo::of::<Business>(),
            "count_async",
            Arguments::new().with("msec", msec),
            move |args| {
                target.journal.record("body");
                async move { target.count_async(msec_of(&args)).await }
            },
        )
    }
}

fn msec_of(args: &Arguments) -> i64 {
    args.by_name::<i64>("msec").copied().unwrap_or_default()
}

/// One reported duration.
#[derive(Debug, Clone)]
pub struct Timed {
    pub method: String,
    pub msec: Option<i64>,
    pub elapsed: Duration,
}

/// Hook set that records every event, prefixed with its label.
#[derive(Clone, Default)]
pub struct Journal {
    label: &'static str,
    events: Arc<Mutex<Vec<String>>>,
    timings: Arc<Mutex<Vec<Timed>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A journal writing into the same log as `self` under another label.
    pub fn labelled(&self, label: &'static str) -> Self {
        Self {
            label,
            ..self.clone()
        }
    }

    pub fn record(&self, event: &str) {
        let entry = if self.label.is_empty() {
            event.to_string()
        } else {
            format!("{}:{}", self.label, event)
        };
        self.events.lock().unwrap().push(entry);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| e.as_str() == event).count()
    }

    pub fn timings(&self) -> Vec<Timed> {
        self.timings.lock().unwrap().clone()
    }

    fn timed(&self, call: &CallContext, elapsed: Duration) {
        self.timings.lock().unwrap().push(Timed {
            method: call.full_method_name(),
            msec: call.arguments().by_name::<i64>("msec").copied(),
            elapsed,
        });
        self.record("completed");
    }
}

impl ExecutionHooks for Journal {
    fn on_entry(&self, _call: &CallContext) {
        self.record("entry");
    }

    fn on_exit(&self, _call: &CallContext) {
        self.record("exit");
    }
}

#[async_trait]
impl AsyncExecutionHooks for Journal {
    async fn on_entry_async(&self, _call: &CallContext) {
        self.record("entry");
    }

    async fn on_exit_async(&self, _call: &CallContext) {
        tokio::time::sleep(Duration::from_millis(1)).await;
        self.record("exit");
    }
}

impl TimingHooks for Journal {
    fn on_completed(&self, call: &CallContext, elapsed: Duration) {
        self.timed(call, elapsed);
    }
}

#[async_trait]
impl AsyncTimingHooks for Journal {
    async fn on_completed_async(&self, call: &CallContext, elapsed: Duration) {
        self.timed(call, elapsed);
    }
}
