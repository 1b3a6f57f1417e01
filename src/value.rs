//! Return values flowing through the pipeline.
//!
//! A [`PendingResult`] is either available now or carried on a future.
//! Both the override protocol and the continuation wrapper work on this
//! one type; the void case is a [`Value`] holding `()`.

use std::any::{type_name, Any};
use std::fmt;

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::Result;

/// Future that settles with an intercepted call's outcome.
pub type DeferredValue = BoxFuture<'static, Result<Value>>;

/// Type-erased return value of an intercepted method.
pub struct Value {
    inner: Box<dyn Any + Send>,
    type_name: &'static str,
}

impl Value {
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            inner: Box::new(value),
            type_name: type_name::<T>(),
        }
    }

    /// The value produced by a method that returns nothing.
    pub fn unit() -> Self {
        Self::new(())
    }

    /// Name of the concrete type this value was built from.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Recover the concrete value, handing the original back on mismatch.
    pub fn downcast<T: Any>(self) -> std::result::Result<T, Value> {
        let type_name = self.type_name;
        self.inner
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|inner| Value { inner, type_name })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Outcome of a call, either settled now or settling later.
pub enum PendingResult {
    /// The call has completed (successfully or not).
    Ready(Result<Value>),
    /// The call completes when the future settles.
    Deferred(DeferredValue),
}

impl PendingResult {
    pub fn ok<T: Any + Send>(value: T) -> Self {
        PendingResult::Ready(Ok(Value::new(value)))
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<Value>> + Send + 'static,
    {
        PendingResult::Deferred(future.boxed())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, PendingResult::Deferred(_))
    }

    /// View the outcome as a future regardless of variant.
    ///
    /// A ready outcome becomes an already-settled future, so a
    /// deferred-declared method that completed (or failed) synchronously is
    /// handled exactly like one that suspended.
    pub fn into_future(self) -> DeferredValue {
        match self {
            PendingResult::Ready(outcome) => future::ready(outcome).boxed(),
            PendingResult::Deferred(deferred) => deferred,
        }
    }
}

impl fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PendingResult::Ready(outcome) => f.debug_tuple("Ready").field(outcome).finish(),
            PendingResult::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}
