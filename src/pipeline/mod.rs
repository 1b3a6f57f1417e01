//! Behavior chain composition and typed call entry points.
//!
//! A [`Pipeline`] is an explicit ordered list of behaviors wrapping a
//! target. Order is exactly registration order: the first behavior added
//! is the outermost, so its entry hook runs first and its exit hook last.
//!
//! ```ignore
//! let pipeline = Pipeline::builder()
//!     .with(Timing::new(LogTiming))
//!     .with(SyncException::new(LogException::returning(-1i32)))
//!     .build();
//!
//! let n: i32 = pipeline.call(TargetInfo::of::<Business>(), "count", args, |args: &Arguments| {
//!     business.count(args.get::<i32>(0).copied().unwrap_or_default())
//! })?;
//! ```

use std::any::{type_name, Any};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, debug_span, Instrument};

use crate::bridge::Bridge;
use crate::error::{BoxError, InterceptError, Result};
use crate::invocation::{Arguments, CallContext, Invocation, MethodBody, MethodInfo, TargetInfo};
use crate::value::{PendingResult, Value};

/// One cross-cutting behavior wrapped around `proceed`.
///
/// `intercept` runs synchronously at call time. A behavior calls
/// [`Invocation::proceed`] to run the rest of the chain and the body, then
/// inspects or replaces the return cell. Deferred results are handled by
/// replacing the cell with a continuation-wrapped future.
pub trait Interceptor: Send + Sync {
    fn intercept(&self, invocation: &mut Invocation);

    /// Name used in trace output.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

/// Interceptor built from a closure.
pub struct FnInterceptor<F> {
    f: F,
}

/// Wrap a closure as an [`Interceptor`].
pub fn interceptor_fn<F>(f: F) -> FnInterceptor<F>
where
    F: Fn(&mut Invocation) + Send + Sync,
{
    FnInterceptor { f }
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut Invocation) + Send + Sync,
{
    fn intercept(&self, invocation: &mut Invocation) {
        (self.f)(invocation)
    }
}

type Factory = Arc<dyn Fn() -> Arc<dyn Interceptor> + Send + Sync>;

/// How a behavior instance is supplied to each call.
#[derive(Clone)]
pub enum Registration {
    /// One instance serves every call, including overlapping ones.
    Shared(Arc<dyn Interceptor>),
    /// A fresh instance per call, for behaviors holding per-call mutable state.
    Transient { name: &'static str, factory: Factory },
}

impl Registration {
    pub fn resolve(&self) -> Arc<dyn Interceptor> {
        match self {
            Registration::Shared(interceptor) => Arc::clone(interceptor),
            Registration::Transient { factory, .. } => factory(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Registration::Shared(interceptor) => interceptor.name(),
            Registration::Transient { name, .. } => name,
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Registration::Shared(_) => write!(f, "Shared({})", self.name()),
            Registration::Transient { name, .. } => write!(f, "Transient({})", name),
        }
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    chain: Vec<Registration>,
    bridge: Option<Arc<Bridge>>,
}

impl PipelineBuilder {
    /// Append a behavior shared by all calls.
    pub fn with<I: Interceptor + 'static>(self, interceptor: I) -> Self {
        self.with_shared(Arc::new(interceptor))
    }

    pub fn with_shared(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.chain.push(Registration::Shared(interceptor));
        self
    }

    /// Append a behavior built fresh for every call.
    pub fn with_transient<I, F>(mut self, factory: F) -> Self
    where
        I: Interceptor + 'static,
        F: Fn() -> I + Send + Sync + 'static,
    {
        self.chain.push(Registration::Transient {
            name: type_name::<I>(),
            factory: Arc::new(move || Arc::new(factory()) as Arc<dyn Interceptor>),
        });
        self
    }

    /// Bridge used by synchronous hooks; defaults to [`Bridge::shared`].
    pub fn bridge(mut self, bridge: Arc<Bridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            chain: Arc::from(self.chain),
            bridge: self.bridge,
        }
    }
}

/// Ordered behavior chain in front of a target.
#[derive(Clone)]
pub struct Pipeline {
    chain: Arc<[Registration]>,
    bridge: Option<Arc<Bridge>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Names of the registered behaviors, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.chain.iter().map(Registration::name).collect()
    }

    /// Build the invocation a proxy hands to the chain.
    pub fn invocation(&self, call: CallContext, body: MethodBody) -> Invocation {
        let invocation = Invocation::new(call, body).with_chain(Arc::clone(&self.chain));
        match &self.bridge {
            Some(bridge) => invocation.with_bridge(Arc::clone(bridge)),
            None => invocation,
        }
    }

    /// Run the chain over one call and return the final return cell.
    ///
    /// This is the untyped entry point a call-interception layer uses; the
    /// typed [`call`](Self::call) and [`call_async`](Self::call_async) are
    /// built on it.
    pub fn intercept(&self, call: CallContext, body: MethodBody) -> PendingResult {
        let method = call.full_method_name();
        let mut invocation = self.invocation(call, body);
        invocation.proceed();
        debug!(method = %method, "Interception complete");
        invocation.into_return_value().unwrap_or_else(|| {
            PendingResult::Ready(Err(InterceptError::NoReturnValue { method }))
        })
    }

    /// Call a method that returns `T` directly.
    pub fn call<T, F, E>(
        &self,
        target: TargetInfo,
        method: &'static str,
        arguments: Arguments,
        body: F,
    ) -> Result<T>
    where
        T: Any + Send,
        F: FnOnce(&Arguments) -> std::result::Result<T, E> + Send + 'static,
        E: Into<BoxError>,
    {
        let call = CallContext::new(target, MethodInfo::sync::<T>(method), arguments);
        let name = call.full_method_name();
        let span = debug_span!(
            "intercept",
            call_id = %call.call_id(),
            method = %name,
            mode = ?call.mode()
        );
        let _entered = span.enter();

        let pending = self.intercept(
            call,
            Box::new(move |args: &Arguments| match body(args) {
                Ok(value) => PendingResult::ok(value),
                Err(e) => PendingResult::Ready(Err(InterceptError::target(e))),
            }),
        );

        let outcome = match pending {
            PendingResult::Ready(outcome) => outcome,
            // A behavior left a deferred value on a sync-declared call.
            PendingResult::Deferred(deferred) => {
                self.resolve_bridge()?.run_to_completion(move || deferred)
            }
        };
        outcome.and_then(|value| downcast::<T>(&name, value))
    }

    /// Call a method that returns a future of `T`.
    ///
    /// The chain runs now, at call time; the returned future settles after
    /// every continuation attached by the chain has run.
    pub fn call_async<T, F, Fut, E>(
        &self,
        target: TargetInfo,
        method: &'static str,
        arguments: Arguments,
        body: F,
    ) -> BoxFuture<'static, Result<T>>
    where
        T: Any + Send,
        F: FnOnce(Arguments) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        let call = CallContext::new(target, MethodInfo::deferred::<T>(method), arguments);
        let name = call.full_method_name();
        let span = debug_span!(
            "intercept",
            call_id = %call.call_id(),
            method = %name,
            mode = ?call.mode()
        );

        let pending = span.in_scope(|| {
            self.intercept(
                call,
                Box::new(move |args: &Arguments| {
                    let future = body(args.clone());
                    PendingResult::deferred(async move {
                        future.await.map(Value::new).map_err(InterceptError::target)
                    })
                }),
            )
        });

        async move {
            let value = pending.into_future().await?;
            downcast::<T>(&name, value)
        }
        .instrument(span)
        .boxed()
    }

    fn resolve_bridge(&self) -> Result<Arc<Bridge>> {
        match &self.bridge {
            Some(bridge) => Ok(Arc::clone(bridge)),
            None => Ok(Bridge::shared()?),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("chain", &self.chain)
            .field("bridge", &self.bridge)
            .finish()
    }
}

fn downcast<T: Any>(method: &str, value: Value) -> Result<T> {
    value
        .downcast::<T>()
        .map_err(|value| InterceptError::ReturnTypeMismatch {
            method: method.to_string(),
            expected: type_name::<T>(),
            actual: value.type_name(),
        })
}
