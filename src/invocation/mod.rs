//! Descriptor of one call in flight through the pipeline.
//!
//! An [`Invocation`] is owned by the calling proxy layer for the duration
//! of one call. Behaviors borrow it mutably while they run; anything that
//! must outlive the synchronous call frame (continuation-wrapped hooks)
//! holds the shared [`CallContext`] instead.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::bridge::Bridge;
use crate::error::{InterceptError, Result};
use crate::mode::{ExecutionMode, ReturnShape};
use crate::pipeline::Registration;
use crate::return_value;
use crate::value::{PendingResult, Value};

/// The real method body, executed at most once per invocation.
pub type MethodBody = Box<dyn FnOnce(&Arguments) -> PendingResult + Send>;

/// Identity of the object whose method is intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetInfo {
    type_name: &'static str,
}

impl TargetInfo {
    /// Target identified by the unqualified name of `T`, without generic
    /// arguments.
    pub fn of<T: ?Sized>() -> Self {
        let full = type_name::<T>();
        let path = full.split('<').next().unwrap_or(full);
        let short = path.rsplit("::").next().unwrap_or(path);
        Self { type_name: short }
    }

    pub fn named(type_name: &'static str) -> Self {
        Self { type_name }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Identity and declared return shape of the intercepted method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    name: &'static str,
    shape: ReturnShape,
    return_type: &'static str,
}

impl MethodInfo {
    /// A method returning `T` directly (`()` for no value).
    pub fn sync<T: Any>(name: &'static str) -> Self {
        Self {
            name,
            shape: ReturnShape::of_sync::<T>(),
            return_type: type_name::<T>(),
        }
    }

    /// A method returning a future of `T` (`()` for no value).
    pub fn deferred<T: Any>(name: &'static str) -> Self {
        Self {
            name,
            shape: ReturnShape::of_deferred::<T>(),
            return_type: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }

    /// Name of the value type the method produces.
    pub fn return_type(&self) -> &'static str {
        self.return_type
    }
}

/// One named argument of an intercepted call.
#[derive(Clone)]
pub struct Argument {
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    rendered: String,
}

impl Argument {
    pub fn new<T>(name: &'static str, value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug,
    {
        let rendered = format!("{:?}", value);
        Self {
            name,
            value: Arc::new(value),
            rendered,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.rendered)
    }
}

/// Ordered argument list of an intercepted call.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    items: Vec<Argument>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T>(mut self, name: &'static str, value: T) -> Self
    where
        T: Any + Send + Sync + fmt::Debug,
    {
        self.items.push(Argument::new(name, value));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.items.iter()
    }

    /// Typed access by position.
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.items.get(index).and_then(Argument::value::<T>)
    }

    /// Typed access by name.
    pub fn by_name<T: Any>(&self, name: &str) -> Option<&T> {
        self.items
            .iter()
            .find(|arg| arg.name == name)
            .and_then(Argument::value::<T>)
    }
}

impl fmt::Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}", arg)?;
        }
        Ok(())
    }
}

/// Immutable description of one call, shared with continuation hooks.
pub struct CallContext {
    call_id: Uuid,
    target: TargetInfo,
    method: MethodInfo,
    mode: ExecutionMode,
    arguments: Arguments,
    return_override: Mutex<Option<Value>>,
}

impl CallContext {
    pub fn new(target: TargetInfo, method: MethodInfo, arguments: Arguments) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            target,
            method,
            mode: ExecutionMode::classify(&method),
            arguments,
            return_override: Mutex::new(None),
        }
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    pub fn target(&self) -> &TargetInfo {
        &self.target
    }

    pub fn method(&self) -> &MethodInfo {
        &self.method
    }

    /// Classification of the declared return type, fixed for the call.
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// `Type.method()` rendering used in log output.
    pub fn full_method_name(&self) -> String {
        format!("{}.{}()", self.target.type_name, self.method.name)
    }

    /// Replace the eventual result of this call from inside a hook.
    ///
    /// The behavior that invoked the hook applies the value as soon as the
    /// hook returns, for immediate and deferred results alike.
    pub fn set_return_value<T: Any + Send>(&self, value: T) {
        *self.override_slot() = Some(Value::new(value));
    }

    /// Take a value set by [`set_return_value`](Self::set_return_value).
    pub fn take_return_override(&self) -> Option<Value> {
        self.override_slot().take()
    }

    fn override_slot(&self) -> std::sync::MutexGuard<'_, Option<Value>> {
        self.return_override
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("call_id", &self.call_id)
            .field("target", &self.target.type_name)
            .field("method", &self.method.name)
            .field("mode", &self.mode)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// One in-flight call: descriptor, return cell, and the `proceed` capability.
pub struct Invocation {
    call: Arc<CallContext>,
    body: Option<MethodBody>,
    return_value: Option<PendingResult>,
    chain: Arc<[Registration]>,
    position: usize,
    bridge: Option<Arc<Bridge>>,
}

impl Invocation {
    /// An invocation with no behaviors in front of the body.
    pub fn new(call: CallContext, body: MethodBody) -> Self {
        Self {
            call: Arc::new(call),
            body: Some(body),
            return_value: None,
            chain: Arc::from(Vec::new()),
            position: 0,
            bridge: None,
        }
    }

    pub(crate) fn with_chain(mut self, chain: Arc<[Registration]>) -> Self {
        self.chain = chain;
        self
    }

    /// Use a specific bridge instead of the process-wide default.
    pub fn with_bridge(mut self, bridge: Arc<Bridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn call(&self) -> &Arc<CallContext> {
        &self.call
    }

    pub fn mode(&self) -> ExecutionMode {
        self.call.mode
    }

    /// Run the next behavior in the chain, or the method body if none remain.
    ///
    /// The body's outcome (value, failure, or future) lands in the return
    /// cell. Reaching the body a second time stores `AlreadyProceeded`.
    pub fn proceed(&mut self) {
        if let Some(registration) = self.chain.get(self.position).cloned() {
            let position = self.position;
            self.position += 1;
            let interceptor = registration.resolve();
            trace!(
                call_id = %self.call.call_id,
                position,
                interceptor = registration.name(),
                "Entering interceptor"
            );
            interceptor.intercept(self);
            self.position = position;
            return;
        }

        match self.body.take() {
            Some(body) => {
                debug!(
                    call_id = %self.call.call_id,
                    method = %self.call.full_method_name(),
                    "Proceeding to method body"
                );
                self.return_value = Some(body(&self.call.arguments));
            }
            None => {
                self.return_value = Some(PendingResult::Ready(Err(
                    InterceptError::AlreadyProceeded,
                )));
            }
        }
    }

    pub fn return_value(&self) -> Option<&PendingResult> {
        self.return_value.as_ref()
    }

    pub fn take_return_value(&mut self) -> Option<PendingResult> {
        self.return_value.take()
    }

    pub fn replace_return_value(&mut self, pending: PendingResult) -> Option<PendingResult> {
        self.return_value.replace(pending)
    }

    /// Override the eventual result of this call. See [`return_value::set_return_value`].
    pub fn set_return_value<T: Any + Send>(&mut self, value: T) {
        return_value::set_return_value(self, value);
    }

    pub fn into_return_value(self) -> Option<PendingResult> {
        self.return_value
    }

    /// Bridge for waiting on deferred values from synchronous hooks.
    pub fn bridge(&self) -> Result<Arc<Bridge>> {
        match &self.bridge {
            Some(bridge) => Ok(Arc::clone(bridge)),
            None => Ok(Bridge::shared()?),
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("call", &self.call)
            .field("proceeded", &self.body.is_none())
            .field("return_value", &self.return_value)
            .field("position", &self.position)
            .finish()
    }
}
