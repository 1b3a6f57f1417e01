//! Return-value override protocol.
//!
//! Replaces the eventual result of a call, whatever its classification and
//! whatever the original outcome.

use std::any::Any;

use futures::FutureExt;
use tracing::debug;

use crate::invocation::Invocation;
use crate::value::{PendingResult, Value};

/// Make `value` the result the caller observes.
///
/// A deferred original (an async call, or a sync call an inner behavior
/// deferred) is replaced by a new deferred value that waits for the original
/// to settle, discards that outcome, and settles with `value`; continuations
/// attached inside it still run. Otherwise the cell gets `value` directly,
/// wrapped as already settled for async calls. The body is never re-run and
/// nothing blocks.
pub fn set_return_value<T: Any + Send>(invocation: &mut Invocation, value: T) {
    apply(invocation, Value::new(value));
}

/// Type-erased form of [`set_return_value`].
pub fn apply(invocation: &mut Invocation, value: Value) {
    debug!(
        call_id = %invocation.call().call_id(),
        value_type = value.type_name(),
        "Overriding return value"
    );

    let async_call = invocation.mode().is_async();
    let replacement = match invocation.take_return_value() {
        Some(PendingResult::Deferred(original)) => PendingResult::Deferred(
            async move {
                let _ = original.await;
                Ok(value)
            }
            .boxed(),
        ),
        _ if async_call => PendingResult::Deferred(futures::future::ready(Ok(value)).boxed()),
        _ => PendingResult::Ready(Ok(value)),
    };

    invocation.replace_return_value(replacement);
}

/// Apply a value a hook set through [`CallContext::set_return_value`].
///
/// [`CallContext::set_return_value`]: crate::invocation::CallContext::set_return_value
pub fn apply_hook_override(invocation: &mut Invocation) {
    if let Some(value) = invocation.call().take_return_override() {
        apply(invocation, value);
    }
}
