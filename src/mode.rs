//! Execution-mode classification.
//!
//! The shape of a method's declared return type is fixed when the call
//! site builds its [`MethodInfo`](crate::invocation::MethodInfo), so
//! classification is a static match and never looks at the runtime value.

use std::any::{Any, TypeId};

use crate::invocation::MethodInfo;

/// Declared return type of an intercepted method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// Returns nothing.
    Unit,
    /// Returns a value directly.
    Value,
    /// Returns a future that carries no value.
    DeferredUnit,
    /// Returns a future that carries a value.
    DeferredValue,
}

impl ReturnShape {
    /// Shape of a method returning `T` directly.
    pub fn of_sync<T: Any>() -> Self {
        if is_unit::<T>() {
            ReturnShape::Unit
        } else {
            ReturnShape::Value
        }
    }

    /// Shape of a method returning a future of `T`.
    pub fn of_deferred<T: Any>() -> Self {
        if is_unit::<T>() {
            ReturnShape::DeferredUnit
        } else {
            ReturnShape::DeferredValue
        }
    }
}

fn is_unit<T: Any>() -> bool {
    TypeId::of::<T>() == TypeId::of::<()>()
}

/// How an intercepted call completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionMode {
    Sync,
    AsyncVoid,
    AsyncValue,
}

impl ExecutionMode {
    pub fn classify(method: &MethodInfo) -> Self {
        match method.shape() {
            ReturnShape::Unit | ReturnShape::Value => ExecutionMode::Sync,
            ReturnShape::DeferredUnit => ExecutionMode::AsyncVoid,
            ReturnShape::DeferredValue => ExecutionMode::AsyncValue,
        }
    }

    pub fn is_async(self) -> bool {
        !matches!(self, ExecutionMode::Sync)
    }
}
