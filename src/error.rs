//! Error taxonomy for the interception pipeline.
//!
//! Target failures travel through the pipeline as values (`Err` in the
//! return cell) so behaviors can observe them without unwinding. Only the
//! exception behaviors convert a failure into a value, and only through the
//! override protocol.

/// Boxed error produced by target operations and hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, InterceptError>;

/// Errors that can occur while an intercepted call is in flight.
#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    /// The intercepted operation itself failed.
    #[error("target operation failed: {0}")]
    Target(#[source] BoxError),

    /// Waiting on a deferred value from synchronous code failed.
    #[error("bridge failed")]
    Bridge(#[from] BridgeError),

    /// The method body was already executed for this invocation.
    #[error("method body already executed for this invocation")]
    AlreadyProceeded,

    /// No behavior proceeded and none supplied a value.
    #[error("no return value produced for {method}")]
    NoReturnValue { method: String },

    /// The final value does not have the type the caller declared.
    #[error("{method} returned {actual}, expected {expected}")]
    ReturnTypeMismatch {
        method: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A hook failed, or translated the original failure into another error.
    #[error("hook failed: {0}")]
    Hook(#[source] BoxError),
}

impl InterceptError {
    /// Wrap an arbitrary target failure.
    pub fn target<E: Into<BoxError>>(error: E) -> Self {
        InterceptError::Target(error.into())
    }

    /// Wrap an arbitrary hook failure.
    pub fn hook<E: Into<BoxError>>(error: E) -> Self {
        InterceptError::Hook(error.into())
    }

    /// Returns the original target failure if it has type `E`.
    pub fn target_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            InterceptError::Target(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Returns true if this error originated in the intercepted operation.
    pub fn is_target(&self) -> bool {
        matches!(self, InterceptError::Target(_))
    }
}

/// Errors raised by the async/sync bridge itself.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The dedicated runtime could not be started.
    #[error("failed to start bridge runtime: {0}")]
    Runtime(#[from] std::io::Error),

    /// The bridged operation panicked.
    #[error("bridged operation panicked: {0}")]
    Panicked(String),

    /// The bridged operation was cancelled before it settled.
    #[error("bridged operation was cancelled")]
    Cancelled,
}
