//! Interpose - method interception for sync and async calls
//!
//! Wraps calls to a target in an ordered chain of cross-cutting behaviors
//! (entry/exit notification, timing, failure recovery). Each behavior works
//! the same whether the call completes immediately or returns a future:
//! post-hooks on deferred results run as continuations, and synchronous
//! hooks that need an async outcome wait for it on a dedicated bridge
//! runtime.

pub mod behaviors;
pub mod bridge;
pub mod config;
pub mod continuation;
pub mod error;
pub mod invocation;
pub mod mode;
pub mod pipeline;
pub mod return_value;
pub mod utils;
pub mod value;

pub use bridge::Bridge;
pub use config::Config;
pub use error::{BoxError, BridgeError, InterceptError, Result};
pub use invocation::{Argument, Arguments, CallContext, Invocation, MethodInfo, TargetInfo};
pub use mode::{ExecutionMode, ReturnShape};
pub use pipeline::{interceptor_fn, Interceptor, Pipeline, PipelineBuilder, Registration};
pub use value::{PendingResult, Value};
