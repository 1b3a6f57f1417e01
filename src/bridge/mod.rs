//! Async/sync bridge.
//!
//! Runs a future-producing operation on a dedicated runtime and blocks the
//! calling thread until it settles. The operation is constructed and polled
//! entirely on the bridge's own workers, so its continuations never need
//! the calling thread (or the caller's runtime) to make progress.

use std::cell::Cell;
use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error, trace};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

static SHARED: OnceLock<Arc<Bridge>> = OnceLock::new();

thread_local! {
    static ON_BRIDGE_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Dedicated scheduling context for sync-over-async waits.
pub struct Bridge {
    runtime: Option<Runtime>,
    thread_name: String,
}

impl Bridge {
    /// Start a bridge with `worker_threads` dedicated workers.
    pub fn new(
        worker_threads: usize,
        thread_name: impl Into<String>,
    ) -> std::result::Result<Self, BridgeError> {
        let thread_name = thread_name.into();
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name(thread_name.clone())
            .on_thread_start(|| ON_BRIDGE_WORKER.with(|flag| flag.set(true)))
            .enable_all()
            .build()?;

        debug!(worker_threads, thread_name = %thread_name, "Bridge runtime started");

        Ok(Self {
            runtime: Some(runtime),
            thread_name,
        })
    }

    pub fn from_config(config: &BridgeConfig) -> std::result::Result<Self, BridgeError> {
        Self::new(config.worker_threads, config.thread_name.clone())
    }

    /// Process-wide bridge built from default configuration on first use.
    pub fn shared() -> std::result::Result<Arc<Bridge>, BridgeError> {
        if let Some(bridge) = SHARED.get() {
            return Ok(Arc::clone(bridge));
        }
        let bridge = Arc::new(Self::from_config(&BridgeConfig::default())?);
        // A racing initializer may have won; its bridge is kept and ours dropped.
        Ok(Arc::clone(SHARED.get_or_init(|| bridge)))
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// True when the current thread is a worker of some bridge runtime.
    pub fn on_worker_thread() -> bool {
        ON_BRIDGE_WORKER.with(Cell::get)
    }

    /// Run `operation` to completion and return its output to the caller.
    ///
    /// The operation is invoked on a bridge worker, never on the calling
    /// thread. Panics inside the operation surface as
    /// [`BridgeError::Panicked`].
    pub fn block_on<F, Fut>(&self, operation: F) -> std::result::Result<Fut::Output, BridgeError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let runtime = self.runtime.as_ref().ok_or(BridgeError::Cancelled)?;

        if Self::on_worker_thread() {
            // Waiting on a sibling task from a worker would park the very
            // thread the task may need; hand this worker's core off first.
            trace!(thread = %self.thread_name, "Nested bridge wait on worker thread");
            let handle = runtime.handle().clone();
            return tokio::task::block_in_place(move || {
                let task = handle.spawn(async move { operation().await });
                handle.block_on(task)
            })
            .map_err(join_error);
        }

        trace!(thread = %self.thread_name, "Bridging deferred operation");
        let task = runtime.spawn(async move { operation().await });
        futures::executor::block_on(task).map_err(join_error)
    }

    /// Run a fallible operation and flatten its error into the pipeline's.
    ///
    /// The operation's own failure is returned unchanged so the original
    /// cause stays attached.
    pub fn run_to_completion<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.block_on(operation)?
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // Dropping a runtime blocks; this bridge may be released from async code.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

fn join_error(e: tokio::task::JoinError) -> BridgeError {
    if e.is_panic() {
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(panic = %message, "Bridged operation panicked");
        BridgeError::Panicked(message)
    } else {
        BridgeError::Cancelled
    }
}
