//! Bridge runtime settings.
//!
//! The bridge owns a dedicated runtime that synchronous hooks use to wait
//! on deferred results. Its workers only ever run bridged operations, so a
//! small pool is enough unless many synchronous callers block at once.

use serde::Deserialize;

/// Default number of bridge worker threads.
pub const DEFAULT_BRIDGE_WORKER_THREADS: usize = 2;

/// Default thread name for bridge workers.
pub const DEFAULT_BRIDGE_THREAD_NAME: &str = "interpose-bridge";

/// Bridge runtime configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Worker threads of the dedicated runtime. Values below 1 are raised to 1.
    pub worker_threads: usize,

    /// Name given to every worker thread.
    pub thread_name: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_BRIDGE_WORKER_THREADS,
            thread_name: DEFAULT_BRIDGE_THREAD_NAME.to_string(),
        }
    }
}
