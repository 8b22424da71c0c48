//! # Execution Context
//!
//! Identity of the thread a store operation (and therefore a signal handler)
//! runs on. Nothing in the store looks this up on its own: callers build a
//! context and pass it to [`Database::atomic`](crate::store::Database::atomic).

use serde::{Deserialize, Serialize};
use std::thread;

/// Name the Rust runtime gives the process main thread.
pub const MAIN_THREAD_NAME: &str = "main";

/// Name used for threads spawned without one.
pub const UNNAMED_THREAD: &str = "unnamed";

/// Who is executing: a name, and whether this is the primary context.
///
/// "Primary" means the context that owns the unit of work (the main thread of
/// a CLI run, the worker serving an HTTP request), as opposed to threads it
/// spawned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    name: String,
    primary: bool,
}

impl ExecutionContext {
    pub fn new(name: impl Into<String>, primary: bool) -> Self {
        Self {
            name: name.into(),
            primary,
        }
    }

    /// The current thread. Primary only on the process main thread.
    #[must_use]
    pub fn current() -> Self {
        let name = current_thread_name();
        let primary = name == MAIN_THREAD_NAME;
        Self { name, primary }
    }

    /// The current thread, marked as the primary context.
    #[must_use]
    pub fn primary() -> Self {
        Self::new(current_thread_name(), true)
    }

    /// The current thread, marked as a spawned (non-primary) context.
    #[must_use]
    pub fn spawned() -> Self {
        Self::new(current_thread_name(), false)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }
}

fn current_thread_name() -> String {
    thread::current()
        .name()
        .unwrap_or(UNNAMED_THREAD)
        .to_string()
}
