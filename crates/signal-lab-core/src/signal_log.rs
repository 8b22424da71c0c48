//! # Signal Log
//!
//! One record per user describing the most recent post-save dispatch for
//! that user: which context ran it, under which transaction id, and how long
//! the handler took.

use crate::error::StoreError;
use crate::signal::{HandlerId, PostSave, SignalBus};
use crate::store::Transaction;
use crate::user::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Thread name stored before any handler has run.
pub const UNKNOWN_THREAD: &str = "Unknown";

/// Longest thread name kept, in characters.
pub const THREAD_NAME_MAX_CHARS: usize = 100;

/// Signal log record, keyed uniquely by user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalLog {
    pub user: UserId,
    /// Whether the handler ran on the primary execution context.
    pub is_sync: bool,
    pub thread_name: String,
    pub transaction_id: Uuid,
    /// Handler duration in seconds, rounded to 4 decimal places.
    pub execution_time: f64,
}

impl SignalLog {
    /// A log with default fields.
    #[must_use]
    pub fn new(user: UserId) -> Self {
        Self {
            user,
            is_sync: true,
            thread_name: UNKNOWN_THREAD.to_string(),
            transaction_id: Uuid::new_v4(),
            execution_time: 0.0,
        }
    }

    /// Set the thread name, truncated to [`THREAD_NAME_MAX_CHARS`].
    pub fn set_thread_name(&mut self, name: &str) {
        self.thread_name = name.chars().take(THREAD_NAME_MAX_CHARS).collect();
    }

    /// Pair the log with its user's name for display.
    ///
    /// The log only stores the user id, so the caller supplies the name.
    #[must_use]
    pub fn label<'a>(&'a self, username: &'a str) -> LogLabel<'a> {
        LogLabel {
            username,
            log: self,
        }
    }
}

/// Displays a signal log as `<username> - <thread_name>`.
#[derive(Debug, Clone, Copy)]
pub struct LogLabel<'a> {
    username: &'a str,
    log: &'a SignalLog,
}

impl fmt::Display for LogLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.username, self.log.thread_name)
    }
}

/// Post-save handler that upserts the saved user's signal log.
pub fn record_signal(event: &PostSave<'_>, tx: &mut Transaction<'_>) -> Result<(), StoreError> {
    let started = Instant::now();
    let transaction_id = Uuid::new_v4();

    let (mut log, _) = tx.get_or_create_signal_log(event.user.id)?;
    log.is_sync = event.context.is_primary();
    log.set_thread_name(event.context.name());
    log.transaction_id = transaction_id;
    log.execution_time = round_seconds(started.elapsed());

    debug!(
        user = %event.user.username,
        thread = %log.thread_name,
        is_sync = log.is_sync,
        transaction_id = %log.transaction_id,
        "recording signal"
    );
    tx.upsert_signal_log(log)?;
    Ok(())
}

/// Connect [`record_signal`] to `bus`.
pub fn install(bus: &SignalBus) -> HandlerId {
    bus.connect(record_signal)
}

/// Seconds in `elapsed`, rounded half-up to 4 decimal places.
#[allow(clippy::float_arithmetic)]
#[must_use]
pub fn round_seconds(elapsed: Duration) -> f64 {
    let ten_thousandths = (elapsed.as_micros() + 50) / 100;
    ten_thousandths as f64 / 10_000.0
}

// =============================================================================
// TESTS
// =============================================================================
