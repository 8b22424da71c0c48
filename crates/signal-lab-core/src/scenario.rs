//! # Scenarios
//!
//! Three demonstrations of post-save signal behaviour, each returning a
//! serializable report.
//!
//! | Scenario                | Shows                                              |
//! |-------------------------|----------------------------------------------------|
//! | [`sync_signal`]         | handler runs on the caller's (primary) context     |
//! | [`thread_signal`]       | handler runs on whichever thread created the user  |
//! | [`transaction_signal`]  | handler writes roll back with the transaction      |
//!
//! The scenarios use fixed usernames, so calling one twice against the same
//! store finds the users from the first call and emits no new signals.

use crate::context::ExecutionContext;
use crate::error::StoreError;
use crate::store::Database;
use serde::{Deserialize, Serialize};
use std::thread;
use tracing::debug;
use uuid::Uuid;

pub const SYNC_USERNAME: &str = "sync_user";
pub const TRANSACTION_USERNAME: &str = "transaction_user";

/// Names given to the two threads spawned by [`thread_signal`].
pub const THREAD_NAMES: [&str; 2] = ["TestThread-1", "TestThread-2"];

const FORCED_ROLLBACK: &str = "Forcing rollback";

// =============================================================================
// REPORTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub message: String,
    pub username: String,
    pub is_sync: bool,
    pub thread_name: String,
    pub transaction_id: Uuid,
    pub execution_time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReport {
    pub message: String,
    pub log_exists_after_rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadResult {
    pub username: String,
    pub thread_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadReport {
    pub message: String,
    pub thread1_result: ThreadResult,
    pub thread2_result: ThreadResult,
}

// =============================================================================
// SCENARIOS
// =============================================================================

/// Create `sync_user` on `context` and report its signal log.
pub fn sync_signal(db: &Database, context: &ExecutionContext) -> Result<SyncReport, StoreError> {
    db.atomic(context, |tx| {
        let (user, _) = tx.get_or_create_user(SYNC_USERNAME)?;
        let (log, _) = tx.get_or_create_signal_log(user.id)?;
        Ok(SyncReport {
            message: "User created, signal executed".to_string(),
            username: user.username,
            is_sync: log.is_sync,
            thread_name: log.thread_name,
            transaction_id: log.transaction_id,
            execution_time: log.execution_time,
        })
    })
}

/// Create `transaction_user` inside a transaction that is then rolled back,
/// and report whether its signal log outlived the rollback.
pub fn transaction_signal(
    db: &Database,
    context: &ExecutionContext,
) -> Result<TransactionReport, StoreError> {
    let outcome = db.atomic(context, |tx| -> Result<(), StoreError> {
        tx.get_or_create_user(TRANSACTION_USERNAME)?;
        Err(StoreError::rollback(FORCED_ROLLBACK))
    });

    match outcome {
        Err(err) if err.is_rollback() => debug!("forced rollback completed"),
        Err(err) => return Err(err),
        Ok(()) => {}
    }

    Ok(TransactionReport {
        message: "User created inside transaction".to_string(),
        log_exists_after_rollback: db.signal_log_for_username(TRANSACTION_USERNAME).is_some(),
    })
}

/// Create one user from each of two spawned threads, then look both up again
/// from `context`.
///
/// The lookups find the users the threads created, so the report carries the
/// thread names recorded by the spawned threads.
pub fn thread_signal(db: &Database, context: &ExecutionContext) -> Result<ThreadReport, StoreError> {
    thread::scope(|scope| -> Result<(), StoreError> {
        let handles = THREAD_NAMES
            .iter()
            .map(|&name| {
                thread::Builder::new()
                    .name(name.to_string())
                    .spawn_scoped(scope, move || {
                        create_thread_user(db, name, &ExecutionContext::spawned())
                    })
                    .map(|handle| (name, handle))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (name, handle) in handles {
            let result = handle
                .join()
                .map_err(|_| StoreError::WorkerPanicked(name.to_string()))??;
            debug!(username = %result.username, thread = %result.thread_name, "worker finished");
        }
        Ok(())
    })?;

    let [first, second] = THREAD_NAMES;
    Ok(ThreadReport {
        message: "Threads executed with signals".to_string(),
        thread1_result: create_thread_user(db, first, context)?,
        thread2_result: create_thread_user(db, second, context)?,
    })
}

fn create_thread_user(
    db: &Database,
    label: &str,
    context: &ExecutionContext,
) -> Result<ThreadResult, StoreError> {
    let username = format!("thread_user_{label}");
    db.atomic(context, |tx| {
        let (user, _) = tx.get_or_create_user(&username)?;
        let (log, _) = tx.get_or_create_signal_log(user.id)?;
        Ok(ThreadResult {
            username: user.username,
            thread_name: log.thread_name,
        })
    })
}

// =============================================================================
// TESTS
// =============================================================================
