//! # CLI Commands
//!
//! One `cmd_*` function per subcommand. They print to stdout and also return
//! what they printed, so tests can check results without capturing output.
//!
//! Commands that touch the store take an optional database path: without one
//! they work on a fresh in-memory store.

use crate::api::{AppState, create_router};
use serde::{Deserialize, Serialize};
use signal_lab_core::scenario::{self, SyncReport, ThreadReport, TransactionReport};
use signal_lab_core::{
    Database, ExecutionContext, Rectangle, RectangleReport, SignalLog, StoreError, UserId,
    signal_log,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Result type for CLI commands.
pub type CliResult<T = ()> = Result<T, Box<dyn Error + Send + Sync>>;

/// Open the store at `path` (or in memory) with the signal logger installed.
pub fn open_database(path: Option<&Path>) -> Result<Arc<Database>, StoreError> {
    let db = match path {
        Some(path) => Database::open(path)?,
        None => Database::in_memory(),
    };
    signal_log::install(db.signals());
    Ok(Arc::new(db))
}

// =============================================================================
// SERVE
// =============================================================================

/// Serve the HTTP API until Ctrl-C.
pub async fn cmd_serve(host: &str, port: u16, database: Option<&Path>) -> CliResult {
    let db = open_database(database)?;
    let app = create_router(AppState::new(db));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        // Without a signal handler, keep serving.
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

// =============================================================================
// RECTANGLE
// =============================================================================

/// Validate a rectangle and print its traversal and measurements.
pub fn cmd_rectangle(length: &str, width: &str, json: bool) -> CliResult<RectangleReport> {
    let rectangle = Rectangle::parse(length, width)?;
    let report = rectangle.report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Rectangle {} x {}", rectangle.length(), rectangle.width());
        for record in &rectangle {
            println!("  {}: {}", record.dimension(), record.value());
        }
        println!("  area: {}", report.area);
        println!("  perimeter: {}", report.perimeter);
    }

    Ok(report)
}

// =============================================================================
// USER
// =============================================================================

/// Get-or-create a user on the main thread and print its signal log.
pub fn cmd_user(database: Option<&Path>, username: &str, json: bool) -> CliResult<SignalLog> {
    let db = open_database(database)?;
    let context = ExecutionContext::current();

    let (created, log) = db.atomic(&context, |tx| {
        let (user, created) = tx.get_or_create_user(username)?;
        let (log, _) = tx.get_or_create_signal_log(user.id)?;
        Ok((created, log))
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
    } else {
        let verb = if created { "Created" } else { "Found" };
        println!("{} user '{}' (id {})", verb, username, log.user);
        print_log(&log, username);
    }

    Ok(log)
}

// =============================================================================
// LOGS
// =============================================================================

/// Print every signal log in the store.
pub fn cmd_logs(database: Option<&Path>, json: bool) -> CliResult<Vec<SignalLog>> {
    let db = open_database(database)?;
    let logs = db.signal_logs();

    if json {
        println!("{}", serde_json::to_string_pretty(&logs)?);
    } else if logs.is_empty() {
        println!("No signal logs");
    } else {
        let names: BTreeMap<UserId, String> = db
            .users()
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();
        for log in &logs {
            let username = names.get(&log.user).map_or("?", String::as_str);
            print_log(log, username);
        }
    }

    Ok(logs)
}

// =============================================================================
// SCENARIOS
// =============================================================================

/// Reports of all three scenarios, run against one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReports {
    pub sync: SyncReport,
    pub thread: ThreadReport,
    pub transaction: TransactionReport,
}

/// Run all three signal scenarios on the main thread and print the reports.
pub fn cmd_scenarios(database: Option<&Path>) -> CliResult<ScenarioReports> {
    let db = open_database(database)?;
    let context = ExecutionContext::current();

    let reports = ScenarioReports {
        sync: scenario::sync_signal(&db, &context)?,
        thread: scenario::thread_signal(&db, &context)?,
        transaction: scenario::transaction_signal(&db, &context)?,
    };
    println!("{}", serde_json::to_string_pretty(&reports)?);

    Ok(reports)
}

fn print_log(log: &SignalLog, username: &str) {
    println!("{}", log.label(username));
    println!("  user:           {}", log.user);
    println!("  thread:         {}", log.thread_name);
    println!("  is_sync:        {}", log.is_sync);
    println!("  transaction_id: {}", log.transaction_id);
    println!("  execution_time: {}s", log.execution_time);
}
