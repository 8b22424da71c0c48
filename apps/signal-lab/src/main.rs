//! Signal Lab binary.
//!
//! ```bash
//! signal-lab serve --port 8000 --database lab.redb
//! signal-lab rectangle --length 7 --width 3
//! signal-lab user alice --database lab.redb
//! signal-lab logs --database lab.redb --json
//! signal-lab scenarios
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use signal_lab::cli;
use signal_lab_core::rectangle::{DEFAULT_LENGTH, DEFAULT_WIDTH};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "signal-lab", version, about = "Rectangle and post-save signal lab")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// redb file for users and signal logs (in memory if omitted)
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Validate a rectangle and print its dimensions, area and perimeter
    Rectangle {
        #[arg(long, default_value_t = DEFAULT_LENGTH.to_string(), allow_hyphen_values = true)]
        length: String,
        #[arg(long, default_value_t = DEFAULT_WIDTH.to_string(), allow_hyphen_values = true)]
        width: String,
        #[arg(long)]
        json: bool,
    },
    /// Get or create a user and print its signal log
    User {
        username: String,
        #[arg(long)]
        database: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// List signal logs
    Logs {
        #[arg(long)]
        database: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Run the sync, thread and transaction scenarios and print their reports
    Scenarios {
        #[arg(long)]
        database: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> cli::CliResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();

    match args.command {
        Command::Serve {
            host,
            port,
            database,
        } => cli::cmd_serve(&host, port, database.as_deref()).await?,
        Command::Rectangle {
            length,
            width,
            json,
        } => {
            cli::cmd_rectangle(&length, &width, json)?;
        }
        Command::User {
            username,
            database,
            json,
        } => {
            cli::cmd_user(database.as_deref(), &username, json)?;
        }
        Command::Logs { database, json } => {
            cli::cmd_logs(database.as_deref(), json)?;
        }
        Command::Scenarios { database } => {
            cli::cmd_scenarios(database.as_deref())?;
        }
    }

    Ok(())
}
