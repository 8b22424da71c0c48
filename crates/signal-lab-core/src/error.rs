//! # Error Types
//!
//! Two families of failure exist in the core:
//!
//! - [`InvalidDimension`]: a rectangle could not be built from its inputs.
//!   Surfaced to HTTP callers as a client error.
//! - [`StoreError`]: the user/log store failed, or a transaction was rolled
//!   back on purpose.
//!
//! Running out of rectangle dimensions during traversal is not an error; the
//! cursor simply returns `None`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which side of a rectangle an input was meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Length,
    Width,
}

impl Dimension {
    /// The lowercase name used in query strings and JSON records.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Width => "width",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rectangle dimension failed validation.
///
/// The three variants map to the validation steps, checked in order:
/// integral, then positive, then representable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidDimension {
    /// The input was not an integer at all.
    #[error("Both length and width must be integers ({dimension} = {input:?})")]
    NotInteger { dimension: Dimension, input: String },

    /// The input was an integer, but zero or negative.
    #[error("Length and width must be positive integers ({dimension} = {input})")]
    NotPositive { dimension: Dimension, input: String },

    /// The input was a positive integer larger than `u32::MAX`.
    #[error("Length and width must not exceed {max} ({dimension} = {input})")]
    TooLarge {
        dimension: Dimension,
        input: String,
        max: u32,
    },
}

impl InvalidDimension {
    /// The dimension whose input was rejected.
    #[must_use]
    pub fn dimension(&self) -> Dimension {
        match self {
            Self::NotInteger { dimension, .. }
            | Self::NotPositive { dimension, .. }
            | Self::TooLarge { dimension, .. } => *dimension,
        }
    }

    /// The rejected input, as the caller supplied it.
    #[must_use]
    pub fn input(&self) -> &str {
        match self {
            Self::NotInteger { input, .. }
            | Self::NotPositive { input, .. }
            | Self::TooLarge { input, .. } => input,
        }
    }
}

/// Errors raised by the user/log store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// A stored record could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),

    /// The transaction body asked for a rollback.
    #[error("transaction rolled back: {0}")]
    Rollback(String),

    /// A signal log was written for a user the store does not know.
    #[error("no user with id {0}")]
    UnknownUser(crate::user::UserId),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// A thread spawned by a scenario panicked before reporting back.
    #[error("worker thread {0} panicked")]
    WorkerPanicked(String),
}

impl StoreError {
    /// Shorthand for a deliberate rollback.
    pub fn rollback(reason: impl Into<String>) -> Self {
        Self::Rollback(reason.into())
    }

    /// Whether this error is a deliberate rollback rather than a failure.
    #[must_use]
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::Rollback(_))
    }
}

// =============================================================================
// TESTS
// =============================================================================
