//! # Signal Lab Core
//!
//! The pure logic behind the Signal Lab application.
//!
//! ```text
//! ┌──────────────┐   get_or_create_user   ┌──────────────┐
//! │  scenario    │ ─────────────────────► │  store       │
//! │  (demos)     │                        │  Database    │
//! └──────────────┘                        │  Transaction │
//!                                         └──────┬───────┘
//!                                                │ PostSave
//!                                         ┌──────▼───────┐
//!                                         │  signal      │
//!                                         │  SignalBus   │
//!                                         └──────┬───────┘
//!                                                │ record_signal
//!                                         ┌──────▼───────┐
//!                                         │  signal_log  │
//!                                         └──────────────┘
//! ```
//!
//! The [`rectangle`] module is independent of everything else: a validated,
//! immutable value object with a bounded traversal over its dimensions.

pub mod context;
pub mod error;
pub mod rectangle;
pub mod scenario;
pub mod signal;
pub mod signal_log;
pub mod store;
pub mod user;

pub use context::ExecutionContext;
pub use error::{Dimension, InvalidDimension, StoreError};
pub use rectangle::{DimensionRecord, Dimensions, Rectangle, RectangleReport};
pub use signal::{HandlerId, PostSave, SignalBus};
pub use signal_log::{LogLabel, SignalLog};
pub use store::{Database, Transaction};
pub use user::{User, UserId};
