//! # Signal Lab Library
//!
//! This library exposes the Signal Lab modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;

// Re-export signal_lab_core for convenience
pub use signal_lab_core;
