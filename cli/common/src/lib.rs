//! Shared utilities for the cloud-sweep CLI.
//!
//! Log level selection, logging setup, and human-readable formatting for
//! sizes, counts and plain-text tables.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_bytes, format_number, render_table};
pub use logging::init_logging;
