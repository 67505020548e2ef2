//! Utility functions and helpers
//!
//! Atomic file writes for the event store and timestamp parsing.

pub mod atomic;
pub mod time;

pub use atomic::{atomic_copy, atomic_write_with, cleanup_temp_files};
pub use time::parse_timestamp;
