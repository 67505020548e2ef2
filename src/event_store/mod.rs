//! Event Store Module
//!
//! This module provides the badge event log and its read path:
//! - `EventStore`: append-only log with a PAUSED/ACCEPTING write gate
//! - `publish_snapshot`: pause → backup → snapshot → resume cycle
//! - `StoreStatus`: point-in-time counts across file variants
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//! ┌──────────┐    ┌──────────────┐    ┌────────────────────────┐
//! │ ingest / │───►│ append /     │───►│ events.json            │
//! │ writers  │    │ append_batch │    │ (whole-file rewrite)   │
//! └──────────┘    └──────────────┘    └────────────────────────┘
//!
//! Read Path:
//! ┌──────────────────┐    ┌─────────────────────┐    ┌───────────────┐
//! │ publish_snapshot │───►│ events_snapshot.json│───►│ occupancy     │
//! │ (write lock held)│    │ events_backup.json  │    │ derivation    │
//! └──────────────────┘    └─────────────────────┘    └───────────────┘
//! ```

mod snapshot;
mod stats;
mod store;

pub use snapshot::SnapshotReport;
pub use stats::StoreStatus;
pub use store::{
    EventStore, EventStoreConfig, EventStoreError, EventStoreResult, LogTarget, StoreState,
};
