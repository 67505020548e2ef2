//! Badge Occupancy
//!
//! Ingests access-control badge swipes into an append-only event log and
//! derives zone-occupancy distributions from stable snapshots of it.
//!
//! # Features
//!
//! - **Thread-Safe Store**: single write lock, PAUSED/ACCEPTING write gate
//! - **Snapshot Publishing**: pause → backup → snapshot → resume, never left paused
//! - **Full Replay**: occupancy recomputed from scratch on every read
//! - **Reconciliation**: threshold rules turning plan + observation into a recommendation
//! - **Indicators**: compliance, deviation, critical zones, hourly flow
//!
//! # Modules
//!
//! - `types`: Event records and distributions
//! - `event_store`: Append-only log, snapshot publisher, status
//! - `config`: Site configuration (zones, assignments, thresholds)
//! - `occupancy`: Reconstruction, reconciliation and indicators
//! - `ingest`: Delimited, CSV and JSON bulk parsers
//! - `utils`: Atomic file writes and timestamp parsing
//!
//! # Example
//!
//! ```no_run
//! use badge_occupancy::{DistributionEngine, EventStore, EventStoreConfig, RawEvent};
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = EventStore::open(EventStoreConfig::new("data"))?;
//!     store.append(RawEvent::new("2025-01-10T08:00:00", "T001234", "1", "entry"))?;
//!
//!     store.publish_snapshot()?;
//!     let engine = DistributionEngine::load(&store, "config.yaml")?;
//!     println!("{:?}", engine.distributions(None));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod event_store;
pub mod ingest;
pub mod occupancy;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{ConfigError, SiteConfig, Thresholds, Zone};
pub use event_store::{
    EventStore, EventStoreConfig, EventStoreError, EventStoreResult, LogTarget, SnapshotReport,
    StoreState, StoreStatus,
};
pub use occupancy::{DistributionEngine, DistributionError, Indicators, OccupancyReport};
pub use types::{Distribution, DistributionSet, Event, EventKind, RawEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
