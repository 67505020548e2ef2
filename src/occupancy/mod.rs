//! Occupancy derivation
//!
//! Turns a frozen event sequence plus site configuration into the
//! defined, observed and recalculated distributions and the indicators
//! derived from them.
//!
//! - `reconstruct`: full replay into per-identity presence and zone counts
//! - `reconcile`: threshold rules comparing plan against observation
//! - `indicators`: compliance, deviation and zone counts, heat map
//! - `flow`: hourly traffic, door traffic, attendance
//! - `engine`: `DistributionEngine` tying the above to a snapshot

mod engine;
mod flow;
mod indicators;
mod reconcile;
mod reconstruct;

pub use engine::{DistributionEngine, OccupancyReport};
pub use flow::{attendance, door_traffic, hourly_flow, Attendance, DoorTraffic, HourBucket, HourlyFlow};
pub use indicators::{compute as compute_indicators, heat_map, Indicators};
pub use reconcile::{
    recalculated_distribution, reconcile, reconcile_zone, ZoneReconciliation, ZoneVerdict,
};
pub use reconstruct::{observed_distribution, replay, replay_order, OccupancyState, Presence};

use crate::config::ConfigError;
use crate::event_store::EventStoreError;

/// Failure to assemble the inputs of a distribution computation
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}
