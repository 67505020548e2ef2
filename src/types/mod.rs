//! Data types for badge events and zone distributions

mod distribution;
mod event;

pub use distribution::{count_for, total, Distribution, DistributionSet};
pub use event::{Event, EventKind, EventLog, InvalidEvent, RawEvent};
