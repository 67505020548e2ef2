//! Zone distributions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Zone name -> head count
///
/// A zone missing from the map counts as zero.
pub type Distribution = BTreeMap<String, u32>;

/// Look up a zone count, treating an absent zone as zero
pub fn count_for(distribution: &Distribution, zone: &str) -> u32 {
    distribution.get(zone).copied().unwrap_or(0)
}

/// Sum of all counts in a distribution
pub fn total(distribution: &Distribution) -> u64 {
    distribution.values().map(|&v| u64::from(v)).sum()
}

/// The three distribution variants computed for one report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSet {
    /// Planned capacity per zone, from configuration
    pub defined: Distribution,
    /// Replayed occupancy per zone
    pub observed: Distribution,
    /// Reconciled recommendation per zone
    pub recalculated: Distribution,
}
