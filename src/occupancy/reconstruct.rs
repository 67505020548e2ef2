//! Occupancy reconstruction by full replay
//!
//! State is rebuilt from the first event on every call. Events are
//! replayed in timestamp order using a stable sort, so events sharing a
//! timestamp keep their log order and the result does not depend on how
//! out-of-order the log was written.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::SiteConfig;
use crate::types::{Distribution, Event, EventKind};

/// Whether an identity is currently in the building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Inside,
    Outside,
}

/// Per-identity presence after a replay
///
/// Identities never seen in the replayed events are `Outside`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyState {
    presence: BTreeMap<String, Presence>,
}

impl OccupancyState {
    pub fn presence(&self, identity: &str) -> Presence {
        self.presence.get(identity).copied().unwrap_or(Presence::Outside)
    }

    pub fn is_inside(&self, identity: &str) -> bool {
        self.presence(identity) == Presence::Inside
    }

    /// Identities currently inside, in name order
    pub fn inside(&self) -> impl Iterator<Item = &str> {
        self.presence
            .iter()
            .filter(|(_, p)| **p == Presence::Inside)
            .map(|(id, _)| id.as_str())
    }

    pub fn inside_count(&self) -> usize {
        self.inside().count()
    }

    /// Identities seen in any replayed event
    pub fn seen(&self) -> impl Iterator<Item = &str> {
        self.presence.keys().map(String::as_str)
    }

    /// Identities inside that have no zone assignment
    pub fn unassigned_inside<'a>(&'a self, config: &SiteConfig) -> Vec<&'a str> {
        self.inside().filter(|id| config.zone_of(id).is_none()).collect()
    }

    fn apply(&mut self, event: &Event) {
        let presence = match event.kind {
            EventKind::Entry => Presence::Inside,
            EventKind::Exit => Presence::Outside,
        };
        self.presence.insert(event.identity.clone(), presence);
    }
}

/// Events at or before `cutoff`, sorted by timestamp (stable)
pub fn replay_order<'a, I>(events: I, cutoff: Option<NaiveDateTime>) -> Vec<&'a Event>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut ordered: Vec<&Event> = events
        .into_iter()
        .filter(|e| cutoff.map_or(true, |c| e.timestamp <= c))
        .collect();
    ordered.sort_by_key(|e| e.timestamp);
    ordered
}

/// Replay events from scratch into per-identity presence
pub fn replay<'a, I>(events: I, cutoff: Option<NaiveDateTime>) -> OccupancyState
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut state = OccupancyState::default();
    for event in replay_order(events, cutoff) {
        state.apply(event);
    }
    state
}

/// Count assigned identities inside, per zone
///
/// Only zones with at least one identity inside appear in the result.
pub fn observed_distribution(state: &OccupancyState, config: &SiteConfig) -> Distribution {
    let mut distribution = Distribution::new();
    for (identity, zone) in config.assignments() {
        if state.is_inside(identity) {
            *distribution.entry(zone.to_string()).or_insert(0) += 1;
        }
    }
    distribution
}
