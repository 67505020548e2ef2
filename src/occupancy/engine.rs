//! Distribution engine over a frozen event sequence
//!
//! Every method recomputes from the full event sequence; nothing derived
//! is cached between calls, so two calls over the same events always
//! agree and no incremental update can drift.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::config::SiteConfig;
use crate::event_store::EventStore;
use crate::types::{Distribution, DistributionSet, Event};

use super::flow::{self, Attendance, DoorTraffic, HourlyFlow};
use super::indicators::{self, Indicators};
use super::reconcile::{self, ZoneReconciliation};
use super::reconstruct::{self, OccupancyState};
use super::DistributionError;

/// Everything a reporting consumer needs, computed in one pass
#[derive(Debug, Clone, Serialize)]
pub struct OccupancyReport {
    /// Events considered (after the cutoff filter)
    pub events: usize,
    pub cutoff: Option<NaiveDateTime>,
    pub distributions: DistributionSet,
    pub zones: Vec<ZoneReconciliation>,
    pub heat_map: BTreeMap<String, f64>,
    pub indicators: Indicators,
    pub hourly_flow: HourlyFlow,
    pub doors: Vec<DoorTraffic>,
    pub attendance: Attendance,
    /// Identities inside without a zone assignment
    pub unassigned_inside: Vec<String>,
}

/// Distribution queries over a frozen event sequence and site configuration
pub struct DistributionEngine {
    config: SiteConfig,
    events: Vec<Event>,
}

impl DistributionEngine {
    pub fn new(config: SiteConfig, events: Vec<Event>) -> Self {
        Self { config, events }
    }

    /// Build over the store's published snapshot (never the live log)
    pub fn from_snapshot(store: &EventStore, config: SiteConfig) -> Result<Self, DistributionError> {
        let events = store.load_snapshot()?;
        info!(events = events.len(), "Loaded snapshot for distribution");
        Ok(Self::new(config, events))
    }

    /// Load configuration from a YAML file and the store's snapshot
    pub fn load<P: AsRef<Path>>(store: &EventStore, config_path: P) -> Result<Self, DistributionError> {
        let config = SiteConfig::from_file(config_path)?;
        Self::from_snapshot(store, config)
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events at or before the cutoff, in replay order
    fn events_until(&self, cutoff: Option<NaiveDateTime>) -> Vec<&Event> {
        reconstruct::replay_order(&self.events, cutoff)
    }

    /// Planned capacity per zone
    pub fn defined(&self) -> Distribution {
        self.config
            .zones()
            .iter()
            .map(|z| (z.name.clone(), z.planned_capacity))
            .collect()
    }

    pub fn occupancy(&self, cutoff: Option<NaiveDateTime>) -> OccupancyState {
        reconstruct::replay(&self.events, cutoff)
    }

    pub fn observed(&self, cutoff: Option<NaiveDateTime>) -> Distribution {
        reconstruct::observed_distribution(&self.occupancy(cutoff), &self.config)
    }

    pub fn reconciliation(&self, cutoff: Option<NaiveDateTime>) -> Vec<ZoneReconciliation> {
        reconcile::reconcile(&self.defined(), &self.observed(cutoff), self.config.thresholds())
    }

    pub fn recalculated(&self, cutoff: Option<NaiveDateTime>) -> Distribution {
        reconcile::recalculated_distribution(
            &self.defined(),
            &self.observed(cutoff),
            self.config.thresholds(),
        )
    }

    pub fn distributions(&self, cutoff: Option<NaiveDateTime>) -> DistributionSet {
        let defined = self.defined();
        let observed = self.observed(cutoff);
        let recalculated =
            reconcile::recalculated_distribution(&defined, &observed, self.config.thresholds());
        DistributionSet {
            defined,
            observed,
            recalculated,
        }
    }

    pub fn heat_map(&self, cutoff: Option<NaiveDateTime>) -> BTreeMap<String, f64> {
        indicators::heat_map(&self.defined(), &self.observed(cutoff))
    }

    pub fn indicators(&self, cutoff: Option<NaiveDateTime>) -> Indicators {
        indicators::compute(&self.defined(), &self.observed(cutoff), self.config.thresholds())
    }

    pub fn hourly_flow(&self, cutoff: Option<NaiveDateTime>) -> HourlyFlow {
        flow::hourly_flow(self.events_until(cutoff))
    }

    pub fn door_traffic(&self, cutoff: Option<NaiveDateTime>) -> Vec<DoorTraffic> {
        flow::door_traffic(self.events_until(cutoff), &self.config)
    }

    pub fn attendance(&self, cutoff: Option<NaiveDateTime>) -> Attendance {
        flow::attendance(self.events_until(cutoff), &self.config)
    }

    /// Full report at an optional cutoff
    pub fn report(&self, cutoff: Option<NaiveDateTime>) -> OccupancyReport {
        let considered = self.events_until(cutoff);
        let state = reconstruct::replay(considered.iter().copied(), None);
        let thresholds = self.config.thresholds();

        let defined = self.defined();
        let observed = reconstruct::observed_distribution(&state, &self.config);
        let zones = reconcile::reconcile(&defined, &observed, thresholds);
        let recalculated: Distribution =
            zones.iter().map(|r| (r.zone.clone(), r.recalculated)).collect();

        OccupancyReport {
            events: considered.len(),
            cutoff,
            heat_map: indicators::heat_map(&defined, &observed),
            indicators: indicators::compute(&defined, &observed, thresholds),
            hourly_flow: flow::hourly_flow(considered.iter().copied()),
            doors: flow::door_traffic(considered.iter().copied(), &self.config),
            attendance: flow::attendance(considered.iter().copied(), &self.config),
            unassigned_inside: state
                .unassigned_inside(&self.config)
                .into_iter()
                .map(str::to_string)
                .collect(),
            zones,
            distributions: DistributionSet {
                defined,
                observed,
                recalculated,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Thresholds, Zone};
    use crate::types::RawEvent;
    use crate::utils::parse_timestamp;

    fn ev(ts: &str, id: &str, kind: &str) -> Event {
        Event::try_from(RawEvent::new(ts, id, "1", kind)).unwrap()
    }

    fn engine() -> DistributionEngine {
        let mut assignments = BTreeMap::new();
        assignments.insert("ops".to_string(), vec!["A".to_string(), "B".to_string()]);
        assignments.insert("lab".to_string(), vec!["C".to_string()]);
        let config = SiteConfig::new(
            vec![Zone::new("ops", 2), Zone::new("lab", 5), Zone::new("spare", 0)],
            assignments,
            Thresholds::new(0.6, 1.5, 0.3).unwrap(),
        )
        .unwrap();

        DistributionEngine::new(
            config,
            vec![
                ev("2025-01-10T08:00:00", "A", "entry"),
                ev("2025-01-10T08:10:00", "B", "entry"),
                ev("2025-01-10T08:20:00", "C", "entry"),
                ev("2025-01-10T08:25:00", "X", "entry"),
                ev("2025-01-10T12:00:00", "C", "exit"),
            ],
        )
    }

    #[test]
    fn test_distributions() {
        let engine = engine();
        let set = engine.distributions(None);

        assert_eq!(set.defined.len(), 3);
        assert_eq!(set.observed.get("ops"), Some(&2));
        assert_eq!(set.observed.get("lab"), None);
        // lab: 0 < 5 * 0.6 -> floor(5 * 0.8)
        assert_eq!(set.recalculated.get("lab"), Some(&4));
        assert_eq!(set.recalculated.get("ops"), Some(&2));
        assert_eq!(set.recalculated.get("spare"), Some(&0));
    }

    #[test]
    fn test_cutoff_report() {
        let engine = engine();
        let report = engine.report(parse_timestamp("2025-01-10T09:00:00"));

        assert_eq!(report.events, 4);
        assert_eq!(report.distributions.observed.get("lab"), Some(&1));
        assert_eq!(report.unassigned_inside, vec!["X"]);
        assert_eq!(report.attendance.present, 3);
    }

    #[test]
    fn test_report_matches_individual_methods() {
        let engine = engine();
        let report = engine.report(None);

        assert_eq!(report.distributions, engine.distributions(None));
        assert_eq!(report.indicators, engine.indicators(None));
        assert_eq!(report.zones, engine.reconciliation(None));
        assert_eq!(report.hourly_flow, engine.hourly_flow(None));
        assert_eq!(report.heat_map, engine.heat_map(None));
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let engine = engine();
        assert_eq!(engine.observed(None), engine.observed(None));
        assert_eq!(engine.recalculated(None), engine.recalculated(None));
    }
}
