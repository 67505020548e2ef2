//! Traffic over time and across doors

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::config::SiteConfig;
use crate::types::{Event, EventKind};

/// Entries and exits recorded in one hour of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub entries: usize,
    pub exits: usize,
}

impl HourBucket {
    pub fn total(&self) -> usize {
        self.entries + self.exits
    }
}

/// Hour-of-day series, ascending, only hours with traffic
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HourlyFlow {
    pub buckets: Vec<HourBucket>,
    /// Running `entries - exits`, starting at 0 before the first bucket
    /// (one element longer than `buckets`)
    pub net_accumulation: Vec<i64>,
    /// Hour with the most swipes; the earliest wins ties
    pub busiest_hour: Option<u32>,
    /// Hour with the most entries, `None` when there are none
    pub peak_entry_hour: Option<u32>,
    /// Hour with the most exits, `None` when there are none
    pub peak_exit_hour: Option<u32>,
}

/// Hour of the first bucket with the highest positive `count`
fn peak_hour(buckets: &[HourBucket], count: impl Fn(&HourBucket) -> usize) -> Option<u32> {
    let mut peak: Option<&HourBucket> = None;
    for bucket in buckets.iter().filter(|&b| count(b) > 0) {
        if peak.map_or(true, |p| count(bucket) > count(p)) {
            peak = Some(bucket);
        }
    }
    peak.map(|b| b.hour)
}

pub fn hourly_flow<'a, I>(events: I) -> HourlyFlow
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut by_hour: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for event in events {
        let counts = by_hour.entry(event.hour()).or_default();
        match event.kind {
            EventKind::Entry => counts.0 += 1,
            EventKind::Exit => counts.1 += 1,
        }
    }

    let buckets: Vec<HourBucket> = by_hour
        .into_iter()
        .map(|(hour, (entries, exits))| HourBucket { hour, entries, exits })
        .collect();

    let mut net_accumulation = Vec::with_capacity(buckets.len() + 1);
    let mut net = 0i64;
    net_accumulation.push(net);
    for bucket in &buckets {
        net += bucket.entries as i64 - bucket.exits as i64;
        net_accumulation.push(net);
    }

    HourlyFlow {
        net_accumulation,
        busiest_hour: peak_hour(&buckets, HourBucket::total),
        peak_entry_hour: peak_hour(&buckets, |b| b.entries),
        peak_exit_hour: peak_hour(&buckets, |b| b.exits),
        buckets,
    }
}

/// Swipes per door
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorTraffic {
    pub door: i64,
    pub label: String,
    pub entries: usize,
    pub exits: usize,
}

pub fn door_traffic<'a, I>(events: I, config: &SiteConfig) -> Vec<DoorTraffic>
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut by_door: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
    for event in events {
        let counts = by_door.entry(event.door).or_default();
        match event.kind {
            EventKind::Entry => counts.0 += 1,
            EventKind::Exit => counts.1 += 1,
        }
    }

    by_door
        .into_iter()
        .map(|(door, (entries, exits))| DoorTraffic {
            door,
            label: config.door_label(door),
            entries,
            exits,
        })
        .collect()
}

/// How many assigned identities showed up at all
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attendance {
    /// Assigned identities with at least one event
    pub present: usize,
    pub assigned: usize,
    pub attendance_pct: f64,
}

pub fn attendance<'a, I>(events: I, config: &SiteConfig) -> Attendance
where
    I: IntoIterator<Item = &'a Event>,
{
    let present: BTreeSet<&str> = events
        .into_iter()
        .map(|e| e.identity.as_str())
        .filter(|id| config.zone_of(id).is_some())
        .collect();

    let assigned = config.assigned_count();
    let attendance_pct = if assigned == 0 {
        0.0
    } else {
        present.len() as f64 / assigned as f64 * 100.0
    };

    Attendance {
        present: present.len(),
        assigned,
        attendance_pct,
    }
}
