//! Derived indicators over a distribution set

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::Thresholds;
use crate::types::{count_for, total, Distribution};

/// Summary statistics for reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicators {
    /// `100 * sum(observed) / sum(defined)`, 0 when nothing is planned
    pub compliance_pct: f64,
    /// `|sum(observed) - sum(defined)|`
    pub total_deviation: u64,
    /// Zones whose relative deviation exceeds the critical threshold
    pub critical_zones: usize,
    pub over_provisioned_zones: usize,
    pub under_attended_zones: usize,
}

/// Compute indicators; zones with a zero plan are left out of the zone counts
pub fn compute(defined: &Distribution, observed: &Distribution, thresholds: &Thresholds) -> Indicators {
    let total_plan = total(defined);
    let total_obs = total(observed);

    let mut critical_zones = 0;
    let mut over_provisioned_zones = 0;
    let mut under_attended_zones = 0;

    for (zone, &plan) in defined {
        if plan == 0 {
            continue;
        }
        let plan = f64::from(plan);
        let obs = f64::from(count_for(observed, zone));

        if ((obs - plan) / plan).abs() > thresholds.critical_deviation {
            critical_zones += 1;
        }
        if obs > plan * thresholds.over {
            over_provisioned_zones += 1;
        }
        if obs < plan * thresholds.under {
            under_attended_zones += 1;
        }
    }

    let compliance_pct = if total_plan > 0 {
        total_obs as f64 / total_plan as f64 * 100.0
    } else {
        0.0
    };

    Indicators {
        compliance_pct,
        total_deviation: total_obs.abs_diff(total_plan),
        critical_zones,
        over_provisioned_zones,
        under_attended_zones,
    }
}

/// Occupancy ratio per defined zone (`obs / plan`, 0.0 when plan is 0)
pub fn heat_map(defined: &Distribution, observed: &Distribution) -> BTreeMap<String, f64> {
    defined
        .iter()
        .map(|(zone, &plan)| {
            let ratio = if plan == 0 {
                0.0
            } else {
                f64::from(count_for(observed, zone)) / f64::from(plan)
            };
            (zone.clone(), ratio)
        })
        .collect()
}
