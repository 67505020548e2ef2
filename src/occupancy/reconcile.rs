//! Plan vs. observed reconciliation

use serde::Serialize;

use crate::config::Thresholds;
use crate::types::{count_for, Distribution};

/// Classification of a zone against its plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneVerdict {
    /// Nothing planned and nobody present
    Empty,
    /// Observed below `plan * under`; suggest minimal reinforcement
    UnderAttended,
    /// Observed above `plan * over`; suggest reduction
    OverProvisioned,
    /// Inside the operating range; keep observed
    WithinRange,
}

/// One row of the reconciliation table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneReconciliation {
    pub zone: String,
    pub planned: u32,
    pub observed: u32,
    pub recalculated: u32,
    pub verdict: ZoneVerdict,
}

/// 80% of plan, rounded down
fn reinforcement(plan: u32) -> u32 {
    (u64::from(plan) * 8 / 10) as u32
}

/// 110% of plan, rounded down
fn reduction(plan: u32) -> u32 {
    u32::try_from(u64::from(plan) * 11 / 10).unwrap_or(u32::MAX)
}

/// Recommended head count and verdict for a single zone
pub fn reconcile_zone(plan: u32, obs: u32, thresholds: &Thresholds) -> (u32, ZoneVerdict) {
    let plan_f = f64::from(plan);
    let obs_f = f64::from(obs);

    if plan == 0 && obs == 0 {
        (0, ZoneVerdict::Empty)
    } else if obs_f < plan_f * thresholds.under {
        (reinforcement(plan), ZoneVerdict::UnderAttended)
    } else if obs_f > plan_f * thresholds.over {
        (reduction(plan), ZoneVerdict::OverProvisioned)
    } else {
        (obs, ZoneVerdict::WithinRange)
    }
}

/// Reconcile every zone of the defined distribution
pub fn reconcile(
    defined: &Distribution,
    observed: &Distribution,
    thresholds: &Thresholds,
) -> Vec<ZoneReconciliation> {
    defined
        .iter()
        .map(|(zone, &planned)| {
            let observed = count_for(observed, zone);
            let (recalculated, verdict) = reconcile_zone(planned, observed, thresholds);
            ZoneReconciliation {
                zone: zone.clone(),
                planned,
                observed,
                recalculated,
                verdict,
            }
        })
        .collect()
}

/// The recalculated distribution alone
pub fn recalculated_distribution(
    defined: &Distribution,
    observed: &Distribution,
    thresholds: &Thresholds,
) -> Distribution {
    reconcile(defined, observed, thresholds)
        .into_iter()
        .map(|row| (row.zone, row.recalculated))
        .collect()
}
