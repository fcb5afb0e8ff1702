use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Serialize;

use crate::predict::{ContactCatalog, ContactWindow, GroundStation};
use crate::scheduler::timeline::{Constraints, Timeline};
use crate::scheduler::types::{
    DataDemand, InfeasibleDemand, Schedule, ScheduleEntry, UnmetReason,
};

/// Baseline schedule plus the demands it could not serve.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Assembly {
    pub schedule: Schedule,
    pub unmet: Vec<InfeasibleDemand>,
}

/// Greedy assignment of demands to contact windows.
///
/// Candidate (demand, window) pairs are visited in a total order:
/// priority descending, AOS ascending, peak elevation descending, then
/// station ID and demand ID. The first pair that fits the timeline wins
/// and reserves `min_duration` starting at AOS.
pub fn assemble(
    catalog: &ContactCatalog,
    demands: &[DataDemand],
    stations: &[GroundStation],
    constraints: &Constraints,
) -> Assembly {
    let mut candidates: Vec<(&DataDemand, &ContactWindow)> = demands
        .iter()
        .flat_map(|d| catalog.windows_for(d.satellite_id).map(move |w| (d, w)))
        .collect();
    candidates.sort_by(|a, b| candidate_order(*a, *b));

    let mut timeline = Timeline::new(stations, constraints);
    let mut schedule = Schedule::new(catalog.horizon_start, catalog.horizon_end);
    let mut satisfied = HashSet::new();

    for (demand, window) in candidates {
        if satisfied.contains(demand.id.as_str()) {
            continue;
        }
        let Some(entry) = reservation(demand, window) else {
            continue;
        };
        if timeline.reserve(&entry).is_ok() {
            log::debug!(
                "Assigned demand {} to window {} ({} - {})",
                demand.id,
                window.id,
                entry.start,
                entry.end
            );
            satisfied.insert(demand.id.as_str());
            schedule.insert(entry);
        }
    }

    let unmet = diagnose_unmet(catalog, demands, &schedule, constraints);
    log::info!(
        "Assembled {} entries, {} demands unmet",
        schedule.len(),
        unmet.len()
    );
    Assembly { schedule, unmet }
}

fn candidate_order(
    (da, wa): (&DataDemand, &ContactWindow),
    (db, wb): (&DataDemand, &ContactWindow),
) -> Ordering {
    db.priority
        .cmp(&da.priority)
        .then(wa.aos.cmp(&wb.aos))
        .then(wb.peak_elevation_deg.total_cmp(&wa.peak_elevation_deg))
        .then_with(|| wa.station_id.cmp(&wb.station_id))
        .then_with(|| da.id.cmp(&db.id))
        .then_with(|| wa.id.cmp(&wb.id))
}

/// The AOS-anchored slice of `window` that would serve `demand`, if the
/// window is long enough and the slice ends before the deadline.
pub(crate) fn reservation(demand: &DataDemand, window: &ContactWindow) -> Option<ScheduleEntry> {
    if window.satellite_id != demand.satellite_id
        || window.duration() < demand.min_duration
        || !demand.meets_deadline(window.aos)
    {
        return None;
    }
    Some(ScheduleEntry {
        demand_id: demand.id.clone(),
        satellite_id: demand.satellite_id,
        station_id: window.station_id.clone(),
        window_id: window.id.clone(),
        start: window.aos,
        end: window.aos + demand.min_duration,
        priority: demand.priority,
        peak_elevation_deg: window.peak_elevation_deg,
    })
}

/// Explain every demand missing from `schedule`, highest priority first.
pub(crate) fn diagnose_unmet(
    catalog: &ContactCatalog,
    demands: &[DataDemand],
    schedule: &Schedule,
    constraints: &Constraints,
) -> Vec<InfeasibleDemand> {
    let unavailable = catalog.unavailable_satellites();
    let mut unmet: Vec<InfeasibleDemand> = demands
        .iter()
        .filter(|d| !schedule.is_scheduled(&d.id))
        .map(|demand| {
            let windows: Vec<_> = catalog.windows_for(demand.satellite_id).collect();
            let long_enough = || windows.iter().filter(|w| w.duration() >= demand.min_duration);
            let contacts = schedule
                .entries()
                .iter()
                .filter(|e| e.satellite_id == demand.satellite_id)
                .count();

            let reason = if unavailable.contains(&demand.satellite_id) {
                UnmetReason::SatelliteUnavailable
            } else if windows.is_empty() {
                UnmetReason::NoContactWindows
            } else if long_enough().next().is_none() {
                UnmetReason::WindowsTooShort
            } else if !long_enough().any(|w| demand.meets_deadline(w.aos)) {
                UnmetReason::DeadlineUnreachable
            } else if constraints
                .max_contacts_per_satellite
                .is_some_and(|limit| contacts >= limit as usize)
            {
                UnmetReason::ContactLimitReached
            } else {
                UnmetReason::CapacityExhausted
            };

            InfeasibleDemand {
                demand_id: demand.id.clone(),
                satellite_id: demand.satellite_id,
                priority: demand.priority,
                reason,
            }
        })
        .collect();
    unmet.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.demand_id.cmp(&b.demand_id))
    });
    unmet
}
