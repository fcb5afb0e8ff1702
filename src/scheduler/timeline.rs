use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::predict::{ContactCatalog, GroundStation, SatelliteId, StationId};
use crate::scheduler::types::{DataDemand, Schedule, ScheduleEntry};

/// Station dead time between contacts unless configured otherwise.
pub const DEFAULT_TURNAROUND_SECONDS: i64 = 60;

/// Resource limits applied on top of the contact windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Constraints {
    /// Dead time a station needs after a contact before the slot frees up.
    #[serde(with = "crate::config::humantime_duration")]
    pub turnaround: Duration,
    pub max_contacts_per_satellite: Option<u32>,
    pub capacity_overrides: BTreeMap<StationId, u32>,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            turnaround: Duration::seconds(DEFAULT_TURNAROUND_SECONDS),
            max_contacts_per_satellite: None,
            capacity_overrides: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    UnknownStation,
    StationFull,
    SatelliteBusy,
    ContactLimit,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Violation {
    #[error("demand {0} is not part of the request")]
    UnknownDemand(String),
    #[error("demand {0} is scheduled more than once")]
    DuplicateDemand(String),
    #[error("demand {demand_id}: window {window_id} does not exist")]
    UnknownWindow { demand_id: String, window_id: String },
    #[error("demand {demand_id}: window {window_id} belongs to another satellite or station")]
    WindowMismatch { demand_id: String, window_id: String },
    #[error("demand {demand_id}: entry lies outside window {window_id}")]
    OutsideWindow { demand_id: String, window_id: String },
    #[error("demand {0}: entry is shorter than the minimum duration")]
    TooShort(String),
    #[error("demand {0}: entry ends after the deadline")]
    DeadlineMissed(String),
    #[error("station {0} is not defined")]
    UnknownStation(StationId),
    #[error("station {station_id} over capacity at {at}")]
    StationOverbooked {
        station_id: StationId,
        at: DateTime<Utc>,
    },
    #[error("satellite {satellite_id} has overlapping contacts at {at}")]
    SatelliteOverlap {
        satellite_id: SatelliteId,
        at: DateTime<Utc>,
    },
    #[error("satellite {satellite_id} exceeds {limit} contacts")]
    ContactLimit { satellite_id: SatelliteId, limit: u32 },
}

type Interval = (DateTime<Utc>, DateTime<Utc>);

/// Occupancy of stations and satellites. Intervals are half-open, so a
/// contact may start exactly when the previous one ends.
#[derive(Debug, Clone)]
pub struct Timeline {
    capacity: HashMap<StationId, u32>,
    stations: HashMap<StationId, Vec<Interval>>,
    satellites: HashMap<SatelliteId, Vec<Interval>>,
    turnaround: Duration,
    max_contacts: Option<u32>,
}

impl Timeline {
    pub fn new(stations: &[GroundStation], constraints: &Constraints) -> Self {
        Self {
            capacity: stations
                .iter()
                .map(|s| (s.id.clone(), s.capacity))
                .collect(),
            stations: HashMap::new(),
            satellites: HashMap::new(),
            turnaround: constraints.turnaround,
            max_contacts: constraints.max_contacts_per_satellite,
        }
    }

    /// Can `satellite_id` talk to `station_id` over `[start, end)`?
    pub fn check(
        &self,
        satellite_id: SatelliteId,
        station_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), Conflict> {
        let capacity = *self
            .capacity
            .get(station_id)
            .ok_or(Conflict::UnknownStation)?;

        if let Some(limit) = self.max_contacts {
            if self.contacts(satellite_id) >= limit as usize {
                return Err(Conflict::ContactLimit);
            }
        }
        let booked = self.satellites.get(&satellite_id);
        if booked.is_some_and(|b| b.iter().any(|&(a, z)| a < end && start < z)) {
            return Err(Conflict::SatelliteBusy);
        }

        let load = self
            .stations
            .get(station_id)
            .map_or(0, |intervals| peak_load(intervals, start, end + self.turnaround));
        if load >= capacity as usize {
            return Err(Conflict::StationFull);
        }
        Ok(())
    }

    pub fn reserve(&mut self, entry: &ScheduleEntry) -> Result<(), Conflict> {
        self.check(entry.satellite_id, &entry.station_id, entry.start, entry.end)?;
        self.stations
            .entry(entry.station_id.clone())
            .or_default()
            .push((entry.start, entry.end + self.turnaround));
        self.satellites
            .entry(entry.satellite_id)
            .or_default()
            .push((entry.start, entry.end));
        Ok(())
    }

    pub fn contacts(&self, satellite_id: SatelliteId) -> usize {
        self.satellites.get(&satellite_id).map_or(0, Vec::len)
    }
}

/// Highest number of `intervals` active at once inside `[start, end)`.
/// The count only rises at an interval start, so those are the only
/// instants worth checking.
fn peak_load(intervals: &[Interval], start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
    let active_at = |t: DateTime<Utc>| intervals.iter().filter(|&&(a, z)| a <= t && t < z).count();
    intervals
        .iter()
        .map(|&(a, _)| a)
        .filter(|&a| start < a && a < end)
        .chain(std::iter::once(start))
        .map(active_at)
        .max()
        .unwrap_or(0)
}

/// Check every schedule invariant from scratch: each entry is a slice of
/// a real window for its own satellite and station, meets its demand's
/// duration and deadline, and the whole set respects station capacity,
/// satellite exclusivity and the contact cap.
pub fn validate(
    schedule: &Schedule,
    catalog: &ContactCatalog,
    demands: &[DataDemand],
    stations: &[GroundStation],
    constraints: &Constraints,
) -> Result<(), Violation> {
    let by_id: HashMap<&str, &DataDemand> = demands.iter().map(|d| (d.id.as_str(), d)).collect();
    let mut seen = HashSet::new();
    let mut timeline = Timeline::new(stations, constraints);

    for entry in schedule.entries() {
        let demand_id = entry.demand_id.clone();
        let demand = by_id
            .get(entry.demand_id.as_str())
            .ok_or_else(|| Violation::UnknownDemand(demand_id.clone()))?;
        if !seen.insert(entry.demand_id.as_str()) {
            return Err(Violation::DuplicateDemand(demand_id));
        }

        let window = catalog
            .get(&entry.window_id)
            .ok_or_else(|| Violation::UnknownWindow {
                demand_id: demand_id.clone(),
                window_id: entry.window_id.clone(),
            })?;
        if window.satellite_id != entry.satellite_id
            || window.station_id != entry.station_id
            || demand.satellite_id != entry.satellite_id
        {
            return Err(Violation::WindowMismatch {
                demand_id,
                window_id: entry.window_id.clone(),
            });
        }
        if entry.start >= entry.end || !window.contains(entry.start, entry.end) {
            return Err(Violation::OutsideWindow {
                demand_id,
                window_id: entry.window_id.clone(),
            });
        }
        if entry.duration() < demand.min_duration {
            return Err(Violation::TooShort(demand_id));
        }
        if demand.deadline.is_some_and(|deadline| entry.end > deadline) {
            return Err(Violation::DeadlineMissed(demand_id));
        }

        timeline.reserve(entry).map_err(|conflict| match conflict {
            Conflict::UnknownStation => Violation::UnknownStation(entry.station_id.clone()),
            Conflict::StationFull => Violation::StationOverbooked {
                station_id: entry.station_id.clone(),
                at: entry.start,
            },
            Conflict::SatelliteBusy => Violation::SatelliteOverlap {
                satellite_id: entry.satellite_id,
                at: entry.start,
            },
            Conflict::ContactLimit => Violation::ContactLimit {
                satellite_id: entry.satellite_id,
                limit: constraints.max_contacts_per_satellite.unwrap_or(0),
            },
        })?;
    }
    Ok(())
}
