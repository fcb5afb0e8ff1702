use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::{SatelliteId, StationId};

/// A satellite's pending need for one contact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct DataDemand {
    pub id: String,
    pub satellite_id: SatelliteId,
    /// Higher is served first.
    pub priority: u32,
    #[serde(with = "crate::config::humantime_duration")]
    #[schema(value_type = String, example = "5m")]
    pub min_duration: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl DataDemand {
    /// Whether a reservation starting at `start` finishes in time.
    pub fn meets_deadline(&self, start: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) => start + self.min_duration <= deadline,
            None => true,
        }
    }
}

/// One demand assigned to a slice of one contact window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ScheduleEntry {
    pub demand_id: String,
    pub satellite_id: SatelliteId,
    pub station_id: StationId,
    pub window_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub priority: u32,
    pub peak_elevation_deg: f64,
}

impl ScheduleEntry {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn minutes(&self) -> f64 {
        self.duration().num_milliseconds() as f64 / 60_000.0
    }

    fn sort_key(&self) -> (DateTime<Utc>, &str, SatelliteId, &str) {
        (
            self.start,
            self.station_id.as_str(),
            self.satellite_id,
            self.demand_id.as_str(),
        )
    }
}

/// Entries for one horizon, kept ordered by (start, station, satellite,
/// demand).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Schedule {
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn new(horizon_start: DateTime<Utc>, horizon_end: DateTime<Utc>) -> Self {
        Self {
            horizon_start,
            horizon_end,
            entries: Vec::new(),
        }
    }

    pub fn from_entries(
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
        mut entries: Vec<ScheduleEntry>,
    ) -> Self {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self {
            horizon_start,
            horizon_end,
            entries,
        }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, entry: ScheduleEntry) {
        let at = self
            .entries
            .partition_point(|e| e.sort_key() <= entry.sort_key());
        self.entries.insert(at, entry);
    }

    pub fn remove(&mut self, demand_id: &str) -> Option<ScheduleEntry> {
        let at = self.entries.iter().position(|e| e.demand_id == demand_id)?;
        Some(self.entries.remove(at))
    }

    pub fn entry_for(&self, demand_id: &str) -> Option<&ScheduleEntry> {
        self.entries.iter().find(|e| e.demand_id == demand_id)
    }

    pub fn is_scheduled(&self, demand_id: &str) -> bool {
        self.entry_for(demand_id).is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnmetReason {
    /// No usable element set for the satellite.
    SatelliteUnavailable,
    NoContactWindows,
    /// Every window is shorter than the minimum duration.
    WindowsTooShort,
    DeadlineUnreachable,
    /// Long enough windows exist but the station or satellite is busy.
    CapacityExhausted,
    ContactLimitReached,
}

impl std::fmt::Display for UnmetReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            UnmetReason::SatelliteUnavailable => "satellite has no usable element set",
            UnmetReason::NoContactWindows => "no contact windows in the horizon",
            UnmetReason::WindowsTooShort => "no window is long enough",
            UnmetReason::DeadlineUnreachable => "no long enough window before the deadline",
            UnmetReason::CapacityExhausted => "every suitable window is already booked",
            UnmetReason::ContactLimitReached => "satellite reached its contact limit",
        };
        f.write_str(text)
    }
}

/// A demand left unscheduled, with the most specific reason found.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct InfeasibleDemand {
    pub demand_id: String,
    pub satellite_id: SatelliteId,
    pub priority: u32,
    pub reason: UnmetReason,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ScheduleMetrics {
    pub total_contacts: usize,
    pub total_contact_minutes: f64,
    pub satellites_covered: usize,
    pub stations_used: usize,
    pub estimated_volume_mb: f64,
}

impl ScheduleMetrics {
    pub fn compute(schedule: &Schedule, downlink_rate_mbps: f64) -> Self {
        let minutes: f64 = schedule.entries().iter().map(ScheduleEntry::minutes).sum();
        let satellites: BTreeSet<_> = schedule.entries().iter().map(|e| e.satellite_id).collect();
        let stations: BTreeSet<_> = schedule.entries().iter().map(|e| &e.station_id).collect();
        Self {
            total_contacts: schedule.len(),
            total_contact_minutes: minutes,
            satellites_covered: satellites.len(),
            stations_used: stations.len(),
            estimated_volume_mb: minutes * 60.0 * downlink_rate_mbps / 8.0,
        }
    }
}
