use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::error::TleError;

/// Satellite catalog (NORAD) number.
pub type SatelliteId = u32;
pub type StationId = String;

/// Mean orbital elements at an epoch, as published in a TLE/OMM.
///
/// Angles are in degrees, mean motion in revolutions per day. A set is
/// never edited: a fresher one with a later epoch replaces it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct OrbitalElementSet {
    pub satellite_id: SatelliteId,
    #[serde(default)]
    pub name: Option<String>,
    pub epoch: DateTime<Utc>,
    pub inclination_deg: f64,
    pub eccentricity: f64,
    pub mean_motion_rev_per_day: f64,
    pub argument_of_perigee_deg: f64,
    pub raan_deg: f64,
    pub mean_anomaly_deg: f64,
    /// B* drag term (1/earth radii).
    #[serde(default)]
    pub drag_term: f64,
    #[serde(default)]
    pub mean_motion_dot: f64,
    #[serde(default)]
    pub mean_motion_ddot: f64,
}

impl OrbitalElementSet {
    /// Parse a two-line or three-line TLE block.
    pub fn from_tle(tle: &str) -> Result<Self, TleError> {
        let (name, line1, line2) = parse_tle_lines(tle)?;
        let elements = sgp4::Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| TleError::Malformed(e.to_string()))?;
        Ok(Self::from_sgp4(&elements))
    }

    pub(crate) fn from_sgp4(elements: &sgp4::Elements) -> Self {
        Self {
            satellite_id: elements.norad_id as SatelliteId,
            name: elements.object_name.clone(),
            epoch: elements.datetime.and_utc(),
            inclination_deg: elements.inclination,
            eccentricity: elements.eccentricity,
            mean_motion_rev_per_day: elements.mean_motion,
            argument_of_perigee_deg: elements.argument_of_perigee,
            raan_deg: elements.right_ascension,
            mean_anomaly_deg: elements.mean_anomaly,
            drag_term: elements.drag_term,
            mean_motion_dot: elements.mean_motion_dot,
            mean_motion_ddot: elements.mean_motion_ddot,
        }
    }

    pub(crate) fn to_sgp4(&self) -> sgp4::Elements {
        sgp4::Elements {
            object_name: self.name.clone(),
            international_designator: None,
            norad_id: u64::from(self.satellite_id),
            classification: sgp4::Classification::Unclassified,
            datetime: self.epoch.naive_utc(),
            mean_motion_dot: self.mean_motion_dot,
            mean_motion_ddot: self.mean_motion_ddot,
            drag_term: self.drag_term,
            element_set_number: 0,
            inclination: self.inclination_deg,
            right_ascension: self.raan_deg,
            eccentricity: self.eccentricity,
            argument_of_perigee: self.argument_of_perigee_deg,
            mean_anomaly: self.mean_anomaly_deg,
            mean_motion: self.mean_motion_rev_per_day,
            revolution_number: 0,
            ephemeris_type: 0,
        }
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("NORAD {}", self.satellite_id))
    }

    /// True when `self` is a newer set for the same satellite.
    pub fn supersedes(&self, other: &OrbitalElementSet) -> bool {
        self.satellite_id == other.satellite_id && self.epoch > other.epoch
    }
}

/// Newest element set per satellite.
#[derive(Debug, Clone, Default)]
pub struct ElementCatalog {
    sets: BTreeMap<SatelliteId, OrbitalElementSet>,
}

impl ElementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equal or newer set is already held.
    pub fn insert(&mut self, set: OrbitalElementSet) -> bool {
        match self.sets.get(&set.satellite_id) {
            Some(existing) if !set.supersedes(existing) => false,
            _ => {
                self.sets.insert(set.satellite_id, set);
                true
            }
        }
    }

    pub fn get(&self, satellite_id: SatelliteId) -> Option<&OrbitalElementSet> {
        self.sets.get(&satellite_id)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrbitalElementSet> {
        self.sets.values()
    }

    pub fn contains(&self, satellite_id: SatelliteId) -> bool {
        self.sets.contains_key(&satellite_id)
    }
}

impl FromIterator<OrbitalElementSet> for ElementCatalog {
    fn from_iter<I: IntoIterator<Item = OrbitalElementSet>>(iter: I) -> Self {
        let mut catalog = ElementCatalog::new();
        for set in iter {
            catalog.insert(set);
        }
        catalog
    }
}

/// Earth-fixed (ECEF) position and velocity. Recomputed on demand.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct StateVector {
    pub satellite_id: SatelliteId,
    pub timestamp: DateTime<Utc>,
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

/// One pass of a satellite above a station's elevation mask.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct ContactWindow {
    pub id: String,
    pub satellite_id: SatelliteId,
    pub station_id: StationId,
    pub aos: DateTime<Utc>,
    pub los: DateTime<Utc>,
    /// Time of peak elevation.
    pub tca: DateTime<Utc>,
    pub peak_elevation_deg: f64,
    pub aos_azimuth_deg: f64,
    pub los_azimuth_deg: f64,
    pub duration_seconds: f64,
    /// Already visible at horizon start; the true AOS is earlier.
    pub clipped_start: bool,
    /// Still visible at horizon end; the true LOS is later.
    pub clipped_end: bool,
}

impl ContactWindow {
    pub fn duration(&self) -> chrono::Duration {
        self.los - self.aos
    }

    pub fn is_clipped(&self) -> bool {
        self.clipped_start || self.clipped_end
    }

    pub fn contains(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.aos <= start && end <= self.los
    }
}

/// Split a 2- or 3-line TLE block into (name, line1, line2).
pub fn parse_tle_lines(tle: &str) -> Result<(Option<String>, String, String), TleError> {
    let lines: Vec<String> = tle
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();

    match lines.len() {
        2 => Ok((None, lines[0].clone(), lines[1].clone())),
        3 => Ok((Some(lines[0].clone()), lines[1].clone(), lines[2].clone())),
        n => Err(TleError::Malformed(format!(
            "expected 2 or 3 lines, got {}",
            n
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ISS_TLE: &str = "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    fn set(epoch_day: u32) -> OrbitalElementSet {
        OrbitalElementSet {
            satellite_id: 7,
            name: None,
            epoch: Utc.with_ymd_and_hms(2026, 1, epoch_day, 0, 0, 0).unwrap(),
            inclination_deg: 51.6,
            eccentricity: 0.0001,
            mean_motion_rev_per_day: 15.05,
            argument_of_perigee_deg: 0.0,
            raan_deg: 0.0,
            mean_anomaly_deg: 0.0,
            drag_term: 0.0,
            mean_motion_dot: 0.0,
            mean_motion_ddot: 0.0,
        }
    }

    #[test]
    fn parses_three_line_tle() {
        let elements = OrbitalElementSet::from_tle(ISS_TLE).unwrap();
        assert_eq!(elements.satellite_id, 25544);
        assert_eq!(elements.name.as_deref(), Some("ISS (ZARYA)"));
        assert!((elements.inclination_deg - 51.6461).abs() < 1e-9);
        assert!((elements.mean_motion_rev_per_day - 15.49507896).abs() < 1e-6);
        assert_eq!(
            elements.epoch.date_naive(),
            chrono::NaiveDate::from_ymd_opt(2020, 7, 12).unwrap()
        );
    }

    #[test]
    fn rejects_single_line() {
        let err = OrbitalElementSet::from_tle("1 25544U 98067A").unwrap_err();
        assert!(matches!(err, TleError::Malformed(_)));
    }

    #[test]
    fn newer_epoch_supersedes_older() {
        let mut catalog = ElementCatalog::new();
        assert!(catalog.insert(set(2)));
        assert!(!catalog.insert(set(1)));
        assert!(!catalog.insert(set(2)));
        assert!(catalog.insert(set(3)));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(7).unwrap().epoch.format("%d").to_string(), "03");
    }

    #[test]
    fn window_containment_is_inclusive() {
        let aos = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let los = aos + chrono::Duration::minutes(8);
        let window = ContactWindow {
            id: "7/gs/0".into(),
            satellite_id: 7,
            station_id: "gs".into(),
            aos,
            los,
            tca: aos + chrono::Duration::minutes(4),
            peak_elevation_deg: 42.0,
            aos_azimuth_deg: 0.0,
            los_azimuth_deg: 180.0,
            duration_seconds: 480.0,
            clipped_start: false,
            clipped_end: false,
        };
        assert!(window.contains(aos, los));
        assert!(!window.contains(aos, los + chrono::Duration::seconds(1)));
        assert_eq!(window.duration(), chrono::Duration::minutes(8));
    }
}
