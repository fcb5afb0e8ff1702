use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sgp4::{Constants, Elements};

use crate::predict::error::{PropagationError, StaleElementsWarning};
use crate::predict::ground_station::EARTH_ROTATION_RAD_S;
use crate::predict::types::{OrbitalElementSet, StateVector};

/// SGP4 propagator for one element set. Holds no mutable state, so a
/// single instance can be shared across threads.
#[derive(Debug)]
pub struct Propagator {
    set: OrbitalElementSet,
    elements: Elements,
    constants: Constants,
}

impl Propagator {
    pub fn new(set: &OrbitalElementSet) -> Result<Self, PropagationError> {
        validate_elements(set)?;
        let elements = set.to_sgp4();
        let constants =
            Constants::from_elements(&elements).map_err(|e| PropagationError::DegenerateOrbit {
                satellite_id: set.satellite_id,
                reason: e.to_string(),
            })?;
        Ok(Self {
            set: set.clone(),
            elements,
            constants,
        })
    }

    pub fn element_set(&self) -> &OrbitalElementSet {
        &self.set
    }

    pub fn propagate(&self, timestamp: DateTime<Utc>) -> Result<StateVector, PropagationError> {
        let failure = |message: String| PropagationError::Propagation {
            satellite_id: self.set.satellite_id,
            timestamp,
            message,
        };

        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp.naive_utc())
            .map_err(|e| failure(e.to_string()))?;

        let prediction = self
            .constants
            .propagate(minutes)
            .map_err(|e| failure(e.to_string()))?;

        let sidereal = sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(
            &timestamp.naive_utc(),
        ));

        Ok(StateVector {
            satellite_id: self.set.satellite_id,
            timestamp,
            position_km: teme_to_ecef_position(prediction.position, sidereal),
            velocity_km_s: teme_to_ecef_velocity(prediction.position, prediction.velocity, sidereal),
        })
    }
}

/// One-shot propagation of `set` to `timestamp`.
pub fn propagate(
    set: &OrbitalElementSet,
    timestamp: DateTime<Utc>,
) -> Result<StateVector, PropagationError> {
    Propagator::new(set)?.propagate(timestamp)
}

fn validate_elements(set: &OrbitalElementSet) -> Result<(), PropagationError> {
    let degenerate = |reason: &str| {
        Err(PropagationError::DegenerateOrbit {
            satellite_id: set.satellite_id,
            reason: reason.to_string(),
        })
    };

    let values = [
        set.inclination_deg,
        set.eccentricity,
        set.mean_motion_rev_per_day,
        set.argument_of_perigee_deg,
        set.raan_deg,
        set.mean_anomaly_deg,
        set.drag_term,
        set.mean_motion_dot,
        set.mean_motion_ddot,
    ];
    if values.iter().any(|v| !v.is_finite()) {
        return degenerate("non-finite orbital parameter");
    }
    if !(0.0..1.0).contains(&set.eccentricity) {
        return degenerate("eccentricity must be in [0, 1)");
    }
    if set.mean_motion_rev_per_day <= 0.0 {
        return degenerate("mean motion must be positive");
    }
    if !(0.0..=180.0).contains(&set.inclination_deg) {
        return degenerate("inclination must be in [0, 180] deg");
    }
    Ok(())
}

/// How far from epoch an element set is trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StalenessPolicy {
    #[serde(with = "crate::config::humantime_duration")]
    pub low_orbit_max_age: Duration,
    #[serde(with = "crate::config::humantime_duration")]
    pub high_orbit_max_age: Duration,
    /// Sets at or above this mean motion (rev/day) count as low orbit.
    pub low_orbit_min_mean_motion: f64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            low_orbit_max_age: Duration::days(3),
            high_orbit_max_age: Duration::days(21),
            low_orbit_min_mean_motion: 11.25,
        }
    }
}

impl StalenessPolicy {
    pub fn max_age(&self, set: &OrbitalElementSet) -> Duration {
        if set.mean_motion_rev_per_day >= self.low_orbit_min_mean_motion {
            self.low_orbit_max_age
        } else {
            self.high_orbit_max_age
        }
    }

    pub fn check(
        &self,
        set: &OrbitalElementSet,
        timestamp: DateTime<Utc>,
    ) -> Option<StaleElementsWarning> {
        let age = (timestamp - set.epoch).abs();
        let max_age = self.max_age(set);
        if age <= max_age {
            return None;
        }
        Some(StaleElementsWarning {
            satellite_id: set.satellite_id,
            epoch: set.epoch,
            timestamp,
            age_hours: age.num_seconds() as f64 / 3600.0,
            max_age_hours: max_age.num_seconds() as f64 / 3600.0,
        })
    }
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

pub fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = teme_to_ecef_position(vel_teme, gmst);
    [
        rotated[0] + EARTH_ROTATION_RAD_S * pos[1],
        rotated[1] - EARTH_ROTATION_RAD_S * pos[0],
        rotated[2],
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    const EARTH_MU: f64 = 398_600.441_8;

    /// Circular orbit at `altitude_km` with the given inclination.
    pub(crate) fn circular_leo(satellite_id: u32, inclination_deg: f64, altitude_km: f64) -> OrbitalElementSet {
        let a = 6378.137 + altitude_km;
        let n_rad_s = (EARTH_MU / (a * a * a)).sqrt();
        OrbitalElementSet {
            satellite_id,
            name: Some(format!("TEST-{}", satellite_id)),
            epoch: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            inclination_deg,
            eccentricity: 0.0001,
            mean_motion_rev_per_day: n_rad_s * 86_400.0 / std::f64::consts::TAU,
            argument_of_perigee_deg: 0.0,
            raan_deg: 40.0,
            mean_anomaly_deg: 0.0,
            drag_term: 0.0,
            mean_motion_dot: 0.0,
            mean_motion_ddot: 0.0,
        }
    }

    fn norm(v: [f64; 3]) -> f64 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    #[test]
    fn circular_orbit_keeps_its_radius() {
        let set = circular_leo(1, 51.6, 550.0);
        let propagator = Propagator::new(&set).unwrap();
        for minutes in [0, 17, 45, 90, 600] {
            let state = propagator
                .propagate(set.epoch + Duration::minutes(minutes))
                .unwrap();
            let altitude = norm(state.position_km) - 6378.137;
            assert!(
                (500.0..600.0).contains(&altitude),
                "altitude {} at +{} min",
                altitude,
                minutes
            );
            // Earth-fixed speed of a 550 km orbit, ~7.1-7.6 km/s depending on latitude.
            let speed = norm(state.velocity_km_s);
            assert!((6.5..8.0).contains(&speed), "speed {}", speed);
        }
    }

    #[test]
    fn propagation_is_deterministic() {
        let set = circular_leo(2, 97.5, 700.0);
        let t = set.epoch + Duration::seconds(12_345);
        let a = propagate(&set, t).unwrap();
        let b = Propagator::new(&set).unwrap().propagate(t).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn inclination_bounds_latitude() {
        let set = circular_leo(3, 51.6, 550.0);
        let propagator = Propagator::new(&set).unwrap();
        for step in 0..200 {
            let state = propagator
                .propagate(set.epoch + Duration::minutes(step * 3))
                .unwrap();
            let lat = (state.position_km[2] / norm(state.position_km)).asin().to_degrees();
            assert!(lat.abs() <= 52.5, "latitude {}", lat);
        }
    }

    #[test]
    fn rejects_hyperbolic_orbit() {
        let mut set = circular_leo(4, 51.6, 550.0);
        set.eccentricity = 1.2;
        let err = Propagator::new(&set).unwrap_err();
        assert!(matches!(err, PropagationError::DegenerateOrbit { satellite_id: 4, .. }));
    }

    #[test]
    fn rejects_non_positive_mean_motion() {
        let mut set = circular_leo(5, 51.6, 550.0);
        set.mean_motion_rev_per_day = 0.0;
        assert!(matches!(
            propagate(&set, set.epoch),
            Err(PropagationError::DegenerateOrbit { .. })
        ));
        set.mean_motion_rev_per_day = f64::NAN;
        assert!(Propagator::new(&set).is_err());
    }

    #[test]
    fn staleness_depends_on_orbit_regime() {
        let policy = StalenessPolicy::default();
        let leo = circular_leo(6, 51.6, 550.0);
        assert!(policy.check(&leo, leo.epoch + Duration::days(2)).is_none());
        let warning = policy.check(&leo, leo.epoch + Duration::days(5)).unwrap();
        assert_eq!(warning.satellite_id, 6);
        assert!((warning.age_hours - 120.0).abs() < 1e-9);
        assert!((warning.max_age_hours - 72.0).abs() < 1e-9);
        // Looking backwards from epoch is just as untrusted.
        assert!(policy.check(&leo, leo.epoch - Duration::days(5)).is_some());

        let mut geo = leo.clone();
        geo.mean_motion_rev_per_day = 1.0027;
        assert!(policy.check(&geo, geo.epoch + Duration::days(5)).is_none());
        assert!(policy.check(&geo, geo.epoch + Duration::days(30)).is_some());
    }
}
