use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::config::humantime_duration;
use crate::predict::{
    parse_multi_tle, ElementCatalog, GroundStation, OrbitalElementSet, SatelliteId, StationId,
    TleError,
};
use crate::scheduler::types::DataDemand;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{field}: {message}")]
    Time { field: String, message: String },
    #[error("satellite entry {index}: {source}")]
    Tle { index: usize, source: TleError },
    #[error("station {id}: {message}")]
    Station { id: StationId, message: String },
    #[error("demand {id}: {message}")]
    Demand { id: String, message: String },
    #[error("satellite {0} is not in the element catalog")]
    NotInCatalog(SatelliteId),
    #[error("duplicate satellite {0}")]
    DuplicateSatellite(SatelliteId),
    #[error("duplicate station {0}")]
    DuplicateStation(StationId),
    #[error("duplicate demand {0}")]
    DuplicateDemand(String),
    #[error("demand {demand_id} references unknown satellite {satellite_id}")]
    UnknownSatellite {
        demand_id: String,
        satellite_id: SatelliteId,
    },
}

/// A station as requested. The mask is only fixed when the request sets
/// it; otherwise the configured default applies.
#[derive(Debug, Clone, PartialEq)]
pub struct StationRequest {
    pub station: GroundStation,
    pub explicit_mask: bool,
}

/// Fully materialized input for one scheduling run.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    pub sampling_step: Option<Duration>,
    pub satellites: ElementCatalog,
    pub stations: Vec<StationRequest>,
    pub demands: Vec<DataDemand>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequest {
    horizon: RawHorizon,
    #[serde(default)]
    sampling_step: Option<String>,
    satellites: Vec<RawSatellite>,
    stations: Vec<RawStation>,
    #[serde(default)]
    demands: Vec<RawDemand>,
}

#[derive(Debug, Deserialize)]
struct RawHorizon {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSatellite {
    Tle { tle: String },
    Elements(OrbitalElementSet),
    /// Catalog number only; elements come from the local store.
    Stored { satellite_id: SatelliteId },
}

#[derive(Debug, Deserialize)]
struct RawStation {
    id: StationId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    coordinates: Option<String>,
    #[serde(default)]
    latitude_deg: Option<f64>,
    #[serde(default)]
    longitude_deg: Option<f64>,
    #[serde(default)]
    altitude_m: Option<f64>,
    #[serde(default)]
    min_elevation_deg: Option<f64>,
    #[serde(default)]
    capacity: Option<u32>,
    #[serde(default)]
    cost_per_minute: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawDemand {
    id: String,
    satellite_id: SatelliteId,
    #[serde(default = "default_priority")]
    priority: u32,
    min_duration: String,
    #[serde(default)]
    deadline: Option<String>,
}

fn default_priority() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimeExpr {
    Relative(Duration),
    Absolute(DateTime<Utc>),
    Now,
}

impl TimeExpr {
    pub fn resolve(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeExpr::Relative(d) => start + *d,
            TimeExpr::Absolute(dt) => *dt,
            TimeExpr::Now => Utc::now(),
        }
    }
}

impl ScheduleRequest {
    /// Parse a request whose satellites all carry their own elements.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(yaml: &str) -> Result<Self, ParseError> {
        Self::parse(yaml, &ElementCatalog::new())
    }

    /// Parse a request, resolving catalog-number-only satellites from
    /// `stored`.
    pub fn parse(yaml: &str, stored: &ElementCatalog) -> Result<Self, ParseError> {
        let raw: RawRequest = serde_yaml::from_str(yaml)?;
        let time_err = |field: &str| {
            let field = field.to_string();
            move |message: String| ParseError::Time { field, message }
        };

        let horizon_start = match parse_time(&raw.horizon.start).map_err(time_err("horizon.start"))? {
            TimeExpr::Relative(_) => {
                return Err(ParseError::Time {
                    field: "horizon.start".into(),
                    message: "start must be an absolute time".into(),
                })
            }
            expr => expr.resolve(Utc::now()),
        };
        let horizon_end = parse_time(&raw.horizon.end)
            .map_err(time_err("horizon.end"))?
            .resolve(horizon_start);

        let sampling_step = raw
            .sampling_step
            .as_deref()
            .map(humantime_duration::parse)
            .transpose()
            .map_err(time_err("sampling_step"))?;

        let satellites = parse_satellites(raw.satellites, stored)?;
        let stations = parse_stations(raw.stations)?;
        let demands = parse_demands(raw.demands, &satellites, horizon_start)?;

        Ok(ScheduleRequest {
            horizon_start,
            horizon_end,
            sampling_step,
            satellites,
            stations,
            demands,
        })
    }
}

fn parse_satellites(
    raw: Vec<RawSatellite>,
    stored: &ElementCatalog,
) -> Result<ElementCatalog, ParseError> {
    let mut catalog = ElementCatalog::new();
    for (index, entry) in raw.into_iter().enumerate() {
        let sets = match entry {
            RawSatellite::Tle { tle } => parse_multi_tle(&tle).map_err(|message| ParseError::Tle {
                index,
                source: TleError::Malformed(message),
            })?,
            RawSatellite::Elements(set) => vec![set],
            RawSatellite::Stored { satellite_id } => match stored.get(satellite_id) {
                Some(set) => vec![set.clone()],
                None => return Err(ParseError::NotInCatalog(satellite_id)),
            },
        };
        if sets.is_empty() {
            return Err(ParseError::Tle {
                index,
                source: TleError::Malformed("no TLE entries found".into()),
            });
        }
        for set in sets {
            let id = set.satellite_id;
            if catalog.contains(id) {
                return Err(ParseError::DuplicateSatellite(id));
            }
            catalog.insert(set);
        }
    }
    Ok(catalog)
}

fn parse_stations(raw: Vec<RawStation>) -> Result<Vec<StationRequest>, ParseError> {
    let mut seen = HashSet::new();
    let mut stations = Vec::with_capacity(raw.len());
    for r in raw {
        let err = |message: &str| ParseError::Station {
            id: r.id.clone(),
            message: message.to_string(),
        };
        if !seen.insert(r.id.clone()) {
            return Err(ParseError::DuplicateStation(r.id.clone()));
        }

        let mut station = match (&r.coordinates, r.latitude_deg, r.longitude_deg) {
            (Some(coordinates), None, None) => {
                GroundStation::from_coordinates(r.id.clone(), coordinates, r.altitude_m)
                    .ok_or_else(|| err("invalid coordinates, expected \"lat, lon\""))?
            }
            (None, Some(lat), Some(lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=360.0).contains(&lon) {
                    return Err(err("latitude or longitude out of range"));
                }
                let mut station = GroundStation::new(r.id.clone(), lat, lon);
                station.altitude_m = r.altitude_m.unwrap_or(0.0);
                station
            }
            _ => {
                return Err(err(
                    "give either coordinates or latitude_deg and longitude_deg",
                ))
            }
        };

        station.name = r.name;
        if let Some(mask) = r.min_elevation_deg {
            station.min_elevation_deg = mask;
        }
        if let Some(capacity) = r.capacity {
            station.capacity = capacity;
        }
        if let Some(cost) = r.cost_per_minute {
            station.cost_per_minute = cost;
        }
        stations.push(StationRequest {
            station,
            explicit_mask: r.min_elevation_deg.is_some(),
        });
    }
    Ok(stations)
}

fn parse_demands(
    raw: Vec<RawDemand>,
    satellites: &ElementCatalog,
    horizon_start: DateTime<Utc>,
) -> Result<Vec<DataDemand>, ParseError> {
    let mut seen = HashSet::new();
    let mut demands = Vec::with_capacity(raw.len());
    for r in raw {
        let err = |message: String| ParseError::Demand {
            id: r.id.clone(),
            message,
        };
        if !seen.insert(r.id.clone()) {
            return Err(ParseError::DuplicateDemand(r.id.clone()));
        }
        if !satellites.contains(r.satellite_id) {
            return Err(ParseError::UnknownSatellite {
                demand_id: r.id.clone(),
                satellite_id: r.satellite_id,
            });
        }

        let min_duration = humantime_duration::parse(&r.min_duration).map_err(err)?;
        if min_duration <= Duration::zero() {
            return Err(err("min_duration must be positive".into()));
        }
        let deadline = r
            .deadline
            .as_deref()
            .map(|s| parse_time(s).map(|t| t.resolve(horizon_start)))
            .transpose()
            .map_err(err)?;

        demands.push(DataDemand {
            id: r.id,
            satellite_id: r.satellite_id,
            priority: r.priority,
            min_duration,
            deadline,
        });
    }
    Ok(demands)
}

/// `T+<duration>` relative to the horizon start, `now`, an RFC 3339
/// instant, or an RFC 3339 instant with a `+/-<duration>` offset.
pub fn parse_time(s: &str) -> Result<TimeExpr, String> {
    let s = s.trim();

    if s.eq_ignore_ascii_case("now") {
        return Ok(TimeExpr::Now);
    }

    // Relative: T+10s, T-5m
    if s.to_lowercase().starts_with('t') {
        let rest = &s[1..];
        let (neg, rest) = match rest.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, rest.strip_prefix('+').unwrap_or(rest)),
        };
        let dur = humantime_duration::parse(rest)?;
        return Ok(TimeExpr::Relative(if neg { -dur } else { dur }));
    }

    // Absolute with offset: 2026-03-01T10:00:00Z + 6h
    if let Some(idx) = s.rfind(['+', '-']) {
        if idx > 10 {
            if let Ok(base) = DateTime::parse_from_rfc3339(s[..idx].trim()) {
                let offset = &s[idx..];
                let (neg, rest) = match offset.strip_prefix('-') {
                    Some(r) => (true, r),
                    None => (false, offset.strip_prefix('+').unwrap_or(offset)),
                };
                let dur = humantime_duration::parse(rest)?;
                return Ok(TimeExpr::Absolute(
                    base.with_timezone(&Utc) + if neg { -dur } else { dur },
                ));
            }
        }
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| TimeExpr::Absolute(dt.with_timezone(&Utc)))
        .map_err(|e| e.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) const REQUEST: &str = r#"
horizon:
  start: 2026-03-01T00:00:00Z
  end: T+24h
sampling_step: 20s
satellites:
  - satellite_id: 1
    name: LEO-1
    epoch: 2026-03-01T00:00:00Z
    inclination_deg: 51.6
    eccentricity: 0.0001
    mean_motion_rev_per_day: 15.05
    argument_of_perigee_deg: 0
    raan_deg: 40
    mean_anomaly_deg: 0
  - satellite_id: 2
    epoch: 2026-03-01T00:00:00Z
    inclination_deg: 97.6
    eccentricity: 0.0001
    mean_motion_rev_per_day: 14.9
    argument_of_perigee_deg: 0
    raan_deg: 120
    mean_anomaly_deg: 90
stations:
  - id: nyc
    coordinates: "40.7, -74.0"
    altitude_m: 10
  - id: svalbard
    latitude_deg: 78.2
    longitude_deg: 15.4
    min_elevation_deg: 5
    capacity: 2
    cost_per_minute: 2.5
demands:
  - id: leo1-a
    satellite_id: 1
    priority: 5
    min_duration: 5m
  - id: leo1-b
    satellite_id: 1
    min_duration: 3m
    deadline: T+12h
  - id: polar-a
    satellite_id: 2
    priority: 3
    min_duration: 4m 30s
    deadline: 2026-03-01T00:00:00Z + 18h
"#;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn parses_full_request() {
        let request = ScheduleRequest::from_str(REQUEST).unwrap();
        assert_eq!(request.horizon_start, t0());
        assert_eq!(request.horizon_end, t0() + Duration::hours(24));
        assert_eq!(request.sampling_step, Some(Duration::seconds(20)));
        assert_eq!(request.satellites.len(), 2);

        assert_eq!(request.stations.len(), 2);
        let nyc = &request.stations[0];
        assert!(!nyc.explicit_mask);
        assert_eq!(nyc.station.capacity, 1);
        let svalbard = &request.stations[1];
        assert!(svalbard.explicit_mask);
        assert_eq!(svalbard.station.capacity, 2);
        assert!((svalbard.station.cost_per_minute - 2.5).abs() < 1e-12);

        let demands = &request.demands;
        assert_eq!(demands.len(), 3);
        assert_eq!(demands[1].priority, 1);
        assert_eq!(demands[1].deadline, Some(t0() + Duration::hours(12)));
        assert_eq!(demands[2].min_duration, Duration::seconds(270));
        assert_eq!(demands[2].deadline, Some(t0() + Duration::hours(18)));
    }

    #[test]
    fn accepts_tle_satellites() {
        let yaml = r#"
horizon:
  start: 2020-07-13T00:00:00Z
  end: 2020-07-13T12:00:00Z
satellites:
  - tle: |
      ISS (ZARYA)
      1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
      2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008
stations:
  - id: gs
    coordinates: "48.1, 11.6"
demands:
  - id: iss
    satellite_id: 25544
    min_duration: 2m
"#;
        let request = ScheduleRequest::from_str(yaml).unwrap();
        assert!(request.satellites.contains(25544));
        assert_eq!(
            request.satellites.get(25544).unwrap().name.as_deref(),
            Some("ISS (ZARYA)")
        );
    }

    #[test]
    fn resolves_stored_satellites() {
        let stored: ElementCatalog = ScheduleRequest::from_str(REQUEST)
            .unwrap()
            .satellites
            .iter()
            .filter(|set| set.satellite_id == 2)
            .cloned()
            .collect();
        let yaml = REQUEST.replace(
            "  - satellite_id: 2\n    epoch: 2026-03-01T00:00:00Z\n",
            "  - satellite_id: 2\n  - satellite_id: 99\n    epoch: 2026-03-01T00:00:00Z\n",
        );

        let request = ScheduleRequest::parse(&yaml, &stored).unwrap();
        assert_eq!(request.satellites.get(2), stored.get(2));
        assert!(request.satellites.contains(99));

        assert!(matches!(
            ScheduleRequest::from_str(&yaml),
            Err(ParseError::NotInCatalog(2))
        ));
    }

    #[test]
    fn rejects_duplicates_and_unknown_references() {
        let dup_station = REQUEST.replace("id: svalbard", "id: nyc");
        assert!(matches!(
            ScheduleRequest::from_str(&dup_station),
            Err(ParseError::DuplicateStation(id)) if id == "nyc"
        ));

        let dup_demand = REQUEST.replace("id: leo1-b", "id: leo1-a");
        assert!(matches!(
            ScheduleRequest::from_str(&dup_demand),
            Err(ParseError::DuplicateDemand(_))
        ));

        let dup_sat = REQUEST.replace("satellite_id: 2\n    epoch", "satellite_id: 1\n    epoch");
        assert!(matches!(
            ScheduleRequest::from_str(&dup_sat),
            Err(ParseError::DuplicateSatellite(1))
        ));

        let unknown = REQUEST.replace("satellite_id: 2\n    priority", "satellite_id: 7\n    priority");
        assert!(matches!(
            ScheduleRequest::from_str(&unknown),
            Err(ParseError::UnknownSatellite { satellite_id: 7, .. })
        ));
    }

    #[test]
    fn rejects_bad_values() {
        let relative_start = REQUEST.replace("start: 2026-03-01T00:00:00Z", "start: T+1h");
        assert!(matches!(
            ScheduleRequest::from_str(&relative_start),
            Err(ParseError::Time { .. })
        ));

        let zero = REQUEST.replace("min_duration: 5m", "min_duration: 0s");
        assert!(matches!(
            ScheduleRequest::from_str(&zero),
            Err(ParseError::Demand { .. })
        ));

        let coords = REQUEST.replace("\"40.7, -74.0\"", "\"somewhere\"");
        assert!(matches!(
            ScheduleRequest::from_str(&coords),
            Err(ParseError::Station { .. })
        ));
    }

    #[test]
    fn time_expressions() {
        assert_eq!(
            parse_time("T+90s").unwrap(),
            TimeExpr::Relative(Duration::seconds(90))
        );
        assert_eq!(
            parse_time("t-5m").unwrap(),
            TimeExpr::Relative(Duration::minutes(-5))
        );
        assert_eq!(
            parse_time("2026-03-01T00:00:00Z - 10s").unwrap(),
            TimeExpr::Absolute(t0() - Duration::seconds(10))
        );
        assert_eq!(
            parse_time("2026-03-01T01:00:00+01:00").unwrap(),
            TimeExpr::Absolute(t0())
        );
        assert_eq!(parse_time("NOW").unwrap(), TimeExpr::Now);
        assert!(parse_time("yesterday").is_err());
    }
}
