use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::predict::types::StationId;

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;
pub const DEFAULT_ELEVATION_MASK_DEG: f64 = 10.0;

// WGS-84
const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const EARTH_ECCENTRICITY_SQ: f64 = 0.006_694_379_990_14;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct GroundStation {
    pub id: StationId,
    #[serde(default)]
    pub name: Option<String>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
    #[serde(default = "default_mask")]
    pub min_elevation_deg: f64,
    /// Simultaneous contacts the station can service.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default = "default_cost")]
    pub cost_per_minute: f64,
}

fn default_mask() -> f64 {
    DEFAULT_ELEVATION_MASK_DEG
}

fn default_capacity() -> u32 {
    1
}

fn default_cost() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
}

impl GroundStation {
    pub fn new(id: impl Into<StationId>, latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            latitude_deg,
            longitude_deg,
            altitude_m: 0.0,
            min_elevation_deg: DEFAULT_ELEVATION_MASK_DEG,
            capacity: 1,
            cost_per_minute: 1.0,
        }
    }

    /// Parse `"lat, lon"` as written in station registries.
    pub fn from_coordinates(
        id: impl Into<StationId>,
        coordinates: &str,
        altitude_m: Option<f64>,
    ) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let lat: f64 = parts[0].parse().ok()?;
        let lon: f64 = parts[1].parse().ok()?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=360.0).contains(&lon) {
            return None;
        }
        let mut station = Self::new(id, lat, lon);
        station.altitude_m = altitude_m.unwrap_or(0.0);
        Some(station)
    }

    pub fn with_mask(mut self, min_elevation_deg: f64) -> Self {
        self.min_elevation_deg = min_elevation_deg;
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let sin_lon = lon.sin();
        let cos_lon = lon.cos();
        let n = EARTH_EQUATORIAL_RADIUS_KM / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        let x = (n + alt_km) * cos_lat * cos_lon;
        let y = (n + alt_km) * cos_lat * sin_lon;
        let z = (n * (1.0 - EARTH_ECCENTRICITY_SQ) + alt_km) * sin_lat;
        [x, y, z]
    }

    /// Azimuth/elevation/range of an ECEF point seen from the station's
    /// local horizon.
    pub fn look_angles(&self, target_ecef_km: [f64; 3]) -> LookAngles {
        let sta = self.position_ecef_km();
        let dr = [
            target_ecef_km[0] - sta[0],
            target_ecef_km[1] - sta[1],
            target_ecef_km[2] - sta[2],
        ];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();
        let (east, north, up) = ecef_to_enu(dr, self.lat_rad(), self.lon_rad());
        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let elevation_deg = if range_km > 0.0 {
            (up / range_km).clamp(-1.0, 1.0).asin().to_degrees()
        } else {
            90.0
        };
        LookAngles {
            azimuth_deg,
            elevation_deg,
            range_km,
        }
    }
}

pub fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}
