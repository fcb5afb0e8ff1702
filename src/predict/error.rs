use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::predict::types::SatelliteId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PropagationError {
    #[error("degenerate orbit for satellite {satellite_id}: {reason}")]
    DegenerateOrbit {
        satellite_id: SatelliteId,
        reason: String,
    },
    #[error("propagation failed for satellite {satellite_id} at {timestamp}: {message}")]
    Propagation {
        satellite_id: SatelliteId,
        timestamp: DateTime<Utc>,
        message: String,
    },
}

impl PropagationError {
    pub fn satellite_id(&self) -> SatelliteId {
        match self {
            PropagationError::DegenerateOrbit { satellite_id, .. }
            | PropagationError::Propagation { satellite_id, .. } => *satellite_id,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum VisibilityError {
    #[error("invalid elevation mask {0} deg (expected 0 <= mask < 90)")]
    InvalidMask(f64),
    #[error("empty horizon: end {end} is not after start {start}")]
    EmptyHorizon {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("invalid sampling parameters: {0}")]
    InvalidSamplingStep(String),
    #[error(transparent)]
    Propagation(#[from] PropagationError),
}

#[derive(Debug, Error)]
pub enum TleError {
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Invalid TLE format in {file}: {message}")]
    InvalidTle { file: String, message: String },
    #[error("Invalid TLE: {0}")]
    Malformed(String),
}

/// Element set used too far from its epoch. Reported, never raised.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct StaleElementsWarning {
    pub satellite_id: SatelliteId,
    pub epoch: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
    pub age_hours: f64,
    pub max_age_hours: f64,
}

impl std::fmt::Display for StaleElementsWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "elements for satellite {} are {:.1} h from epoch {} at {} (trusted up to {:.1} h)",
            self.satellite_id, self.age_hours, self.epoch, self.timestamp, self.max_age_hours
        )
    }
}
