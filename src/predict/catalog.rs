use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::abort::AbortHandle;
use crate::predict::error::VisibilityError;
use crate::predict::ground_station::GroundStation;
use crate::predict::pass_finder::{find_windows_with, validate_mask, VisibilityParams};
use crate::predict::propagation::{Propagator, StalenessPolicy};
use crate::predict::types::{ContactWindow, ElementCatalog, SatelliteId, StationId};

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error(transparent)]
    InvalidHorizon(#[from] VisibilityError),
    #[error("station {station_id}: {source}")]
    InvalidStation {
        station_id: StationId,
        source: VisibilityError,
    },
    #[error("contact window computation cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    DegenerateOrbit,
    StaleElements,
    PropagationFailed,
}

/// Per-satellite problem found while building the catalog. Reported
/// alongside the results instead of failing the run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct SatelliteIssue {
    pub satellite_id: SatelliteId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_id: Option<StationId>,
    pub kind: IssueKind,
    pub message: String,
}

/// Every candidate contact for a horizon, sorted by (AOS, satellite, station).
#[derive(Debug, Clone, Serialize)]
pub struct ContactCatalog {
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    windows: Vec<ContactWindow>,
    issues: Vec<SatelliteIssue>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

enum PairOutcome {
    Windows(Vec<ContactWindow>),
    Failed(SatelliteIssue),
}

impl ContactCatalog {
    /// Compute windows for every satellite × station pair.
    ///
    /// Horizon and masks are checked before any propagation. Pairs run on
    /// the rayon pool and each returns its own window list; the lists are
    /// merged once all pairs are done. Aborting discards everything.
    pub fn build(
        element_sets: &ElementCatalog,
        stations: &[GroundStation],
        params: &VisibilityParams,
        staleness: &StalenessPolicy,
        abort: &AbortHandle,
    ) -> Result<Self, CatalogError> {
        params.validate_horizon()?;
        for station in stations {
            validate_mask(station.min_elevation_deg).map_err(|source| {
                CatalogError::InvalidStation {
                    station_id: station.id.clone(),
                    source,
                }
            })?;
        }
        params.validate_sampling()?;

        let mut issues = Vec::new();
        let mut propagators = Vec::new();
        for set in element_sets.iter() {
            match Propagator::new(set) {
                Ok(propagator) => {
                    let stale = [params.start, params.end]
                        .into_iter()
                        .filter_map(|t| staleness.check(set, t))
                        .max_by(|a, b| a.age_hours.total_cmp(&b.age_hours));
                    if let Some(warning) = stale {
                        log::warn!("{}", warning);
                        issues.push(SatelliteIssue {
                            satellite_id: set.satellite_id,
                            station_id: None,
                            kind: IssueKind::StaleElements,
                            message: warning.to_string(),
                        });
                    }
                    propagators.push(propagator);
                }
                Err(e) => {
                    log::warn!("Skipping {}: {}", set.display_name(), e);
                    issues.push(SatelliteIssue {
                        satellite_id: set.satellite_id,
                        station_id: None,
                        kind: IssueKind::DegenerateOrbit,
                        message: e.to_string(),
                    });
                }
            }
        }

        let pairs: Vec<(&Propagator, &GroundStation)> = propagators
            .iter()
            .flat_map(|p| stations.iter().map(move |s| (p, s)))
            .collect();

        log::info!(
            "Computing contact windows for {} pairs ({} satellites x {} stations)",
            pairs.len(),
            propagators.len(),
            stations.len()
        );

        let outcomes = pairs
            .par_iter()
            .map(|(propagator, station)| {
                if abort.is_aborted() {
                    return Err(CatalogError::Cancelled);
                }
                Ok(match find_windows_with(propagator, station, params) {
                    Ok(windows) => PairOutcome::Windows(windows),
                    Err(e) => {
                        let satellite_id = propagator.element_set().satellite_id;
                        log::warn!(
                            "Pass search failed for satellite {} at {}: {}",
                            satellite_id,
                            station.id,
                            e
                        );
                        PairOutcome::Failed(SatelliteIssue {
                            satellite_id,
                            station_id: Some(station.id.clone()),
                            kind: IssueKind::PropagationFailed,
                            message: e.to_string(),
                        })
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if abort.is_aborted() {
            return Err(CatalogError::Cancelled);
        }

        let mut windows = Vec::new();
        for outcome in outcomes {
            match outcome {
                PairOutcome::Windows(w) => windows.extend(w),
                PairOutcome::Failed(issue) => issues.push(issue),
            }
        }

        Ok(Self::from_parts(params.start, params.end, windows, issues))
    }

    /// Assemble a catalog from precomputed windows.
    pub fn from_parts(
        horizon_start: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
        mut windows: Vec<ContactWindow>,
        mut issues: Vec<SatelliteIssue>,
    ) -> Self {
        windows.sort_by(|a, b| {
            a.aos
                .cmp(&b.aos)
                .then(a.satellite_id.cmp(&b.satellite_id))
                .then_with(|| a.station_id.cmp(&b.station_id))
                .then_with(|| a.id.cmp(&b.id))
        });
        issues.sort_by(|a, b| {
            a.satellite_id
                .cmp(&b.satellite_id)
                .then_with(|| a.station_id.cmp(&b.station_id))
        });
        let index = windows
            .iter()
            .enumerate()
            .map(|(i, w)| (w.id.clone(), i))
            .collect();
        Self {
            horizon_start,
            horizon_end,
            windows,
            issues,
            index,
        }
    }

    pub fn windows(&self) -> &[ContactWindow] {
        &self.windows
    }

    pub fn issues(&self) -> &[SatelliteIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn get(&self, window_id: &str) -> Option<&ContactWindow> {
        self.index.get(window_id).map(|&i| &self.windows[i])
    }

    pub fn windows_for(&self, satellite_id: SatelliteId) -> impl Iterator<Item = &ContactWindow> {
        self.windows
            .iter()
            .filter(move |w| w.satellite_id == satellite_id)
    }

    /// Satellites that could not be propagated at all.
    pub fn unavailable_satellites(&self) -> BTreeSet<SatelliteId> {
        self.issues
            .iter()
            .filter(|i| i.kind == IssueKind::DegenerateOrbit)
            .map(|i| i.satellite_id)
            .collect()
    }

    pub fn into_parts(self) -> (Vec<ContactWindow>, Vec<SatelliteIssue>) {
        (self.windows, self.issues)
    }
}
