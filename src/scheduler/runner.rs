use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::abort::AbortHandle;
use crate::config::Config;
use crate::predict::{
    validate_mask, CatalogError, ContactCatalog, GroundStation, SatelliteIssue, StationId,
    VisibilityError, VisibilityParams,
};
use crate::scheduler::assembler::assemble;
use crate::scheduler::objective::WeightedObjective;
use crate::scheduler::optimizer::{optimize, OptimizeError, Problem, Proposal};
use crate::scheduler::request::ScheduleRequest;
use crate::scheduler::types::{InfeasibleDemand, Schedule, ScheduleMetrics};

/// Hard failures only. Anything that concerns a single satellite or
/// demand ends up in the [`RunReport`] instead.
#[derive(Debug, Error, PartialEq)]
pub enum RunError {
    #[error(transparent)]
    Visibility(#[from] VisibilityError),
    #[error("station {station_id}: {source}")]
    InvalidStation {
        station_id: StationId,
        source: VisibilityError,
    },
    #[error("station {0}: capacity must be at least 1")]
    InvalidCapacity(StationId),
    #[error("run cancelled")]
    Cancelled,
}

impl From<CatalogError> for RunError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::InvalidHorizon(source) => RunError::Visibility(source),
            CatalogError::InvalidStation { station_id, source } => {
                RunError::InvalidStation { station_id, source }
            }
            CatalogError::Cancelled => RunError::Cancelled,
        }
    }
}

impl From<OptimizeError> for RunError {
    fn from(e: OptimizeError) -> Self {
        match e {
            OptimizeError::Cancelled => RunError::Cancelled,
        }
    }
}

/// Outcome of one scheduling run: the committed baseline, everything that
/// could not be served, and the optimizer's separate proposal.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunReport {
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    pub window_count: usize,
    pub committed: Schedule,
    pub unmet: Vec<InfeasibleDemand>,
    pub issues: Vec<SatelliteIssue>,
    pub metrics: ScheduleMetrics,
    pub proposal: Option<Proposal>,
}

pub fn visibility_params(request: &ScheduleRequest, config: &Config) -> VisibilityParams {
    let params = config
        .visibility
        .params(request.horizon_start, request.horizon_end);
    match request.sampling_step {
        Some(step) => params.with_step(step),
        None => params,
    }
}

/// Stations with the configured mask default and capacity overrides
/// applied. Nothing is validated here.
pub fn resolve_stations(request: &ScheduleRequest, config: &Config) -> Vec<GroundStation> {
    request
        .stations
        .iter()
        .map(|requested| {
            let mut station = requested.station.clone();
            if !requested.explicit_mask {
                station.min_elevation_deg = config.visibility.default_min_elevation_deg;
            }
            if let Some(&capacity) = config.constraints.capacity_overrides.get(&station.id) {
                station.capacity = capacity;
            }
            station
        })
        .collect()
}

/// Every hard failure a run can hit, checked without propagating
/// anything: horizon, masks, sampling step, then capacity. Returns the
/// resolved stations.
pub fn preflight(
    request: &ScheduleRequest,
    config: &Config,
) -> Result<Vec<GroundStation>, RunError> {
    let params = visibility_params(request, config);
    params.validate_horizon()?;
    let stations = resolve_stations(request, config);
    for station in &stations {
        validate_mask(station.min_elevation_deg).map_err(|source| RunError::InvalidStation {
            station_id: station.id.clone(),
            source,
        })?;
    }
    params.validate_sampling()?;
    if let Some(station) = stations.iter().find(|s| s.capacity == 0) {
        return Err(RunError::InvalidCapacity(station.id.clone()));
    }
    Ok(stations)
}

/// Contact windows for every satellite and station in the request.
pub fn contact_windows(
    request: &ScheduleRequest,
    config: &Config,
    abort: &AbortHandle,
) -> Result<ContactCatalog, RunError> {
    let stations = preflight(request, config)?;
    let params = visibility_params(request, config);
    Ok(ContactCatalog::build(
        &request.satellites,
        &stations,
        &params,
        &config.staleness,
        abort,
    )?)
}

/// Windows, greedy baseline, then (if enabled) an optimizer proposal.
pub fn run(
    request: &ScheduleRequest,
    config: &Config,
    abort: &AbortHandle,
) -> Result<RunReport, RunError> {
    let stations = preflight(request, config)?;
    let params = visibility_params(request, config);

    log::info!(
        "Scheduling {} demands for {} satellites over {} stations, {} to {}",
        request.demands.len(),
        request.satellites.len(),
        stations.len(),
        request.horizon_start,
        request.horizon_end
    );

    let catalog = ContactCatalog::build(
        &request.satellites,
        &stations,
        &params,
        &config.staleness,
        abort,
    )?;
    log::info!(
        "Found {} contact windows ({} satellite issues)",
        catalog.len(),
        catalog.issues().len()
    );

    let constraints = &config.constraints;
    let assembly = assemble(&catalog, &request.demands, &stations, constraints);
    let downlink_rate_mbps = config.metrics.downlink_rate_mbps;

    let proposal = if config.optimizer.enabled {
        let problem = Problem {
            catalog: &catalog,
            demands: &request.demands,
            stations: &stations,
            constraints,
            downlink_rate_mbps,
        };
        let objective = WeightedObjective::new(config.optimizer.weights.clone(), &stations);
        Some(optimize(
            &problem,
            &assembly.schedule,
            &objective,
            &config.optimizer,
            abort,
        )?)
    } else {
        None
    };

    Ok(RunReport {
        horizon_start: request.horizon_start,
        horizon_end: request.horizon_end,
        window_count: catalog.len(),
        metrics: ScheduleMetrics::compute(&assembly.schedule, downlink_rate_mbps),
        committed: assembly.schedule,
        unmet: assembly.unmet,
        issues: catalog.issues().to_vec(),
        proposal,
    })
}
