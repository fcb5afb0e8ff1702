mod catalog;
mod error;
mod ground_station;
mod pass_finder;
pub(crate) mod propagation;
mod tle_loader;
mod types;

pub use catalog::{CatalogError, ContactCatalog, IssueKind, SatelliteIssue};
pub use error::{PropagationError, StaleElementsWarning, TleError, VisibilityError};
pub use ground_station::{GroundStation, LookAngles, DEFAULT_ELEVATION_MASK_DEG};
pub use pass_finder::{
    find_windows, find_windows_with, validate_mask, VisibilityParams,
    DEFAULT_REFINE_TOLERANCE_MS, DEFAULT_SAMPLING_STEP_SECONDS,
};
pub use propagation::{propagate, Propagator, StalenessPolicy};
pub use tle_loader::{parse_multi_tle, TleLoader};
pub use types::{
    ContactWindow, ElementCatalog, OrbitalElementSet, SatelliteId, StateVector, StationId,
};
