use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::runs::RunResponse;
use super::api::schedules::ScheduleDetailResponse;
use super::api::strategies::{StrategiesResponse, StrategyInfo};
use super::api::windows::WindowsResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::windows::compute_windows,
        super::api::runs::submit_run,
        super::api::strategies::list_strategies,
        super::api::schedules::list_schedules,
        super::api::schedules::get_schedule,
        super::api::schedules::approve_schedule,
        super::api::schedules::reject_schedule,
    ),
    components(
        schemas(
            WindowsResponse,
            RunResponse,
            ScheduleDetailResponse,
            StrategiesResponse,
            StrategyInfo,
            crate::scheduler::OptimizerStrategy,
            ErrorResponse,
            crate::scheduler::ScheduleSummary,
            crate::scheduler::ScheduleState,
            crate::scheduler::SavedRun,
        )
    ),
    info(
        title = "Contact-O-Mat API",
        description = "Contact window prediction and ground-contact scheduling",
        version = "0.1.0"
    ),
    tags(
        (name = "windows", description = "Contact window prediction"),
        (name = "runs", description = "Scheduling runs"),
        (name = "schedules", description = "Committed schedules and proposals")
    )
)]
pub struct ApiDoc;
