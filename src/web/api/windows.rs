use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::predict::{ContactWindow, SatelliteIssue};
use crate::scheduler::{contact_windows, ScheduleRequest};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::api::run_blocking;
use crate::web::server::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct WindowsResponse {
    pub horizon_start: DateTime<Utc>,
    pub horizon_end: DateTime<Utc>,
    pub windows: Vec<ContactWindow>,
    pub issues: Vec<SatelliteIssue>,
}

#[utoipa::path(
    post,
    path = "/api/windows",
    tag = "windows",
    request_body(content = String, content_type = "application/yaml"),
    responses(
        (status = 200, description = "Contact windows for every satellite/station pair", body = WindowsResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 503, description = "Computation cancelled", body = ErrorResponse)
    )
)]
pub async fn compute_windows(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    let request = ScheduleRequest::parse(&body, &state.elements)?;
    let (horizon_start, horizon_end) = (request.horizon_start, request.horizon_end);
    let config = state.config.clone();

    let catalog = run_blocking(move |abort| contact_windows(&request, &config, abort)).await?;
    let (windows, issues) = catalog.into_parts();

    Ok(Json(WindowsResponse {
        horizon_start,
        horizon_end,
        windows,
        issues,
    }))
}
