use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::scheduler::{run, RunReport, SavedRun, ScheduleRequest};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::api::run_blocking;
use crate::web::server::AppState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RunQuery {
    /// Persist the baseline as committed and the proposal for review.
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RunResponse {
    #[serde(flatten)]
    pub report: RunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved: Option<SavedRun>,
}

#[utoipa::path(
    post,
    path = "/api/runs",
    tag = "runs",
    params(RunQuery),
    request_body(content = String, content_type = "application/yaml"),
    responses(
        (status = 200, description = "Run finished", body = RunResponse),
        (status = 201, description = "Run finished and saved", body = RunResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Overlaps a committed schedule", body = ErrorResponse),
        (status = 503, description = "Run cancelled", body = ErrorResponse)
    )
)]
pub async fn submit_run(
    State(state): State<AppState>,
    Query(query): Query<RunQuery>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    let request = ScheduleRequest::parse(&body, &state.elements)?;
    let config = state.config.clone();

    let report = run_blocking(move |abort| run(&request, &config, abort)).await?;

    if !query.save {
        return Ok((StatusCode::OK, Json(RunResponse { report, saved: None })));
    }

    let saved = state.storage.save_run(&report)?;
    Ok((
        StatusCode::CREATED,
        Json(RunResponse {
            report,
            saved: Some(saved),
        }),
    ))
}
