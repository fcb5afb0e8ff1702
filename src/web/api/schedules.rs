use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::scheduler::{
    CommittedRecord, ProposedRecord, ScheduleState, ScheduleSummary, StorageError,
};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::server::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListSchedulesQuery {
    /// `committed` or `proposed`; both when omitted.
    #[serde(default)]
    pub state: Option<ScheduleState>,
}

#[utoipa::path(
    get,
    path = "/api/schedules",
    tag = "schedules",
    params(ListSchedulesQuery),
    responses(
        (status = 200, description = "Stored schedules", body = Vec<ScheduleSummary>)
    )
)]
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(query): Query<ListSchedulesQuery>,
) -> ApiResult<impl IntoResponse> {
    let states = match query.state {
        Some(s) => vec![s],
        None => vec![ScheduleState::Committed, ScheduleState::Proposed],
    };

    let mut summaries = Vec::new();
    for s in states {
        summaries.extend(state.storage.list(s)?);
    }

    Ok((StatusCode::OK, Json(summaries)))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleDetailResponse {
    pub committed: CommittedRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposed: Option<ProposedRecord>,
}

#[utoipa::path(
    get,
    path = "/api/schedules/{id}",
    tag = "schedules",
    params(
        ("id" = String, Path, description = "Run ID")
    ),
    responses(
        (status = 200, description = "Committed schedule and pending proposal", body = ScheduleDetailResponse),
        (status = 404, description = "Schedule not found", body = ErrorResponse)
    )
)]
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let committed = state.storage.committed(&id)?;
    let proposed = match state.storage.proposed(&id) {
        Ok(record) => Some(record),
        Err(StorageError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    Ok(Json(ScheduleDetailResponse {
        committed,
        proposed,
    }))
}

#[utoipa::path(
    post,
    path = "/api/schedules/{id}/approve",
    tag = "schedules",
    params(
        ("id" = String, Path, description = "Run ID")
    ),
    responses(
        (status = 200, description = "Proposal promoted", body = CommittedRecord),
        (status = 404, description = "No pending proposal", body = ErrorResponse),
        (status = 409, description = "Proposal is stale", body = ErrorResponse)
    )
)]
pub async fn approve_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.storage.approve(&id)?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/api/schedules/{id}/reject",
    tag = "schedules",
    params(
        ("id" = String, Path, description = "Run ID")
    ),
    responses(
        (status = 204, description = "Proposal discarded"),
        (status = 404, description = "No pending proposal", body = ErrorResponse)
    )
)]
pub async fn reject_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.storage.reject(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
