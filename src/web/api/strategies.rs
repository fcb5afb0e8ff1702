use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::scheduler::{OptimizerConfig, OptimizerStrategy};
use crate::web::server::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct StrategyInfo {
    pub name: OptimizerStrategy,
    pub description: String,
    pub is_default: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StrategiesResponse {
    pub available_strategies: Vec<StrategyInfo>,
    /// Strategy used for runs that do not pick one.
    pub current_strategy: OptimizerStrategy,
}

fn strategies(config: &OptimizerConfig) -> StrategiesResponse {
    let available_strategies = OptimizerStrategy::ALL
        .iter()
        .map(|strategy| StrategyInfo {
            name: *strategy,
            description: strategy.description().to_string(),
            is_default: *strategy == OptimizerStrategy::default(),
        })
        .collect();

    StrategiesResponse {
        available_strategies,
        current_strategy: config.strategy,
    }
}

#[utoipa::path(
    get,
    path = "/api/strategies",
    tag = "runs",
    responses(
        (status = 200, description = "Optimizer strategies and the configured one", body = StrategiesResponse)
    )
)]
pub async fn list_strategies(State(state): State<AppState>) -> Json<StrategiesResponse> {
    Json(strategies(&state.config.optimizer))
}
