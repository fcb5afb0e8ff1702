use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::predict::ElementCatalog;
use crate::scheduler::Storage;

use super::api::runs as run_handlers;
use super::api::schedules as schedule_handlers;
use super::api::strategies as strategy_handlers;
use super::api::windows as window_handlers;
use super::api_doc::ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<Storage>,
    /// Loaded once at startup.
    pub elements: Arc<ElementCatalog>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/windows", post(window_handlers::compute_windows))
        .route("/api/runs", post(run_handlers::submit_run))
        .route("/api/strategies", get(strategy_handlers::list_strategies))
        .route("/api/schedules", get(schedule_handlers::list_schedules))
        .route("/api/schedules/{id}", get(schedule_handlers::get_schedule))
        .route(
            "/api/schedules/{id}/approve",
            post(schedule_handlers::approve_schedule),
        )
        .route(
            "/api/schedules/{id}/reject",
            post(schedule_handlers::reject_schedule),
        )
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let storage = Storage::new(config.storage.base_folder.clone());
    let elements = config.elements.load();

    let state = AppState {
        config: Arc::new(config),
        storage: Arc::new(storage),
        elements: Arc::new(elements),
    };
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
