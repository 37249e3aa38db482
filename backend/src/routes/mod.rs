//! Route definitions for the Farm Zone Analysis Platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Protected routes - farm management
        .nest("/farms", farm_routes())
        // Protected routes - analysis lifecycle
        .nest("/analysis", analysis_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
        // Health check (public)
        .route("/health", get(handlers::health_check))
}

/// Farm routes (protected)
fn farm_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_farms).post(handlers::create_farm))
        .route(
            "/:farm_id",
            get(handlers::get_farm)
                .put(handlers::update_farm)
                .delete(handlers::delete_farm),
        )
        .route("/:farm_id/grid", get(handlers::get_farm_grid))
        .route("/:farm_id/grid/zones/:row/:col", get(handlers::get_farm_zone))
        .route("/:farm_id/analyses", get(handlers::list_farm_analyses))
}

/// Analysis routes (protected)
fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/soil-health", post(handlers::request_soil_health))
        .route("/soil-health/:analysis_id", get(handlers::get_soil_health))
        .route("/roi", post(handlers::request_roi))
        .route("/roi/:analysis_id", get(handlers::get_roi))
        .route("/status", get(handlers::get_queue_status))
}
