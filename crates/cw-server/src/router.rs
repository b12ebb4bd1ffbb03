use axum::{routing::get, Router};
use cw_protocol::endpoints;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with the warehouse read endpoints.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(endpoints::HEALTH, get(handler::health_handler))
        .route(endpoints::SNAPSHOT, get(handler::snapshot_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
