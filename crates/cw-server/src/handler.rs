use axum::extract::State;
use axum::response::Json;
use cw_protocol::HealthResponse;
use cw_sync::AuthorityHandle;
use cw_types::Snapshot;

use crate::error::ServerResult;

/// Shared state of the HTTP endpoints.
#[derive(Clone, Debug)]
pub struct AppState {
    pub handle: AuthorityHandle,
}

/// Health check: world name and joined viewer count.
pub async fn health_handler(State(state): State<AppState>) -> ServerResult<Json<HealthResponse>> {
    let viewers = state.handle.viewer_count().await?;
    Ok(Json(HealthResponse::ok(state.handle.world(), viewers)))
}

/// The current snapshot in its durable JSON form.
pub async fn snapshot_handler(State(state): State<AppState>) -> ServerResult<Json<Snapshot>> {
    Ok(Json(state.handle.snapshot().await?))
}
