use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, http::Uri};
use log::warn;

use super::dto::Health;
use crate::{error::ErrorServer, state::ServerState};

#[utoipa::path(
    get,
    path = "/api/ping",
    description = "Liveness probe",
    responses(
        (status = 200, description = "pong"),
    )
)]
pub async fn ping() -> &'static str {
    "pong"
}

#[utoipa::path(
    get,
    path = "/api/health",
    description = "Health check",
    responses(
        (status = 200, description = "Success", body = Health),
    )
)]
pub async fn health(State(server_state): State<Arc<ServerState>>) -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        port: server_state.port(),
    })
}

pub async fn not_found(uri: Uri) -> ErrorServer {
    warn!("Route not found: {}", uri.path());
    ErrorServer {
        message: format!("API Route Not Found: {}", uri.path()),
        status: StatusCode::NOT_FOUND.into(),
    }
}
