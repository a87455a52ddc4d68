use std::sync::Arc;

use axum::{Json, extract::State};
use mindshare_core::region::RegionEntry;

use crate::state::ServerState;

#[utoipa::path(
    get,
    path = "/api/regions",
    description = "Hashtags and mentions that count toward each region's score",
    responses(
        (status = 200, description = "Success", body = [RegionEntry]),
    )
)]
pub async fn regions(State(server_state): State<Arc<ServerState>>) -> Json<Vec<RegionEntry>> {
    Json(server_state.auth_service().rules().entries())
}
