use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use log::info;
use mindshare_core::users::dto::{UpsertUserResponse, User, UserExistsResponse};

use crate::{error::ErrorServer, state::ServerState};

#[utoipa::path(
    get,
    path = "/api/users",
    description = "Leaderboard: every registered user, highest score first",
    responses(
        (status = 200, description = "Success", body = [User]),
    )
)]
pub async fn list_users(
    State(server_state): State<Arc<ServerState>>,
) -> Result<Json<Vec<User>>, ErrorServer> {
    let users = server_state
        .users()
        .list_all()
        .map_err(ErrorServer::internal)?;

    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/api/users/check/{id}",
    params(("id" = String, Path, description = "Discord username, case-insensitive")),
    description = "Check whether a Discord username is already registered",
    responses(
        (status = 200, description = "Success", body = UserExistsResponse),
    )
)]
pub async fn check_user(
    State(server_state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<UserExistsResponse>, ErrorServer> {
    let exists = server_state
        .users()
        .exists(&id)
        .map_err(ErrorServer::internal)?;

    Ok(Json(UserExistsResponse { exists }))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = User,
    description = "Register a user or update an existing one",
    responses(
        (status = 200, description = "Success", body = UpsertUserResponse),
        (status = 400, description = "Bad Request"),
    )
)]
pub async fn upsert_user(
    State(server_state): State<Arc<ServerState>>,
    Json(user): Json<User>,
) -> Result<Json<UpsertUserResponse>, ErrorServer> {
    if user.discord_username.trim().is_empty() {
        return Err(ErrorServer {
            message: "discordUsername is required".to_string(),
            status: StatusCode::BAD_REQUEST.into(),
        });
    }

    let user = server_state
        .users()
        .upsert(user)
        .await
        .map_err(ErrorServer::internal)?;

    info!(
        "Saved user {} ({}, score {})",
        user.discord_username, user.region, user.mindshare_score
    );

    Ok(Json(UpsertUserResponse {
        success: true,
        user,
    }))
}
