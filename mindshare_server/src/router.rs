use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use crate::{
    auth::handler::{auth_callback, auth_start},
    docs::{dto::ApiDoc, handler::api_docs},
    info::handler::{health, not_found, ping},
    regions::handler::regions,
    state::ServerState,
    users::handler::{check_user, list_users, upsert_user},
};

pub fn router(state: Arc<ServerState>) -> Router {
    let doc = ApiDoc::openapi();

    // The provider and older front-end builds use both spellings of the auth paths.
    let auth_router = Router::new()
        .route("/api/auth/twitter", get(auth_start))
        .route("/api/auth/twitter/", get(auth_start))
        .route("/api/auth/twitter/callback", get(auth_callback))
        .route("/api/auth/twitter/callback/", get(auth_callback));

    let users_router = Router::new()
        .route("/api/users", get(list_users).post(upsert_user))
        .route("/api/users/check/{id}", get(check_user));

    Router::new()
        .merge(Redoc::with_url("/redoc", doc))
        .merge(auth_router)
        .merge(users_router)
        .route("/api/ping", get(ping))
        .route("/api/health", get(health))
        .route("/api/regions", get(regions))
        .route("/docs", get(api_docs))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
