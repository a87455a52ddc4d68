use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use log::{error, info};
use mindshare_core::twitter::{auth::append_query, dto::CallbackParams};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{state::ServerState, util::caller_origin};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct AuthStartQuery {
    /// Participant identifier chosen on the front end (Discord username).
    #[serde(alias = "discordId")]
    pub external_user_id: Option<String>,
    pub region: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/auth/twitter",
    params(AuthStartQuery),
    description = "Start Twitter OAuth2 for a participant",
    responses(
        (status = 303, description = "Redirect to the Twitter authorization page"),
    )
)]
pub async fn auth_start(
    State(server_state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(query): Query<AuthStartQuery>,
) -> Redirect {
    let origin = caller_origin(&headers);
    let service = server_state.auth_service();

    let external_user_id = query.external_user_id.unwrap_or_default();
    let region = query.region.unwrap_or_default();

    match service.begin_auth(&external_user_id, &region, &origin) {
        Ok(redirect) => {
            info!(
                "Redirecting {} ({}) to Twitter authorization",
                external_user_id, redirect.region
            );
            Redirect::to(&redirect.authorize_url)
        }
        Err(failure) => {
            error!("Auth start error: {}", failure);
            let frontend_url = service.frontend_url(&origin);
            Redirect::to(&append_query(&frontend_url, &failure.redirect_params()))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/auth/twitter/callback",
    description = "Twitter OAuth2 callback; redirects to the front end with the scored profile",
    responses(
        (status = 303, description = "Redirect to the front end with status=success or status=error"),
    )
)]
pub async fn auth_callback(
    State(server_state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let origin = caller_origin(&headers);
    let service = server_state.auth_service();
    let frontend_url = service.frontend_url(&origin);

    let result_params = match service.handle_callback(params, &origin).await {
        Ok(profile) => profile.redirect_params(),
        Err(failure) => {
            error!("Auth callback error ({}): {}", failure.reason(), failure);
            failure.redirect_params()
        }
    };

    Redirect::to(&append_query(&frontend_url, &result_params))
}
