mod auth;
mod docs;
mod error;
mod info;
mod regions;
mod router;
mod state;
mod users;
mod util;

use std::{sync::Arc, time::Duration};

use dotenvy::dotenv;
use log::info;
use mindshare_core::{
    auth_service::AuthScoringService,
    config::ServiceConfig,
    region::RegionRules,
    twitter::{auth::STATE_TTL_SECS, storage::OAuthStateStorage},
    users::storage::UserStorage,
};
use router::router;
use state::ServerState;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = ServiceConfig::from_env()?;
    let rules = Arc::new(RegionRules::load(&config.region_rules_path)?);

    let db = sled::open(&config.sled_url)
        .map_err(|e| anyhow::anyhow!("Failed to open sled database: {}", e))?;

    let oauth_states = OAuthStateStorage::new(db.clone());
    let removed = oauth_states.cleanup_expired()?;
    if removed > 0 {
        info!("Removed {} expired OAuth states", removed);
    }
    oauth_states.spawn_cleanup(Duration::from_secs(STATE_TTL_SECS));

    let users = UserStorage::new(db);
    let auth_service = AuthScoringService::new(config.clone(), rules, oauth_states)?;
    let state = Arc::new(ServerState::from((auth_service, users)));

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server_domain).await?;
    info!("Server running on {}", config.server_domain);

    axum::serve(listener, app).await?;

    Ok(())
}
