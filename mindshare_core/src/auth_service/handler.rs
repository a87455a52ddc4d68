use anyhow::Result;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::{
    config::{DecodeFailurePolicy, PkceMode, ServiceConfig},
    error::{AuthFailure, FailureReason},
    region::{Region, RegionRules},
    twitter::{
        auth::{
            base_url, build_auth_url, callback_url, decode_state, encode_state,
            generate_nonce, generate_pkce_pair, PkcePair, FIXED_PKCE_VERIFIER,
        },
        client::TwitterClient,
        dto::{AuthRedirect, AuthState, CallbackParams, CallerOrigin, ScoredProfile},
        score::score_tweets,
        storage::{OAuthStateStorage, PendingVerifier},
    },
};

const LOCAL_FRONTEND_URL: &str = "http://localhost:3000";

/// Runs the two halves of the registration flow: sending the participant to
/// the provider, and turning the provider's callback into a `ScoredProfile`.
///
/// Nothing is persisted here apart from pending PKCE verifiers; the caller
/// decides what to do with the result.
#[derive(Clone)]
pub struct AuthScoringService {
    config: ServiceConfig,
    rules: Arc<RegionRules>,
    twitter: TwitterClient,
    oauth_states: OAuthStateStorage,
}

impl AuthScoringService {
    pub fn new(
        config: ServiceConfig,
        rules: Arc<RegionRules>,
        oauth_states: OAuthStateStorage,
    ) -> Result<Self> {
        let twitter = TwitterClient::new(
            &config.api_url,
            &config.client_id,
            &config.client_secret,
            config.http_timeout,
        )?;

        Ok(Self {
            config,
            rules,
            twitter,
            oauth_states,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn rules(&self) -> &RegionRules {
        &self.rules
    }

    /// Base URL of the front end that receives the result parameters.
    pub fn frontend_url(&self, origin: &CallerOrigin) -> String {
        match &self.config.frontend_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if origin.is_local() => LOCAL_FRONTEND_URL.to_string(),
            None => base_url(origin, self.config.public_base_url.as_deref()),
        }
    }

    fn default_redirect_uri(&self, origin: &CallerOrigin) -> String {
        callback_url(&base_url(origin, self.config.public_base_url.as_deref()))
    }

    fn resolve_region(&self, region_key: &str) -> Result<Region, AuthFailure> {
        if let Some(region) = self.rules.resolve(region_key) {
            return Ok(region);
        }

        match self.config.on_decode_failure {
            DecodeFailurePolicy::Reject => Err(AuthFailure::UnknownRegion(region_key.to_string())),
            DecodeFailurePolicy::UseDefault => {
                let fallback = self.rules.default_region();
                warn!(
                    "Unknown region '{}', falling back to {}",
                    region_key, fallback
                );
                Ok(fallback)
            }
        }
    }

    pub fn begin_auth(
        &self,
        external_user_id: &str,
        region_key: &str,
        origin: &CallerOrigin,
    ) -> Result<AuthRedirect, AuthFailure> {
        let region = self.resolve_region(region_key)?;
        // A known key travels in the state exactly as the caller sent it.
        let state_region_key = match self.rules.resolve(region_key) {
            Some(_) => region_key.to_string(),
            None => region.to_string(),
        };
        let redirect_uri = self.default_redirect_uri(origin);

        info!("Auth start for user {} in region {}", external_user_id, region);
        debug!("Auth start redirect URI: {}", redirect_uri);

        let (pkce, nonce) = match self.config.pkce_mode {
            PkceMode::Fixed => (PkcePair::fixed(), None),
            PkceMode::Random => {
                let pkce = generate_pkce_pair();
                let nonce = generate_nonce();
                self.oauth_states
                    .store(&nonce, &PendingVerifier::new(pkce.verifier.clone()))
                    .map_err(|e| {
                        AuthFailure::Internal(format!("Failed to store PKCE verifier: {}", e))
                    })?;
                (pkce, Some(nonce))
            }
        };

        let auth_state = AuthState {
            external_user_id: external_user_id.to_string(),
            region_key: state_region_key,
            redirect_uri: redirect_uri.clone(),
            nonce,
        };
        let state = encode_state(&auth_state)
            .map_err(|e| AuthFailure::Internal(format!("Failed to encode state: {}", e)))?;

        let authorize_url = build_auth_url(
            &self.config.authorize_url,
            self.twitter.client_id(),
            &redirect_uri,
            &state,
            &pkce,
        );

        Ok(AuthRedirect {
            authorize_url,
            state,
            redirect_uri,
            region,
        })
    }

    /// Decodes the callback state, applying the configured policy on failure.
    fn callback_state(
        &self,
        state: Option<&str>,
        origin: &CallerOrigin,
    ) -> Result<(AuthState, Region), AuthFailure> {
        let decoded = state
            .ok_or_else(|| anyhow::anyhow!("State missing from callback"))
            .and_then(decode_state);

        let mut auth_state = match decoded {
            Ok(auth_state) => auth_state,
            Err(e) => match self.config.on_decode_failure {
                DecodeFailurePolicy::Reject => {
                    return Err(AuthFailure::StateDecodeFailed(e.to_string()));
                }
                DecodeFailurePolicy::UseDefault => {
                    warn!("{}: {} (continuing with defaults)", FailureReason::StateDecodeFailed, e);
                    AuthState {
                        external_user_id: String::new(),
                        region_key: self.rules.default_region().to_string(),
                        redirect_uri: String::new(),
                        nonce: None,
                    }
                }
            },
        };

        if auth_state.redirect_uri.is_empty() {
            auth_state.redirect_uri = self.default_redirect_uri(origin);
        }

        let region = self.resolve_region(&auth_state.region_key)?;

        Ok((auth_state, region))
    }

    /// States without a nonce were issued with the fixed pair.
    fn code_verifier(&self, auth_state: &AuthState) -> Result<String, AuthFailure> {
        let Some(nonce) = auth_state.nonce.as_deref() else {
            return Ok(FIXED_PKCE_VERIFIER.to_string());
        };

        match self.oauth_states.take(nonce) {
            Ok(Some(verifier)) => Ok(verifier),
            Ok(None) => Err(AuthFailure::TokenExchangeFailed(
                "PKCE verifier for this flow is missing or expired".to_string(),
            )),
            Err(e) => Err(AuthFailure::TokenExchangeFailed(format!(
                "Failed to load PKCE verifier: {}",
                e
            ))),
        }
    }

    pub async fn handle_callback(
        &self,
        params: CallbackParams,
        origin: &CallerOrigin,
    ) -> Result<ScoredProfile, AuthFailure> {
        if let Some(error) = params.error {
            warn!("Twitter returned error: {}", error);
            let message = match params.error_description {
                Some(description) => format!("{}: {}", error, description),
                None => error,
            };
            return Err(AuthFailure::ProviderDenied(message));
        }

        let (auth_state, region) = self.callback_state(params.state.as_deref(), origin)?;

        let code = params
            .code
            .filter(|code| !code.is_empty())
            .ok_or(AuthFailure::MissingCode)?;

        let verifier = self.code_verifier(&auth_state)?;

        let access_token = self
            .twitter
            .exchange_code(&code, &auth_state.redirect_uri, &verifier)
            .await
            .map_err(|e| AuthFailure::TokenExchangeFailed(e.to_string()))?;

        debug!("Successfully exchanged code for token");

        let profile = self
            .twitter
            .fetch_profile(&access_token)
            .await
            .map_err(|e| AuthFailure::ProfileFetchFailed(e.to_string()))?;

        debug!("Fetched Twitter profile for: @{}", profile.username);

        let tweets = match self
            .twitter
            .fetch_recent_tweets(&profile.id, &access_token, self.config.tweets_max_results)
            .await
        {
            Ok(tweets) => tweets,
            Err(e) => {
                warn!(
                    "{} for @{}: {} (scoring with no posts)",
                    FailureReason::PostsFetchFailed,
                    profile.username,
                    e
                );
                Vec::new()
            }
        };

        let score = self
            .rules
            .rule(region)
            .map(|rule| score_tweets(rule, &tweets))
            .unwrap_or(0);

        let follower_count = profile
            .public_metrics
            .as_ref()
            .map(|m| m.followers_count)
            .unwrap_or(0);

        info!(
            "User @{} scored {} in {} ({} posts scanned, {} followers)",
            profile.username,
            score,
            region,
            tweets.len(),
            follower_count
        );

        Ok(ScoredProfile {
            external_user_id: auth_state.external_user_id,
            region,
            social_handle: profile.username,
            social_user_id: profile.id,
            avatar_url: profile.profile_image_url.unwrap_or_default(),
            follower_count,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitter::auth::code_challenge;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ORIGIN_HOST: &str = "mindshare.example.com";

    fn origin() -> CallerOrigin {
        CallerOrigin::new("http", ORIGIN_HOST)
    }

    fn service_with(
        server: &MockServer,
        pkce_mode: PkceMode,
        policy: DecodeFailurePolicy,
    ) -> AuthScoringService {
        let mut config = ServiceConfig::new("client-id", "client-secret");
        config.api_url = server.uri();
        config.http_timeout = Duration::from_secs(2);
        config.pkce_mode = pkce_mode;
        config.on_decode_failure = policy;

        let db = sled::Config::new().temporary(true).open().unwrap();
        AuthScoringService::new(
            config,
            Arc::new(RegionRules::builtin()),
            OAuthStateStorage::new(db),
        )
        .unwrap()
    }

    fn fixed_service(server: &MockServer) -> AuthScoringService {
        service_with(server, PkceMode::Fixed, DecodeFailurePolicy::UseDefault)
    }

    fn state_for(service: &AuthScoringService, user: &str, region: &str) -> String {
        service.begin_auth(user, region, &origin()).unwrap().state
    }

    fn callback(code: Option<&str>, state: Option<String>) -> CallbackParams {
        CallbackParams {
            code: code.map(str::to_string),
            state,
            error: None,
            error_description: None,
        }
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token-123",
                "token_type": "bearer"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    async fn mount_profile(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": "42",
                    "username": "carv_fan",
                    "name": "Carv Fan",
                    "profile_image_url": "https://pbs.twimg.com/a.jpg",
                    "public_metrics": {"followers_count": 321}
                }
            })))
            .mount(server)
            .await;
    }

    async fn mount_tweets(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/2/users/42/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "1", "text": "great #CarvTurkey launch", "public_metrics": {"impression_count": 100}},
                    {"id": "2", "text": "unrelated", "public_metrics": {"impression_count": 50}}
                ]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_begin_auth_state_round_trips_for_every_region() {
        let server = MockServer::start().await;
        let service = fixed_service(&server);

        for region in Region::ALL {
            let redirect = service
                .begin_auth("neo#0001", region.as_str(), &origin())
                .unwrap();

            let decoded = decode_state(&redirect.state).unwrap();
            assert_eq!(decoded.external_user_id, "neo#0001");
            assert_eq!(decoded.region_key, region.as_str());
            assert_eq!(
                decoded.redirect_uri,
                "https://mindshare.example.com/api/auth/twitter/callback"
            );
            assert_eq!(decoded.redirect_uri, redirect.redirect_uri);
            assert!(redirect.authorize_url.contains("code_challenge_method=plain"));
        }
    }

    #[tokio::test]
    async fn test_begin_auth_uses_configured_public_base_url() {
        let server = MockServer::start().await;
        let mut service = fixed_service(&server);
        service.config.public_base_url = Some("https://campaign.example.org/".to_string());

        let redirect = service.begin_auth("neo", "Japan", &origin()).unwrap();
        assert_eq!(
            redirect.redirect_uri,
            "https://campaign.example.org/api/auth/twitter/callback"
        );
    }

    #[tokio::test]
    async fn test_begin_auth_random_pkce_stores_verifier() {
        let server = MockServer::start().await;
        let service = service_with(&server, PkceMode::Random, DecodeFailurePolicy::UseDefault);

        let redirect = service.begin_auth("neo", "Korea", &origin()).unwrap();
        let state = decode_state(&redirect.state).unwrap();
        let nonce = state.nonce.clone().unwrap();

        let verifier = service.oauth_states.take(&nonce).unwrap().unwrap();
        let challenge = code_challenge(&verifier);

        assert!(redirect
            .authorize_url
            .contains(&format!("code_challenge={}", challenge)));
        assert!(redirect.authorize_url.contains("code_challenge_method=S256"));
    }

    #[tokio::test]
    async fn test_unknown_region_falls_back_to_default() {
        let server = MockServer::start().await;
        let service = fixed_service(&server);

        let redirect = service.begin_auth("neo", "Atlantis", &origin()).unwrap();
        assert_eq!(redirect.region, Region::Turkey);
        assert_eq!(decode_state(&redirect.state).unwrap().region_key, "Turkey");
    }

    #[tokio::test]
    async fn test_begin_auth_keeps_supplied_region_key() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        mount_profile(&server).await;
        mount_tweets(&server).await;
        let service = fixed_service(&server);

        let redirect = service.begin_auth("neo", "turkey", &origin()).unwrap();
        assert_eq!(redirect.region, Region::Turkey);
        assert_eq!(decode_state(&redirect.state).unwrap().region_key, "turkey");

        let profile = service
            .handle_callback(callback(Some("code"), Some(redirect.state)), &origin())
            .await
            .unwrap();
        assert_eq!(profile.region, Region::Turkey);
        assert_eq!(profile.score, 100);
    }

    #[tokio::test]
    async fn test_unknown_region_rejected_in_strict_mode() {
        let server = MockServer::start().await;
        let service = service_with(&server, PkceMode::Fixed, DecodeFailurePolicy::Reject);

        let failure = service.begin_auth("neo", "Atlantis", &origin()).unwrap_err();
        assert_eq!(failure.reason(), FailureReason::UnknownRegion);
    }

    #[tokio::test]
    async fn test_provider_error_skips_token_exchange() {
        let server = MockServer::start().await;
        mount_token(&server, 0).await;
        let service = fixed_service(&server);

        let params = CallbackParams {
            code: Some("code".to_string()),
            state: Some(state_for(&service, "neo", "Turkey")),
            error: Some("access_denied".to_string()),
            error_description: None,
        };

        let failure = service.handle_callback(params, &origin()).await.unwrap_err();
        assert_eq!(failure.reason(), FailureReason::ProviderDenied);
        assert_eq!(failure.redirect_params()[0], ("status", "error".to_string()));
    }

    #[tokio::test]
    async fn test_missing_code() {
        let server = MockServer::start().await;
        mount_token(&server, 0).await;
        let service = fixed_service(&server);

        let state = Some(state_for(&service, "neo", "Turkey"));
        let failure = service
            .handle_callback(callback(None, state.clone()), &origin())
            .await
            .unwrap_err();
        assert_eq!(failure.reason(), FailureReason::MissingCode);

        let failure = service
            .handle_callback(callback(Some(""), state), &origin())
            .await
            .unwrap_err();
        assert_eq!(failure.reason(), FailureReason::MissingCode);
    }

    #[tokio::test]
    async fn test_successful_callback_scores_matching_posts() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains("code_verifier=challenge"))
            .and(body_string_contains(
                "redirect_uri=https%3A%2F%2Fmindshare.example.com%2Fapi%2Fauth%2Ftwitter%2Fcallback",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token-123"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_profile(&server).await;
        mount_tweets(&server).await;

        let service = fixed_service(&server);
        let state = state_for(&service, "neo#0001", "Turkey");

        let profile = service
            .handle_callback(callback(Some("auth-code"), Some(state)), &origin())
            .await
            .unwrap();

        assert_eq!(
            profile,
            ScoredProfile {
                external_user_id: "neo#0001".to_string(),
                region: Region::Turkey,
                social_handle: "carv_fan".to_string(),
                social_user_id: "42".to_string(),
                avatar_url: "https://pbs.twimg.com/a.jpg".to_string(),
                follower_count: 321,
                score: 100,
            }
        );
    }

    #[tokio::test]
    async fn test_posts_failure_still_succeeds_with_zero_score() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        mount_profile(&server).await;
        Mock::given(method("GET"))
            .and(path("/2/users/42/tweets"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service = fixed_service(&server);
        let state = state_for(&service, "neo", "Turkey");

        let profile = service
            .handle_callback(callback(Some("code"), Some(state)), &origin())
            .await
            .unwrap();

        assert_eq!(profile.score, 0);
        assert_eq!(profile.social_handle, "carv_fan");
    }

    #[tokio::test]
    async fn test_profile_failure_is_fatal() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        mount_tweets(&server).await;
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "title": "Unauthorized",
                "detail": "Unauthorized"
            })))
            .mount(&server)
            .await;

        let service = fixed_service(&server);
        let state = state_for(&service, "neo", "Turkey");

        let failure = service
            .handle_callback(callback(Some("code"), Some(state)), &origin())
            .await
            .unwrap_err();

        assert_eq!(failure.reason(), FailureReason::ProfileFetchFailed);
    }

    #[tokio::test]
    async fn test_token_exchange_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Value passed for the token was invalid."
            })))
            .mount(&server)
            .await;

        let service = fixed_service(&server);
        let state = state_for(&service, "neo", "Turkey");

        let failure = service
            .handle_callback(callback(Some("code"), Some(state)), &origin())
            .await
            .unwrap_err();

        assert_eq!(failure.reason(), FailureReason::TokenExchangeFailed);
        assert!(failure
            .to_string()
            .contains("Value passed for the token was invalid."));
    }

    #[tokio::test]
    async fn test_undecodable_state_uses_defaults() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;
        mount_profile(&server).await;
        mount_tweets(&server).await;

        let service = fixed_service(&server);

        let profile = service
            .handle_callback(
                callback(Some("code"), Some("definitely not state".to_string())),
                &origin(),
            )
            .await
            .unwrap();

        assert_eq!(profile.external_user_id, "");
        assert_eq!(profile.region, Region::Turkey);
        assert_eq!(profile.score, 100);
    }

    #[tokio::test]
    async fn test_undecodable_state_rejected_in_strict_mode() {
        let server = MockServer::start().await;
        mount_token(&server, 0).await;

        let service = service_with(&server, PkceMode::Fixed, DecodeFailurePolicy::Reject);

        let failure = service
            .handle_callback(callback(Some("code"), Some("garbage".to_string())), &origin())
            .await
            .unwrap_err();

        assert_eq!(failure.reason(), FailureReason::StateDecodeFailed);
    }

    #[tokio::test]
    async fn test_random_pkce_verifier_is_sent_once() {
        let server = MockServer::start().await;
        let service = service_with(&server, PkceMode::Random, DecodeFailurePolicy::UseDefault);

        let redirect = service.begin_auth("neo", "Turkey", &origin()).unwrap();
        let nonce = decode_state(&redirect.state).unwrap().nonce.unwrap();

        // Peek at the verifier, then put it back for the callback to consume.
        let verifier = service.oauth_states.take(&nonce).unwrap().unwrap();
        service
            .oauth_states
            .store(&nonce, &PendingVerifier::new(verifier.clone()))
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/2/oauth2/token"))
            .and(body_string_contains(format!("code_verifier={}", verifier)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "token-123"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_profile(&server).await;
        mount_tweets(&server).await;

        let profile = service
            .handle_callback(
                callback(Some("code"), Some(redirect.state.clone())),
                &origin(),
            )
            .await
            .unwrap();
        assert_eq!(profile.score, 100);

        let replay = service
            .handle_callback(callback(Some("code"), Some(redirect.state)), &origin())
            .await
            .unwrap_err();
        assert_eq!(replay.reason(), FailureReason::TokenExchangeFailed);
    }

    #[tokio::test]
    async fn test_frontend_url() {
        let server = MockServer::start().await;
        let mut service = fixed_service(&server);

        assert_eq!(
            service.frontend_url(&CallerOrigin::new("http", "localhost:5000")),
            "http://localhost:3000"
        );
        assert_eq!(
            service.frontend_url(&origin()),
            "https://mindshare.example.com"
        );

        service.config.frontend_url = Some("https://app.example.org/".to_string());
        assert_eq!(service.frontend_url(&origin()), "https://app.example.org");
    }
}
