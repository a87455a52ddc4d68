use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use reqwest::{Client, Response};
use std::time::Duration;

use super::dto::{
    Tweet, TwitterApiResponse, TwitterErrorBody, TwitterProfile, TwitterTimelineResponse,
    TwitterTokenResponse,
};
use crate::error::{TwitterError, TwitterResult};

pub const DEFAULT_API_URL: &str = "https://api.twitter.com";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://twitter.com/i/oauth2/authorize";

/// Bounds the provider puts on `max_results` for user timelines.
pub const MIN_TWEETS: u8 = 5;
pub const MAX_TWEETS: u8 = 50;

/// Thin client over the three provider calls the callback makes.
///
/// Every request shares one connection pool and is bounded by the timeout
/// given at construction.
#[derive(Clone)]
pub struct TwitterClient {
    http: Client,
    api_base: String,
    client_id: String,
    client_secret: String,
}

impl TwitterClient {
    pub fn new(
        api_base: &str,
        client_id: &str,
        client_secret: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .user_agent("mindshare-server/1.0")
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Exchanges an authorization code for an access token.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &str,
    ) -> TwitterResult<String> {
        let params = [
            ("code", code),
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier),
        ];

        let auth_string = format!("{}:{}", self.client_id, self.client_secret);
        let auth_header = format!("Basic {}", STANDARD.encode(auth_string));

        debug!("Exchanging token with URI: {}", redirect_uri);

        let response = self
            .http
            .post(format!("{}/2/oauth2/token", self.api_base))
            .header("Authorization", auth_header)
            .form(&params)
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let token_response: TwitterTokenResponse = response.json().await?;

        token_response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(TwitterError::MissingAccessToken)
    }

    pub async fn fetch_profile(&self, access_token: &str) -> TwitterResult<TwitterProfile> {
        let response = self
            .http
            .get(format!("{}/2/users/me", self.api_base))
            .bearer_auth(access_token)
            .query(&[("user.fields", "profile_image_url,public_metrics")])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let api_response: TwitterApiResponse<TwitterProfile> = response.json().await?;

        Ok(api_response.data)
    }

    /// Most recent original posts (no reposts, no replies) with their public metrics.
    pub async fn fetch_recent_tweets(
        &self,
        user_id: &str,
        access_token: &str,
        max_results: u8,
    ) -> TwitterResult<Vec<Tweet>> {
        let max_results = max_results.clamp(MIN_TWEETS, MAX_TWEETS).to_string();

        let response = self
            .http
            .get(format!("{}/2/users/{}/tweets", self.api_base, user_id))
            .bearer_auth(access_token)
            .query(&[
                ("max_results", max_results.as_str()),
                ("exclude", "retweets,replies"),
                ("tweet.fields", "public_metrics"),
            ])
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let timeline: TwitterTimelineResponse = response.json().await?;

        Ok(timeline.data)
    }
}

async fn ensure_success(response: Response) -> TwitterResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<TwitterErrorBody>(&error_text)
        .ok()
        .and_then(|body| body.message())
        .or_else(|| (!error_text.trim().is_empty()).then(|| error_text.clone()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });

    Err(TwitterError::Status {
        status: status.as_u16(),
        detail,
    })
}
