use serde::{Deserialize, Serialize};

use crate::region::Region;

/// Flow metadata carried through the OAuth `state` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    #[serde(default, alias = "discordId")]
    pub external_user_id: String,
    #[serde(default, alias = "region")]
    pub region_key: String,
    #[serde(default)]
    pub redirect_uri: String,
    /// Key of the stored PKCE verifier; absent when the fixed pair is in use.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Query parameters the provider sends to the callback endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Where the caller reached us from; used to build the callback address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerOrigin {
    pub scheme: String,
    pub host: String,
}

impl CallerOrigin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    pub fn is_local(&self) -> bool {
        let hostname = self.host.split(':').next().unwrap_or_default();
        hostname == "localhost" || hostname == "127.0.0.1"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirect {
    pub authorize_url: String,
    pub state: String,
    pub redirect_uri: String,
    pub region: Region,
}

/// Result of a successful callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredProfile {
    pub external_user_id: String,
    pub region: Region,
    pub social_handle: String,
    pub social_user_id: String,
    pub avatar_url: String,
    pub follower_count: u64,
    pub score: u64,
}

impl ScoredProfile {
    /// Query parameters handed to the front end on success.
    pub fn redirect_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("status", "success".to_string()),
            ("externalUserId", self.external_user_id.clone()),
            ("region", self.region.to_string()),
            ("socialHandle", format!("@{}", self.social_handle)),
            ("avatarUrl", self.avatar_url.clone()),
            ("followers", self.follower_count.to_string()),
            ("score", self.score.to_string()),
        ]
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TwitterTokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TwitterProfile {
    pub id: String,
    pub username: String,
    pub name: Option<String>,
    pub profile_image_url: Option<String>,
    pub public_metrics: Option<TwitterPublicMetrics>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TwitterPublicMetrics {
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub tweet_count: u64,
    #[serde(default)]
    pub listed_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    pub id: String,
    pub text: String,
    pub public_metrics: Option<TweetPublicMetrics>,
}

impl Tweet {
    pub fn impressions(&self) -> u64 {
        self.public_metrics
            .as_ref()
            .and_then(|m| m.impression_count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetPublicMetrics {
    pub impression_count: Option<u64>,
    pub like_count: Option<u64>,
    pub retweet_count: Option<u64>,
    pub reply_count: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TwitterApiResponse<T> {
    pub data: T,
}

/// Timeline responses omit `data` entirely when the user has no posts.
#[derive(Debug, Serialize, Deserialize)]
pub struct TwitterTimelineResponse {
    #[serde(default)]
    pub data: Vec<Tweet>,
}

/// Error body shapes returned by the provider.
#[derive(Debug, Default, Deserialize)]
pub struct TwitterErrorBody {
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub detail: Option<String>,
    pub title: Option<String>,
}

impl TwitterErrorBody {
    pub fn message(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.detail.clone())
            .or_else(|| self.error.clone())
            .or_else(|| self.title.clone())
    }
}
