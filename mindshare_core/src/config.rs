use anyhow::Result;
use std::{env, str::FromStr, time::Duration};

use crate::twitter::client::{DEFAULT_API_URL, DEFAULT_AUTHORIZE_URL};

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TWEETS_MAX_RESULTS: u8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkceMode {
    /// Fresh verifier per flow, S256 challenge.
    Random,
    /// Constant `plain` pair, for app registrations that depend on it.
    Fixed,
}

impl FromStr for PkceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" | "s256" => Ok(PkceMode::Random),
            "fixed" | "plain" => Ok(PkceMode::Fixed),
            other => Err(anyhow::anyhow!("Invalid PKCE_MODE: {}", other)),
        }
    }
}

/// What to do with an undecodable state or an unknown region key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailurePolicy {
    UseDefault,
    Reject,
}

impl FromStr for DecodeFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "use_default" | "lenient" => Ok(DecodeFailurePolicy::UseDefault),
            "reject" | "strict" => Ok(DecodeFailurePolicy::Reject),
            other => Err(anyhow::anyhow!("Invalid ON_DECODE_FAILURE: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub client_id: String,
    pub client_secret: String,
    pub public_base_url: Option<String>,
    pub frontend_url: Option<String>,
    pub api_url: String,
    pub authorize_url: String,
    pub http_timeout: Duration,
    pub tweets_max_results: u8,
    pub pkce_mode: PkceMode,
    pub on_decode_failure: DecodeFailurePolicy,
    pub region_rules_path: String,
    pub sled_url: String,
    pub server_domain: String,
}

impl ServiceConfig {
    /// Defaults for everything except the client credentials.
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            public_base_url: None,
            frontend_url: None,
            api_url: DEFAULT_API_URL.to_string(),
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            tweets_max_results: DEFAULT_TWEETS_MAX_RESULTS,
            pkce_mode: PkceMode::Random,
            on_decode_failure: DecodeFailurePolicy::UseDefault,
            region_rules_path: "assets/regions.ron".to_string(),
            sled_url: "mindshare_db".to_string(),
            server_domain: "0.0.0.0:5000".to_string(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let client_id = env::var("TWITTER_CLIENT_ID")
            .map_err(|_| anyhow::anyhow!("TWITTER_CLIENT_ID not set"))?;
        let client_secret = env::var("TWITTER_CLIENT_SECRET")
            .map_err(|_| anyhow::anyhow!("TWITTER_CLIENT_SECRET not set"))?;

        let mut config = Self::new(&client_id, &client_secret);

        config.public_base_url = optional_var("PUBLIC_BASE_URL");
        config.frontend_url = optional_var("FRONTEND_URL");

        if let Some(api_url) = optional_var("TWITTER_API_URL") {
            config.api_url = api_url;
        }
        if let Some(authorize_url) = optional_var("TWITTER_AUTHORIZE_URL") {
            config.authorize_url = authorize_url;
        }
        if let Some(timeout) = optional_var("HTTP_TIMEOUT_SECS") {
            let secs = timeout
                .parse::<u64>()
                .map_err(|e| anyhow::anyhow!("Invalid HTTP_TIMEOUT_SECS: {}", e))?;
            if secs == 0 {
                return Err(anyhow::anyhow!("Invalid HTTP_TIMEOUT_SECS: must be at least 1"));
            }
            config.http_timeout = Duration::from_secs(secs);
        }
        if let Some(max_results) = optional_var("TWEETS_MAX_RESULTS") {
            config.tweets_max_results = max_results
                .parse::<u8>()
                .map_err(|e| anyhow::anyhow!("Invalid TWEETS_MAX_RESULTS: {}", e))?;
        }
        if let Some(mode) = optional_var("PKCE_MODE") {
            config.pkce_mode = mode.parse()?;
        }
        if let Some(policy) = optional_var("ON_DECODE_FAILURE") {
            config.on_decode_failure = policy.parse()?;
        }
        if let Some(path) = optional_var("REGION_RULES_PATH") {
            config.region_rules_path = path;
        }
        if let Some(sled_url) = optional_var("SLED_URL") {
            config.sled_url = sled_url;
        }
        if let Some(server_domain) = optional_var("SERVER_DOMAIN") {
            config.server_domain = server_domain;
        }

        Ok(config)
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
