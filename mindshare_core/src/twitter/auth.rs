use anyhow::Result;
use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD},
    Engine,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

use super::dto::{AuthState, CallerOrigin};

pub const CALLBACK_PATH: &str = "/api/auth/twitter/callback";
pub const SCOPES: &str = "tweet.read users.read offline.access";

/// Verifier and challenge of the fixed `plain` pair some app registrations expect.
pub const FIXED_PKCE_VERIFIER: &str = "challenge";

/// OAuth state lifetime in seconds (15 minutes).
pub const STATE_TTL_SECS: u64 = 15 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
    pub method: &'static str,
}

impl PkcePair {
    pub fn fixed() -> Self {
        Self {
            verifier: FIXED_PKCE_VERIFIER.to_string(),
            challenge: FIXED_PKCE_VERIFIER.to_string(),
            method: "plain",
        }
    }
}

/// Generate a PKCE code verifier and S256 challenge pair
pub fn generate_pkce_pair() -> PkcePair {
    // 64 bytes encode to 86 characters, inside the 43..=128 range verifiers allow
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..64).map(|_| rng.gen()).collect();
    let verifier = URL_SAFE_NO_PAD.encode(&random_bytes);
    let challenge = code_challenge(&verifier);

    PkcePair {
        verifier,
        challenge,
        method: "S256",
    }
}

/// base64url(SHA-256(verifier)), no padding
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a cryptographically secure nonce
pub fn generate_nonce() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(&random_bytes)
}

/// Build Twitter OAuth2 authorization URL
pub fn build_auth_url(
    authorize_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    state: &str,
    pkce: &PkcePair,
) -> String {
    format!(
        "{}\
         ?response_type=code\
         &client_id={}\
         &redirect_uri={}\
         &scope={}\
         &state={}\
         &code_challenge={}\
         &code_challenge_method={}",
        authorize_endpoint,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(SCOPES),
        urlencoding::encode(state),
        urlencoding::encode(&pkce.challenge),
        pkce.method
    )
}

/// Encode OAuth state as base64url JSON
pub fn encode_state(state: &AuthState) -> Result<String> {
    let json = serde_json::to_vec(state)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode OAuth state. Standard base64 is accepted too, including the case
/// where `+` came back as a space after form decoding.
pub fn decode_state(state: &str) -> Result<AuthState> {
    let trimmed = state.trim();
    if trimmed.is_empty() {
        return Err(anyhow::anyhow!("Empty state"));
    }

    let restored = trimmed.replace(' ', "+");
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| URL_SAFE.decode(trimmed))
        .or_else(|_| STANDARD.decode(&restored))
        .or_else(|_| STANDARD_NO_PAD.decode(&restored))
        .map_err(|e| anyhow::anyhow!("State is not base64: {}", e))?;

    let auth_state: AuthState = serde_json::from_slice(&bytes)
        .map_err(|e| anyhow::anyhow!("State is not valid JSON: {}", e))?;

    Ok(auth_state)
}

/// Public base URL of this service, without trailing slash.
///
/// A configured base URL wins. Otherwise non-local hosts are assumed to sit
/// behind TLS termination and get `https`.
pub fn base_url(origin: &CallerOrigin, public_base_url: Option<&str>) -> String {
    let base = match public_base_url {
        Some(configured) => configured.to_string(),
        None if origin.is_local() => format!("{}://{}", origin.scheme, origin.host),
        None => format!("https://{}", origin.host),
    };

    base.trim_end_matches('/').to_string()
}

pub fn callback_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), CALLBACK_PATH)
}

/// Appends url-encoded parameters to `{base}/?`.
pub fn append_query(base: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}/?{}", base.trim_end_matches('/'), query)
}

/// Get current Unix timestamp
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Check if OAuth state has expired
pub fn is_state_expired(created_at: u64) -> bool {
    current_timestamp().saturating_sub(created_at) > STATE_TTL_SECS
}
