use std::fmt;
use thiserror::Error;

/// Failure kinds of the registration flow. Only some of them abort it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    ProviderDenied,
    MissingCode,
    StateDecodeFailed,
    UnknownRegion,
    TokenExchangeFailed,
    ProfileFetchFailed,
    PostsFetchFailed,
    Internal,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ProviderDenied => "provider_denied",
            FailureReason::MissingCode => "missing_code",
            FailureReason::StateDecodeFailed => "state_decode_failed",
            FailureReason::UnknownRegion => "unknown_region",
            FailureReason::TokenExchangeFailed => "token_exchange_failed",
            FailureReason::ProfileFetchFailed => "profile_fetch_failed",
            FailureReason::PostsFetchFailed => "posts_fetch_failed",
            FailureReason::Internal => "internal_error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal outcome of a failed `begin_auth` / `handle_callback`.
#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("{0}")]
    ProviderDenied(String),
    #[error("No code returned")]
    MissingCode,
    #[error("Invalid OAuth state: {0}")]
    StateDecodeFailed(String),
    #[error("Unknown region: {0}")]
    UnknownRegion(String),
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),
    #[error("Profile fetch failed: {0}")]
    ProfileFetchFailed(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthFailure {
    pub fn reason(&self) -> FailureReason {
        match self {
            AuthFailure::ProviderDenied(_) => FailureReason::ProviderDenied,
            AuthFailure::MissingCode => FailureReason::MissingCode,
            AuthFailure::StateDecodeFailed(_) => FailureReason::StateDecodeFailed,
            AuthFailure::UnknownRegion(_) => FailureReason::UnknownRegion,
            AuthFailure::TokenExchangeFailed(_) => FailureReason::TokenExchangeFailed,
            AuthFailure::ProfileFetchFailed(_) => FailureReason::ProfileFetchFailed,
            AuthFailure::Internal(_) => FailureReason::Internal,
        }
    }

    /// Query parameters handed to the front end on failure.
    pub fn redirect_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("status", "error".to_string()),
            ("reason", self.reason().to_string()),
            ("message", self.to_string()),
        ]
    }
}

/// Errors talking to the identity provider.
#[derive(Debug, Error)]
pub enum TwitterError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("Failed to get access token")]
    MissingAccessToken,
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TwitterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TwitterError::Timeout
        } else if err.is_decode() {
            TwitterError::Decode(err.to_string())
        } else {
            TwitterError::Transport(err)
        }
    }
}

pub type TwitterResult<T> = Result<T, TwitterError>;
