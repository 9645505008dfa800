//! Bearer token acquisition and renewal
//!
//! TheTVDB hands out tokens that stay valid for about a month. We still
//! renew after [`TOKEN_LIFETIME`] so a long-running process never carries a
//! token near the end of its life.

use super::transport::{ApiRequest, HttpTransport, TransportError};
use super::tvdb_types::LoginResponse;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, error, warn};

/// How long a freshly issued token is trusted before renewal
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors that can occur while logging in
#[derive(Debug, Error)]
pub enum AuthError {
    /// No API key is configured, so fetching is disabled
    #[error("No API key configured")]
    MissingApiKey,

    /// The login request did not produce a response
    #[error("Login request failed: {0}")]
    Transport(#[from] TransportError),

    /// The login endpoint answered with a non-200 status
    #[error("Login failed with status {0}")]
    Status(u16),

    /// The provider refused the key
    #[error("Login rejected: {0}")]
    Rejected(String),

    /// The login response body was not the expected JSON
    #[error("Failed to parse login response: {0}")]
    Parse(String),

    /// A success payload that carried no token
    #[error("Login response did not contain a token")]
    MissingToken,
}

/// A bearer credential together with its self-imposed expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub value: String,
    pub expires_at: SystemTime,
}

impl Token {
    pub fn is_valid(&self) -> bool {
        SystemTime::now() < self.expires_at
    }
}

/// Owns the current bearer token and knows how to renew it
///
/// `get_token` and `invalidate` are the only ways the token changes.
#[derive(Debug)]
pub struct Authenticator {
    api_key: Option<String>,
    login_url: String,
    token: Option<Token>,
}

impl Authenticator {
    /// Creates an authenticator for the API rooted at `base_url`
    ///
    /// An empty or whitespace-only key is treated as no key at all.
    pub fn new(api_key: Option<String>, base_url: &str) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            login_url: format!("{}/login", base_url.trim_end_matches('/')),
            token: None,
        }
    }

    /// The cached token, if one exists and has not expired
    pub fn current_token(&self) -> Option<&Token> {
        self.token.as_ref().filter(|token| token.is_valid())
    }

    /// Returns a usable token, logging in when none is cached
    ///
    /// Failures are logged and reported as `None`; callers treat that as
    /// "nothing can be fetched right now".
    pub fn get_token<T: HttpTransport>(&mut self, transport: &T) -> Option<Token> {
        if let Some(token) = self.current_token() {
            return Some(token.clone());
        }

        match self.login(transport) {
            Ok(token) => {
                debug!("Authentication with TheTVDB successful");
                self.token = Some(token.clone());
                Some(token)
            }
            Err(AuthError::MissingApiKey) => {
                warn!("No TheTVDB API key configured");
                None
            }
            Err(e) => {
                error!("TheTVDB authentication failed: {}", e);
                None
            }
        }
    }

    /// Forgets the cached token so the next `get_token` logs in again
    pub fn invalidate(&mut self) {
        self.token = None;
    }

    fn login<T: HttpTransport>(&self, transport: &T) -> Result<Token, AuthError> {
        let api_key = self.api_key.as_deref().ok_or(AuthError::MissingApiKey)?;

        let request =
            ApiRequest::post_json(&self.login_url, serde_json::json!({ "apikey": api_key }));
        let response = transport.send(&request)?;

        if response.status != 200 {
            return Err(AuthError::Status(response.status));
        }

        let payload: LoginResponse = response
            .json()
            .map_err(|e| AuthError::Parse(e.to_string()))?;

        if payload.status.as_deref() != Some("success") {
            return Err(AuthError::Rejected(
                payload.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let value = payload
            .data
            .and_then(|data| data.token)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        Ok(Token {
            value,
            expires_at: SystemTime::now() + TOKEN_LIFETIME,
        })
    }
}
