//! HTTP transport seam
//!
//! The authenticator and the episode fetcher never talk to `reqwest`
//! directly. They describe each call as an [`ApiRequest`] and hand it to an
//! [`HttpTransport`], so the network can be swapped for a scripted transport
//! in tests.

use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

/// Errors raised below the HTTP status level
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuildFailed(String),

    /// The request never produced a response
    #[error("Request to {url} failed: {reason}")]
    RequestFailed { url: String, reason: String },

    /// A response arrived but its body could not be read
    #[error("Failed to read response body from {url}: {reason}")]
    BodyReadFailed { url: String, reason: String },
}

/// HTTP methods used against the catalog API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A transport-agnostic description of one API call
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    /// Bearer credential sent in the `Authorization` header
    pub bearer: Option<String>,
    pub query: Vec<(String, String)>,
    pub json_body: Option<serde_json::Value>,
}

impl ApiRequest {
    /// Builds a GET request without headers or query parameters
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            bearer: None,
            query: Vec::new(),
            json_body: None,
        }
    }

    /// Builds a POST request carrying a JSON body
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            bearer: None,
            query: Vec::new(),
            json_body: Some(body),
        }
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// Status code and raw body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decodes the body as JSON into the requested type
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Trait for anything that can execute an [`ApiRequest`]
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status code. `Err` is reserved for failures where no usable
/// response exists.
pub trait HttpTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

impl<T> HttpTransport for &T
where
    T: HttpTransport + ?Sized,
{
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).send(request)
    }
}

/// Production transport backed by a blocking `reqwest` client
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Creates a transport whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tvdb_episodes/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::ClientBuildFailed(e.to_string()))?;

        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .map_err(|e| TransportError::RequestFailed {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| TransportError::BodyReadFailed {
                url: request.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(ApiResponse { status, body })
    }
}
