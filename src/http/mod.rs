//! HTTP plumbing for talking to the gateway
//!
//! The [`Transport`] trait performs a single exchange and knows nothing about
//! retries. [`Executor`] wraps a transport with per-attempt timeouts and
//! exponential backoff.

pub mod retry;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub use retry::{Executor, RetryPolicy};

/// Transport-level failures
///
/// Everything here except `Setup` is transient and retried by the executor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::Setup(_))
    }
}

// Timeouts are mapped by `ReqwestTransport`, which knows the configured limit.
impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::Setup(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// A single request to the gateway or through its proxy
#[derive(Clone, PartialEq)]
pub enum GatewayRequest {
    Get {
        url: String,
    },
    /// `application/x-www-form-urlencoded` POST
    PostForm {
        url: String,
        form: Vec<(String, String)>,
    },
}

impl GatewayRequest {
    pub fn get(url: impl Into<String>) -> Self {
        GatewayRequest::Get { url: url.into() }
    }

    pub fn post_form(url: impl Into<String>, form: &[(&str, &str)]) -> Self {
        GatewayRequest::PostForm {
            url: url.into(),
            form: form
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            GatewayRequest::Get { url } | GatewayRequest::PostForm { url, .. } => url,
        }
    }

    /// Value of a form field, if this is a form POST
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            GatewayRequest::Get { .. } => None,
            GatewayRequest::PostForm { form, .. } => form
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
        }
    }
}

// Form values are left out: the login form carries the password.
impl fmt::Debug for GatewayRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayRequest::Get { url } => f.debug_struct("Get").field("url", url).finish(),
            GatewayRequest::PostForm { url, form } => {
                let keys: Vec<&str> = form.iter().map(|(k, _)| k.as_str()).collect();
                f.debug_struct("PostForm")
                    .field("url", url)
                    .field("fields", &keys)
                    .finish()
            }
        }
    }
}

/// One HTTP exchange, returning the response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &GatewayRequest) -> Result<String, TransportError>;
}

/// Production transport backed by `reqwest`
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build the client used for both the gateway form and the probe
    ///
    /// Plain `http://` traffic goes through `proxy_url`; the `https://`
    /// gateway form is reached directly.
    pub fn new(
        proxy_url: &str,
        timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self, TransportError> {
        if accept_invalid_certs {
            warn!("TLS certificate validation toward the gateway is disabled");
        }

        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .proxy(Proxy::http(proxy_url)?)
            .build()?;

        Ok(Self { client, timeout })
    }

    fn map_error(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            e.into()
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &GatewayRequest) -> Result<String, TransportError> {
        debug!("Sending {:?}", request);

        let builder = match request {
            GatewayRequest::Get { url } => self.client.get(url),
            GatewayRequest::PostForm { url, form } => self.client.post(url).form(form),
        };

        // Non-2xx responses are still gateway pages; the caller classifies them.
        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_error(e))?;
        debug!("Response {} ({} bytes)", status, body.len());

        Ok(body)
    }
}
