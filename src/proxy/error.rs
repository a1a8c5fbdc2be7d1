//! Error taxonomy shared by every call that goes through the proxy.
//!
//! The variants map one-to-one onto the outcomes a caller has to tell apart:
//! ask the user to sign in again (`NotAuthenticated`), the model provider
//! itself failed (`UpstreamProvider`), our request was malformed
//! (`RequestRejected`), or try again later (`Server` / `Network`).

use thiserror::Error;

/// Errors surfaced by the authenticated proxy client.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No credential available, or the proxy answered 401.
    /// Re-auth is the session layer's job; never retried here.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The upstream model provider failed (HTTP 502 from the proxy).
    /// The body carries provider error text; terminal, not retried.
    #[error("upstream provider failed: {detail}")]
    UpstreamProvider { detail: String },

    /// The proxy rejected our request (4xx other than 401). Terminal.
    #[error("request rejected (HTTP {status}): {detail}")]
    RequestRejected { status: u16, detail: String },

    /// Unexpected status from the proxy itself. Retried, then surfaced.
    #[error("proxy server error (HTTP {status})")]
    Server { status: u16 },

    /// Transport-level failure (timeout, connection loss). Retried up to
    /// the configured ceiling, then surfaced wrapping the last cause.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The call succeeded but the payload was empty or unusable.
    #[error("empty response from proxy")]
    EmptyResponse,

    /// The event stream was malformed or closed unexpectedly.
    #[error("stream error: {detail}")]
    Stream { detail: String },

    /// Client misconfiguration (bad header value, client build failure).
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProxyError {
    /// Create an upstream provider error carrying the provider's own text.
    pub fn upstream(detail: impl Into<String>) -> Self {
        Self::UpstreamProvider {
            detail: detail.into(),
        }
    }

    /// Create a request-rejected error.
    pub fn rejected(status: u16, detail: impl Into<String>) -> Self {
        Self::RequestRejected {
            status,
            detail: detail.into(),
        }
    }

    /// Create a stream error.
    pub fn stream(detail: impl Into<String>) -> Self {
        Self::Stream {
            detail: detail.into(),
        }
    }

    /// Create a config error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config(detail.into())
    }

    /// Whether the retry loop may consume an attempt on this error.
    ///
    /// Only transport failures and unclassified server statuses are
    /// transient; 401/502/4xx short-circuit on the first occurrence.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotAuthenticated => false,
            Self::UpstreamProvider { .. } => false,
            Self::RequestRejected { .. } => false,
            Self::Server { .. } => true,
            Self::Network(_) => true,
            Self::EmptyResponse => false,
            Self::Stream { .. } => false,
            Self::Config(_) => false,
        }
    }

    /// Short error code for logging and usage records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::UpstreamProvider { .. } => "upstream_provider",
            Self::RequestRejected { .. } => "request_rejected",
            Self::Server { .. } => "server_error",
            Self::Network(_) => "network_error",
            Self::EmptyResponse => "empty_response",
            Self::Stream { .. } => "stream_error",
            Self::Config(_) => "config_error",
        }
    }
}
