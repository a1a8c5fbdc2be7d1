//! Core types for the proxy client.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

// =============================================================================
// ATTRIBUTION
// =============================================================================

/// Attribution for logging and usage records.
///
/// Every request through the client carries attribution so we know which
/// account context it ran under and which code path triggered it.
#[derive(Debug, Clone, Default)]
pub struct Attribution {
    /// Active account the call ran under (if known).
    pub account_id: Option<Uuid>,
    /// Which code path made this call, for debugging.
    /// Use a static string like "reduce::chunk" or "briefing::generate".
    pub caller: &'static str,
}

impl Attribution {
    pub fn new(caller: &'static str) -> Self {
        Self {
            caller,
            ..Default::default()
        }
    }

    pub fn with_account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }
}

// =============================================================================
// PROVIDERS AND REQUESTS
// =============================================================================

/// Upstream model vendor reachable through the proxy.
///
/// The proxy keeps provider credentials server-side; this layer only names
/// which vendor the opaque body is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }
}

/// Expected weight of a call, used to pick the per-request timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallClass {
    /// Quick field-level calls (30s budget).
    Light,
    /// Ordinary single completions (120s budget).
    #[default]
    Standard,
    /// Multi-minute structuring calls (300s budget).
    Heavy,
}

/// One outbound inference request. Immutable once built; owned exclusively
/// by the call that issues it.
///
/// Serialized verbatim as the proxy envelope
/// `{"provider","endpoint","body","stream"}`.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyRequest {
    /// Which vendor the proxy should forward to.
    pub provider: Provider,
    /// Vendor-relative endpoint path, e.g. "/v1/messages".
    pub endpoint: String,
    /// Opaque vendor-native JSON body. Prompt content is configuration,
    /// not something this layer interprets.
    pub body: serde_json::Value,
    /// Whether the proxy should stream the response.
    pub stream: bool,
    /// Timeout class for this call. Not part of the wire envelope.
    #[serde(skip)]
    pub class: CallClass,
    /// Attribution for logging. Not part of the wire envelope.
    #[serde(skip)]
    pub attribution: Attribution,
}

impl ProxyRequest {
    pub fn new(provider: Provider, endpoint: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            provider,
            endpoint: endpoint.into(),
            body,
            stream: false,
            class: CallClass::Standard,
            attribution: Attribution::default(),
        }
    }

    /// Mark this request as streaming.
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn class(mut self, class: CallClass) -> Self {
        self.class = class;
        self
    }

    pub fn attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// A short-lived bearer token. Fetched fresh per call; never persisted here.
#[derive(Clone)]
pub struct Credential {
    pub bearer: String,
}

impl Credential {
    pub fn new(bearer: impl Into<String>) -> Self {
        Self {
            bearer: bearer.into(),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token itself.
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

/// Source of short-lived bearer credentials.
///
/// Passed into the client at construction so the orchestration layer has no
/// hidden global session state. Returning `None` means expired/absent, which
/// the client surfaces as `NotAuthenticated` without issuing a call.
/// Caching and refresh are the session layer's responsibility, not ours.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<Credential>;
}

/// Fixed-token provider for tests and tooling.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    token: String,
}

impl StaticCredentialProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentialProvider {
    async fn bearer_token(&self) -> Option<Credential> {
        Some(Credential::new(self.token.clone()))
    }
}

/// Provider that never yields a credential. Useful for signed-out tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentialProvider;

#[async_trait]
impl CredentialProvider for NoCredentialProvider {
    async fn bearer_token(&self) -> Option<Credential> {
        None
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Client configuration. Timeouts apply per request; streaming calls are
/// open-ended reads and set no overall timeout.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Full URL of the proxy endpoint.
    pub base_url: String,
    /// Publishable API key sent in the `apikey` header.
    pub anon_key: String,
    /// Timeout for standard calls.
    pub request_timeout: Duration,
    /// Timeout for heavy structuring calls.
    pub heavy_timeout: Duration,
    /// Timeout for lightweight field-level calls.
    pub light_timeout: Duration,
}

impl ProxyConfig {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            anon_key: anon_key.into(),
            request_timeout: Duration::from_secs(120),
            heavy_timeout: Duration::from_secs(300),
            light_timeout: Duration::from_secs(30),
        }
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn heavy_timeout(mut self, timeout: Duration) -> Self {
        self.heavy_timeout = timeout;
        self
    }

    pub fn light_timeout(mut self, timeout: Duration) -> Self {
        self.light_timeout = timeout;
        self
    }

    /// Timeout to apply for a given call class.
    pub fn timeout_for(&self, class: CallClass) -> Duration {
        match class {
            CallClass::Light => self.light_timeout,
            CallClass::Standard => self.request_timeout,
            CallClass::Heavy => self.heavy_timeout,
        }
    }
}
