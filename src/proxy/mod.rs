//! Authenticated client for the inference proxy.
//!
//! Every outbound inference request flows through [`ProxyClient`]: it fetches
//! a fresh credential, wraps the vendor-native body in the proxy envelope,
//! classifies the HTTP outcome, and applies the retry policy. Single-shot
//! calls return the vendor body verbatim; streaming calls yield an ordered
//! token stream.

pub mod error;
pub mod retry;
pub mod stream;
pub mod types;
pub mod usage;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tokio::time::sleep;

pub use error::ProxyError;
pub use retry::RetryPolicy;
pub use stream::{StreamToken, TokenStream, STREAM_DONE};
pub use types::{
    Attribution, CallClass, Credential, CredentialProvider, NoCredentialProvider, Provider,
    ProxyConfig, ProxyRequest, StaticCredentialProvider,
};
pub use usage::{CallRecord, CallStatus, NoopUsageSink, StderrUsageSink, UsageSink};

/// Maximum allowed single-shot response length (1MB).
const MAX_RESPONSE_LEN: usize = 1_024 * 1_024;

/// Single-shot call surface, as a trait so the reduce engine and fan-out
/// orchestration can run against fakes in tests.
#[async_trait]
pub trait ProxyApi: Send + Sync {
    /// Issue one logical call; returns the vendor-native JSON body verbatim.
    async fn call(&self, req: &ProxyRequest) -> Result<String, ProxyError>;

    /// Issue one logical call and extract the generated text from the
    /// vendor-native response shape.
    async fn complete(&self, req: &ProxyRequest) -> Result<String, ProxyError> {
        let body = self.call(req).await?;
        extract_text(req.provider, &body)
    }
}

/// Pull the generated text out of a vendor-native response body.
///
/// The body is otherwise passed through verbatim; this is the one place the
/// orchestration layer reaches into vendor shapes, because the reduce engine
/// needs text, not JSON.
pub fn extract_text(provider: Provider, body: &str) -> Result<String, ProxyError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| ProxyError::EmptyResponse)?;

    let text = match provider {
        Provider::Anthropic => value
            .pointer("/content/0/text")
            .and_then(|v| v.as_str()),
        Provider::OpenAi => value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str()),
    };

    match text {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(ProxyError::EmptyResponse),
    }
}

/// Authenticated proxy client with retry and streaming call modes.
pub struct ProxyClient {
    http: reqwest::Client,
    config: ProxyConfig,
    credentials: Arc<dyn CredentialProvider>,
    retry: RetryPolicy,
    usage: Arc<dyn UsageSink>,
}

impl ProxyClient {
    pub fn new(
        config: ProxyConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ProxyError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let anon_value = HeaderValue::from_str(&config.anon_key)
            .map_err(|_| ProxyError::config("invalid anon key format"))?;
        headers.insert("apikey", anon_value);

        // No client-level timeout: streaming reads are open-ended. Single-shot
        // calls get a per-request timeout from the call class.
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| ProxyError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config,
            credentials,
            retry: RetryPolicy::default(),
            usage: Arc::new(NoopUsageSink),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_usage_sink(mut self, usage: Arc<dyn UsageSink>) -> Self {
        self.usage = usage;
        self
    }

    /// Single-shot call. One retry sequence of up to `max_retries + 1`
    /// attempts; only transient failures consume attempts, terminal
    /// classifications (401/502/other 4xx) short-circuit immediately.
    pub async fn call(&self, req: &ProxyRequest) -> Result<String, ProxyError> {
        let start = Instant::now();
        let mut attempt = 0u32;

        loop {
            match self.attempt_call(req).await {
                Ok(body) => {
                    self.record(req, attempt + 1, start, None).await;
                    return Ok(body);
                }
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.retry.max_retries {
                        self.record(req, attempt + 1, start, Some(err.code())).await;
                        return Err(err);
                    }
                    tracing::warn!(
                        attempt,
                        code = err.code(),
                        endpoint = %req.endpoint,
                        "transient proxy failure, backing off"
                    );
                    // Cancellable suspension point: abandoning the call chain
                    // here abandons the remaining attempts too.
                    sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Streaming call. The connection is opened once and never retried
    /// mid-stream; the open status is classified exactly like a single-shot
    /// response, so a 502 surfaces as `UpstreamProvider` before any tokens.
    pub async fn stream(&self, req: &ProxyRequest) -> Result<TokenStream, ProxyError> {
        let start = Instant::now();
        let result = self.open_stream(req).await;

        let error_code = result.as_ref().err().map(|e| e.code());
        let record = CallRecord::new(req.provider.as_str(), req.endpoint.clone(), req.attribution.caller)
            .account(req.attribution.account_id)
            .latency(start.elapsed().as_millis() as i64)
            .streamed();
        let record = match error_code {
            Some(code) => record.error(code),
            None => record,
        };
        self.usage.record(record).await;

        result
    }

    async fn open_stream(&self, req: &ProxyRequest) -> Result<TokenStream, ProxyError> {
        let credential = self.credential().await?;

        let envelope = ProxyRequest {
            stream: true,
            ..req.clone()
        };

        let response = self
            .http
            .post(&self.config.base_url)
            .bearer_auth(&credential.bearer)
            .json(&envelope)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Self::classify_failure(status.as_u16(), detail));
        }

        Ok(TokenStream::from_response(response))
    }

    async fn attempt_call(&self, req: &ProxyRequest) -> Result<String, ProxyError> {
        let credential = self.credential().await?;

        let mut response = self
            .http
            .post(&self.config.base_url)
            .bearer_auth(&credential.bearer)
            .timeout(self.config.timeout_for(req.class))
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status.is_success() {
            // Stream the body to enforce the size limit.
            let mut bytes = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                let new_len = bytes.len() + chunk.len();
                if new_len > MAX_RESPONSE_LEN {
                    return Err(ProxyError::rejected(
                        status.as_u16(),
                        format!("response too large: {new_len} bytes"),
                    ));
                }
                bytes.extend_from_slice(&chunk);
            }

            let body = String::from_utf8_lossy(&bytes).to_string();
            if body.trim().is_empty() {
                return Err(ProxyError::EmptyResponse);
            }
            return Ok(body);
        }

        let detail = response.text().await.unwrap_or_default();
        Err(Self::classify_failure(status.as_u16(), detail))
    }

    /// Map a non-2xx proxy status onto the error taxonomy.
    fn classify_failure(status: u16, detail: String) -> ProxyError {
        match status {
            401 => ProxyError::NotAuthenticated,
            502 => ProxyError::upstream(detail),
            400..=499 => ProxyError::rejected(status, detail),
            _ => ProxyError::Server { status },
        }
    }

    /// Fetch a fresh credential for this call. Absent/expired is a hard
    /// failure; no silent retry across re-auth.
    async fn credential(&self) -> Result<Credential, ProxyError> {
        self.credentials
            .bearer_token()
            .await
            .ok_or(ProxyError::NotAuthenticated)
    }

    async fn record(
        &self,
        req: &ProxyRequest,
        attempts: u32,
        start: Instant,
        error_code: Option<&'static str>,
    ) {
        let record = CallRecord::new(req.provider.as_str(), req.endpoint.clone(), req.attribution.caller)
            .account(req.attribution.account_id)
            .attempts(attempts)
            .latency(start.elapsed().as_millis() as i64);
        let record = match error_code {
            Some(code) => record.error(code),
            None => record,
        };
        self.usage.record(record).await;
    }
}

#[async_trait]
impl ProxyApi for ProxyClient {
    async fn call(&self, req: &ProxyRequest) -> Result<String, ProxyError> {
        ProxyClient::call(self, req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_text_reads_anthropic_shape() {
        let body = r#"{"content":[{"type":"text","text":"hello"}]}"#;
        assert_eq!(extract_text(Provider::Anthropic, body).unwrap(), "hello");
    }

    #[test]
    fn extract_text_reads_openai_shape() {
        let body = r#"{"choices":[{"message":{"content":"hello"}}]}"#;
        assert_eq!(extract_text(Provider::OpenAi, body).unwrap(), "hello");
    }

    #[test]
    fn extract_text_rejects_missing_or_blank_content() {
        let err = extract_text(Provider::Anthropic, r#"{"content":[]}"#).unwrap_err();
        assert!(matches!(err, ProxyError::EmptyResponse));

        let err =
            extract_text(Provider::OpenAi, r#"{"choices":[{"message":{"content":"  "}}]}"#)
                .unwrap_err();
        assert!(matches!(err, ProxyError::EmptyResponse));

        let err = extract_text(Provider::OpenAi, "not json").unwrap_err();
        assert!(matches!(err, ProxyError::EmptyResponse));
    }
}
