//! Per-call usage records via the UsageSink trait.
//!
//! The client logs every logical call (one retry sequence counts as one call)
//! through a UsageSink. This decouples the client from any storage backend:
//! the app wires in its own sink; tests and tooling use Noop/Stderr.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Status of a logical proxy call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Error => "error",
        }
    }
}

/// Record of one logical proxy call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Upstream vendor name: "anthropic" or "openai".
    pub provider: &'static str,
    /// Vendor-relative endpoint path.
    pub endpoint: String,
    /// Which code path made the call.
    pub caller: &'static str,
    /// Account the call ran under, if known.
    pub account_id: Option<Uuid>,
    /// Attempts consumed (1 means no retries).
    pub attempts: u32,
    /// End-to-end latency including backoff, in milliseconds.
    pub latency_ms: i64,
    /// Whether the call was streamed.
    pub streamed: bool,
    /// Final status.
    pub status: CallStatus,
    /// Error code if status is Error.
    pub error_code: Option<String>,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
}

impl CallRecord {
    pub fn new(provider: &'static str, endpoint: impl Into<String>, caller: &'static str) -> Self {
        Self {
            provider,
            endpoint: endpoint.into(),
            caller,
            account_id: None,
            attempts: 1,
            latency_ms: 0,
            streamed: false,
            status: CallStatus::Success,
            error_code: None,
            timestamp: Utc::now(),
        }
    }

    pub fn account(mut self, account_id: Option<Uuid>) -> Self {
        self.account_id = account_id;
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn latency(mut self, ms: i64) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn streamed(mut self) -> Self {
        self.streamed = true;
        self
    }

    pub fn error(mut self, code: impl Into<String>) -> Self {
        self.status = CallStatus::Error;
        self.error_code = Some(code.into());
        self
    }
}

/// Trait for recording proxy call usage.
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Record a call. Fire-and-forget: failures should be logged, never
    /// propagated into the call path.
    async fn record(&self, record: CallRecord);
}

/// Discards all records. For tests and tooling.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUsageSink;

#[async_trait]
impl UsageSink for NoopUsageSink {
    async fn record(&self, _record: CallRecord) {}
}

/// Writes records to stderr as JSON lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrUsageSink;

#[async_trait]
impl UsageSink for StderrUsageSink {
    async fn record(&self, record: CallRecord) {
        eprintln!(
            r#"{{"provider":"{}","endpoint":"{}","caller":"{}","attempts":{},"latency_ms":{},"streamed":{},"status":"{}","error_code":{}}}"#,
            record.provider,
            record.endpoint,
            record.caller,
            record.attempts,
            record.latency_ms,
            record.streamed,
            record.status.as_str(),
            record
                .error_code
                .as_deref()
                .map(|c| format!("\"{c}\""))
                .unwrap_or_else(|| "null".to_string()),
        );
    }
}
