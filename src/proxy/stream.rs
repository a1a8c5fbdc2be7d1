//! Streaming response parsing.
//!
//! The proxy streams vendor events as a `text/event-stream`-like line
//! protocol: each data line carries a JSON event or the literal `[DONE]`
//! sentinel; anything else is ignored. The consumer pulls tokens in order and
//! may simply drop the stream to cancel it; there is no obligation to drain.

use std::pin::Pin;
use std::task::{Context, Poll};

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;

use super::error::ProxyError;

/// Sentinel data payload that terminates the stream.
pub const STREAM_DONE: &str = "[DONE]";

/// One incremental text fragment from the stream, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamToken {
    pub text: String,
}

/// Classification of a single event data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental text fragment extracted from `delta.text`.
    Token(String),
    /// The `[DONE]` sentinel; the sequence ends here.
    Done,
    /// Anything else: keep-alives, block boundaries, malformed payloads.
    Ignored,
}

#[derive(Deserialize)]
struct DeltaEvent {
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    text: Option<String>,
}

/// Classify one event data payload (the part after the `data: ` prefix).
///
/// Token text comes from the nested `delta.text` field. Payloads that do not
/// parse, or parse without a text delta, are ignored rather than failing the
/// stream; vendors interleave bookkeeping events with content deltas.
pub fn parse_event_data(data: &str) -> StreamEvent {
    let data = data.trim();
    if data == STREAM_DONE {
        return StreamEvent::Done;
    }

    match serde_json::from_str::<DeltaEvent>(data) {
        Ok(event) => match event.delta.and_then(|d| d.text) {
            Some(text) if !text.is_empty() => StreamEvent::Token(text),
            _ => StreamEvent::Ignored,
        },
        Err(err) => {
            tracing::warn!(error = %err, "skipping unparseable stream event");
            StreamEvent::Ignored
        }
    }
}

/// Ordered, cancellable pull of stream tokens.
///
/// Ends at the `[DONE]` sentinel or when the connection closes. Dropping the
/// value abandons the remaining stream.
pub struct TokenStream {
    inner: Pin<Box<dyn Stream<Item = Result<StreamToken, ProxyError>> + Send>>,
}

impl std::fmt::Debug for TokenStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStream").finish_non_exhaustive()
    }
}

impl TokenStream {
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        let inner = response
            .bytes_stream()
            .eventsource()
            .map(|event| match event {
                Ok(event) => Ok(parse_event_data(&event.data)),
                Err(err) => Err(ProxyError::stream(err.to_string())),
            })
            .take_while(|item| {
                futures::future::ready(!matches!(item, Ok(StreamEvent::Done)))
            })
            .filter_map(|item| {
                futures::future::ready(match item {
                    Ok(StreamEvent::Token(text)) => Some(Ok(StreamToken { text })),
                    Ok(StreamEvent::Ignored | StreamEvent::Done) => None,
                    Err(err) => Some(Err(err)),
                })
            });

        Self {
            inner: Box::pin(inner),
        }
    }

    /// Drain the stream, accumulating token text in order.
    pub async fn collect_text(mut self) -> Result<String, ProxyError> {
        let mut text = String::new();
        while let Some(token) = self.inner.next().await {
            text.push_str(&token?.text);
        }
        Ok(text)
    }
}

impl Stream for TokenStream {
    type Item = Result<StreamToken, ProxyError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_delta_yields_token() {
        let event =
            parse_event_data(r#"{"type":"content_block_delta","delta":{"text":"Hi"}}"#);
        assert_eq!(event, StreamEvent::Token("Hi".to_string()));
    }

    #[test]
    fn done_sentinel_terminates() {
        assert_eq!(parse_event_data("[DONE]"), StreamEvent::Done);
        assert_eq!(parse_event_data("  [DONE]  "), StreamEvent::Done);
    }

    #[test]
    fn events_without_text_delta_are_ignored() {
        assert_eq!(
            parse_event_data(r#"{"type":"message_start","message":{}}"#),
            StreamEvent::Ignored
        );
        assert_eq!(
            parse_event_data(r#"{"type":"content_block_delta","delta":{}}"#),
            StreamEvent::Ignored
        );
        assert_eq!(
            parse_event_data(r#"{"type":"content_block_delta","delta":{"text":""}}"#),
            StreamEvent::Ignored
        );
    }

    #[test]
    fn malformed_payloads_do_not_fail_the_stream() {
        assert_eq!(parse_event_data("not json"), StreamEvent::Ignored);
    }
}
