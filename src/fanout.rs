//! Bounded concurrent fan-out for per-item enrichment calls.
//!
//! Many small independent calls, a fixed admission window, and one result per
//! input item in original order, always. A single item's failure never aborts
//! the batch: it degrades to a neutral result and is logged. Implemented as a
//! structured stream with `buffer_unordered` and explicit index→result
//! re-association, never fire-and-forget callbacks.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::retrieval::{EvidenceBlock, EvidenceRetriever};

/// Default admission window for batch enrichment: small and fixed to respect
/// upstream rate limits while still overlapping latency.
pub const DEFAULT_FANOUT_WINDOW: usize = 3;

/// Run `worker` over every item with at most `max_concurrent` in flight.
///
/// Guarantees exactly one result per input item, in original input order,
/// even when every underlying call fails (failures become `R::default()`).
/// Empty input returns an empty vec without invoking the worker.
pub async fn fan_out<T, R, E, F, Fut>(items: Vec<T>, max_concurrent: usize, worker: F) -> Vec<R>
where
    R: Default,
    E: std::fmt::Display,
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    if items.is_empty() {
        return Vec::new();
    }

    let count = items.len();
    let window = max_concurrent.max(1);

    let mut indexed: HashMap<usize, R> =
        stream::iter(items.into_iter().enumerate().map(|(index, item)| {
            let fut = worker(index, item);
            async move {
                match fut.await {
                    Ok(result) => (index, result),
                    Err(err) => {
                        tracing::warn!(
                            index,
                            error = %err,
                            "fan-out item failed; substituting neutral result"
                        );
                        (index, R::default())
                    }
                }
            }
        }))
        .buffer_unordered(window)
        .collect()
        .await;

    (0..count)
        .map(|index| indexed.remove(&index).unwrap_or_default())
        .collect()
}

/// Enrich a batch of items with grounding evidence from the retrieval
/// pipeline, one retrieval call per item with a query.
///
/// Items with no query short-circuit to an empty result without issuing a
/// call at all (no enrichment source configured for them).
pub async fn enrich_with_evidence<R>(
    retriever: Arc<R>,
    queries: Vec<Option<String>>,
    per_item_limit: usize,
    max_concurrent: usize,
) -> Vec<Vec<EvidenceBlock>>
where
    R: EvidenceRetriever + ?Sized + 'static,
{
    fan_out(queries, max_concurrent, |_, query| {
        let retriever = Arc::clone(&retriever);
        async move {
            match query {
                None => Ok(Vec::new()),
                Some(query) => retriever.retrieve(&query, per_item_limit).await,
            }
        }
    })
    .await
}
