//! Chunked map-reduce over inputs too large for a single inference call.
//!
//! Short inputs go straight to one proxy call. Oversized inputs are split on
//! line boundaries, each chunk is summarized into a dense intermediate
//! extract (sequentially, to respect per-account rate limits), and one final
//! call structures the concatenated intermediates. The chunked path is purely
//! a mechanism to fit the provider's input-size budget; both paths satisfy
//! the same structuring contract.

use std::sync::Arc;

use thiserror::Error;

use crate::chunking::{ReducePlan, LONG_INPUT_THRESHOLD, TARGET_CHUNK_CHARS};
use crate::proxy::{Attribution, CallClass, Provider, ProxyApi, ProxyError, ProxyRequest};

#[derive(Debug, Error)]
pub enum ReduceError {
    /// The direct or final structuring call failed.
    #[error("proxy call failed: {0}")]
    Proxy(#[from] ProxyError),

    /// A chunk summarization call failed. Aborts the whole reduction:
    /// silently dropping a chunk would corrupt the final artifact.
    #[error("chunk {index} extract failed: {source}")]
    Chunk {
        index: usize,
        #[source]
        source: ProxyError,
    },

    /// A chunk call succeeded but produced no usable extract.
    #[error("chunk {index} produced an empty extract")]
    EmptyChunk { index: usize },
}

/// Configuration for a reducer. The instruction strings are opaque to this
/// layer; prompt content is owned by the feature that builds the reducer.
#[derive(Debug, Clone)]
pub struct ReduceConfig {
    pub provider: Provider,
    pub endpoint: String,
    /// Instruction prefixed to each chunk to produce a dense extract.
    pub chunk_instruction: String,
    /// Full structuring instruction for the direct path and the final call.
    pub final_instruction: String,
    /// Input length above which the chunked path is taken.
    pub threshold_chars: usize,
    /// Target upper bound on chunk size.
    pub max_chunk_chars: usize,
    pub attribution: Attribution,
}

impl ReduceConfig {
    pub fn new(
        provider: Provider,
        endpoint: impl Into<String>,
        chunk_instruction: impl Into<String>,
        final_instruction: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            endpoint: endpoint.into(),
            chunk_instruction: chunk_instruction.into(),
            final_instruction: final_instruction.into(),
            threshold_chars: LONG_INPUT_THRESHOLD,
            max_chunk_chars: TARGET_CHUNK_CHARS,
            attribution: Attribution::default(),
        }
    }

    pub fn limits(mut self, threshold_chars: usize, max_chunk_chars: usize) -> Self {
        self.threshold_chars = threshold_chars;
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    pub fn attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }
}

/// Map-reduce engine over a [`ProxyApi`].
pub struct Reducer<P: ProxyApi + ?Sized> {
    proxy: Arc<P>,
    config: ReduceConfig,
}

impl<P: ProxyApi + ?Sized> Reducer<P> {
    pub fn new(proxy: Arc<P>, config: ReduceConfig) -> Self {
        Self { proxy, config }
    }

    /// Produce the final structured text for `raw_context`, taking the direct
    /// or chunked path depending on input size. `auxiliary` rides along into
    /// the structuring call unchanged on either path.
    pub async fn reduce(&self, raw_context: &str, auxiliary: &str) -> Result<String, ReduceError> {
        match ReducePlan::with_limits(
            raw_context,
            self.config.threshold_chars,
            self.config.max_chunk_chars,
        ) {
            ReducePlan::Direct => {
                tracing::debug!(len = raw_context.len(), "reduce: direct path");
                let text = self
                    .structuring_call(auxiliary, raw_context)
                    .await?;
                Ok(text)
            }
            ReducePlan::Chunked(chunks) => {
                let total = chunks.len();
                tracing::debug!(len = raw_context.len(), chunks = total, "reduce: chunked path");

                // Strictly sequential: chunk i completes before i+1 starts,
                // and the reduce step sees intermediates in original order.
                let mut parts = Vec::with_capacity(total);
                for (index, chunk) in chunks.iter().enumerate() {
                    let extract = self
                        .chunk_call(chunk)
                        .await
                        .map_err(|source| ReduceError::Chunk { index, source })?;
                    if extract.trim().is_empty() {
                        return Err(ReduceError::EmptyChunk { index });
                    }
                    parts.push(format!("## Part {}/{}\n{}", index + 1, total, extract));
                }

                let combined = parts.join("\n\n");
                let text = self.structuring_call(auxiliary, &combined).await?;
                Ok(text)
            }
        }
    }

    async fn chunk_call(&self, chunk: &str) -> Result<String, ProxyError> {
        let req = self
            .request(&self.config.chunk_instruction, chunk)
            .class(CallClass::Standard);
        self.proxy.complete(&req).await
    }

    async fn structuring_call(&self, auxiliary: &str, context: &str) -> Result<String, ProxyError> {
        let input = if auxiliary.is_empty() {
            context.to_string()
        } else {
            format!("{auxiliary}\n\n{context}")
        };
        let req = self
            .request(&self.config.final_instruction, &input)
            .class(CallClass::Heavy);
        self.proxy.complete(&req).await
    }

    fn request(&self, instruction: &str, input: &str) -> ProxyRequest {
        ProxyRequest::new(
            self.config.provider,
            self.config.endpoint.clone(),
            serde_json::json!({
                "system": instruction,
                "messages": [{ "role": "user", "content": input }],
            }),
        )
        .attribution(self.config.attribution.clone())
    }
}
