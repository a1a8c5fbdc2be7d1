//! Boundary to the external retrieval/semantic-search pipeline.
//!
//! This layer consumes retrieval only through this contract: given a query,
//! get back scored grounding snippets. The pipeline's internals (indexing,
//! embeddings, ranking) live elsewhere.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A retrieved snippet of grounding text, opaque beyond these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceBlock {
    pub title: String,
    pub text: String,
    pub score: f64,
}

impl EvidenceBlock {
    pub fn new(title: impl Into<String>, text: impl Into<String>, score: f64) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            score,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("retrieval backend failed: {0}")]
    Backend(String),
}

/// Source of grounding evidence for a query.
#[async_trait]
pub trait EvidenceRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, limit: usize)
        -> Result<Vec<EvidenceBlock>, RetrievalError>;
}
