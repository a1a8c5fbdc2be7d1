#![forbid(unsafe_code)]

//! # relay-harness
//!
//! The AI request orchestration layer of a desktop productivity assistant.
//!
//! All intelligence features go through a server-side inference proxy; this
//! crate owns the mechanics of talking to it: authenticated single-shot and
//! streaming calls with an explicit retry policy ([`proxy`]), bounded
//! concurrent fan-out for bulk enrichment ([`fanout`]), chunked map-reduce
//! for inputs too large for one call ([`reduce`] / [`chunking`]), and a
//! TTL-bounded cache for expensive generated artifacts ([`artifact`]).
//!
//! What the model is asked to do is configuration owned by callers; this
//! layer only decides how requests are issued, retried, streamed, batched,
//! chunked, and cached.

pub mod artifact;
pub mod chunking;
pub mod fanout;
pub mod proxy;
pub mod reduce;
pub mod retrieval;

pub use artifact::{ArtifactCache, ArtifactKind, DEFAULT_ARTIFACT_TTL};
pub use chunking::{split_line_chunks, ReducePlan, LONG_INPUT_THRESHOLD, TARGET_CHUNK_CHARS};
pub use fanout::{enrich_with_evidence, fan_out, DEFAULT_FANOUT_WINDOW};
pub use proxy::{
    Attribution, CallClass, Credential, CredentialProvider, Provider, ProxyApi, ProxyClient,
    ProxyConfig, ProxyError, ProxyRequest, RetryPolicy, StreamToken, TokenStream,
};
pub use reduce::{ReduceConfig, ReduceError, Reducer};
pub use retrieval::{EvidenceBlock, EvidenceRetriever, RetrievalError};
