//! Time-bounded cache for expensive generated artifacts.
//!
//! Per key, the lifecycle is Empty → Generating → Valid → (TTL expiry) →
//! Stale → Generating → … A concurrent caller for a key mid-generation awaits
//! the in-flight generation instead of starting a second one; distinct keys
//! are fully independent. An artifact that generated empty is not protected
//! by the TTL: the next request may regenerate it immediately, since an empty
//! artifact usually means an upstream hiccup rather than a legitimately empty
//! result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;

/// Fixed reference TTL: generated artifacts stay valid for 3 hours.
pub const DEFAULT_ARTIFACT_TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// Logical key for a cached artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The morning briefing document.
    Briefing,
    /// The inbox digest summary.
    DigestSummary,
    /// Suggested follow-ups across threads.
    FollowUps,
    /// Escape hatch for feature-defined artifacts.
    Custom(String),
}

impl ArtifactKind {
    pub fn as_str(&self) -> &str {
        match self {
            ArtifactKind::Briefing => "briefing",
            ArtifactKind::DigestSummary => "digest_summary",
            ArtifactKind::FollowUps => "follow_ups",
            ArtifactKind::Custom(name) => name,
        }
    }
}

/// Whether an artifact of the given age is still within its TTL.
pub fn is_fresh(age: Duration, ttl: Duration) -> bool {
    age < ttl
}

#[derive(Debug, Clone)]
struct Entry {
    content: String,
    generated_at: Instant,
}

type Slot = Arc<AsyncMutex<Option<Entry>>>;

/// Memoizes generation pipelines keyed by artifact kind, with a fixed TTL
/// and explicit invalidation on account/context change.
pub struct ArtifactCache {
    ttl: Duration,
    slots: std::sync::Mutex<HashMap<ArtifactKind, Slot>>,
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_ARTIFACT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached artifact for `key`, or run `generate` and cache its
    /// output. `force_refresh` regenerates regardless of TTL.
    ///
    /// Reads and writes for one key are serialized: a caller arriving while
    /// the key is generating awaits that generation and then observes its
    /// result. A failed generation caches nothing.
    pub async fn get_or_generate<F, Fut, E>(
        &self,
        key: ArtifactKind,
        force_refresh: bool,
        generate: F,
    ) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        let slot = self.slot(&key);
        let mut guard = slot.lock().await;

        if !force_refresh {
            if let Some(entry) = guard.as_ref() {
                if !entry.content.is_empty() && is_fresh(entry.generated_at.elapsed(), self.ttl) {
                    tracing::debug!(key = key.as_str(), "artifact cache hit");
                    return Ok(entry.content.clone());
                }
            }
        }

        tracing::debug!(key = key.as_str(), force_refresh, "generating artifact");
        let content = generate().await?;
        if content.is_empty() {
            tracing::warn!(key = key.as_str(), "generated artifact is empty; left regenerable");
        }
        *guard = Some(Entry {
            content: content.clone(),
            generated_at: Instant::now(),
        });
        Ok(content)
    }

    /// Whether `key` currently holds a valid (non-empty, unexpired) artifact.
    /// A key mid-generation is not yet valid.
    pub fn is_cached(&self, key: &ArtifactKind) -> bool {
        let slot = {
            let slots = self.slots.lock().expect("artifact cache lock poisoned");
            match slots.get(key) {
                Some(slot) => Arc::clone(slot),
                None => return false,
            }
        };
        let valid = match slot.try_lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|entry| {
                    !entry.content.is_empty() && is_fresh(entry.generated_at.elapsed(), self.ttl)
                })
                .unwrap_or(false),
            Err(_) => false,
        };
        valid
    }

    /// Drop one key's content immediately, independent of TTL.
    pub fn invalidate(&self, key: &ArtifactKind) {
        let mut slots = self.slots.lock().expect("artifact cache lock poisoned");
        slots.remove(key);
    }

    /// Drop every key and its content immediately (account switch). An
    /// in-flight generation may still complete, but it commits into a
    /// detached slot and is never observed again.
    pub fn invalidate_all(&self) {
        let mut slots = self.slots.lock().expect("artifact cache lock poisoned");
        slots.clear();
    }

    fn slot(&self, key: &ArtifactKind) -> Slot {
        let mut slots = self.slots.lock().expect("artifact cache lock poisoned");
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}
