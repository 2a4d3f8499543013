//! Read-through cache for post snapshots.
//!
//! The cache is never authoritative. Every failure here is reported to the
//! caller as a `CacheError` so the read path can fall back to the store of
//! record and the write path can log and move on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::warn;

use crate::domain::entities::{PostId, PostRecord};

pub const POST_CACHE_KEY_PREFIX: &str = "post:";
pub const POST_CACHE_PATTERN: &str = "post:*";
pub const DEFAULT_POST_CACHE_TTL: Duration = Duration::from_secs(300);

const METRIC_CACHE_HIT: &str = "trellis_cache_hit_total";
const METRIC_CACHE_MISS: &str = "trellis_cache_miss_total";
const METRIC_CACHE_ERROR: &str = "trellis_cache_error_total";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache entry could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("cache entry under `{key}` holds post {found}")]
    Mismatch { key: String, found: PostId },
}

impl CacheError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

/// Byte-oriented key-value store with per-entry expiry.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Delete every key matching a glob-style pattern (`*` wildcard) and
    /// return how many were removed.
    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError>;
}

pub fn post_cache_key(id: PostId) -> String {
    format!("{POST_CACHE_KEY_PREFIX}{id}")
}

/// Typed view over a [`KeyValueStore`] holding JSON post snapshots.
#[derive(Clone)]
pub struct PostCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl PostCache {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_post(&self, id: PostId) -> Result<Option<PostRecord>, CacheError> {
        let key = post_cache_key(id);
        let result = self.load(&key, id).await;
        match &result {
            Ok(Some(_)) => counter!(METRIC_CACHE_HIT).increment(1),
            Ok(None) => counter!(METRIC_CACHE_MISS).increment(1),
            Err(err) => {
                counter!(METRIC_CACHE_ERROR, "op" => "get").increment(1);
                warn!(
                    target = "trellis::cache",
                    key = %key,
                    error = %err,
                    "cache lookup failed"
                );
            }
        }
        result
    }

    async fn load(&self, key: &str, id: PostId) -> Result<Option<PostRecord>, CacheError> {
        let Some(bytes) = self.store.get(key).await? else {
            return Ok(None);
        };
        let record: PostRecord = serde_json::from_slice(&bytes)?;
        if record.id != id {
            return Err(CacheError::Mismatch {
                key: key.to_string(),
                found: record.id,
            });
        }
        Ok(Some(record))
    }

    pub async fn set_post(&self, record: &PostRecord) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(record)?;
        self.store
            .set(&post_cache_key(record.id), bytes, self.ttl)
            .await
    }

    pub async fn invalidate_post(&self, id: PostId) -> Result<(), CacheError> {
        self.store.delete(&post_cache_key(id)).await
    }

    pub async fn invalidate_all(&self) -> Result<u64, CacheError> {
        self.store.delete_by_pattern(POST_CACHE_PATTERN).await
    }
}
