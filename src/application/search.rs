//! Search index contract used by the post service.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{PostId, SearchDocument};

/// Upper bound on full-text search results.
pub const SEARCH_RESULT_LIMIT: usize = 50;
/// Number of related posts attached to a point read.
pub const RELATED_POSTS_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search transport error: {0}")]
    Transport(String),
    #[error("search index returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("search response could not be decoded: {0}")]
    Decode(String),
}

impl SearchError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Create the index and its mapping when it does not exist yet.
    async fn ensure_index(&self) -> Result<(), SearchError>;

    /// Insert or fully replace the document stored under `document.id`.
    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchError>;

    /// Remove a document. A document that is already gone is not an error.
    async fn delete(&self, id: PostId) -> Result<(), SearchError>;

    /// Fuzzy match over title and content, best score first.
    async fn search_text(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchDocument>, SearchError>;

    /// Documents sharing at least one of `tags`, never including `exclude_id`.
    async fn search_by_tags(
        &self,
        tags: &[String],
        exclude_id: PostId,
        limit: usize,
    ) -> Result<Vec<SearchDocument>, SearchError>;
}
