//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{ActivityLogRecord, PostId, PostRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Full replacement of the mutable fields of an existing post.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError>;

    /// Every post whose tag set contains `tag`, newest first.
    async fn find_by_tag(&self, tag: &str) -> Result<Vec<PostRecord>, RepoError>;

    /// A page of posts ordered by `created_at` descending.
    async fn list_posts(&self, limit: u32, offset: u64) -> Result<Vec<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    /// Insert the post and its activity entry in one transaction.
    async fn create_post_with_activity(
        &self,
        params: CreatePostParams,
        action: &str,
    ) -> Result<PostRecord, RepoError>;

    /// Returns `RepoError::NotFound` when the post no longer exists.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    /// Returns whether a row was removed. Missing ids are not an error.
    async fn delete_post(&self, id: PostId) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    async fn list_activity(&self, post_id: PostId) -> Result<Vec<ActivityLogRecord>, RepoError>;
}
