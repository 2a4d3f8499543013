use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::application::repos::RepoError;
use crate::application::search::SearchError;
use crate::domain::entities::{PostId, PostRecord, SearchDocument};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum PostServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("post {0} not found")]
    NotFound(PostId),
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl From<DomainError> for PostServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } => Self::Validation(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

/// Partial update. `None` leaves the stored value untouched; `Some` tags
/// replace the whole set.
#[derive(Debug, Clone, Default)]
pub struct UpdatePostCommand {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdatePostCommand {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }
}

/// Search-index projection attached to a point read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedPost {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl From<SearchDocument> for RelatedPost {
    fn from(document: SearchDocument) -> Self {
        Self {
            id: document.id,
            title: document.title,
            content: document.content,
            tags: document.tags,
        }
    }
}

/// A post as returned by a point read.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_posts: Vec<RelatedPost>,
}

impl PostView {
    pub fn new(record: PostRecord, related_posts: Vec<RelatedPost>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            tags: record.tags,
            created_at: record.created_at,
            updated_at: record.updated_at,
            related_posts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub posts: Vec<SearchDocument>,
    pub total: usize,
}
