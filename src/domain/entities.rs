//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identity assigned by the store of record.
pub type PostId = i64;

/// Authoritative post as persisted in the store of record.
///
/// Cache entries are JSON snapshots of this struct, so the serialized shape is
/// also the cache wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl PostRecord {
    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }
}

/// Append-only audit row written alongside post creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityLogRecord {
    pub id: i64,
    pub action: String,
    pub post_id: PostId,
    #[serde(with = "time::serde::rfc3339")]
    pub logged_at: OffsetDateTime,
}

/// Projection of a post stored in the search index. Carries no timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: PostId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<&PostRecord> for SearchDocument {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            content: post.content.clone(),
            tags: post.tags.clone(),
        }
    }
}
