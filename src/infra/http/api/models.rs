use serde::{Deserialize, Serialize};

use crate::application::posts::{
    CreatePostCommand, PostView, SearchResults, UpdatePostCommand,
};
use crate::domain::entities::PostRecord;

#[derive(Debug, Deserialize, Serialize)]
pub struct PostCreateRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<PostCreateRequest> for CreatePostCommand {
    fn from(request: PostCreateRequest) -> Self {
        Self {
            title: request.title,
            content: request.content,
            tags: request.tags,
        }
    }
}

/// Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PostUpdateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl From<PostUpdateRequest> for UpdatePostCommand {
    fn from(request: PostUpdateRequest) -> Self {
        Self {
            title: request.title,
            content: request.content,
            tags: request.tags,
        }
    }
}

/// Query parameters are kept raw so malformed values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PostListQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TagQuery {
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageDataResponse<T> {
    pub message: &'static str,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub data: PostView,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub data: Vec<PostRecord>,
    pub total: usize,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Serialize)]
pub struct TagSearchResponse {
    pub data: Vec<PostRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub data: SearchResults,
}
