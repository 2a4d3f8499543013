//! Consistency orchestration for posts across the store of record, the
//! read cache and the search index.

mod commands;
mod generation;
mod queries;
mod service;
pub mod types;

pub use queries::DEFAULT_LIST_LIMIT;
pub use service::*;
pub use types::{
    CreatePostCommand, PostServiceError, PostView, RelatedPost, SearchResults, UpdatePostCommand,
};
