//! Application services: the orchestration of the store of record, the read
//! cache and the search index.

pub mod cache;
pub mod error;
pub mod posts;
pub mod propagation;
pub mod reindex;
pub mod repos;
pub mod search;
