//! Elasticsearch adapter for the post search index.

mod elasticsearch;
mod query;

pub use elasticsearch::ElasticsearchIndex;
