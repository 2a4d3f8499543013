//! Corrective rebuild of the search index from the store of record.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{Stream, TryStreamExt};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::cache::{CacheError, PostCache};
use crate::application::repos::RepoError;
use crate::application::search::{SearchError, SearchIndex};
use crate::domain::entities::{PostRecord, SearchDocument};

pub const DEFAULT_REINDEX_CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum ReindexError {
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub indexed: u64,
    pub failed: u64,
    pub cache_entries_flushed: Option<u64>,
}

pub struct Reindexer {
    index: Arc<dyn SearchIndex>,
    cache: Option<PostCache>,
    concurrency: usize,
}

impl Reindexer {
    pub fn new(index: Arc<dyn SearchIndex>, concurrency: usize) -> Self {
        Self {
            index,
            cache: None,
            concurrency: concurrency.max(1),
        }
    }

    /// Also drop every cached post snapshot once indexing finished.
    pub fn with_cache_flush(mut self, cache: PostCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Upsert every streamed post. Individual index failures are counted and
    /// skipped; a store error aborts the run.
    pub async fn run<S>(&self, posts: S) -> Result<ReindexReport, ReindexError>
    where
        S: Stream<Item = Result<PostRecord, RepoError>>,
    {
        self.index.ensure_index().await?;

        let indexed = AtomicU64::new(0);
        let failed = AtomicU64::new(0);
        {
            let indexed = &indexed;
            let failed = &failed;
            let index = &self.index;
            posts
                .try_for_each_concurrent(self.concurrency, move |record| async move {
                    let document = SearchDocument::from(&record);
                    match index.upsert(&document).await {
                        Ok(()) => {
                            indexed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(err) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            warn!(
                                target = "trellis::reindex",
                                post_id = record.id,
                                error = %err,
                                "failed to index post"
                            );
                        }
                    }
                    Ok::<(), RepoError>(())
                })
                .await?;
        }

        let cache_entries_flushed = match &self.cache {
            Some(cache) => Some(cache.invalidate_all().await?),
            None => None,
        };

        let report = ReindexReport {
            indexed: indexed.into_inner(),
            failed: failed.into_inner(),
            cache_entries_flushed,
        };
        info!(
            target = "trellis::reindex",
            indexed = report.indexed,
            failed = report.failed,
            flushed = ?report.cache_entries_flushed,
            "reindex finished"
        );
        Ok(report)
    }
}
