use std::sync::Arc;

use tracing::debug;

use crate::application::cache::{CacheError, PostCache};
use crate::application::propagation::{PropagationTarget, Propagator};
use crate::application::repos::{ActivityRepo, PostsRepo, PostsWriteRepo};
use crate::application::search::SearchIndex;
use crate::domain::entities::{PostId, PostRecord, SearchDocument};

use super::generation::WriteGenerations;

#[derive(Clone)]
pub struct PostService {
    pub(crate) reader: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) activity: Arc<dyn ActivityRepo>,
    pub(crate) cache: PostCache,
    pub(crate) search: Arc<dyn SearchIndex>,
    pub(crate) propagator: Propagator,
    pub(crate) generations: WriteGenerations,
}

impl PostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        activity: Arc<dyn ActivityRepo>,
        cache: PostCache,
        search: Arc<dyn SearchIndex>,
        propagator: Propagator,
    ) -> Self {
        Self {
            reader,
            writer,
            activity,
            cache,
            search,
            propagator,
            generations: WriteGenerations::default(),
        }
    }

    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Write `record` back to the cache unless an update or delete of the
    /// same id landed after `observed` was taken. A write that races the
    /// check is undone once the set returns.
    pub(crate) fn schedule_cache_fill(&self, record: &PostRecord, observed: u64) {
        let cache = self.cache.clone();
        let generations = self.generations.clone();
        let record = record.clone();
        let id = record.id;
        self.propagator
            .dispatch(PropagationTarget::Cache, "set", id, async move {
                if !generations.unchanged_since(id, observed) {
                    debug!(
                        target = "trellis::cache",
                        post_id = id,
                        "stale cache fill skipped"
                    );
                    return Ok::<(), CacheError>(());
                }
                cache.set_post(&record).await?;
                if !generations.unchanged_since(id, observed) {
                    debug!(
                        target = "trellis::cache",
                        post_id = id,
                        "stale cache fill reverted"
                    );
                    cache.invalidate_post(id).await?;
                }
                Ok::<(), CacheError>(())
            });
    }

    /// Bumps the id's write generation before dispatching, so fills that
    /// read the store earlier cannot outlive the invalidation.
    pub(crate) fn schedule_cache_invalidation(&self, id: PostId) {
        self.generations.bump(id);
        let cache = self.cache.clone();
        self.propagator
            .dispatch(PropagationTarget::Cache, "invalidate", id, async move {
                cache.invalidate_post(id).await
            });
    }

    pub(crate) fn schedule_index_upsert(&self, record: &PostRecord) {
        let search = self.search.clone();
        let document = SearchDocument::from(record);
        self.propagator
            .dispatch(PropagationTarget::Index, "upsert", record.id, async move {
                search.upsert(&document).await
            });
    }

    pub(crate) fn schedule_index_delete(&self, id: PostId) {
        let search = self.search.clone();
        self.propagator
            .dispatch(PropagationTarget::Index, "delete", id, async move {
                search.delete(id).await
            });
    }
}
