use std::time::Instant;

use metrics::{counter, histogram};
use tracing::{debug, warn};

use crate::application::search::{RELATED_POSTS_LIMIT, SEARCH_RESULT_LIMIT};
use crate::domain::entities::{ActivityLogRecord, PostId, PostRecord};
use crate::domain::posts::{ensure_non_empty, ensure_valid_id};

use super::service::PostService;
use super::types::{PostServiceError, PostView, RelatedPost, SearchResults};

pub const DEFAULT_LIST_LIMIT: u32 = 10;

const METRIC_STORE_READ_MS: &str = "trellis_store_read_ms";
const METRIC_RELATED_FAILED: &str = "trellis_related_lookup_failed_total";

impl PostService {
    /// Cache-aside point read with related posts attached.
    pub async fn get_post(&self, id: PostId) -> Result<PostView, PostServiceError> {
        ensure_valid_id(id)?;

        let record = match self.cache.get_post(id).await {
            Ok(Some(record)) => record,
            // Errors are logged by the cache and treated as a miss.
            Ok(None) | Err(_) => {
                let observed = self.generations.current(id);
                let started = Instant::now();
                let found = self.reader.find_by_id(id).await;
                histogram!(METRIC_STORE_READ_MS, "op" => "find_by_id")
                    .record(started.elapsed().as_secs_f64() * 1000.0);
                let record = found?.ok_or(PostServiceError::NotFound(id))?;
                self.schedule_cache_fill(&record, observed);
                record
            }
        };

        let related = if record.has_tags() {
            match self
                .related_posts(&record.tags, record.id, RELATED_POSTS_LIMIT)
                .await
            {
                Ok(related) => related,
                Err(err) => {
                    counter!(METRIC_RELATED_FAILED).increment(1);
                    warn!(
                        target = "trellis::posts",
                        post_id = record.id,
                        error = %err,
                        "related posts lookup failed"
                    );
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(PostView::new(record, related))
    }

    /// Relevance-ranked posts sharing any of `tags`, excluding `exclude_id`.
    pub async fn related_posts(
        &self,
        tags: &[String],
        exclude_id: PostId,
        limit: usize,
    ) -> Result<Vec<RelatedPost>, PostServiceError> {
        if tags.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let documents = self.search.search_by_tags(tags, exclude_id, limit).await?;
        Ok(documents
            .into_iter()
            .filter(|document| document.id != exclude_id)
            .take(limit)
            .map(RelatedPost::from)
            .collect())
    }

    /// Full-text search over title and content. Only the index is consulted.
    pub async fn search_posts(&self, query: &str) -> Result<SearchResults, PostServiceError> {
        ensure_non_empty(query, "q")?;
        let posts = self
            .search
            .search_text(query.trim(), SEARCH_RESULT_LIMIT)
            .await?;
        debug!(
            target = "trellis::posts",
            hits = posts.len(),
            "full-text search completed"
        );
        let total = posts.len();
        Ok(SearchResults { posts, total })
    }

    /// Exact tag filter against the store of record.
    pub async fn find_by_tag(&self, tag: &str) -> Result<Vec<PostRecord>, PostServiceError> {
        ensure_non_empty(tag, "tag")?;
        Ok(self.reader.find_by_tag(tag.trim()).await?)
    }

    /// Newest posts first. A zero limit falls back to the default page size.
    pub async fn list_posts(
        &self,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<PostRecord>, PostServiceError> {
        let limit = if limit == 0 { DEFAULT_LIST_LIMIT } else { limit };
        Ok(self.reader.list_posts(limit, offset).await?)
    }

    pub async fn list_activity(
        &self,
        post_id: PostId,
    ) -> Result<Vec<ActivityLogRecord>, PostServiceError> {
        ensure_valid_id(post_id)?;
        Ok(self.activity.list_activity(post_id).await?)
    }
}
