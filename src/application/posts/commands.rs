use tracing::info;

use crate::application::repos::{CreatePostParams, RepoError, UpdatePostParams};
use crate::domain::entities::{PostId, PostRecord};
use crate::domain::posts::{NEW_POST_ACTION, ensure_non_empty, ensure_valid_id, normalize_tags};

use super::service::PostService;
use super::types::{CreatePostCommand, PostServiceError, UpdatePostCommand};

impl PostService {
    /// Persist a new post together with its `new_post` activity entry, then
    /// index it in the background.
    pub async fn create_post(
        &self,
        command: CreatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        ensure_non_empty(&command.title, "title")?;
        ensure_non_empty(&command.content, "content")?;

        let params = CreatePostParams {
            title: command.title,
            content: command.content,
            tags: normalize_tags(&command.tags),
        };
        let record = self
            .writer
            .create_post_with_activity(params, NEW_POST_ACTION)
            .await?;

        self.schedule_index_upsert(&record);

        info!(
            target = "trellis::posts",
            post_id = record.id,
            tags = record.tags.len(),
            "post created"
        );
        Ok(record)
    }

    /// Apply the present fields of `command` to the stored post. The cached
    /// snapshot is invalidated and the index document replaced afterwards.
    pub async fn update_post(
        &self,
        id: PostId,
        command: UpdatePostCommand,
    ) -> Result<PostRecord, PostServiceError> {
        ensure_valid_id(id)?;
        if let Some(title) = command.title.as_deref() {
            ensure_non_empty(title, "title")?;
        }
        if let Some(content) = command.content.as_deref() {
            ensure_non_empty(content, "content")?;
        }

        let current = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(PostServiceError::NotFound(id))?;

        let params = UpdatePostParams {
            id,
            title: command.title.unwrap_or(current.title),
            content: command.content.unwrap_or(current.content),
            tags: match command.tags {
                Some(tags) => normalize_tags(&tags),
                None => current.tags,
            },
        };

        let record = match self.writer.update_post(params).await {
            Ok(record) => record,
            Err(RepoError::NotFound) => return Err(PostServiceError::NotFound(id)),
            Err(err) => return Err(err.into()),
        };

        self.schedule_cache_invalidation(record.id);
        self.schedule_index_upsert(&record);

        info!(target = "trellis::posts", post_id = record.id, "post updated");
        Ok(record)
    }

    /// Remove a post. Deleting an id that does not exist succeeds.
    pub async fn delete_post(&self, id: PostId) -> Result<(), PostServiceError> {
        ensure_valid_id(id)?;

        let removed = self.writer.delete_post(id).await?;

        self.schedule_cache_invalidation(id);
        self.schedule_index_delete(id);

        info!(target = "trellis::posts", post_id = id, removed, "post deleted");
        Ok(())
    }
}
