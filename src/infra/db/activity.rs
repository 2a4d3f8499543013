use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{ActivityRepo, RepoError};
use crate::domain::entities::{ActivityLogRecord, PostId};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: i64,
    action: String,
    post_id: i64,
    logged_at: OffsetDateTime,
}

impl From<ActivityRow> for ActivityLogRecord {
    fn from(row: ActivityRow) -> Self {
        Self {
            id: row.id,
            action: row.action,
            post_id: row.post_id,
            logged_at: row.logged_at,
        }
    }
}

#[async_trait]
impl ActivityRepo for PostgresRepositories {
    async fn list_activity(&self, post_id: PostId) -> Result<Vec<ActivityLogRecord>, RepoError> {
        let rows = sqlx::query_as::<_, ActivityRow>(
            "SELECT id, action, post_id, logged_at FROM activity_logs \
             WHERE post_id = $1 ORDER BY logged_at, id",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ActivityLogRecord::from).collect())
    }
}
