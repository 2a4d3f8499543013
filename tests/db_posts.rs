use futures::TryStreamExt;
use sqlx::PgPool;
use trellis::application::repos::{
    ActivityRepo, CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use trellis::infra::db::PostgresRepositories;

fn params(title: &str, tags: &[&str]) -> CreatePostParams {
    CreatePostParams {
        title: title.to_string(),
        content: format!("{title} body"),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn create_writes_post_and_activity(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let record = repos
        .create_post_with_activity(params("Hello", &["go", "rust"]), "new_post")
        .await
        .expect("create");

    assert!(record.id > 0);
    assert_eq!(record.tags, vec!["go".to_string(), "rust".to_string()]);
    assert_eq!(record.created_at, record.updated_at);

    let activity = repos.list_activity(record.id).await.expect("activity");
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].action, "new_post");

    let found = repos.find_by_id(record.id).await.expect("find");
    assert_eq!(found, Some(record));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn rejected_activity_entry_rolls_back_the_post(pool: PgPool) {
    sqlx::query(
        "ALTER TABLE activity_logs ADD CONSTRAINT reject_rollback_action \
         CHECK (action <> 'rollback_me')",
    )
    .execute(&pool)
    .await
    .expect("add check constraint");

    let repos = PostgresRepositories::new(pool.clone());
    let err = repos
        .create_post_with_activity(params("Orphan", &["go"]), "rollback_me")
        .await
        .expect_err("activity insert must fail");
    assert!(matches!(err, RepoError::Integrity { .. }), "got {err:?}");

    let posts: i64 = sqlx::query_scalar("SELECT count(*) FROM posts")
        .fetch_one(&pool)
        .await
        .expect("count posts");
    let activity: i64 = sqlx::query_scalar("SELECT count(*) FROM activity_logs")
        .fetch_one(&pool)
        .await
        .expect("count activity");
    assert_eq!((posts, activity), (0, 0));

    repos
        .create_post_with_activity(params("Kept", &[]), "new_post")
        .await
        .expect("normal create still works");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn tag_filter_matches_array_membership(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    repos
        .create_post_with_activity(params("Go", &["go"]), "new_post")
        .await
        .expect("create");
    repos
        .create_post_with_activity(params("Both", &["go", "rust"]), "new_post")
        .await
        .expect("create");
    repos
        .create_post_with_activity(params("Rust", &["rust"]), "new_post")
        .await
        .expect("create");

    let posts = repos.find_by_tag("go").await.expect("by tag");
    let titles: Vec<_> = posts.iter().map(|post| post.title.as_str()).collect();
    assert_eq!(titles, vec!["Both", "Go"]);

    assert!(repos.find_by_tag("missing").await.expect("none").is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn update_replaces_fields_and_bumps_timestamp(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let record = repos
        .create_post_with_activity(params("Before", &["a"]), "new_post")
        .await
        .expect("create");

    let updated = repos
        .update_post(UpdatePostParams {
            id: record.id,
            title: "After".to_string(),
            content: "New".to_string(),
            tags: Vec::new(),
        })
        .await
        .expect("update");
    assert_eq!(updated.title, "After");
    assert!(updated.tags.is_empty());
    assert!(updated.updated_at >= record.updated_at);
    assert_eq!(updated.created_at, record.created_at);

    let err = repos
        .update_post(UpdatePostParams {
            id: record.id + 1000,
            title: "x".to_string(),
            content: "y".to_string(),
            tags: Vec::new(),
        })
        .await
        .expect_err("missing");
    assert!(matches!(err, RepoError::NotFound));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn delete_is_idempotent(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    let record = repos
        .create_post_with_activity(params("Doomed", &[]), "new_post")
        .await
        .expect("create");

    assert!(repos.delete_post(record.id).await.expect("first delete"));
    assert!(!repos.delete_post(record.id).await.expect("second delete"));
    assert!(repos.find_by_id(record.id).await.expect("find").is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_and_stream_cover_every_post(pool: PgPool) {
    let repos = PostgresRepositories::new(pool);
    for index in 0..5 {
        repos
            .create_post_with_activity(params(&format!("Post {index}"), &[]), "new_post")
            .await
            .expect("create");
    }

    let page = repos.list_posts(2, 1).await.expect("list");
    let titles: Vec<_> = page.iter().map(|post| post.title.as_str()).collect();
    assert_eq!(titles, vec!["Post 3", "Post 2"]);

    let all: Vec<_> = repos.stream_all_posts().try_collect().await.expect("stream");
    assert_eq!(all.len(), 5);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn tag_index_exists(pool: PgPool) {
    let indexdef: String = sqlx::query_scalar(
        "SELECT indexdef FROM pg_indexes WHERE tablename = 'posts' AND indexname = 'posts_tags_gin_idx'",
    )
    .fetch_one(&pool)
    .await
    .expect("gin index");

    assert!(indexdef.to_lowercase().contains("using gin"));
}
