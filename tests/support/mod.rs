#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use time::OffsetDateTime;
use trellis::application::cache::{CacheError, KeyValueStore, PostCache};
use trellis::application::posts::{CreatePostCommand, PostService};
use trellis::application::propagation::Propagator;
use trellis::application::repos::{
    ActivityRepo, CreatePostParams, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use trellis::application::search::{SearchError, SearchIndex};
use trellis::domain::entities::{ActivityLogRecord, PostId, PostRecord, SearchDocument};

#[derive(Default)]
struct PostsState {
    posts: BTreeMap<PostId, PostRecord>,
    activity: Vec<ActivityLogRecord>,
    next_post_id: PostId,
    next_activity_id: i64,
    clock: i64,
}

/// Store of record kept in memory. Creation is all-or-nothing like the
/// Postgres transaction it stands in for.
#[derive(Default)]
pub struct InMemoryPosts {
    state: Mutex<PostsState>,
    fail_activity: AtomicBool,
    fail_all: AtomicBool,
    reads: AtomicUsize,
}

impl InMemoryPosts {
    pub fn fail_activity_insert(&self, fail: bool) {
        self.fail_activity.store(fail, Ordering::SeqCst);
    }

    pub fn fail_everything(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn count(&self) -> usize {
        self.state.lock().unwrap().posts.len()
    }

    pub fn activity_count(&self) -> usize {
        self.state.lock().unwrap().activity.len()
    }

    /// Change a row without going through the service, bypassing cache
    /// invalidation.
    pub fn overwrite_title(&self, id: PostId, title: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(post) = state.posts.get_mut(&id) {
            post.title = title.to_string();
        }
    }

    pub fn stream(&self) -> BoxStream<'static, Result<PostRecord, RepoError>> {
        let posts: Vec<_> = self
            .state
            .lock()
            .unwrap()
            .posts
            .values()
            .cloned()
            .map(Ok)
            .collect();
        stream::iter(posts).boxed()
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for InMemoryPosts {
    async fn find_by_id(&self, id: PostId) -> Result<Option<PostRecord>, RepoError> {
        self.check()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().unwrap().posts.get(&id).cloned())
    }

    async fn find_by_tag(&self, tag: &str) -> Result<Vec<PostRecord>, RepoError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let mut posts: Vec<PostRecord> = state
            .posts
            .values()
            .filter(|post| post.tags.iter().any(|candidate| candidate == tag))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts)
    }

    async fn list_posts(&self, limit: u32, offset: u64) -> Result<Vec<PostRecord>, RepoError> {
        self.check()?;
        let state = self.state.lock().unwrap();
        let mut posts: Vec<PostRecord> = state.posts.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryPosts {
    async fn create_post_with_activity(
        &self,
        params: CreatePostParams,
        action: &str,
    ) -> Result<PostRecord, RepoError> {
        self.check()?;

        let mut state = self.state.lock().unwrap();
        // The id is consumed even when the transaction rolls back, like a
        // Postgres sequence.
        state.next_post_id += 1;
        if self.fail_activity.load(Ordering::SeqCst) {
            return Err(RepoError::Integrity {
                message: "activity insert rejected".to_string(),
            });
        }
        state.next_activity_id += 1;
        state.clock += 1;
        let now = OffsetDateTime::UNIX_EPOCH + Duration::from_secs(state.clock as u64);
        let record = PostRecord {
            id: state.next_post_id,
            title: params.title,
            content: params.content,
            tags: params.tags,
            created_at: now,
            updated_at: now,
        };
        let entry = ActivityLogRecord {
            id: state.next_activity_id,
            action: action.to_string(),
            post_id: record.id,
            logged_at: now,
        };
        state.posts.insert(record.id, record.clone());
        state.activity.push(entry);
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        self.check()?;
        let mut state = self.state.lock().unwrap();
        state.clock += 1;
        let now = OffsetDateTime::UNIX_EPOCH + Duration::from_secs(state.clock as u64);
        let post = state.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.title = params.title;
        post.content = params.content;
        post.tags = params.tags;
        post.updated_at = now;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: PostId) -> Result<bool, RepoError> {
        self.check()?;
        Ok(self.state.lock().unwrap().posts.remove(&id).is_some())
    }
}

#[async_trait]
impl ActivityRepo for InMemoryPosts {
    async fn list_activity(&self, post_id: PostId) -> Result<Vec<ActivityLogRecord>, RepoError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .activity
            .iter()
            .filter(|entry| entry.post_id == post_id)
            .cloned()
            .collect())
    }
}

/// Key-value store with a switch that makes every call fail.
#[derive(Default)]
pub struct FakeKeyValue {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
    set_delay_ms: AtomicU64,
}

impl FakeKeyValue {
    /// Make every `set` sleep before storing, like a slow network round trip.
    pub fn delay_sets(&self, delay: Duration) {
        self.set_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn check(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::backend("cache unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FakeKeyValue {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        let delay = self.set_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn delete_by_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        self.check()?;
        let prefix = pattern.trim_end_matches('*');
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok((before - entries.len()) as u64)
    }
}

/// Search index with naive word matching and tag-overlap ranking.
#[derive(Default)]
pub struct FakeSearchIndex {
    documents: Mutex<BTreeMap<PostId, SearchDocument>>,
    failing: AtomicBool,
    tag_queries: AtomicUsize,
}

impl FakeSearchIndex {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, id: PostId) -> Option<SearchDocument> {
        self.documents.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn tag_queries(&self) -> usize {
        self.tag_queries.load(Ordering::SeqCst)
    }

    pub fn insert(&self, document: SearchDocument) {
        self.documents.lock().unwrap().insert(document.id, document);
    }

    fn check(&self) -> Result<(), SearchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::transport("index unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for FakeSearchIndex {
    async fn ensure_index(&self) -> Result<(), SearchError> {
        self.check()
    }

    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchError> {
        self.check()?;
        self.insert(document.clone());
        Ok(())
    }

    async fn delete(&self, id: PostId) -> Result<(), SearchError> {
        self.check()?;
        self.documents.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn search_text(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchDocument>, SearchError> {
        self.check()?;
        let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        let documents = self.documents.lock().unwrap();
        let mut scored: Vec<(usize, SearchDocument)> = documents
            .values()
            .map(|document| {
                let haystack =
                    format!("{} {}", document.title, document.content).to_lowercase();
                let score = words.iter().filter(|word| haystack.contains(*word)).count();
                (score, document.clone())
            })
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        Ok(scored
            .into_iter()
            .take(max_results)
            .map(|(_, document)| document)
            .collect())
    }

    async fn search_by_tags(
        &self,
        tags: &[String],
        exclude_id: PostId,
        limit: usize,
    ) -> Result<Vec<SearchDocument>, SearchError> {
        self.check()?;
        self.tag_queries.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.lock().unwrap();
        let mut scored: Vec<(usize, SearchDocument)> = documents
            .values()
            .filter(|document| document.id != exclude_id)
            .map(|document| {
                let overlap = document.tags.iter().filter(|tag| tags.contains(tag)).count();
                (overlap, document.clone())
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.id.cmp(&b.1.id)));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, document)| document)
            .collect())
    }
}

pub struct Harness {
    pub service: PostService,
    pub posts: Arc<InMemoryPosts>,
    pub kv: Arc<FakeKeyValue>,
    pub search: Arc<FakeSearchIndex>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_max_in_flight(64)
    }

    pub fn with_max_in_flight(max_in_flight: u32) -> Self {
        let posts = Arc::new(InMemoryPosts::default());
        let kv = Arc::new(FakeKeyValue::default());
        let search = Arc::new(FakeSearchIndex::default());
        let service = PostService::new(
            posts.clone(),
            posts.clone(),
            posts.clone(),
            PostCache::new(kv.clone(), Duration::from_secs(300)),
            search.clone(),
            Propagator::new(max_in_flight),
        );
        Self {
            service,
            posts,
            kv,
            search,
        }
    }

    /// Wait for every background propagation to finish.
    pub async fn settle(&self) {
        self.service.propagator().wait_idle().await;
    }

    pub async fn create(&self, title: &str, content: &str, tags: &[&str]) -> PostRecord {
        let record = self
            .service
            .create_post(command(title, content, tags))
            .await
            .expect("create post");
        self.settle().await;
        record
    }
}

pub fn command(title: &str, content: &str, tags: &[&str]) -> CreatePostCommand {
    CreatePostCommand {
        title: title.to_string(),
        content: content.to_string(),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}
