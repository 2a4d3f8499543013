use std::sync::Arc;

use crate::application::posts::PostService;
use crate::infra::http::DatabaseProbe;

#[derive(Clone)]
pub struct ApiState {
    pub posts: Arc<PostService>,
    pub db: Arc<dyn DatabaseProbe>,
}

impl ApiState {
    pub fn new(posts: Arc<PostService>, db: Arc<dyn DatabaseProbe>) -> Self {
        Self { posts, db }
    }
}
