pub mod error;
pub mod handlers;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{Router, routing::get};

/// Versioned post routes. Static segments win over `{id}`.
pub fn build_api_router() -> Router<ApiState> {
    Router::new()
        .route(
            "/api/v1/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/api/v1/posts/search", get(handlers::search_posts))
        .route("/api/v1/posts/search-by-tag", get(handlers::search_by_tag))
        .route(
            "/api/v1/posts/{id}",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
}
