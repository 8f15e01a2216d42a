pub mod posts;
pub mod search;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/smart-search", post(search::smart_search))
        .route("/api/posts", get(posts::list_posts))
        .route("/api/posts/reload", post(posts::reload_posts))
        .route("/api/cache/stats", get(posts::cache_stats))
        .with_state(state)
}
