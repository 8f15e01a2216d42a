use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::cache::CacheStats;
use crate::models::CandidatePost;
use crate::state::AppState;

/// GET /api/posts - Current corpus snapshot
pub async fn list_posts(State(state): State<AppState>) -> Json<Vec<CandidatePost>> {
    Json(state.posts.snapshot().as_ref().clone())
}

#[derive(Serialize)]
pub struct ReloadResponse {
    pub post_count: usize,
}

/// POST /api/posts/reload - Re-read the posts snapshot from disk
pub async fn reload_posts(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, (StatusCode, String)> {
    let store = state.posts.clone();
    let post_count = tokio::task::spawn_blocking(move || store.reload())
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Reload task failed: {e}"),
            )
        })?
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}")))?;

    Ok(Json(ReloadResponse { post_count }))
}

/// GET /api/cache/stats - Ranking cache counters
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.ranker.cache().stats())
}
