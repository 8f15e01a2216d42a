use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::error::SearchError;
use crate::models::{SearchRequest, SmartSearchRequest, SmartSearchResponse};
use crate::state::AppState;

/// POST /api/smart-search - Hybrid ranking pipeline:
///   1. Keyword extraction + lexical pre-filter (top 20)
///   2. Cache lookup keyed on request, tags and corpus size
///   3. LLM re-rank of the filtered posts
///   4. Fail-closed parsing of the ranked blocks
pub async fn smart_search(
    State(state): State<AppState>,
    Json(req): Json<SmartSearchRequest>,
) -> Result<Json<SmartSearchResponse>, (StatusCode, String)> {
    let request = SearchRequest::from(req);
    let corpus = state.posts.snapshot();

    match state.ranker.search(&request, &corpus).await {
        Ok(response) => Ok(Json(response.into())),
        Err(SearchError::EmptyRequest) => {
            Err((StatusCode::BAD_REQUEST, "Query is required".to_string()))
        }
    }
}
