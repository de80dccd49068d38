use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::errors::ApiError;
use crate::models::ChatRequest;
use crate::state::AppState;

/// Main chat endpoint: the full retrieval-augmented answer flow.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.pipeline.answer(request).await?;
    Ok(Json(response))
}
