use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::errors::ApiError;
use crate::models::ActionRequest;
use crate::state::AppState;

/// Specialized analysis endpoint. Unknown action types never reach this
/// handler; they are rejected when the request body is deserialized.
pub async fn action(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ActionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.pipeline.run_action(request).await?;
    Ok(Json(response))
}
