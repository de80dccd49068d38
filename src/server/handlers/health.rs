use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "message": "RAG Pipeline API is running",
        "status": "healthy"
    }))
}

/// Live reachability report for the three external collaborators.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (embedding_ok, qdrant_ok, gemini_ok) = tokio::join!(
        state.embedder.health_check(),
        state.store.health_check(),
        state.llm.health_check(),
    );

    Json(json!({
        "status": "healthy",
        "embedding_model": if embedding_ok { "E5-base-v2" } else { "Not loaded" },
        "qdrant_client": if qdrant_ok { "Connected" } else { "Not connected" },
        "gemini_model": if gemini_ok { "Ready" } else { "Not ready" },
    }))
}
