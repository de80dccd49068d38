use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::errors::ApiError;
use crate::ingest::IngestJob;
use crate::state::AppState;

/// Trigger the flood-data ingestion job synchronously within the request.
pub async fn ingest_flood_data(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Starting flood data ingestion process...");

    let job = IngestJob::new(
        state.config.clone(),
        state.embedder.clone(),
        state.store.clone(),
    );

    match job.run().await {
        Ok(summary) => {
            tracing::info!(
                "Flood data processing completed: {} files, {} documents indexed, {} embedding failures",
                summary.files_processed,
                summary.documents_indexed,
                summary.embedding_failures
            );
            Ok(Json(json!({
                "status": "success",
                "message": "Flood data has been successfully processed and indexed into the vector database.",
                "details": "Your Excel flood data files have been converted to embeddings and stored in Qdrant for analysis."
            })))
        }
        Err(err) => {
            tracing::error!("Error in flood data ingestion: {}", err);
            Err(ApiError::Internal(
                "Failed to process flood data. Check server logs for details.".to_string(),
            ))
        }
    }
}
