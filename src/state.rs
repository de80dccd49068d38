use std::sync::Arc;

use crate::config::{RagConfig, GEMINI_MODEL};
use crate::embedding::{EmbeddingClient, HttpEmbeddingClient};
use crate::llm::{GeminiProvider, GenerationProvider};
use crate::rag::RagPipeline;
use crate::vector::{QdrantStore, VectorStore};

/// Shared application state: configuration and the three external-client
/// handles, constructed once at startup and never re-initialized. The
/// clients are stateless HTTP wrappers, safe to share across requests.
pub struct AppState {
    pub config: RagConfig,
    pub embedder: Arc<dyn EmbeddingClient>,
    pub store: Arc<dyn VectorStore>,
    pub llm: Arc<dyn GenerationProvider>,
    pub pipeline: RagPipeline,
}

impl AppState {
    pub fn initialize() -> anyhow::Result<Arc<Self>> {
        let config = RagConfig::from_env()?;

        let embedder: Arc<dyn EmbeddingClient> =
            Arc::new(HttpEmbeddingClient::new(config.embedding_url.clone()));
        tracing::info!("Using {} via {}", embedder.model_name(), config.embedding_url);

        tracing::info!("Connecting to Qdrant at {}", config.qdrant_url);
        let store: Arc<dyn VectorStore> = Arc::new(QdrantStore::new(
            config.qdrant_url.clone(),
            config.qdrant_api_key.clone(),
        ));

        let llm: Arc<dyn GenerationProvider> =
            Arc::new(GeminiProvider::new(config.gemini_api_key.clone()));
        tracing::info!("{} model ({}) initialized", llm.name(), GEMINI_MODEL);

        let pipeline = RagPipeline::new(
            config.clone(),
            embedder.clone(),
            store.clone(),
            llm.clone(),
        );

        Ok(Arc::new(AppState {
            config,
            embedder,
            store,
            llm,
            pipeline,
        }))
    }
}
