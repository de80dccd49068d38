//! Vector store abstraction and the Qdrant backend.

mod qdrant;

pub use qdrant::QdrantStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ApiError;

/// One ranked hit from a similarity search, payload only (vectors are never
/// requested back).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

/// One record for upsert: a fresh id, its embedding, and the stored payload.
#[derive(Debug, Clone, Serialize)]
pub struct PointRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Check if the store is reachable with the configured credentials.
    async fn health_check(&self) -> bool;

    /// Top-`limit` nearest neighbours of `vector` in `collection`, ranked by
    /// similarity, with payloads and without vectors.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, ApiError>;

    /// Write a batch of points to `collection`.
    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<(), ApiError>;
}
