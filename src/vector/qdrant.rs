use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{PointRecord, ScoredPoint, VectorStore};
use crate::errors::ApiError;

const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Qdrant REST client. Authenticates every call with the `api-key` header.
#[derive(Clone)]
pub struct QdrantStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl QdrantStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<RawPoint>,
}

#[derive(Deserialize)]
struct RawPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: Map<String, Value>,
}

impl RawPoint {
    fn into_scored_point(self) -> ScoredPoint {
        // Point ids may be UUIDs or integers; normalize to a string.
        let id = match self.id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        ScoredPoint {
            id,
            score: self.score,
            payload: self.payload,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn health_check(&self) -> bool {
        let url = format!("{}/collections", self.base_url);
        match self
            .client
            .get(&url)
            .header("api-key", &self.api_key)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredPoint>, ApiError> {
        let url = format!("{}/collections/{}/points/search", self.base_url, collection);
        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });

        let res = self
            .client
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Qdrant search error {}: {}",
                status, text
            )));
        }

        let response: SearchResponse = res.json().await.map_err(ApiError::internal)?;
        Ok(response
            .result
            .into_iter()
            .map(RawPoint::into_scored_point)
            .collect())
    }

    async fn upsert(&self, collection: &str, points: Vec<PointRecord>) -> Result<(), ApiError> {
        let url = format!("{}/collections/{}/points?wait=true", self.base_url, collection);
        let body = json!({ "points": points });

        let res = self
            .client
            .put(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "Qdrant upsert error {}: {}",
                status, text
            )));
        }

        Ok(())
    }
}
