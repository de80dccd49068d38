use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::config::EMBEDDING_MODEL;
use crate::errors::ApiError;

/// E5 models distinguish query-side and passage-side encodings by a literal
/// text prefix. Both prefixes must match what was used at indexing time or
/// retrieval quality degrades silently.
pub const QUERY_PREFIX: &str = "query: ";
pub const PASSAGE_PREFIX: &str = "passage: ";

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Model identifier served by the endpoint.
    fn model_name(&self) -> &str;

    /// Check if the endpoint is reachable.
    async fn health_check(&self) -> bool;

    /// Embed the text exactly as given, returning a unit-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;

    /// Query-side encoding for retrieval.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        self.embed(&format!("{}{}", QUERY_PREFIX, text)).await
    }

    /// Passage-side encoding for indexing.
    async fn embed_passage(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        self.embed(&format!("{}{}", PASSAGE_PREFIX, text)).await
    }
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint serving the
/// fixed E5 model (e.g. text-embeddings-inference).
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    base_url: String,
    model: String,
    client: Client,
}

impl HttpEmbeddingClient {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: EMBEDDING_MODEL.to_string(),
            client,
        }
    }
}

#[async_trait]
impl EmbeddingClient for HttpEmbeddingClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": [text],
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "embedding endpoint error {}: {}",
                status, body
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let mut vector = parse_embedding(&payload)?;
        l2_normalize(&mut vector);
        Ok(vector)
    }
}

/// Extract `data[0].embedding` from an OpenAI-compatible response.
fn parse_embedding(payload: &Value) -> Result<Vec<f32>, ApiError> {
    let values = payload["data"][0]["embedding"]
        .as_array()
        .ok_or_else(|| ApiError::Internal("embedding response missing data".to_string()))?;

    Ok(values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect())
}

/// Scale the vector to unit length. The store is queried with dot-product
/// scoring, which only equals cosine similarity on unit vectors.
fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_embedding_reads_first_data_entry() {
        let payload = json!({
            "data": [{ "embedding": [0.5, 0.25, -1.0] }],
            "model": "intfloat/e5-base-v2"
        });
        let vector = parse_embedding(&payload).unwrap();
        assert_eq!(vector, vec![0.5, 0.25, -1.0]);
    }

    #[test]
    fn parse_embedding_rejects_missing_data() {
        let payload = json!({ "error": "bad input" });
        assert!(parse_embedding(&payload).is_err());
    }

    #[test]
    fn normalize_produces_unit_length() {
        let mut vector = vec![3.0, 4.0];
        l2_normalize(&mut vector);
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((vector[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn normalize_leaves_zero_vector_untouched() {
        let mut vector = vec![0.0, 0.0, 0.0];
        l2_normalize(&mut vector);
        assert_eq!(vector, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn prefixes_match_the_e5_convention() {
        assert_eq!(format!("{}what is RAG", QUERY_PREFIX), "query: what is RAG");
        assert_eq!(
            format!("{}some document", PASSAGE_PREFIX),
            "passage: some document"
        );
    }
}
