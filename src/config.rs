use std::env;
use std::path::PathBuf;

use anyhow::Context;

/// Embedding model served by the inference endpoint. E5 models expect the
/// `query:`/`passage:` prefixes handled in [`crate::embedding`].
pub const EMBEDDING_MODEL: &str = "intfloat/e5-base-v2";
/// Generation model on the Google Generative Language API.
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Environment-sourced service configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub default_retrieval_count: u64,
    pub max_retrieval_count: u64,
    pub collection_name: String,
    pub qdrant_url: String,
    pub qdrant_api_key: String,
    pub gemini_api_key: String,
    pub embedding_url: String,
    pub flood_data_dir: PathBuf,
    pub ingest_backup_path: Option<PathBuf>,
}

impl RagConfig {
    /// Read configuration from the environment. Missing required variables
    /// (Qdrant endpoint/key, Gemini key) are a fatal startup error.
    pub fn from_env() -> anyhow::Result<Self> {
        let default_retrieval_count = parse_env_u64("DEFAULT_RETRIEVAL_COUNT", 20)?;
        let max_retrieval_count = parse_env_u64("MAX_RETRIEVAL_COUNT", 50)?;
        if default_retrieval_count == 0 || max_retrieval_count == 0 {
            anyhow::bail!("retrieval counts must be at least 1");
        }
        let collection_name =
            env::var("COLLECTION_NAME").unwrap_or_else(|_| "GovTech".to_string());

        let qdrant_url = env::var("QDRANT_URL").ok().filter(|v| !v.is_empty());
        let qdrant_api_key = env::var("QDRANT_API_KEY").ok().filter(|v| !v.is_empty());
        let (qdrant_url, qdrant_api_key) = match (qdrant_url, qdrant_api_key) {
            (Some(url), Some(key)) => (url, key),
            _ => anyhow::bail!("QDRANT_URL and QDRANT_API_KEY must be set"),
        };

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .context("GEMINI_API_KEY must be set")?;

        let embedding_url =
            env::var("EMBEDDING_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let flood_data_dir = env::var("FLOOD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("floods data"));
        let ingest_backup_path = env::var("INGEST_BACKUP_PATH").ok().map(PathBuf::from);

        Ok(RagConfig {
            default_retrieval_count,
            max_retrieval_count,
            collection_name,
            qdrant_url,
            qdrant_api_key,
            gemini_api_key,
            embedding_url,
            flood_data_dir,
            ingest_backup_path,
        })
    }

    /// Resolve the effective retrieval count for a request: the caller's
    /// value if present, else the configured default, clamped to
    /// `[1, max_retrieval_count]`.
    pub fn resolve_retrieval_count(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_retrieval_count)
            .clamp(1, self.max_retrieval_count)
    }
}

fn parse_env_u64(name: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{} must be a positive integer, got '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}
