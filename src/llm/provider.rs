use async_trait::async_trait;

use crate::errors::ApiError;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// return the provider name (e.g. "gemini")
    fn name(&self) -> &str;

    /// check if the provider is reachable with the configured credentials
    async fn health_check(&self) -> bool;

    /// generate a completion for a fully composed prompt
    async fn generate(&self, prompt: &str) -> Result<String, ApiError>;
}
