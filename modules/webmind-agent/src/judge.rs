use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_client::OllamaClient;

/// Single-prompt completion seam. The session only ever needs one raw text
/// reply per prompt; response envelope normalization happens below this
/// trait, so callers never see provider wire shapes.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    fn model_name(&self) -> &str;
}

/// Production model backed by a local Ollama server.
pub struct OllamaModel {
    client: OllamaClient,
    model: String,
}

impl OllamaModel {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: OllamaClient::new(base_url),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CompletionModel for OllamaModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.client
            .chat(&self.model, prompt)
            .await
            .with_context(|| format!("Ollama chat failed for model {}", self.model))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
