pub mod error;

pub use error::{OllamaError, Result};

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

const DEFAULT_TEMPERATURE: f32 = 0.7;

pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    temperature: f32,
}

/// The server replies with one of two envelope shapes depending on which
/// endpoint family produced it: `/api/chat` nests the text under
/// `message.content`, `/api/generate` puts it directly in `response`.
/// Callers only ever see the normalized string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CompletionEnvelope {
    Chat { message: ChatMessage },
    Generate { response: String },
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

fn parse_completion(body: &str) -> Result<String> {
    match serde_json::from_str::<CompletionEnvelope>(body) {
        Ok(CompletionEnvelope::Chat { message }) => Ok(message.content),
        Ok(CompletionEnvelope::Generate { response }) => Ok(response),
        Err(_) => {
            let preview: String = body.chars().take(200).collect();
            Err(OllamaError::Response(preview))
        }
    }
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Send a single-turn chat request and return the model's text reply.
    pub async fn chat(&self, model: &str, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(OllamaError::EmptyPrompt);
        }

        let endpoint = format!("{}/api/chat", self.base_url);
        let body = serde_json::json!({
            "model": model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "options": { "temperature": self.temperature },
        });

        debug!(model, prompt_len = prompt.len(), "Ollama chat request");

        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(OllamaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text().await?;
        parse_completion(&text)
    }
}
