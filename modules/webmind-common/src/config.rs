use std::env;

use tracing::info;

/// Context cap (in characters) applied to scraped text before it is sent to
/// a model the table does not know about.
pub const DEFAULT_CONTEXT_CHARS: usize = 15_000;

/// Maximum number of characters of scraped page text handed to the active
/// model in one sufficiency check. Keyed by model name; unknown models fall
/// back to [`DEFAULT_CONTEXT_CHARS`].
pub fn context_cap(model: &str) -> usize {
    match model {
        "gemma3:4b" => 100_000,
        _ => DEFAULT_CONTEXT_CHARS,
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Model
    pub chat_model: String,
    pub ollama_url: String,

    // Agent
    pub max_attempts: usize,
    pub summarize_failures: bool,

    // Web search
    pub max_results: usize,
    pub serper_api_key: Option<String>,

    // Page fetching
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    /// Everything has a default or is optional; numeric values panic with a
    /// clear message when set to something unparseable.
    pub fn from_env() -> Self {
        Self {
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gemma3:4b".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            max_attempts: numeric_env("MAX_SEARCH_ATTEMPTS", 5),
            summarize_failures: env::var("SUMMARIZE_FAILURES")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            max_results: numeric_env("SEARCH_MAX_RESULTS", 5),
            serper_api_key: optional_env("SERPER_API_KEY"),
            browserless_url: optional_env("BROWSERLESS_URL"),
            browserless_token: optional_env("BROWSERLESS_TOKEN"),
        }
    }

    /// Context cap for the configured chat model.
    pub fn context_cap(&self) -> usize {
        context_cap(&self.chat_model)
    }

    /// Log the non-secret parts of the configuration.
    pub fn log_redacted(&self) {
        info!(
            chat_model = self.chat_model.as_str(),
            ollama_url = self.ollama_url.as_str(),
            max_attempts = self.max_attempts,
            max_results = self.max_results,
            summarize_failures = self.summarize_failures,
            serper = self.serper_api_key.is_some(),
            browserless = self.browserless_url.is_some(),
            "Configuration loaded"
        );
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn numeric_env(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(v) => v
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got '{v}'")),
        Err(_) => default,
    }
}
