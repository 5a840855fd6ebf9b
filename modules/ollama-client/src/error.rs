use thiserror::Error;

pub type Result<T> = std::result::Result<T, OllamaError>;

#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unrecognized response envelope: {0}")]
    Response(String),
}

impl From<reqwest::Error> for OllamaError {
    fn from(err: reqwest::Error) -> Self {
        OllamaError::Network(err.to_string())
    }
}
