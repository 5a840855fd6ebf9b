use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebMindError {
    #[error("Attempt budget must be at least 1, got {0}")]
    InvalidBudget(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
