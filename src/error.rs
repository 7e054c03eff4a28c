//! Error types for Svar.

use thiserror::Error;

/// Library-level error type for Svar operations.
#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Question file error: {0}")]
    QuestionFile(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error: {0}")]
    ModelApi(String),

    #[error("Model invocation timed out after {0} seconds")]
    InvocationTimeout(u64),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Result sink error: {0}")]
    Sink(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SvarError {
    /// Whether this error came from a per-invocation timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SvarError::InvocationTimeout(_))
    }
}

/// Result type alias for Svar operations.
pub type Result<T> = std::result::Result<T, SvarError>;
