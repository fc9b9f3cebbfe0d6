//! Error types for the fact-checking pipeline.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("OpenAI API error: {0}")]
    OpenAiError(#[from] async_openai::error::OpenAIError),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("empty completion after {attempts} attempts")]
    EmptyResponse { attempts: u32 },

    #[error("batch call returned {got} completions for {expected} prompts")]
    BatchShape { expected: usize, got: usize },

    #[error("invalid debate format '{name}': {reason}")]
    InvalidFormat { name: String, reason: String },

    #[error("unknown debate format: {0}")]
    UnknownFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("malformed input document: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DebateError>;
