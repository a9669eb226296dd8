//! Agent error types.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM response contained no text")]
    EmptyResponse,

    #[error("Malformed LLM response: {0}")]
    Malformed(String),

    #[error("No API key configured (set GEMINI_API_KEY or GOOGLE_API_KEY)")]
    MissingApiKey,
}

pub type Result<T> = std::result::Result<T, AgentError>;
