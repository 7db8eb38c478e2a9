use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI provider endpoint is not configured")]
    NotConfigured,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("stream decode error: {0}")]
    Decode(String),
}
