use std::path::PathBuf;

use relnotes_core::ConfigError;
use relnotes_llm::{LlmError, RateLimitExceeded};
use thiserror::Error;

use crate::tokenizer::TokenizerError;

/// Run-level failures. Chunk-level failures never surface here; they are
/// annotated inline in the summary instead.
#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("rate limit: {0}")]
    RateLimit(#[from] RateLimitExceeded),

    #[error("LLM provider error: {0}")]
    Provider(#[source] LlmError),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

impl SummarizeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SummarizeError::Io { path: path.into(), source }
    }

    /// Provider-side 429s and local limiter rejections.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            SummarizeError::RateLimit(_) => true,
            SummarizeError::Provider(e) => e.is_rate_limited(),
            _ => false,
        }
    }
}

impl From<LlmError> for SummarizeError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::RateLimited(limit) => SummarizeError::RateLimit(limit),
            other => SummarizeError::Provider(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SummarizeError>;
