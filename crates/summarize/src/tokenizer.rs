//! Token counting.
//!
//! Counts only need to be deterministic for a given input; exact fidelity
//! with any provider's tokenizer is not required.

use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tiktoken_rs::{cl100k_base, CoreBPE};

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("failed to load BPE encoding: {0}")]
    Load(String),
    #[error("unknown tokenizer '{0}'")]
    Unknown(String),
}

pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError>;

    fn name(&self) -> &'static str;
}

/// Characters-per-token estimate over whitespace-normalised text.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicCounter {
    chars_per_token: f64,
}

impl Default for HeuristicCounter {
    fn default() -> Self {
        Self { chars_per_token: 3.5 }
    }
}

impl TokenCounter for HeuristicCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        let mut chars = 0usize;
        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                chars += 1;
            }
            chars += word.chars().count();
        }
        Ok((chars as f64 / self.chars_per_token).ceil() as usize)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// One token per whitespace-separated word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceCounter;

impl TokenCounter for WhitespaceCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.split_whitespace().count())
    }

    fn name(&self) -> &'static str {
        "whitespace"
    }
}

/// `cl100k_base` BPE.
pub struct TiktokenCounter {
    bpe: CoreBPE,
}

impl TiktokenCounter {
    pub fn new() -> Result<Self, TokenizerError> {
        let bpe = cl100k_base().map_err(|e| TokenizerError::Load(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(self.bpe.encode_with_special_tokens(text).len())
    }

    fn name(&self) -> &'static str {
        "tiktoken"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerKind {
    Heuristic,
    Whitespace,
    Tiktoken,
}

impl FromStr for TokenizerKind {
    type Err = TokenizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" => Ok(TokenizerKind::Heuristic),
            "whitespace" => Ok(TokenizerKind::Whitespace),
            "tiktoken" => Ok(TokenizerKind::Tiktoken),
            other => Err(TokenizerError::Unknown(other.to_string())),
        }
    }
}

pub fn counter_for(kind: TokenizerKind) -> Result<Arc<dyn TokenCounter>, TokenizerError> {
    Ok(match kind {
        TokenizerKind::Heuristic => Arc::new(HeuristicCounter::default()),
        TokenizerKind::Whitespace => Arc::new(WhitespaceCounter),
        TokenizerKind::Tiktoken => Arc::new(TiktokenCounter::new()?),
    })
}
