use thiserror::Error;

/// Invalid configuration detected before any work starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be positive")]
    NotPositive { key: &'static str },

    #[error("{key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),

    #[error("{0} is required for the selected provider")]
    MissingKey(&'static str),
}
