pub mod config;
pub mod error;

pub use config::{
    load_dotenv, Config, LlmConfig, PathsConfig, ProcessingConfig, RateLimitConfig, TokenConfig,
    PROVIDER_GEMINI, PROVIDER_LOCAL,
};
pub use error::*;
