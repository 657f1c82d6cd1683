use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

/// Run configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub llm: LlmConfig,
    pub tokens: TokenConfig,
    pub rate_limit: RateLimitConfig,
    pub paths: PathsConfig,
    pub processing: ProcessingConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RELNOTES_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("RELNOTES_PROFILE").unwrap_or_default();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            llm: LlmConfig::from_env_profiled(p),
            tokens: TokenConfig::from_env_profiled(p),
            rate_limit: RateLimitConfig::from_env_profiled(p),
            paths: PathsConfig::from_env_profiled(p),
            processing: ProcessingConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject budgets and limits that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate()?;
        self.tokens.validate()?;
        self.rate_limit.validate()?;
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  llm:         provider={}, model={}, key={}",
            self.llm.provider,
            self.llm.active_model(),
            if self.llm.google_api_key.is_some() { "set" } else { "(none)" }
        );
        tracing::info!(
            "  tokens:      max_input={}, chunk_size={}, overlap={}, tokenizer={}",
            self.tokens.max_input_tokens,
            self.tokens.chunk_size,
            self.tokens.chunk_overlap,
            self.tokens.tokenizer
        );
        tracing::info!(
            "  rate_limit:  rpm={}, rpd={}, parallel={}",
            self.rate_limit.requests_per_minute,
            self.rate_limit.requests_per_day,
            self.rate_limit.max_parallel_chunks
        );
        tracing::info!(
            "  paths:       data_dir={}, config_dir={}",
            self.paths.data_dir.display(),
            self.paths.config_dir.display()
        );
        tracing::info!(
            "  processing:  enabled={}, reduce={}, persist_chunks={}",
            self.processing.summarize_enabled,
            self.processing.reduce_enabled,
            self.processing.persist_chunk_summaries
        );
    }

    /// Return a redacted view safe for printing (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "llm": {
                "provider": self.llm.provider,
                "model": self.llm.active_model(),
                "api_url": self.llm.api_url,
                "configured": self.llm.is_configured(),
            },
            "tokens": self.tokens,
            "rate_limit": self.rate_limit,
            "paths": self.paths,
            "processing": self.processing,
        })
    }
}

// ── LLM ───────────────────────────────────────────────────────

pub const PROVIDER_LOCAL: &str = "local";
pub const PROVIDER_GEMINI: &str = "gemini";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "local" (Ollama) or "gemini"
    pub provider: String,
    /// Model used by the local provider.
    pub model: String,
    pub api_url: String,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", PROVIDER_LOCAL).to_lowercase(),
            model: profiled_env_or(p, "LLM_MODEL", "mistral"),
            api_url: profiled_env_or(p, "LLM_API_URL", "http://localhost:11434"),
            google_api_key: profiled_env_opt(p, "GOOGLE_API_KEY"),
            gemini_model: profiled_env_or(p, "GEMINI_MODEL", "gemini-1.5-flash"),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.0),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 8192),
        }
    }

    pub fn is_local(&self) -> bool {
        self.provider == PROVIDER_LOCAL
    }

    pub fn active_model(&self) -> &str {
        if self.provider == PROVIDER_GEMINI { &self.gemini_model } else { &self.model }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            PROVIDER_GEMINI => self.google_api_key.is_some(),
            PROVIDER_LOCAL => true,
            _ => false,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.provider.as_str() {
            PROVIDER_LOCAL => {}
            PROVIDER_GEMINI if self.google_api_key.is_none() => {
                return Err(ConfigError::MissingKey("GOOGLE_API_KEY"));
            }
            PROVIDER_GEMINI => {}
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::NotPositive { key: "LLM_MAX_TOKENS" });
        }
        Ok(())
    }
}

// ── Token budgets ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Total input budget of the model, prompt template included.
    pub max_input_tokens: usize,
    /// Upper bound for a single chunk on the chunked path.
    pub chunk_size: usize,
    /// Words carried over between sub-chunks of a split section.
    pub chunk_overlap: usize,
    /// "heuristic", "whitespace" or "tiktoken"
    pub tokenizer: String,
}

impl TokenConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_input_tokens: profiled_env_parse(p, "MAX_INPUT_TOKENS", 50_000),
            chunk_size: profiled_env_parse(p, "CHUNK_SIZE", 40_000),
            chunk_overlap: profiled_env_parse(p, "CHUNK_OVERLAP", 200),
            tokenizer: profiled_env_or(p, "TOKENIZER", "heuristic").to_lowercase(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_input_tokens == 0 {
            return Err(ConfigError::NotPositive { key: "MAX_INPUT_TOKENS" });
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::NotPositive { key: "CHUNK_SIZE" });
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::Invalid {
                key: "CHUNK_OVERLAP",
                reason: format!("must be smaller than CHUNK_SIZE ({})", self.chunk_size),
            });
        }
        if !matches!(self.tokenizer.as_str(), "heuristic" | "whitespace" | "tiktoken") {
            return Err(ConfigError::Invalid {
                key: "TOKENIZER",
                reason: format!("unknown tokenizer '{}'", self.tokenizer),
            });
        }
        Ok(())
    }
}

// ── Rate limits ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
    pub min_request_interval_ms: u64,
    /// Chunks dispatched concurrently within one batch.
    pub max_parallel_chunks: usize,
    pub chunk_timeout_secs: u64,
}

impl RateLimitConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            requests_per_minute: profiled_env_parse(p, "REQUESTS_PER_MINUTE", 5),
            requests_per_day: profiled_env_parse(p, "REQUESTS_PER_DAY", 25),
            min_request_interval_ms: profiled_env_parse(p, "MIN_REQUEST_INTERVAL_MS", 200),
            max_parallel_chunks: profiled_env_parse(p, "MAX_PARALLEL_CHUNKS", 2),
            chunk_timeout_secs: profiled_env_parse(p, "CHUNK_TIMEOUT_SECS", 300),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.requests_per_minute == 0 {
            return Err(ConfigError::NotPositive { key: "REQUESTS_PER_MINUTE" });
        }
        if self.requests_per_day == 0 {
            return Err(ConfigError::NotPositive { key: "REQUESTS_PER_DAY" });
        }
        if self.max_parallel_chunks == 0 {
            return Err(ConfigError::NotPositive { key: "MAX_PARALLEL_CHUNKS" });
        }
        if self.chunk_timeout_secs == 0 {
            return Err(ConfigError::NotPositive { key: "CHUNK_TIMEOUT_SECS" });
        }
        Ok(())
    }
}

// ── Paths ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Input (`correlated.json`) and output files live here.
    pub data_dir: PathBuf,
    /// Prompt templates live here.
    pub config_dir: PathBuf,
}

impl PathsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            config_dir: PathBuf::from(profiled_env_or(p, "CONFIG_DIR", "config")),
        }
    }
}

// ── Processing switches ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub summarize_enabled: bool,
    /// Run a final reduce call over the merged chunk summaries.
    pub reduce_enabled: bool,
    /// Write every chunk summary to `{data_dir}/chunks/` for inspection.
    pub persist_chunk_summaries: bool,
}

impl ProcessingConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            summarize_enabled: profiled_env_bool(p, "SUMMARIZE_ENABLED", true),
            reduce_enabled: profiled_env_bool(p, "REDUCE_ENABLED", false),
            persist_chunk_summaries: profiled_env_bool(p, "PERSIST_CHUNK_SUMMARIES", false),
        }
    }
}
