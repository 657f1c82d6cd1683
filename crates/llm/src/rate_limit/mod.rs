//! Request budgets for rate-limited LLM backends.
//!
//! Two flavours are provided:
//! - [`DailyLimiter`]: a plain per-day counter wrapped around each call
//!   (single-shot path).
//! - [`BucketLimiter`]: a token bucket refilled continuously at
//!   `requests_per_minute / 60` tokens per second plus a hard daily ceiling
//!   that resets on the local calendar day (chunked path).

mod bucket;
mod daily;

pub use bucket::{BucketConfig, BucketLimiter};
pub use daily::DailyLimiter;

/// A request was refused because a budget is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitExceeded {
    #[error("Daily API request limit exceeded ({limit} requests)")]
    Daily { limit: u32 },
    #[error("Per-minute request limit exceeded ({limit} requests)")]
    Minute { limit: u32 },
}

impl RateLimitExceeded {
    /// Daily exhaustion cannot recover within the current run.
    pub fn is_daily(&self) -> bool {
        matches!(self, RateLimitExceeded::Daily { .. })
    }
}
