pub mod lazy;
pub mod limited;
pub mod provider;
pub mod providers;
pub mod rate_limit;

pub use lazy::LazyProvider;
pub use limited::RateLimitedProvider;
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
pub use rate_limit::{BucketConfig, BucketLimiter, DailyLimiter, RateLimitExceeded};
