use std::sync::Arc;

use async_trait::async_trait;

use crate::provider::{LlmError, LlmProvider, Message};
use crate::rate_limit::DailyLimiter;

/// Provider wrapper that counts successful completions against a daily budget.
pub struct RateLimitedProvider {
    inner: Arc<dyn LlmProvider>,
    limiter: DailyLimiter,
}

impl RateLimitedProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, limiter: DailyLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn limiter(&self) -> &DailyLimiter {
        &self.limiter
    }
}

#[async_trait]
impl LlmProvider for RateLimitedProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.limiter
            .call(|| self.inner.complete(messages, temperature, max_tokens))
            .await
    }
}
