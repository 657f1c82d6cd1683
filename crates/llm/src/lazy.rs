use std::sync::Arc;

use async_trait::async_trait;
use relnotes_core::LlmConfig;
use tokio::sync::OnceCell;
use tracing::info;

use crate::provider::{LlmError, LlmProvider, Message};
use crate::providers::create_provider;

type ProviderFactory = Box<dyn Fn() -> Result<Arc<dyn LlmProvider>, LlmError> + Send + Sync>;

/// Builds the configured provider on first use and hands out the cached
/// instance afterwards. A failed construction is not cached.
pub struct LazyProvider {
    factory: ProviderFactory,
    cell: OnceCell<Arc<dyn LlmProvider>>,
}

impl LazyProvider {
    pub fn new(config: LlmConfig) -> Self {
        Self::with_factory(move || {
            info!(provider = %config.provider, model = %config.active_model(), "initializing LLM provider");
            create_provider(&config).map(Arc::from)
        })
    }

    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn LlmProvider>, LlmError> + Send + Sync + 'static,
    {
        Self { factory: Box::new(factory), cell: OnceCell::new() }
    }

    pub async fn get(&self) -> Result<Arc<dyn LlmProvider>, LlmError> {
        self.cell
            .get_or_try_init(|| async { (self.factory)() })
            .await
            .cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl LlmProvider for LazyProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        self.get().await?.complete(messages, temperature, max_tokens).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo;

    #[async_trait]
    impl LlmProvider for Echo {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Ok(messages.last().map(|m| m.content.clone()).unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn constructs_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let lazy = LazyProvider::with_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Echo) as Arc<dyn LlmProvider>)
        });

        assert!(!lazy.is_initialized());
        assert_eq!(lazy.complete(vec![Message::user("a")], 0.0, 1).await.unwrap(), "a");
        assert_eq!(lazy.complete(vec![Message::user("b")], 0.0, 1).await.unwrap(), "b");
        assert!(lazy.is_initialized());
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_construction_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let lazy = LazyProvider::with_factory(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(LlmError::NotConfigured("not yet".into()))
            } else {
                Ok(Arc::new(Echo) as Arc<dyn LlmProvider>)
            }
        });

        assert!(lazy.get().await.is_err());
        assert!(lazy.get().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_provider_surfaces_on_first_use() {
        let config = LlmConfig {
            provider: "nope".into(),
            model: "m".into(),
            api_url: "http://localhost:11434".into(),
            google_api_key: None,
            gemini_model: "g".into(),
            temperature: 0.0,
            max_tokens: 16,
        };
        let lazy = LazyProvider::new(config);
        assert!(matches!(lazy.get().await, Err(LlmError::NotConfigured(_))));
    }
}
