pub mod gemini;
pub mod ollama;

use relnotes_core::config::{LlmConfig, PROVIDER_GEMINI, PROVIDER_LOCAL};

use crate::provider::{LlmError, LlmProvider};

/// Create the appropriate LLM provider based on config.
pub fn create_provider(llm_config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    match llm_config.provider.as_str() {
        PROVIDER_GEMINI => {
            let api_key = llm_config
                .google_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("GOOGLE_API_KEY not set".into()))?;
            Ok(Box::new(gemini::GeminiProvider::new(
                api_key.clone(),
                llm_config.gemini_model.clone(),
            )))
        }
        PROVIDER_LOCAL | "ollama" => Ok(Box::new(ollama::OllamaProvider::new(
            llm_config.api_url.clone(),
            llm_config.model.clone(),
        ))),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}
