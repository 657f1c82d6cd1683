use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message, Role};

/// Local models served by Ollama's chat endpoint.
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    /// `url` may be the server root or a full `/api/generate` / `/api/chat`
    /// endpoint; only the root is kept.
    pub fn new(url: String, model: String) -> Self {
        let url = url.trim_end_matches('/');
        let url = url
            .strip_suffix("/api/generate")
            .or_else(|| url.strip_suffix("/api/chat"))
            .unwrap_or(url)
            .to_string();
        Self {
            client: reqwest::Client::new(),
            url,
            model,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/chat", self.url)
    }

    fn build_request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> serde_json::Value {
        let api_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                    },
                    "content": m.content,
                })
            })
            .collect();

        json!({
            "model": self.model,
            "messages": api_messages,
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = self.endpoint();
        let body = self.build_request_body(&messages, temperature, max_tokens);

        debug!("Ollama request to {} (model={})", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError { status, body });
        }

        let resp: serde_json::Value = response.json().await?;
        let content = resp["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("missing message.content".into()))?
            .to_string();

        Ok(content)
    }
}
