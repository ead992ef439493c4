// llm/openrouter.rs — OpenRouter provider

use super::{status_error, transport_error, LLMError, ProviderAdapter};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const FALLBACK_MODEL: &str = "meta-llama/llama-3.1-8b-instruct:free";

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterAdapter {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenRouterAdapter {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            model,
        }
    }

    async fn call_model(&self, model: &str, prompt: &str) -> Result<String, LLMError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: 2048,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(OPENROUTER_URL)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://regional-agent.local")
            .header("X-Title", "Regional Agent")
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("OpenRouter", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(&format!("OpenRouter {}", model), status, body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ProviderError(format!("OpenRouter parse: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LLMError::InvalidResponse)
    }
}

#[async_trait]
impl ProviderAdapter for OpenRouterAdapter {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        // Configured model first, then the free fallback model
        match self.call_model(&self.model, prompt).await {
            Ok(text) => Ok(text),
            Err(LLMError::AuthenticationError(msg)) => Err(LLMError::AuthenticationError(msg)),
            Err(e) if self.model == FALLBACK_MODEL => Err(e),
            Err(e) => {
                tracing::warn!(
                    "OpenRouter '{}' failed: {:?}, trying '{}'",
                    self.model,
                    e,
                    FALLBACK_MODEL
                );
                self.call_model(FALLBACK_MODEL, prompt).await
            }
        }
    }

    fn name(&self) -> &str {
        "OpenRouter"
    }
}
