// llm/groq.rs — Groq provider (OpenAI-compatible chat completions)

use super::{status_error, transport_error, LLMError, ProviderAdapter};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

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

pub struct GroqAdapter {
    client: Client,
    api_key: String,
    model: String,
}

impl GroqAdapter {
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
}

#[async_trait]
impl ProviderAdapter for GroqAdapter {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: 2048,
            temperature: 0.3,
        };

        let response = self
            .client
            .post(GROQ_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("Groq", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("Groq", status, body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ProviderError(format!("Groq parse: {}", e)))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LLMError::InvalidResponse)
    }

    fn name(&self) -> &str {
        "Groq"
    }
}
