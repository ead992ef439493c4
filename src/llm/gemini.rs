// llm/gemini.rs — Google Gemini provider

use super::{status_error, transport_error, LLMError, ProviderAdapter};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiAdapter {
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
impl ProviderAdapter for GeminiAdapter {
    async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                max_output_tokens: 2048,
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("Gemini", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(status_error("Gemini", status, body));
        }

        let gemini: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ProviderError(format!("Gemini parse: {}", e)))?;

        // Multi-part candidates are concatenated in order.
        let text: String = gemini
            .candidates
            .first()
            .map(|c| c.content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LLMError::InvalidResponse);
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}
