// llm/mod.rs — Provider capability trait shared by every LLM backend

pub mod gemini;
pub mod groq;
pub mod openrouter;
pub mod prompts;
mod types;

pub use gemini::GeminiAdapter;
pub use groq::GroqAdapter;
pub use openrouter::OpenRouterAdapter;
pub use types::{CodeType, LLMError, QueryAnalysis, MAX_SEARCH_KEYWORDS};

use crate::aggregate::Aggregate;
use crate::json_repair;
use async_trait::async_trait;

/// Uniform capability set implemented by each LLM provider.
///
/// Adapters supply the raw `generate` transport; the three capabilities are
/// built on top of it and may be overridden per provider.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider name, used in logs and failover error lists
    fn name(&self) -> &str;

    /// Send a single prompt and return the model's text
    async fn generate(&self, prompt: &str) -> Result<String, LLMError>;

    /// Classify the query. Transport failures are errors; unparseable output
    /// is not, and degrades to [`QueryAnalysis::heuristic`].
    async fn analyze(&self, query: &str) -> Result<QueryAnalysis, LLMError> {
        let raw = self.generate(&prompts::analysis_prompt(query)).await?;
        Ok(parse_analysis(self.name(), query, &raw))
    }

    async fn synthesize_response(
        &self,
        query: &str,
        aggregate: &Aggregate,
    ) -> Result<String, LLMError> {
        let prompt = prompts::synthesis_prompt(self.name(), query, aggregate);
        non_empty(self.generate(&prompt).await?)
    }

    async fn answer_directly(&self, query: &str) -> Result<String, LLMError> {
        let prompt = prompts::direct_prompt(self.name(), query);
        non_empty(self.generate(&prompt).await?)
    }
}

pub fn parse_analysis(provider: &str, query: &str, raw: &str) -> QueryAnalysis {
    match json_repair::extract_as::<QueryAnalysis>(raw) {
        Some(analysis) => analysis.normalized(query),
        None => {
            tracing::warn!(
                "LLM: '{}' analysis unparseable ({} chars), using keyword heuristic",
                provider,
                raw.len()
            );
            QueryAnalysis::heuristic(query)
        }
    }
}

fn non_empty(text: String) -> Result<String, LLMError> {
    if text.trim().is_empty() {
        Err(LLMError::InvalidResponse)
    } else {
        Ok(text)
    }
}

/// Map a non-success HTTP status to the matching adapter error.
pub(crate) fn status_error(provider: &str, status: reqwest::StatusCode, body: String) -> LLMError {
    match status.as_u16() {
        401 | 403 => LLMError::AuthenticationError(format!("{} {}", provider, status)),
        429 => LLMError::RateLimitError(format!("{} {}", provider, status)),
        _ => LLMError::ProviderError(format!("{} {}: {}", provider, status, body)),
    }
}

pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> LLMError {
    if error.is_timeout() {
        LLMError::Timeout
    } else {
        LLMError::NetworkError(format!("{}: {}", provider, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedAdapter {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedAdapter {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String, LLMError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn analyze_parses_fenced_json() {
        let adapter = ScriptedAdapter::new(
            "```json\n{\"intent\":\"weather\",\"needsWeatherData\":true,\"location\":\"Paris\"}\n```",
        );
        let analysis = adapter.analyze("What's the weather in Paris?").await.unwrap();
        assert!(analysis.needs_weather_data);
        assert_eq!(analysis.location.as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn analyze_falls_back_to_heuristic() {
        let adapter = ScriptedAdapter::new("I am not sure what you mean.");
        let analysis = adapter.analyze("Tell me the latest news").await.unwrap();
        assert!(analysis.needs_web_search);
        assert_eq!(analysis.intent, "Tell me the latest news");
    }

    #[tokio::test]
    async fn blank_answers_are_invalid() {
        let adapter = ScriptedAdapter::new("   ");
        let err = adapter.answer_directly("hi").await.unwrap_err();
        assert!(matches!(err, LLMError::InvalidResponse));
    }

    #[tokio::test]
    async fn direct_answer_uses_provider_persona() {
        let adapter = ScriptedAdapter::new("NDVI is a vegetation index.");
        let answer = adapter.answer_directly("What is NDVI?").await.unwrap();
        assert_eq!(answer, "NDVI is a vegetation index.");
        let prompts = adapter.prompts.lock().unwrap();
        assert!(prompts[0].contains("You are scripted"));
        assert!(prompts[0].contains("What is NDVI?"));
    }

    #[test]
    fn maps_http_status() {
        let auth = status_error("groq", reqwest::StatusCode::UNAUTHORIZED, String::new());
        assert!(matches!(auth, LLMError::AuthenticationError(_)));
        let rate = status_error("groq", reqwest::StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(rate, LLMError::RateLimitError(_)));
        let other = status_error("groq", reqwest::StatusCode::BAD_GATEWAY, "oops".to_string());
        assert!(matches!(other, LLMError::ProviderError(ref m) if m.contains("oops")));
    }
}
