use super::RingEntry;
use crate::config::AppConfig;
use crate::llm::{GeminiAdapter, GroqAdapter, OpenRouterAdapter};
use std::sync::Arc;

/// Providers whose credentials are present, in default priority order:
/// Gemini, then Groq, then OpenRouter.
pub fn default_providers_from_config(config: &AppConfig) -> Vec<RingEntry> {
    let mut providers = Vec::new();
    let timeout = config.llm_timeout();

    if let Some(key) = config.gemini_api_key.clone() {
        providers.push(RingEntry::new(Arc::new(GeminiAdapter::new(
            key,
            config.gemini_model.clone(),
            timeout,
        ))));
        tracing::info!("LLM: Gemini adapter loaded ({})", config.gemini_model);
    }

    if let Some(key) = config.valid_groq_key() {
        providers.push(RingEntry::new(Arc::new(GroqAdapter::new(
            key.to_string(),
            config.groq_model.clone(),
            timeout,
        ))));
        tracing::info!("LLM: Groq adapter loaded ({})", config.groq_model);
    } else if config.groq_api_key.is_some() {
        tracing::warn!("LLM: Groq key present but invalid (expected 'gsk_' prefix), skipping");
    }

    if let Some(key) = config.openrouter_api_key.clone() {
        providers.push(RingEntry::new(Arc::new(OpenRouterAdapter::new(
            key,
            config.openrouter_model.clone(),
            timeout,
        ))));
        tracing::info!("LLM: OpenRouter adapter loaded ({})", config.openrouter_model);
    }

    tracing::info!("LLM: {} providers available", providers.len());
    providers
}
