// sources/search/poe.rs — Poe Web-Search bot

use super::SearchTier;
use crate::sources::{
    enhanced_query, read_json, truncate_chars, SearchHit, SearchResults, SourceError, SourceOrigin,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const SUMMARY_MAX_CHARS: usize = 500;
const SNIPPET_MAX_CHARS: usize = 300;

pub struct PoeTier {
    client: Client,
    api_key: String,
    bot_name: String,
    api_url: String,
}

impl PoeTier {
    pub fn new(api_key: String, bot_name: String, api_url: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            bot_name,
            api_url,
        }
    }

    /// The bot API has accepted several request shapes over time.
    fn payloads(&self, query: &str) -> [Value; 3] {
        [
            json!({ "message": query, "bot": self.bot_name, "api_key": self.api_key }),
            json!({ "query": query, "bot": self.bot_name, "api_key": self.api_key }),
            json!({
                "message": query,
                "bot_handle": self.bot_name.to_lowercase().replace('-', "_"),
                "api_key": self.api_key,
            }),
        ]
    }

    async fn post(&self, payload: &Value) -> Result<Value, SourceError> {
        let response = self
            .client
            .post(format!("{}query", self.api_url))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl SearchTier for PoeTier {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Poe
    }

    async fn search(
        &self,
        query: &str,
        keywords: &[String],
    ) -> Result<Option<SearchResults>, SourceError> {
        let enhanced = enhanced_query(query, keywords);
        let mut last_error = None;

        for payload in self.payloads(&enhanced) {
            match self.post(&payload).await {
                Ok(body) => {
                    if let Some(text) = response_text(&body) {
                        return Ok(Some(results_from_text(&enhanced, &text)));
                    }
                }
                Err(e) => {
                    tracing::debug!("Poe: payload rejected: {}", e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

/// Reply text from `text`, `response` or `message`, whichever is present.
fn response_text(body: &Value) -> Option<String> {
    let text = match body {
        Value::Object(map) => {
            let field = ["text", "response", "message"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|v| !is_blank(v))?;
            match field {
                Value::String(s) => s.clone(),
                Value::Object(inner) => match inner.get("text") {
                    Some(Value::String(s)) if !s.is_empty() => s.clone(),
                    _ => field.to_string(),
                },
                other => other.to_string(),
            }
        }
        Value::String(s) => s.clone(),
        Value::Null => return None,
        other => other.to_string(),
    };

    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn results_from_text(query: &str, text: &str) -> SearchResults {
    SearchResults {
        query: query.to_string(),
        summary: truncate_chars(text, SUMMARY_MAX_CHARS),
        sources: vec![SearchHit {
            title: format!("Poe Web-Search: {}", query),
            url: String::new(),
            snippet: truncate_chars(text, SNIPPET_MAX_CHARS),
        }],
    }
}
