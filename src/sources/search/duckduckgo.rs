// sources/search/duckduckgo.rs — DuckDuckGo Instant Answer API

use super::SearchTier;
use crate::sources::{
    enhanced_query, read_json, truncate_chars, SearchHit, SearchResults, SourceError, SourceOrigin,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const DDG_URL: &str = "https://api.duckduckgo.com/";
const MAX_RESULTS: usize = 5;

pub struct DuckDuckGoTier {
    client: Client,
}

impl DuckDuckGoTier {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl SearchTier for DuckDuckGoTier {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Duckduckgo
    }

    async fn search(
        &self,
        query: &str,
        keywords: &[String],
    ) -> Result<Option<SearchResults>, SourceError> {
        let enhanced = enhanced_query(query, keywords);
        let response = self
            .client
            .get(DDG_URL)
            .query(&[
                ("q", enhanced.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;
        let body: Value = read_json(response).await?;

        Ok(parse_instant_answer(query, &enhanced, &body))
    }
}

fn parse_instant_answer(query: &str, enhanced: &str, body: &Value) -> Option<SearchResults> {
    let mut hits = Vec::new();

    if let Some(abstract_text) = non_empty_str(body, "AbstractText") {
        hits.push(SearchHit {
            title: non_empty_str(body, "Heading").unwrap_or(query).to_string(),
            url: non_empty_str(body, "AbstractURL").unwrap_or_default().to_string(),
            snippet: abstract_text.to_string(),
        });
    }

    if let Some(Value::Array(topics)) = body.get("RelatedTopics") {
        collect_topics(topics, &mut hits);
    }
    hits.truncate(MAX_RESULTS);

    let top = hits.first()?;
    let summary = format!(
        "Found {} relevant sources about {}. Top result: {}...",
        hits.len(),
        query,
        truncate_chars(&top.snippet, 150)
    );

    Some(SearchResults {
        query: enhanced.to_string(),
        summary,
        sources: hits,
    })
}

/// Related topics are either leaf entries or named groups of entries.
fn collect_topics(topics: &[Value], hits: &mut Vec<SearchHit>) {
    for topic in topics {
        if hits.len() >= MAX_RESULTS {
            return;
        }
        if let Some(Value::Array(nested)) = topic.get("Topics") {
            collect_topics(nested, hits);
            continue;
        }
        if let Some(text) = non_empty_str(topic, "Text") {
            let title = text.split(" - ").next().unwrap_or(text);
            hits.push(SearchHit {
                title: title.to_string(),
                url: non_empty_str(topic, "FirstURL").unwrap_or_default().to_string(),
                snippet: text.to_string(),
            });
        }
    }
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn abstract_and_related_topics_become_hits() {
        let body = json!({
            "Heading": "Sorghum",
            "AbstractText": "Sorghum is a genus of flowering plants.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Sorghum",
            "RelatedTopics": [
                {"Text": "Sorghum bicolor - cultivated species", "FirstURL": "https://duckduckgo.com/Sorghum_bicolor"},
                {"Name": "Uses", "Topics": [
                    {"Text": "Sorghum flour - gluten-free flour", "FirstURL": "https://duckduckgo.com/Sorghum_flour"}
                ]}
            ]
        });

        let results = parse_instant_answer("sorghum", "sorghum crop", &body).unwrap();

        assert_eq!(results.query, "sorghum crop");
        assert_eq!(results.sources.len(), 3);
        assert_eq!(results.sources[0].title, "Sorghum");
        assert_eq!(results.sources[1].title, "Sorghum bicolor");
        assert_eq!(results.sources[2].url, "https://duckduckgo.com/Sorghum_flour");
        assert!(results
            .summary
            .starts_with("Found 3 relevant sources about sorghum. Top result: Sorghum is a genus"));
        assert!(results.summary.ends_with("..."));
    }

    #[test]
    fn caps_results_at_five() {
        let topics: Vec<Value> = (0..9)
            .map(|i| {
                json!({
                    "Text": format!("Topic {}", i),
                    "FirstURL": format!("https://duckduckgo.com/{}", i)
                })
            })
            .collect();
        let body = json!({"AbstractText": "", "RelatedTopics": topics});

        let results = parse_instant_answer("q", "q", &body).unwrap();
        assert_eq!(results.sources.len(), MAX_RESULTS);
    }

    #[test]
    fn empty_answer_yields_nothing() {
        let body = json!({"AbstractText": "", "RelatedTopics": []});
        assert!(parse_instant_answer("q", "q", &body).is_none());
    }
}
