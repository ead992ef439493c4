// sources/search/mod.rs — Tiered web search with a guaranteed mock fallback

mod duckduckgo;
mod mock;
mod poe;
mod wikipedia;

pub use duckduckgo::DuckDuckGoTier;
pub use mock::mock_results;
pub use poe::PoeTier;
pub use wikipedia::WikipediaTier;

use super::{SearchResults, SourceError, SourceOrigin, SourcePayload, SourceResult, WebSearchSource};
use crate::config::AppConfig;
use async_trait::async_trait;

/// One search strategy. `Ok(None)` means the tier ran but found nothing.
#[async_trait]
pub trait SearchTier: Send + Sync {
    fn origin(&self) -> SourceOrigin;

    async fn search(
        &self,
        query: &str,
        keywords: &[String],
    ) -> Result<Option<SearchResults>, SourceError>;
}

/// Tries each configured tier in order; falls through to the mock.
pub struct WebSearchClient {
    tiers: Vec<Box<dyn SearchTier>>,
}

impl WebSearchClient {
    pub fn new(tiers: Vec<Box<dyn SearchTier>>) -> Self {
        Self { tiers }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = config.source_timeout();
        let mut tiers: Vec<Box<dyn SearchTier>> = Vec::new();

        if let Some(key) = config.poe_api_key.clone() {
            tiers.push(Box::new(PoeTier::new(
                key,
                config.poe_bot_name.clone(),
                config.poe_api_url.clone(),
                timeout,
            )));
        }
        if config.duckduckgo_enabled {
            tiers.push(Box::new(DuckDuckGoTier::new(timeout)));
        }
        if config.wikipedia_enabled {
            tiers.push(Box::new(WikipediaTier::new(timeout)));
        }

        let labels: Vec<&str> = tiers.iter().map(|t| t.origin().label()).collect();
        tracing::info!("Search: tiers [{}] + mock", labels.join(", "));
        Self::new(tiers)
    }

    /// Labels of the tiers `from_config` would build, mock last.
    pub fn configured_tiers(config: &AppConfig) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if config.poe_api_key.is_some() {
            labels.push(SourceOrigin::Poe.label());
        }
        if config.duckduckgo_enabled {
            labels.push(SourceOrigin::Duckduckgo.label());
        }
        if config.wikipedia_enabled {
            labels.push(SourceOrigin::Wikipedia.label());
        }
        labels.push(SourceOrigin::Mock.label());
        labels
    }

    pub fn tier_labels(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.origin().label()).collect()
    }

    /// Latest news on a topic.
    pub async fn news(&self, topic: &str) -> SourceResult {
        let keywords = ["news", "recent", "update"].map(String::from);
        self.search(&format!("latest news about {}", topic), &keywords)
            .await
    }
}

#[async_trait]
impl WebSearchSource for WebSearchClient {
    async fn search(&self, query: &str, keywords: &[String]) -> SourceResult {
        for tier in &self.tiers {
            let origin = tier.origin();
            match tier.search(query, keywords).await {
                Ok(Some(results)) => {
                    tracing::debug!(
                        "Search: {} returned {} sources",
                        origin.label(),
                        results.sources.len()
                    );
                    return SourceResult::live(origin, SourcePayload::Search(results));
                }
                Ok(None) => {
                    tracing::debug!("Search: {} found nothing", origin.label());
                }
                Err(e) => {
                    tracing::warn!("Search: {} failed: {}", origin.label(), e);
                }
            }
        }

        mock_results(query)
    }
}
