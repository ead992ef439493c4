// sources/mod.rs — Data-source clients (web search, weather, agriculture/soil)

mod agriculture;
pub mod search;
mod types;
mod weather;

pub use agriculture::AgricultureClient;
pub use search::WebSearchClient;
pub use types::{
    Coordinates, CurrentConditions, DailyForecast, HourlyForecast, PrecipitationTotals, Rainfall,
    RegionalReport, SearchHit, SearchResults, SourceOrigin, SourcePayload, SourceResult,
    WeatherReport,
};
pub use weather::{weather_description, WeatherClient};

use crate::config::AppConfig;
use crate::json_repair;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Client-internal failure. Never crosses a client boundary: clients fold it
/// into a `success: false` envelope or a mock result.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Network(String),

    #[error("HTTP error: {0}")]
    Http(u16),

    #[error("Invalid response: {0}")]
    Parse(String),

    #[error("Location \"{0}\" not found")]
    LocationNotFound(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for SourceError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SourceError::Timeout
        } else if let Some(status) = error.status() {
            SourceError::Http(status.as_u16())
        } else {
            SourceError::Network(error.to_string())
        }
    }
}

#[async_trait]
pub trait WebSearchSource: Send + Sync {
    /// Always resolves; the last tier is a deterministic mock.
    async fn search(&self, query: &str, keywords: &[String]) -> SourceResult;
}

#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Resolves to `success: false` on any failure.
    async fn weather(&self, location: &str) -> SourceResult;
}

#[async_trait]
pub trait AgricultureSource: Send + Sync {
    async fn agricultural_data(&self, location: &str, crop_type: Option<&str>) -> SourceResult;

    async fn soil_data(&self, location: &str) -> SourceResult;
}

/// Long-lived clients shared by every query.
#[derive(Clone)]
pub struct DataSources {
    pub web: Arc<dyn WebSearchSource>,
    pub weather: Arc<dyn WeatherSource>,
    pub agriculture: Arc<dyn AgricultureSource>,
}

impl DataSources {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            web: Arc::new(WebSearchClient::from_config(config)),
            weather: Arc::new(WeatherClient::from_config(config)),
            agriculture: Arc::new(AgricultureClient::from_config(config)),
        }
    }
}

/// Decode a JSON body, salvaging an object from malformed text if needed.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Http(status.as_u16()));
    }

    let body = response.text().await?;
    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(strict_err) => json_repair::extract_object(&body)
            .and_then(|obj| serde_json::from_value(Value::Object(obj)).ok())
            .ok_or_else(|| SourceError::Parse(strict_err.to_string())),
    }
}

/// `"{query} {k1 k2 k3}"`, using at most three keywords.
pub(crate) fn enhanced_query(query: &str, keywords: &[String]) -> String {
    let extra: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .take(3)
        .collect();
    if extra.is_empty() {
        query.to_string()
    } else {
        format!("{} {}", query, extra.join(" "))
    }
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhances_with_up_to_three_keywords() {
        let keywords: Vec<String> = ["maize", "drought", " ", "Kenya", "2025"]
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(enhanced_query("crop news", &keywords), "crop news maize drought Kenya");
        assert_eq!(enhanced_query("crop news", &[]), "crop news");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
