// sources/types.rs — Uniform result envelope shared by every data-source client

use chrono::Local;
use serde::Serialize;
use serde_json::Value;

/// Which tier or service actually produced a [`SourceResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceOrigin {
    Poe,
    Duckduckgo,
    Wikipedia,
    OpenMeteo,
    AgricultureApi,
    Mock,
}

impl SourceOrigin {
    pub fn label(&self) -> &'static str {
        match self {
            SourceOrigin::Poe => "poe",
            SourceOrigin::Duckduckgo => "duckduckgo",
            SourceOrigin::Wikipedia => "wikipedia",
            SourceOrigin::OpenMeteo => "open-meteo",
            SourceOrigin::AgricultureApi => "agriculture-api",
            SourceOrigin::Mock => "mock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub summary: String,
    pub sources: Vec<SearchHit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentConditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub description: String,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub precipitation: f64,
    pub rain: f64,
    pub showers: f64,
    pub snowfall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrecipitationTotals {
    pub precipitation: f64,
    pub rain: f64,
    pub showers: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rainfall {
    pub current: PrecipitationTotals,
    pub today: PrecipitationTotals,
    pub next_24h: PrecipitationTotals,
    pub unit: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyForecast {
    pub datetime: String,
    pub temp: f64,
    pub description: String,
    pub humidity: f64,
    pub precipitation: f64,
    pub precipitation_probability: f64,
    pub rain: f64,
    pub showers: f64,
    pub snowfall: f64,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyForecast {
    pub date: String,
    pub temp_max: f64,
    pub temp_min: f64,
    pub precipitation_sum: f64,
    pub rain_sum: f64,
    pub showers_sum: f64,
    pub snowfall_sum: f64,
    pub precipitation_hours: f64,
    pub precipitation_probability_max: f64,
    pub weather_code: i64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub location: String,
    pub coordinates: Coordinates,
    pub current: CurrentConditions,
    pub rainfall: Rainfall,
    pub hourly_forecast: Vec<HourlyForecast>,
    pub daily_forecast: Vec<DailyForecast>,
}

/// Agriculture and soil payloads are provider-defined JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionalReport {
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_type: Option<String>,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourcePayload {
    Search(SearchResults),
    Weather(WeatherReport),
    Regional(RegionalReport),
}

/// Envelope returned by every data-source client, whichever tier answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResult {
    pub success: bool,
    pub source: SourceOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SourcePayload>,
    pub mock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: String,
}

impl SourceResult {
    pub fn live(source: SourceOrigin, data: SourcePayload) -> Self {
        Self {
            success: true,
            source,
            data: Some(data),
            mock: false,
            error: None,
            message: None,
            timestamp: now(),
        }
    }

    pub fn mock(data: SourcePayload, message: impl Into<String>) -> Self {
        Self {
            success: true,
            source: SourceOrigin::Mock,
            data: Some(data),
            mock: true,
            error: None,
            message: Some(message.into()),
            timestamp: now(),
        }
    }

    pub fn failed(
        source: SourceOrigin,
        error: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            source,
            data: None,
            mock: false,
            error: Some(error.into()),
            message: Some(message.into()),
            timestamp: now(),
        }
    }

    pub fn search(&self) -> Option<&SearchResults> {
        match &self.data {
            Some(SourcePayload::Search(results)) => Some(results),
            _ => None,
        }
    }

    pub fn weather(&self) -> Option<&WeatherReport> {
        match &self.data {
            Some(SourcePayload::Weather(report)) => Some(report),
            _ => None,
        }
    }

    pub fn regional(&self) -> Option<&RegionalReport> {
        match &self.data {
            Some(SourcePayload::Regional(report)) => Some(report),
            _ => None,
        }
    }
}

fn now() -> String {
    Local::now().to_rfc3339()
}
