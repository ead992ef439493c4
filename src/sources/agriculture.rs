// sources/agriculture.rs — Crop and soil data

use super::{
    read_json, AgricultureSource, RegionalReport, SourceError, SourceOrigin, SourcePayload,
    SourceResult,
};
use crate::config::AppConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_CROP: &str = "general";

struct Endpoint {
    url: String,
    api_key: String,
}

pub struct AgricultureClient {
    client: Client,
    endpoint: Option<Endpoint>,
}

impl AgricultureClient {
    /// Without an endpoint every lookup returns sample data.
    pub fn new(api_url: Option<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        let endpoint = match (api_url, api_key) {
            (Some(url), Some(api_key)) => Some(Endpoint {
                url: url.trim_end_matches('/').to_string(),
                api_key,
            }),
            _ => None,
        };

        Self { client, endpoint }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.agriculture_api_url.clone(),
            config.agriculture_api_key.clone(),
            config.source_timeout(),
        )
    }

    async fn fetch(
        &self,
        endpoint: &Endpoint,
        location: &str,
        crop_type: Option<&str>,
    ) -> Result<Value, SourceError> {
        let mut params = vec![("location", location), ("api_key", endpoint.api_key.as_str())];
        if let Some(crop) = crop_type {
            params.push(("crop", crop));
        }

        let response = self
            .client
            .get(format!("{}/crop-data", endpoint.url))
            .query(&params)
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl AgricultureSource for AgricultureClient {
    async fn agricultural_data(&self, location: &str, crop_type: Option<&str>) -> SourceResult {
        let Some(endpoint) = &self.endpoint else {
            tracing::debug!("Agriculture: API not configured, using sample data");
            return mock_agricultural_data(location, crop_type);
        };

        match self.fetch(endpoint, location, crop_type).await {
            Ok(data) => SourceResult::live(
                SourceOrigin::AgricultureApi,
                SourcePayload::Regional(RegionalReport {
                    location: location.to_string(),
                    crop_type: crop_type.map(str::to_string),
                    data,
                }),
            ),
            Err(e) => {
                tracing::warn!("Agriculture: API error for '{}': {}", location, e);
                mock_agricultural_data(location, crop_type)
            }
        }
    }

    async fn soil_data(&self, location: &str) -> SourceResult {
        mock_soil_data(location)
    }
}

fn mock_agricultural_data(location: &str, crop_type: Option<&str>) -> SourceResult {
    let report = RegionalReport {
        location: location.to_string(),
        crop_type: Some(crop_type.unwrap_or(DEFAULT_CROP).to_string()),
        data: json!({
            "soilMoisture": 68,
            "growingSeason": "Active",
            "recommendedCrops": ["Maize", "Wheat", "Sorghum"],
            "alerts": ["Optimal planting conditions", "Monitor for pest activity"],
            "yieldForecast": "Above average expected"
        }),
    };
    SourceResult::mock(
        SourcePayload::Regional(report),
        "Mock data - configure Agriculture API for real data",
    )
}

fn mock_soil_data(location: &str) -> SourceResult {
    let report = RegionalReport {
        location: location.to_string(),
        crop_type: None,
        data: json!({
            "soilType": "Loamy",
            "pH": 6.5,
            "nitrogen": "Medium",
            "phosphorus": "High",
            "potassium": "Medium",
            "organicMatter": "3.2%",
            "recommendations": [
                "Good drainage capacity",
                "Suitable for most crops",
                "Consider adding organic compost"
            ]
        }),
    };
    SourceResult::mock(SourcePayload::Regional(report), "Sample soil profile")
}
