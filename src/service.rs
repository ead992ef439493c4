// service.rs — Long-lived entry point: degraded-capable startup, request aliasing, status

use crate::config::{mask_api_key, AppConfig};
use crate::failover::{ProviderStats, RingError};
use crate::pipeline::{PipelineError, QueryPipeline, QueryResponse, Route};
use crate::sources::WebSearchClient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Degraded,
}

/// Inbound query. Clients use any of several field names for the text.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    #[serde(alias = "message", alias = "input", alias = "text", alias = "prompt")]
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReply {
    pub success: bool,
    pub query: String,
    pub response: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switched_from: Option<String>,
    pub route: Route,
}

impl QueryReply {
    fn from_response(query: String, response: QueryResponse) -> Self {
        Self {
            success: true,
            query,
            response: response.answer,
            provider: response.provider,
            switched_from: response.switched_from,
            route: response.route,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub health: Health,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_provider: Option<String>,
    pub providers: Vec<ProviderStats>,
    pub provider_switches: u64,
    pub search_tiers: Vec<&'static str>,
    pub agriculture: &'static str,
    pub credentials: BTreeMap<&'static str, String>,
    pub config: AppConfig,
}

pub struct AgentService {
    config: AppConfig,
    pipeline: Option<QueryPipeline>,
}

impl AgentService {
    /// Never fails. With no usable provider the service starts degraded
    /// and every query reports why.
    pub fn start(config: AppConfig) -> Self {
        let pipeline = match QueryPipeline::from_config(&config) {
            Ok(pipeline) => Some(pipeline),
            Err(e) => {
                tracing::error!("Service starting degraded: {}", e);
                None
            }
        };
        Self { config, pipeline }
    }

    pub fn health(&self) -> Health {
        if self.pipeline.is_some() {
            Health::Healthy
        } else {
            Health::Degraded
        }
    }

    pub fn current_provider(&self) -> Option<String> {
        self.pipeline.as_ref().map(|p| p.ring().current_provider())
    }

    fn pipeline(&self) -> Result<&QueryPipeline, PipelineError> {
        self.pipeline
            .as_ref()
            .ok_or(PipelineError::Ring(RingError::NoProviderAvailable))
    }

    pub async fn process_query(&self, text: &str) -> Result<String, PipelineError> {
        self.pipeline()?.process_query(text).await
    }

    pub async fn handle(&self, request: QueryRequest) -> Result<QueryReply, PipelineError> {
        if request.query.trim().is_empty() {
            return Err(PipelineError::EmptyQuery);
        }
        let response = self.pipeline()?.process(&request.query).await?;
        Ok(QueryReply::from_response(request.query, response))
    }

    pub fn status(&self) -> ServiceStatus {
        let ring = self.pipeline.as_ref().map(|p| p.ring());

        ServiceStatus {
            health: self.health(),
            reason: ring
                .is_none()
                .then(|| RingError::NoProviderAvailable.to_string()),
            current_provider: ring.map(|r| r.current_provider()),
            providers: ring.map(|r| r.provider_stats()).unwrap_or_default(),
            provider_switches: ring.map(|r| r.switch_count()).unwrap_or(0),
            search_tiers: WebSearchClient::configured_tiers(&self.config),
            agriculture: if self.config.agriculture_configured() {
                "live"
            } else {
                "mock"
            },
            credentials: masked_credentials(&self.config),
            config: self.config.clone(),
        }
    }
}

fn masked_credentials(config: &AppConfig) -> BTreeMap<&'static str, String> {
    [
        ("gemini", config.gemini_api_key.as_deref()),
        ("groq", config.valid_groq_key()),
        ("openrouter", config.openrouter_api_key.as_deref()),
        ("poe", config.poe_api_key.as_deref()),
        ("agriculture", config.agriculture_api_key.as_deref()),
    ]
    .into_iter()
    .filter_map(|(name, key)| key.map(|k| (name, mask_api_key(k))))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn request_accepts_field_aliases() {
        for field in ["query", "message", "input", "text", "prompt"] {
            let body = format!(r#"{{"{}": "Rain in Accra?"}}"#, field);
            let request: QueryRequest = serde_json::from_str(&body).unwrap();
            assert_eq!(request.query, "Rain in Accra?");
        }
        assert!(serde_json::from_str::<QueryRequest>(r#"{"question": "x"}"#).is_err());
    }

    #[tokio::test]
    async fn starts_degraded_without_providers() {
        let service = AgentService::start(config_from(&[]));

        assert_eq!(service.health(), Health::Degraded);
        assert!(service.current_provider().is_none());
        let err = service.process_query("hello").await.unwrap_err();
        assert!(matches!(err, PipelineError::Ring(RingError::NoProviderAvailable)));
    }

    #[tokio::test]
    async fn blank_request_is_rejected_before_dispatch() {
        let service = AgentService::start(config_from(&[]));
        let err = service
            .handle(QueryRequest {
                query: "  ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyQuery));
    }

    #[test]
    fn status_reports_configuration_without_secrets() {
        let service = AgentService::start(config_from(&[
            ("GEMINI_API_KEY", "AIzaSyExampleKey1234"),
            ("POE_API_KEY", "poe-secret-key-9876"),
        ]));
        let status = service.status();

        assert_eq!(status.health, Health::Healthy);
        assert_eq!(status.current_provider.as_deref(), Some("Gemini"));
        assert_eq!(status.search_tiers, vec!["poe", "duckduckgo", "wikipedia", "mock"]);
        assert_eq!(status.agriculture, "mock");
        assert_eq!(status.credentials["gemini"], "AIzaSy********1234");

        let json = serde_json::to_string(&status).unwrap();
        assert!(!json.contains("AIzaSyExampleKey1234"));
        assert!(!json.contains("poe-secret-key-9876"));
        assert!(json.contains("\"health\":\"healthy\""));
    }

    #[test]
    fn degraded_status_explains_reason() {
        let status = AgentService::start(config_from(&[])).status();
        assert_eq!(status.health, Health::Degraded);
        assert!(status.reason.unwrap().contains("No AI providers available"));
        assert!(status.providers.is_empty());
    }
}
