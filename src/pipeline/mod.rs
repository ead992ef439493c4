// pipeline/mod.rs — Per-query orchestration: analyze, branch, gather, synthesize

use crate::aggregate::{Aggregate, SourceKind};
use crate::codegen::{CodegenError, PyqgisTemplateWriter, ScriptGenerator, ScriptRequest};
use crate::config::AppConfig;
use crate::failover::{FailoverRing, RingError, RingOutcome};
use crate::llm::QueryAnalysis;
use crate::sources::{DataSources, SourceResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ring(#[from] RingError),

    #[error("Query timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Query cannot be empty")]
    EmptyQuery,
}

/// Which branch produced the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    /// Answered from model knowledge, no data sources consulted
    Direct,
    /// Satellite-processing script written to disk
    Script,
    /// Code help that the template writer does not cover
    CodeAssist,
    /// Data gathered and synthesized
    Synthesized,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub id: String,
    pub answer: String,
    pub route: Route,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switched_from: Option<String>,
    pub analysis: QueryAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_path: Option<PathBuf>,
}

/// Provider bookkeeping across the ring calls of one query.
#[derive(Debug, Default)]
struct ProviderTrail {
    provider: String,
    switched_from: Option<String>,
}

impl ProviderTrail {
    fn record<T>(&mut self, outcome: RingOutcome<T>) -> T {
        if let Some(previous) = outcome.switched_from {
            tracing::warn!("LLM: switched from {} to {}", previous, outcome.provider);
            self.switched_from.get_or_insert(previous);
        }
        self.provider = outcome.provider;
        outcome.value
    }
}

pub struct QueryPipeline {
    ring: Arc<FailoverRing>,
    sources: DataSources,
    scripts: Arc<dyn ScriptGenerator>,
    script_dir: PathBuf,
    query_timeout: Duration,
}

impl QueryPipeline {
    pub fn new(
        ring: Arc<FailoverRing>,
        sources: DataSources,
        scripts: Arc<dyn ScriptGenerator>,
        script_dir: impl Into<PathBuf>,
        query_timeout: Duration,
    ) -> Self {
        Self {
            ring,
            sources,
            scripts,
            script_dir: script_dir.into(),
            query_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RingError> {
        let ring = FailoverRing::from_config(config)?;
        Ok(Self::new(
            Arc::new(ring),
            DataSources::from_config(config),
            Arc::new(PyqgisTemplateWriter),
            &config.script_output_dir,
            config.query_timeout(),
        ))
    }

    pub fn ring(&self) -> &FailoverRing {
        &self.ring
    }

    /// Answer text only.
    pub async fn process_query(&self, text: &str) -> Result<String, PipelineError> {
        self.process(text).await.map(|response| response.answer)
    }

    /// Run one query end to end under the per-query ceiling. In-flight
    /// provider and source calls are dropped when the ceiling is hit.
    pub async fn process(&self, text: &str) -> Result<QueryResponse, PipelineError> {
        let query = text.trim();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        let id = Uuid::new_v4();
        let span = tracing::info_span!("query", id = %id);

        match tokio::time::timeout(self.query_timeout, self.run(id, query).instrument(span)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(%id, "Query exceeded {:?}, abandoning", self.query_timeout);
                Err(PipelineError::Timeout(self.query_timeout))
            }
        }
    }

    async fn run(&self, id: Uuid, query: &str) -> Result<QueryResponse, PipelineError> {
        let mut trail = ProviderTrail::default();

        let analysis = trail.record(self.ring.analyze(query).await?);
        tracing::info!("Understanding: {}", analysis.intent);
        if let Some(location) = &analysis.location {
            tracing::info!("Location detected: {}", location);
        }

        let respond = |trail: ProviderTrail,
                       route: Route,
                       answer: String,
                       analysis: QueryAnalysis,
                       aggregate: Option<Aggregate>,
                       script_path: Option<PathBuf>| QueryResponse {
            id: id.to_string(),
            answer,
            route,
            provider: trail.provider,
            switched_from: trail.switched_from,
            analysis,
            aggregate,
            script_path,
        };

        if analysis.needs_code_generation {
            if analysis.wants_satellite_script(query) {
                match self.write_script(&analysis) {
                    Ok(path) => {
                        let answer = script_message(&path);
                        return Ok(respond(
                            trail,
                            Route::Script,
                            answer,
                            analysis,
                            None,
                            Some(path),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!("Codegen: {}; answering directly instead", e);
                    }
                }
            }

            tracing::info!("Providing coding assistance");
            let answer = trail.record(self.ring.answer_directly(query).await?);
            return Ok(respond(trail, Route::CodeAssist, answer, analysis, None, None));
        }

        if !analysis.needs_external_data() {
            tracing::info!("Answering from model knowledge");
            let answer = trail.record(self.ring.answer_directly(query).await?);
            return Ok(respond(trail, Route::Direct, answer, analysis, None, None));
        }

        let aggregate = self.gather(query, &analysis).await;
        let answer = trail.record(self.ring.synthesize(query, &aggregate).await?);
        Ok(respond(
            trail,
            Route::Synthesized,
            answer,
            analysis,
            Some(aggregate),
            None,
        ))
    }

    fn write_script(&self, analysis: &QueryAnalysis) -> Result<PathBuf, CodegenError> {
        let request = ScriptRequest::for_region(analysis.location.as_deref());
        self.scripts.generate(&request, &self.script_dir)
    }

    /// Fetch every requested source concurrently. Weather and agriculture
    /// need a location and are skipped without one.
    async fn gather(&self, query: &str, analysis: &QueryAnalysis) -> Aggregate {
        let location = analysis.location.as_deref();

        let web = async {
            if !analysis.needs_web_search {
                return None;
            }
            tracing::info!("Searching the web for: {}", analysis.search_keywords.join(", "));
            Some(self.sources.web.search(query, &analysis.search_keywords).await)
        };

        let weather = async {
            let location = location.filter(|_| analysis.needs_weather_data)?;
            tracing::info!("Checking weather for {}", location);
            Some(self.sources.weather.weather(location).await)
        };

        let regional = async {
            let location = location.filter(|_| analysis.needs_agricultural_data)?;
            tracing::info!("Fetching agricultural data for {}", location);
            let agriculture = &self.sources.agriculture;
            Some(tokio::join!(
                agriculture.agricultural_data(location, None),
                agriculture.soil_data(location)
            ))
        };

        let (web, weather, regional) = tokio::join!(web, weather, regional);

        let mut aggregate = Aggregate::new(query, analysis.clone());
        if let Some(result) = web {
            log_source("Web search", &result);
            aggregate.insert(SourceKind::WebSearch, result);
        }
        if let Some(result) = weather {
            log_source("Weather", &result);
            aggregate.insert(SourceKind::Weather, result);
        }
        if let Some((agriculture, soil)) = regional {
            log_source("Agriculture", &agriculture);
            aggregate.insert(SourceKind::Agriculture, agriculture);
            aggregate.insert(SourceKind::Soil, soil);
        }
        aggregate
    }
}

fn log_source(label: &str, result: &SourceResult) {
    if !result.success {
        tracing::warn!(
            "{} unavailable: {}",
            label,
            result.error.as_deref().unwrap_or("unknown error")
        );
    } else if result.mock {
        tracing::warn!("{} served sample data", label);
    } else {
        tracing::info!("{} retrieved from {}", label, result.source.label());
    }
}

fn script_message(path: &Path) -> String {
    format!(
        "I've generated a PyQGIS script for automated satellite imagery processing!\n\n\
        **Script saved to:** {}\n\n\
        **What it does:**\n\
        • Loads every Landsat/Sentinel-2 raster in the input folder\n\
        • Calculates NDVI (vegetation health index)\n\
        • Clips the results to your regional boundary shapefile\n\
        • Exports GeoTIFF files to the output folder\n\n\
        **Next steps:**\n\
        1. Open QGIS Desktop\n\
        2. Open Plugins → Python Console\n\
        3. Update the paths at the top of the script, then load and run it\n\n\
        Would you like me to explain any part of it?",
        path.display()
    )
}
