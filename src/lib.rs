pub mod aggregate;
pub mod chat;
pub mod codegen;
pub mod config;
pub mod failover;
pub mod json_repair;
pub mod llm;
pub mod pipeline;
pub mod service;
pub mod sources;

pub use aggregate::{Aggregate, SourceKind};
pub use config::AppConfig;
pub use failover::{FailoverRing, RingError, RingOutcome};
pub use llm::{LLMError, ProviderAdapter, QueryAnalysis};
pub use pipeline::{PipelineError, QueryPipeline, QueryResponse, Route};
pub use service::{AgentService, Health, QueryRequest, ServiceStatus};
pub use sources::{DataSources, SourceResult};
