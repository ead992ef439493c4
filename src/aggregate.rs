// aggregate.rs — Per-query bundle threaded from data gathering into synthesis

use crate::llm::QueryAnalysis;
use crate::sources::SourceResult;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    WebSearch,
    Weather,
    Agriculture,
    Soil,
}

/// Built fresh for each query and dropped once synthesis returns. A missing
/// key means the source was not requested or its fetch failed.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregate {
    pub query: String,
    pub analysis: QueryAnalysis,
    pub sources: BTreeMap<SourceKind, SourceResult>,
}

impl Aggregate {
    pub fn new(query: impl Into<String>, analysis: QueryAnalysis) -> Self {
        Self {
            query: query.into(),
            analysis,
            sources: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, kind: SourceKind, result: SourceResult) {
        self.sources.insert(kind, result);
    }

    pub fn get(&self, kind: SourceKind) -> Option<&SourceResult> {
        self.sources.get(&kind)
    }

    /// The source result, only if its fetch succeeded.
    pub fn successful(&self, kind: SourceKind) -> Option<&SourceResult> {
        self.get(kind).filter(|result| result.success)
    }

    pub fn has_live_data(&self) -> bool {
        self.sources.values().any(|result| result.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{SourceOrigin, SourceResult};

    #[test]
    fn failed_and_missing_sources_are_not_successful() {
        let mut aggregate = Aggregate::new("q", QueryAnalysis::default());
        assert!(!aggregate.has_live_data());

        aggregate.insert(
            SourceKind::Weather,
            SourceResult::failed(SourceOrigin::OpenMeteo, "boom", "Unable to fetch"),
        );
        assert!(aggregate.get(SourceKind::Weather).is_some());
        assert!(aggregate.successful(SourceKind::Weather).is_none());
        assert!(aggregate.successful(SourceKind::WebSearch).is_none());
        assert!(!aggregate.has_live_data());
    }

    #[test]
    fn serializes_sources_by_camel_case_kind() {
        let mut aggregate = Aggregate::new("q", QueryAnalysis::default());
        aggregate.insert(
            SourceKind::WebSearch,
            SourceResult::failed(SourceOrigin::Mock, "e", "m"),
        );
        let json = serde_json::to_value(&aggregate).unwrap();
        assert!(json["sources"]["webSearch"].is_object());
        assert_eq!(json["sources"]["webSearch"]["success"], false);
    }
}
