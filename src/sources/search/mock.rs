use crate::sources::{SearchHit, SearchResults, SourcePayload, SourceResult};

/// Deterministic sample results used when no live tier answers.
pub fn mock_results(query: &str) -> SourceResult {
    let results = SearchResults {
        query: query.to_string(),
        summary: format!(
            "Mock search results for: \"{}\". Configure search providers for real results.",
            query
        ),
        sources: vec![
            SearchHit {
                title: "Example Source 1".to_string(),
                url: "https://example.com/1".to_string(),
                snippet: "This is a mock search result. Configure a Poe API key or enable \
                          DuckDuckGo/Wikipedia for real results."
                    .to_string(),
            },
            SearchHit {
                title: "Example Source 2".to_string(),
                url: "https://example.com/2".to_string(),
                snippet: "Mock data for testing purposes.".to_string(),
            },
        ],
    };

    SourceResult::mock(
        SourcePayload::Search(results),
        "No live search provider returned results",
    )
}
