// sources/search/wikipedia.rs — MediaWiki search + REST page summary

use super::SearchTier;
use crate::sources::{
    read_json, truncate_chars, SearchHit, SearchResults, SourceError, SourceOrigin,
};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

const SEARCH_URL: &str = "https://en.wikipedia.org/w/api.php";
const SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
const SEARCH_LIMIT: &str = "3";

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: String,
}

pub struct WikipediaTier {
    client: Client,
}

impl WikipediaTier {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("regional-agent/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    async fn titles(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let response = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", SEARCH_LIMIT),
                ("format", "json"),
            ])
            .send()
            .await?;
        let body: SearchResponse = read_json(response).await?;

        Ok(body
            .query
            .map(|q| q.search.into_iter().map(|e| e.title).collect())
            .unwrap_or_default())
    }

    async fn summary(&self, title: &str) -> Result<PageSummary, SourceError> {
        let response = self.client.get(summary_url(title)?).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl SearchTier for WikipediaTier {
    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Wikipedia
    }

    /// Keywords are ignored; article search works best on the plain query.
    async fn search(
        &self,
        query: &str,
        _keywords: &[String],
    ) -> Result<Option<SearchResults>, SourceError> {
        let titles = self.titles(query).await?;
        let results =
            first_usable_page(query, titles, |title| async move { self.summary(&title).await })
                .await;
        Ok(results)
    }
}

/// Walk the search hits in rank order. Disambiguation pages, empty extracts
/// and failed summary lookups all move on to the next title.
async fn first_usable_page<F, Fut>(
    query: &str,
    titles: Vec<String>,
    summary: F,
) -> Option<SearchResults>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<PageSummary, SourceError>>,
{
    for title in titles {
        match summary(title.clone()).await {
            Ok(page) => {
                if let Some(results) = results_from_summary(query, page) {
                    return Some(results);
                }
            }
            Err(e) => tracing::warn!("Search: wikipedia summary for '{}' failed: {}", title, e),
        }
    }
    None
}

fn results_from_summary(query: &str, page: PageSummary) -> Option<SearchResults> {
    if page.kind == "disambiguation" || page.extract.trim().is_empty() {
        return None;
    }

    let url = page
        .content_urls
        .and_then(|u| u.desktop)
        .map(|d| d.page)
        .unwrap_or_else(|| {
            format!("https://en.wikipedia.org/wiki/{}", page.title.replace(' ', "_"))
        });
    let snippet = format!("{}...", truncate_chars(&page.extract, 200));

    Some(SearchResults {
        query: query.to_string(),
        summary: page.extract,
        sources: vec![SearchHit {
            title: page.title,
            url,
            snippet,
        }],
    })
}

fn summary_url(title: &str) -> Result<Url, SourceError> {
    let mut url = Url::parse(SUMMARY_URL).map_err(|e| SourceError::Parse(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| SourceError::Parse(format!("{} cannot take a path", SUMMARY_URL)))?
        .pop_if_empty()
        .push(&title.replace(' ', "_"));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(kind: &str, title: &str, extract: &str) -> PageSummary {
        serde_json::from_value(serde_json::json!({
            "type": kind,
            "title": title,
            "extract": extract,
        }))
        .unwrap()
    }

    #[test]
    fn standard_page_becomes_single_hit() {
        let extract = "Teff is an annual grass native to the Horn of Africa. ".repeat(6);
        let results = results_from_summary("teff", page("standard", "Teff", &extract)).unwrap();

        assert_eq!(results.summary, extract);
        assert_eq!(results.sources[0].url, "https://en.wikipedia.org/wiki/Teff");
        assert_eq!(results.sources[0].snippet.chars().count(), 203);
        assert!(results.sources[0].snippet.ends_with("..."));
    }

    #[test]
    fn disambiguation_pages_are_skipped() {
        let disambiguation = page("disambiguation", "Java", "Java may refer to");
        assert!(results_from_summary("java", disambiguation).is_none());
        assert!(results_from_summary("x", page("standard", "X", "  ")).is_none());
    }

    #[test]
    fn summary_url_encodes_title_as_one_segment() {
        assert_eq!(
            summary_url("São Paulo").unwrap().as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/S%C3%A3o_Paulo"
        );
        assert_eq!(
            summary_url("AC/DC").unwrap().as_str(),
            "https://en.wikipedia.org/api/rest_v1/page/summary/AC%2FDC"
        );
    }

    #[tokio::test]
    async fn failed_summary_moves_on_to_next_title() {
        let titles = vec!["Broken".to_string(), "Teff".to_string()];
        let results = first_usable_page("teff", titles, |title| async move {
            if title == "Broken" {
                Err(SourceError::Http(500))
            } else {
                Ok(page("standard", &title, "Teff is an annual grass."))
            }
        })
        .await
        .unwrap();

        assert_eq!(results.sources[0].title, "Teff");
    }

    #[tokio::test]
    async fn no_usable_title_yields_nothing() {
        let titles = vec!["Java".to_string()];
        let results = first_usable_page("java", titles, |title| async move {
            Ok(page("disambiguation", &title, "Java may refer to"))
        })
        .await;
        assert!(results.is_none());
    }
}
