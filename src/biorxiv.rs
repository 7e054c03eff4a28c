//! bioRxiv preprint search.
//!
//! Site-restricted web search returning numbered title/URL/snippet blocks.
//! The tool contract is text-in, text-out: failures become readable error
//! text for the model rather than errors crossing the agent loop.

use crate::error::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";
const MAX_RESULTS: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, rename = "RelatedTopics")]
    related_topics: Vec<Topic>,
    #[serde(default, rename = "AbstractText")]
    abstract_text: String,
    #[serde(default, rename = "AbstractURL")]
    abstract_url: String,
}

/// Topics arrive either as direct results or nested under a category;
/// category entries carry a `Topics` array and no `Text`/`FirstURL`.
#[derive(Debug, Deserialize)]
struct Topic {
    #[serde(default, rename = "FirstURL")]
    first_url: Option<String>,
    #[serde(default, rename = "Text")]
    text: Option<String>,
    #[serde(default, rename = "Topics")]
    topics: Option<Vec<Topic>>,
}

/// One formatted search hit.
#[derive(Debug, Clone)]
struct Hit {
    url: String,
    text: String,
}

fn collect_hits(topics: &[Topic], hits: &mut Vec<Hit>) {
    for topic in topics {
        if hits.len() >= MAX_RESULTS {
            return;
        }
        if let (Some(url), Some(text)) = (&topic.first_url, &topic.text) {
            if !text.is_empty() {
                hits.push(Hit {
                    url: url.clone(),
                    text: text.clone(),
                });
            }
        }
        if let Some(nested) = &topic.topics {
            collect_hits(nested, hits);
        }
    }
}

/// bioRxiv preprint search client.
pub struct BiorxivSearch {
    http: reqwest::Client,
}

impl BiorxivSearch {
    /// Create a search client with the given request timeout.
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("svar/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Search bioRxiv for preprints matching the query.
    ///
    /// Always returns text: results, a "no results" message, or error text.
    pub async fn search(&self, query: &str) -> String {
        match self.search_inner(query).await {
            Ok(Some(formatted)) => formatted,
            Ok(None) => format!("No bioRxiv preprints found for query: {}", query),
            Err(e) => format!("Error searching bioRxiv: {}", e),
        }
    }

    async fn search_inner(&self, query: &str) -> Result<Option<String>> {
        let search_query = format!("site:biorxiv.org {}", query);
        let url = Url::parse_with_params(
            SEARCH_ENDPOINT,
            &[
                ("q", search_query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )
        .map_err(|e| crate::error::SvarError::Tool(format!("Bad search URL: {}", e)))?;

        debug!("bioRxiv search: {}", search_query);

        let response: SearchResponse = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut hits = Vec::new();
        if !response.abstract_text.is_empty() {
            hits.push(Hit {
                url: response.abstract_url.clone(),
                text: response.abstract_text.clone(),
            });
        }
        collect_hits(&response.related_topics, &mut hits);

        if hits.is_empty() {
            return Ok(None);
        }

        let formatted = hits
            .iter()
            .take(MAX_RESULTS)
            .enumerate()
            .map(|(i, hit)| format!("{}. {}\n   URL: {}", i + 1, hit.text, hit.url))
            .collect::<Vec<_>>()
            .join("\n\n");

        Ok(Some(formatted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_hits_flattens_categories() {
        let response: SearchResponse = serde_json::from_str(
            r#"{
                "AbstractText": "",
                "AbstractURL": "",
                "RelatedTopics": [
                    {"FirstURL": "https://www.biorxiv.org/content/1", "Text": "First preprint"},
                    {"Topics": [
                        {"FirstURL": "https://www.biorxiv.org/content/2", "Text": "Nested preprint"}
                    ]},
                    {"Name": "See also"}
                ]
            }"#,
        )
        .unwrap();

        let mut hits = Vec::new();
        collect_hits(&response.related_topics, &mut hits);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "First preprint");
        assert_eq!(hits[1].url, "https://www.biorxiv.org/content/2");
    }

    #[test]
    fn test_hits_capped_at_max_results() {
        let topics: Vec<Topic> = (0..10)
            .map(|i| Topic {
                first_url: Some(format!("https://www.biorxiv.org/content/{}", i)),
                text: Some(format!("Preprint {}", i)),
                topics: None,
            })
            .collect();

        let mut hits = Vec::new();
        collect_hits(&topics, &mut hits);
        assert_eq!(hits.len(), MAX_RESULTS);
    }
}
