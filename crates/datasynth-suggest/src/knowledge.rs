//! Knowledge-base lookup: find the best page for a query and pull out its
//! fact-box labels and a short summary.

use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::factbox::extract_factbox_labels;
use crate::fetch::{FetchClient, FetchError, RetryPolicy};

const SUMMARY_MAX_CHARS: usize = 800;
const ACTION_API_PATH: &str = "/w/api.php";
const REST_SEARCH_PATH: &str = "/w/rest.php/v1/search/title";
const REST_PAGE_PATH: &str = "/w/rest.php/v1/page/";

/// Page matched for a query, with whatever could be extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCandidates {
    pub title: String,
    /// Hit-count estimate reported by the search surface.
    pub hits: u64,
    /// Fact-box labels; empty when the page has no fact box.
    pub labels: Vec<String>,
    /// Plain-text summary truncated to 800 characters; may be empty.
    pub summary: String,
}

impl PageCandidates {
    /// A page without labels is a partial result: there is a title to cite
    /// but no structured attributes.
    pub fn is_partial(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Result of a successful lookup round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(PageCandidates),
    NotFound,
}

/// Source of schema candidates for a free-text query.
pub trait KnowledgeSource {
    fn lookup(&self, query: &str) -> Result<LookupOutcome, FetchError>;
}

impl<K: KnowledgeSource + ?Sized> KnowledgeSource for &K {
    fn lookup(&self, query: &str) -> Result<LookupOutcome, FetchError> {
        (**self).lookup(query)
    }
}

/// The two protocol surfaces of the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Action,
    Rest,
}

/// Encyclopedic knowledge base reachable through an action-style API with a
/// REST API as fallback.
#[derive(Debug, Clone)]
pub struct WikiKnowledgeBase {
    base_url: String,
    user_agent: String,
    policy: RetryPolicy,
}

impl WikiKnowledgeBase {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn lookup_on(
        &self,
        client: &FetchClient,
        surface: Surface,
        query: &str,
    ) -> Result<LookupOutcome, FetchError> {
        let (title, hits) = match surface {
            Surface::Action => self.action_search(client, query)?,
            Surface::Rest => self.rest_search(client, query)?,
        };
        let Some(title) = title else {
            debug!(?surface, query, "no search hits");
            return Ok(LookupOutcome::NotFound);
        };

        let (markup, summary) = match surface {
            Surface::Action => (
                self.action_markup(client, &title)?,
                self.action_summary(client, &title)?,
            ),
            Surface::Rest => (
                self.rest_markup(client, &title)?,
                self.rest_summary(client, &title)?,
            ),
        };

        let labels = extract_factbox_labels(&markup);
        debug!(?surface, %title, labels = labels.len(), "extracted fact-box labels");

        Ok(LookupOutcome::Found(PageCandidates {
            title,
            hits,
            labels,
            summary,
        }))
    }

    fn action_url(&self) -> String {
        format!("{}{ACTION_API_PATH}", self.base_url)
    }

    fn action_search(
        &self,
        client: &FetchClient,
        query: &str,
    ) -> Result<(Option<String>, u64), FetchError> {
        let data = client.get_json(
            &self.action_url(),
            &[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("format", "json"),
                ("srlimit", "1"),
                ("utf8", "1"),
            ],
        )?;

        let title = data["query"]["search"]
            .get(0)
            .and_then(|hit| hit["title"].as_str())
            .filter(|title| !title.is_empty())
            .map(str::to_string);
        let hits = data["query"]["searchinfo"]["totalhits"]
            .as_u64()
            .unwrap_or(0);
        Ok((title, hits))
    }

    fn action_markup(&self, client: &FetchClient, title: &str) -> Result<String, FetchError> {
        let data = client.get_json(
            &self.action_url(),
            &[
                ("action", "parse"),
                ("page", title),
                ("prop", "text"),
                ("formatversion", "2"),
                ("format", "json"),
                ("utf8", "1"),
            ],
        )?;
        Ok(data["parse"]["text"].as_str().unwrap_or_default().to_string())
    }

    fn action_summary(&self, client: &FetchClient, title: &str) -> Result<String, FetchError> {
        let data = client.get_json(
            &self.action_url(),
            &[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("titles", title),
                ("format", "json"),
                ("utf8", "1"),
            ],
        )?;

        let pages: Vec<&Value> = match &data["query"]["pages"] {
            Value::Object(pages) => pages.values().collect(),
            Value::Array(pages) => pages.iter().collect(),
            _ => Vec::new(),
        };
        let extract = pages
            .into_iter()
            .filter_map(|page| page["extract"].as_str())
            .find(|extract| !extract.is_empty())
            .unwrap_or_default();
        Ok(truncate_chars(extract, SUMMARY_MAX_CHARS))
    }

    fn rest_search(
        &self,
        client: &FetchClient,
        query: &str,
    ) -> Result<(Option<String>, u64), FetchError> {
        let url = format!("{}{REST_SEARCH_PATH}", self.base_url);
        let data = client.get_json(&url, &[("q", query), ("limit", "1")])?;

        let pages = data["pages"].as_array().map(Vec::as_slice).unwrap_or_default();
        let title = pages
            .first()
            .and_then(|page| page["title"].as_str())
            .filter(|title| !title.is_empty())
            .map(str::to_string);
        Ok((title, pages.len() as u64))
    }

    fn rest_markup(&self, client: &FetchClient, title: &str) -> Result<String, FetchError> {
        let url = self.rest_page_url(title, Some("with_html"))?;
        let data = client.get_json(&url, &[])?;
        Ok(data["html"].as_str().unwrap_or_default().to_string())
    }

    fn rest_summary(&self, client: &FetchClient, title: &str) -> Result<String, FetchError> {
        let url = self.rest_page_url(title, None)?;
        let data = client.get_json(&url, &[])?;
        let extract = data["extract"]
            .as_str()
            .filter(|text| !text.is_empty())
            .or_else(|| data["description"].as_str())
            .unwrap_or_default();
        Ok(truncate_chars(extract, SUMMARY_MAX_CHARS))
    }

    /// Page URL with the title encoded as a single path segment.
    fn rest_page_url(&self, title: &str, suffix: Option<&str>) -> Result<String, FetchError> {
        let raw = format!("{}{REST_PAGE_PATH}", self.base_url);
        let invalid = || FetchError::InvalidUrl { url: raw.clone() };
        let mut url = Url::parse(&raw).map_err(|_| invalid())?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| invalid())?;
            segments.pop_if_empty().push(title);
            if let Some(suffix) = suffix {
                segments.push(suffix);
            }
        }
        Ok(url.to_string())
    }
}

impl KnowledgeSource for WikiKnowledgeBase {
    /// Try the action surface; on any failure there, repeat the whole
    /// search/markup/summary sequence against the REST surface.
    fn lookup(&self, query: &str) -> Result<LookupOutcome, FetchError> {
        let client = FetchClient::new(&self.user_agent)?.with_policy(self.policy);

        let outcome = match self.lookup_on(&client, Surface::Action, query) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(query, error = %err, "action API lookup failed; falling back to REST API");
                self.lookup_on(&client, Surface::Rest, query)?
            }
        };

        if let LookupOutcome::Found(page) = &outcome {
            info!(
                query,
                title = %page.title,
                hits = page.hits,
                labels = page.labels.len(),
                "knowledge-base page matched"
            );
        }
        Ok(outcome)
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_page_url_encodes_title_as_one_segment() {
        let kb = WikiKnowledgeBase::new("https://kb.example.org/", "test-agent");
        let url = kb
            .rest_page_url("AC/DC discography", Some("with_html"))
            .expect("build url");
        assert_eq!(
            url,
            "https://kb.example.org/w/rest.php/v1/page/AC%2FDC%20discography/with_html"
        );
    }

    #[test]
    fn truncation_counts_characters() {
        let text = "é".repeat(900);
        assert_eq!(truncate_chars(&text, SUMMARY_MAX_CHARS).chars().count(), 800);
        assert_eq!(truncate_chars("short", SUMMARY_MAX_CHARS), "short");
    }

    #[test]
    fn partial_pages_have_no_labels() {
        let page = PageCandidates {
            title: "Mars".to_string(),
            hits: 10,
            labels: Vec::new(),
            summary: String::new(),
        };
        assert!(page.is_partial());
    }
}
