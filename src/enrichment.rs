//! Term Enrichment Lookup
//!
//! Pulls a candidate medical term out of "what is <term>" questions and fetches
//! a short definition for it. Every failure degrades to "no definition"; a miss
//! here never fails the request.

use crate::error::{AssistantError, Result};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

lazy_static! {
    static ref WHAT_IS_PATTERN: Regex =
        Regex::new(r"(?i)what is ([A-Za-z0-9\- ]+)").expect("valid term pattern");
}

/// Term found in a question, e.g. "diabetes" from "What is diabetes?".
pub fn extract_term(question: &str) -> Option<String> {
    let captures = WHAT_IS_PATTERN.captures(question)?;
    let term = captures.get(1)?.as_str().trim();
    if term.is_empty() {
        None
    } else {
        Some(term.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    pub term: String,
    pub text: String,
}

/// External free-text definition source.
#[async_trait]
pub trait DefinitionSource: Send + Sync {
    /// Summary text for `term`, or `None` on any failure.
    async fn summary(&self, term: &str) -> Option<String>;
}

#[derive(Debug, Deserialize)]
struct PageSummary {
    extract: Option<String>,
}

/// Wikipedia REST `page/summary` client.
#[derive(Clone)]
pub struct WikipediaClient {
    base_url: Url,
    http: reqwest::Client,
}

impl WikipediaClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://en.wikipedia.org/api/rest_v1/page/summary";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AssistantError::Config(format!("Invalid definition source URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AssistantError::Config(format!(
                "Definition source URL '{}' cannot carry a path",
                base_url
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssistantError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { base_url, http })
    }

    /// Request URL for a term; the term becomes one percent-encoded path segment.
    pub fn summary_url(&self, term: &str) -> Option<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push(term);
        Some(url)
    }
}

#[async_trait]
impl DefinitionSource for WikipediaClient {
    async fn summary(&self, term: &str) -> Option<String> {
        let url = self.summary_url(term)?;
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(term, error = %e, "definition lookup failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(term, status = %response.status(), "no definition page");
            return None;
        }
        match response.json::<PageSummary>().await {
            Ok(page) => page.extract.filter(|text| !text.trim().is_empty()),
            Err(e) => {
                warn!(term, error = %e, "malformed definition response");
                None
            }
        }
    }
}

/// Extracts a term from the question and looks it up.
#[derive(Clone)]
pub struct TermEnricher {
    source: Arc<dyn DefinitionSource>,
}

impl TermEnricher {
    pub fn new(source: Arc<dyn DefinitionSource>) -> Self {
        Self { source }
    }

    pub async fn enrich(&self, question: &str) -> Option<Definition> {
        let term = extract_term(question)?;
        match self.source.summary(&term).await {
            Some(text) => {
                info!("📖 Found definition for '{}'", term);
                Some(Definition { term, text })
            }
            None => {
                debug!("no definition for '{}'", term);
                None
            }
        }
    }
}
