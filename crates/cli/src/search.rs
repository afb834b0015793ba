//! Job search orchestration: compose the prompt, submit it once with the
//! hosted web search tool enabled, and render the text that comes back.

use std::io::Write;

use job_search_kernel::Settings;
use job_search_router::{CompletionRequest, HostedTool, Message, Provider, ProviderError};
use tracing::debug;

/// Width of the separator lines framing results.
pub const SEPARATOR_WIDTH: usize = 80;

pub const NO_RESULTS: &str = "No results found. Try different keywords or location.";

pub fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

/// What to search for. Both fields are trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keywords: String,
    pub location: String,
}

impl SearchQuery {
    /// `None` if either field is blank.
    pub fn new(keywords: &str, location: &str) -> Option<Self> {
        let keywords = keywords.trim();
        let location = location.trim();
        if keywords.is_empty() || location.is_empty() {
            return None;
        }
        Some(Self {
            keywords: keywords.to_string(),
            location: location.to_string(),
        })
    }
}

/// Build the instruction sent to the model.
pub fn compose_prompt(query: &SearchQuery) -> String {
    format!(
        "Search for current job openings for '{keywords}' in or near '{location}'.\n\
         \n\
         Find recent job listings and for each one provide:\n\
         1. Job title and company name\n\
         2. Location\n\
         3. A brief description or the key requirements\n\
         4. A link to apply (if available)\n\
         \n\
         Format the results so they are easy to read, and focus on the most relevant \
         and recent postings.",
        keywords = query.keywords,
        location = query.location,
    )
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(
        "Invalid API key. Please check your API key and try again.\n\
         You can reset your API key with: job-search --reset-key"
    )]
    InvalidApiKey,

    #[error("{0}")]
    Failed(ProviderError),
}

impl From<ProviderError> for SearchError {
    fn from(err: ProviderError) -> Self {
        if err.is_authentication() {
            debug!(error = %err, "API key rejected");
            SearchError::InvalidApiKey
        } else {
            SearchError::Failed(err)
        }
    }
}

/// Result of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Text segments joined with newlines; `None` when the service sent none.
    pub text: Option<String>,
    pub web_search_requests: u64,
    pub total_tokens: u64,
    pub cost: f64,
}

pub struct JobSearch<P> {
    provider: P,
    model: String,
    max_tokens: u32,
    max_searches: Option<u32>,
}

impl<P: Provider> JobSearch<P> {
    pub fn new(provider: P, settings: &Settings) -> Self {
        Self {
            provider,
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            max_searches: settings.max_searches,
        }
    }

    #[cfg(test)]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The request submitted for `query`.
    pub fn request(&self, query: &SearchQuery) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            tools: vec![HostedTool::web_search(self.max_searches)],
            messages: vec![Message::user(compose_prompt(query))],
        }
    }

    /// Run one search. A single attempt; failures are returned as-is.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        let request = self.request(query);
        let response = self.provider.complete(&request).await?;

        let text = response.text();
        debug!(
            model = %response.model,
            latency_ms = response.latency_ms,
            segments = response.segments.len(),
            has_text = text.is_some(),
            stop_reason = ?response.stop_reason,
            "search response"
        );

        Ok(SearchOutcome {
            text,
            web_search_requests: response.web_search_requests,
            total_tokens: response.total_tokens(),
            cost: response.cost,
        })
    }
}

/// Print the outcome framed by separators, or the no-results notice.
pub fn render(outcome: &SearchOutcome, out: &mut impl Write) -> std::io::Result<()> {
    match &outcome.text {
        Some(text) => {
            let sep = separator();
            writeln!(out, "{sep}")?;
            writeln!(out, "{text}")?;
            writeln!(out, "{sep}")?;
        }
        None => writeln!(out, "{NO_RESULTS}")?,
    }
    out.flush()
}
