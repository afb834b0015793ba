use serde::{Deserialize, Serialize};

/// One block of a structured completion response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    /// Displayable text.
    Text(String),

    /// Anything else the service emits (e.g. `server_tool_use`,
    /// `web_search_tool_result`), identified by its wire type.
    Other { kind: String },
}

impl Segment {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::Text(text) => Some(text),
            Segment::Other { .. } => None,
        }
    }
}

/// Response from a completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Content segments in the order the service returned them.
    pub segments: Vec<Segment>,

    /// Model that served the request.
    pub model: String,

    /// Prompt tokens used.
    pub prompt_tokens: u64,

    /// Completion tokens used.
    pub completion_tokens: u64,

    /// Hosted web searches the service ran while answering.
    pub web_search_requests: u64,

    /// Estimated cost in USD.
    pub cost: f64,

    /// Roundtrip latency in milliseconds.
    pub latency_ms: u64,

    #[serde(default)]
    pub stop_reason: Option<String>,
}

impl ProviderResponse {
    /// All text segments joined with newlines, or `None` if there are none.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self.segments.iter().filter_map(Segment::as_text).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}
