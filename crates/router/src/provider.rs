pub mod anthropic;

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::response::ProviderResponse;

/// Boxed future returned by Provider methods (for dyn compatibility).
pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProviderResponse, ProviderError>> + Send + 'a>>;

/// Wire type of Anthropic's hosted web search tool.
pub const WEB_SEARCH_TOOL_TYPE: &str = "web_search_20250305";
pub const WEB_SEARCH_TOOL_NAME: &str = "web_search";

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// A provider handles the actual HTTP call to an LLM API.
///
/// Implementations translate a [`CompletionRequest`] into the
/// provider-specific request shape and parse the reply into ordered
/// [`Segment`](crate::response::Segment)s.
pub trait Provider: Send + Sync {
    /// Make a single completion call. No retries.
    fn complete(&self, request: &CompletionRequest) -> ProviderFuture<'_>;
}

/// Errors from a provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {body}")]
    Authentication { body: String },

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },
}

impl ProviderError {
    /// True only when the service rejected the credential.
    pub fn is_authentication(&self) -> bool {
        matches!(self, ProviderError::Authentication { .. })
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A tool that runs on the provider's side; this program only declares it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_uses: Option<u32>,
}

impl HostedTool {
    pub fn web_search(max_uses: Option<u32>) -> Self {
        Self {
            kind: WEB_SEARCH_TOOL_TYPE.into(),
            name: WEB_SEARCH_TOOL_NAME.into(),
            max_uses,
        }
    }
}

/// Everything needed for one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    pub max_tokens: u32,
    pub tools: Vec<HostedTool>,
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_search_tool_serializes_to_wire_shape() {
        let json = serde_json::to_value(HostedTool::web_search(None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "web_search_20250305", "name": "web_search"})
        );

        let capped = serde_json::to_value(HostedTool::web_search(Some(5))).unwrap();
        assert_eq!(capped["max_uses"], 5);
    }

    #[test]
    fn message_role_serde() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn only_authentication_is_authentication() {
        let auth = ProviderError::Authentication { body: "bad key".into() };
        assert!(auth.is_authentication());

        let others = [
            ProviderError::Api {
                status: 403,
                body: "forbidden".into(),
            },
            ProviderError::Api {
                status: 500,
                body: "boom".into(),
            },
            ProviderError::Parse("eof".into()),
            ProviderError::RateLimited {
                retry_after_ms: Some(1000),
            },
        ];
        for err in others {
            assert!(!err.is_authentication(), "{err} misclassified");
        }
    }
}
