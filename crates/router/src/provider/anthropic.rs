use std::time::Instant;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CompletionRequest, HostedTool, Message, Provider, ProviderError, ProviderFuture};
use crate::response::{ProviderResponse, Segment};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    /// `base_url` is the full messages endpoint.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
        }
    }

    /// POST a JSON body to the Anthropic API, handle status codes,
    /// return `(response_text, latency_ms)`.
    async fn send_request(&self, body: &impl Serialize) -> Result<(String, u64), ProviderError> {
        let start = Instant::now();

        let resp = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let status = resp.status().as_u16();

        if status == 429 || status == 529 {
            return Err(ProviderError::RateLimited {
                retry_after_ms: resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(|s| s * 1000)
                    .or(if status == 529 { Some(5000) } else { None }),
            });
        }

        let resp_text = resp.text().await?;

        if status == 401 {
            return Err(ProviderError::Authentication { body: resp_text });
        }

        if status >= 400 {
            return Err(ProviderError::Api {
                status,
                body: resp_text,
            });
        }

        Ok((resp_text, latency_ms))
    }

    /// Parse an Anthropic response body into ordered segments plus usage
    /// and cost.
    fn parse_response(
        resp_text: &str,
        model: &str,
        latency_ms: u64,
    ) -> Result<ProviderResponse, ProviderError> {
        let parsed: AnthropicResponse = serde_json::from_str(resp_text)
            .map_err(|e| ProviderError::Parse(format!("{e}: {resp_text}")))?;

        let segments: Vec<Segment> = parsed
            .content
            .into_iter()
            .map(|block| {
                if block.r#type == "text" {
                    if let Some(text) = block.text {
                        return Segment::Text(text);
                    }
                    warn!("text block without text field");
                }
                Segment::Other { kind: block.r#type }
            })
            .collect();

        let prompt_tokens = parsed.usage.input_tokens;
        let completion_tokens = parsed.usage.output_tokens;
        let web_search_requests = parsed
            .usage
            .server_tool_use
            .map(|u| u.web_search_requests)
            .unwrap_or(0);
        let cost = estimate_anthropic_cost(model, prompt_tokens, completion_tokens);

        debug!(
            model,
            latency_ms,
            prompt_tokens,
            completion_tokens,
            web_search_requests,
            cost,
            segments = segments.len(),
            "anthropic response"
        );

        Ok(ProviderResponse {
            segments,
            model: parsed.model.unwrap_or_else(|| model.to_string()),
            prompt_tokens,
            completion_tokens,
            web_search_requests,
            cost,
            latency_ms,
            stop_reason: parsed.stop_reason,
        })
    }
}

impl Provider for AnthropicProvider {
    fn complete(&self, request: &CompletionRequest) -> ProviderFuture<'_> {
        let request = request.clone();

        Box::pin(async move {
            let body = AnthropicRequest {
                model: &request.model,
                max_tokens: request.max_tokens,
                tools: &request.tools,
                messages: &request.messages,
            };

            debug!(
                url = %self.base_url,
                model = %request.model,
                max_tokens = request.max_tokens,
                tools = request.tools.len(),
                "sending anthropic request"
            );

            let (resp_text, latency_ms) = self.send_request(&body).await?;
            Self::parse_response(&resp_text, &request.model, latency_ms)
        })
    }
}

// ---------------------------------------------------------------------------
// Request/response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    tools: &'a [HostedTool],
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseBlock>,
    usage: Usage,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// A content block in an Anthropic API *response*. Only `text` blocks carry
/// displayable content; tool blocks are kept by type alone.
#[derive(Deserialize)]
struct ResponseBlock {
    r#type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
    #[serde(default)]
    server_tool_use: Option<ServerToolUse>,
}

#[derive(Deserialize)]
struct ServerToolUse {
    #[serde(default)]
    web_search_requests: u64,
}

fn estimate_anthropic_cost(model: &str, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    let (input_per_m, output_per_m) = if model.contains("opus") {
        (15.0, 75.0)
    } else if model.contains("sonnet") {
        (3.0, 15.0)
    } else if model.contains("haiku") {
        (0.25, 1.25)
    } else {
        (3.0, 15.0)
    };

    let input_cost = (prompt_tokens as f64 / 1_000_000.0) * input_per_m;
    let output_cost = (completion_tokens as f64 / 1_000_000.0) * output_per_m;
    input_cost + output_cost
}
