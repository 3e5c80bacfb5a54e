//! Anthropic backend over the `/v1/messages` API.
//!
//! Requests carry the prompt layers in the top-level `system` field and a
//! single user turn. Only text blocks are read back.

use serde::{Deserialize, Serialize};

use crate::credentials::ApiKey;

use super::{
    http_client, post_json, CompletionRequest, CompletionResponse, LlmProvider, ProviderError,
    StopReason, UsageStats,
};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
/// The messages API requires a cap, so one is always sent.
const FALLBACK_MAX_TOKENS: u32 = 4096;

/// Request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct MessagesBody {
    /// Model name without the provider prefix.
    pub model: String,
    /// Output cap.
    pub max_tokens: u32,
    /// Prompt layers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Always exactly one user turn.
    pub messages: [Turn; 1],
}

/// One conversation turn.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct Turn {
    /// Always `user`.
    pub role: &'static str,
    /// Turn text.
    pub content: String,
}

/// Response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct MessagesReply {
    /// Reply blocks in order.
    pub content: Vec<Block>,
    /// Serving model.
    pub model: String,
    /// `end_turn`, `max_tokens`, ...
    pub stop_reason: Option<String>,
    /// Token counts.
    pub usage: TokenCounts,
}

/// A reply block. Only text is requested; anything else is skipped.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Reply text.
    Text {
        /// Block text.
        text: String,
    },
    /// Thinking or other block kinds.
    #[serde(other)]
    Other,
}

/// Token counts as reported.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct TokenCounts {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Reply tokens.
    pub output_tokens: u32,
}

/// Anthropic text backend.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    model_spec: String,
    model_name: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Backend for `model_name`, reported in logs as `model_spec`.
    pub fn new(model_spec: String, model_name: String, api_key: ApiKey) -> Self {
        Self {
            model_spec,
            model_name,
            api_key,
            client: http_client(),
        }
    }
}

/// Wire body for `request`.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> MessagesBody {
    MessagesBody {
        model: model.to_owned(),
        max_tokens: request.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
        system: request.system.clone(),
        messages: [Turn {
            role: "user",
            content: request.prompt.clone(),
        }],
    }
}

fn stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        None | Some("end_turn" | "stop_sequence") => StopReason::EndTurn,
        Some("max_tokens") => StopReason::MaxTokens,
        Some(other) => StopReason::Other(other.to_owned()),
    }
}

/// Decode a response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body is not a messages reply.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let reply: MessagesReply =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let text = reply
        .content
        .into_iter()
        .filter_map(|block| match block {
            Block::Text { text } => Some(text),
            Block::Other => None,
        })
        .collect::<String>();

    Ok(CompletionResponse {
        text,
        stop_reason: stop_reason(reply.stop_reason.as_deref()),
        usage: UsageStats {
            input_tokens: reply.usage.input_tokens,
            output_tokens: reply.usage.output_tokens,
        },
        model: reply.model,
    })
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = build_request(&self.model_name, &request);
        let call = self
            .client
            .post(MESSAGES_URL)
            .header("anthropic-version", API_VERSION)
            .header("x-api-key", self.api_key.expose());
        parse_response(&post_json(call, &body).await?)
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}
