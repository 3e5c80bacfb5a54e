//! OpenAI backend over the `/v1/chat/completions` API.

use serde::{Deserialize, Serialize};

use crate::credentials::ApiKey;

use super::{
    http_client, post_json, CompletionRequest, CompletionResponse, LlmProvider, ProviderError,
    StopReason, UsageStats,
};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const FALLBACK_MAX_TOKENS: u32 = 4096;

/// Request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatBody {
    /// Model name without the provider prefix.
    pub model: String,
    /// Optional system turn, then the user turn.
    pub messages: Vec<ChatTurn>,
    /// Output cap.
    pub max_tokens: u32,
}

/// One chat turn.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct ChatTurn {
    /// `system` or `user`.
    pub role: &'static str,
    /// Turn text.
    pub content: String,
}

/// Response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatReply {
    /// Candidate replies; only the first is used.
    pub choices: Vec<ChatChoice>,
    /// Serving model.
    pub model: String,
    /// Token counts, when reported.
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

/// One candidate reply.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// Assistant turn.
    pub message: ChatMessage,
    /// `stop`, `length`, ...
    pub finish_reason: Option<String>,
}

/// Assistant turn text, which may be null.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    /// Text, if any.
    pub content: Option<String>,
}

/// Token counts as reported.
#[doc(hidden)]
#[derive(Debug, Default, Deserialize)]
pub struct ChatUsage {
    /// Prompt tokens.
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Reply tokens.
    #[serde(default)]
    pub completion_tokens: u32,
}

/// OpenAI text backend.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    model_spec: String,
    model_name: String,
    api_key: ApiKey,
    client: reqwest::Client,
}

impl OpenAiProvider {
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

/// Wire body for `request`. The prompt layers travel as a system turn.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest) -> ChatBody {
    let system = request.system.iter().map(|text| ChatTurn {
        role: "system",
        content: text.clone(),
    });
    let user = ChatTurn {
        role: "user",
        content: request.prompt.clone(),
    };
    ChatBody {
        model: model.to_owned(),
        messages: system.chain(std::iter::once(user)).collect(),
        max_tokens: request.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
    }
}

fn stop_reason(raw: Option<&str>) -> StopReason {
    match raw {
        None | Some("stop") => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some(other) => StopReason::Other(other.to_owned()),
    }
}

/// Decode a response body.
///
/// # Errors
///
/// Returns `ProviderError::Parse` when the body is not a chat reply or has
/// no choices.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let reply: ChatReply =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let usage = reply.usage.unwrap_or_default();
    let Some(choice) = reply.choices.into_iter().next() else {
        return Err(ProviderError::Parse("missing choices[0]".to_owned()));
    };

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        stop_reason: stop_reason(choice.finish_reason.as_deref()),
        usage: UsageStats {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        },
        model: reply.model,
    })
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let body = build_request(&self.model_name, &request);
        let call = self
            .client
            .post(CHAT_URL)
            .bearer_auth(self.api_key.expose());
        parse_response(&post_json(call, &body).await?)
    }

    fn model_id(&self) -> &str {
        &self.model_spec
    }
}
