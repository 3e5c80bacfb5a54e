//! Backend seam: the [`LlmProvider`] and [`ImageProvider`] traits plus the
//! request and reply types they exchange.
//!
//! Backends:
//! - [`anthropic::AnthropicProvider`]: Anthropic `/v1/messages` API
//! - [`openai::OpenAiProvider`]: OpenAI `/v1/chat/completions` API
//! - [`images::OpenAiImageProvider`]: OpenAI `/v1/images/generations` API
//!
//! The [`router::ModelRouter`] resolves the text provider for each request
//! mode (role override, then default).

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub mod anthropic;
pub mod images;
pub mod openai;
pub mod router;

/// Upper bound on one backend round trip. Calendar replies are long, so
/// this is generous; a stuck request still ends up as a transient failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// HTTP client shared by the backend implementations.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("postcraft/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default http client");
            reqwest::Client::new()
        })
}

// ---------------------------------------------------------------------------
// Text generation
// ---------------------------------------------------------------------------

/// One generation call: the layered system prompt and a single user turn.
///
/// Every request is stateless. Nothing from earlier calls is replayed; the
/// preference layer inside `system` is the only memory a backend sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Composed prompt layers.
    pub system: Option<String>,
    /// The user turn, e.g. `Write a post for Rednote about: ...`.
    pub prompt: String,
    /// Output cap for the request mode.
    pub max_tokens: Option<u32>,
}

/// Why a backend stopped writing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The reply is complete.
    EndTurn,
    /// The output cap cut the reply short.
    MaxTokens,
    /// Any other backend-specific reason, kept verbatim.
    Other(String),
}

/// Token accounting for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageStats {
    /// Prompt tokens.
    pub input_tokens: u32,
    /// Reply tokens.
    pub output_tokens: u32,
}

/// A backend reply.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Reply text, all text blocks joined.
    pub text: String,
    /// Stop reason.
    pub stop_reason: StopReason,
    /// Tokens used.
    pub usage: UsageStats,
    /// Model name as reported by the backend.
    pub model: String,
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Output dimensions for a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSize {
    /// 1024x1024, for square feeds.
    Square,
    /// 1024x1792, for vertical feeds.
    Portrait,
}

impl ImageSize {
    /// Dimension string understood by image backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1024x1024",
            Self::Portrait => "1024x1792",
        }
    }

    /// Aspect guidance for image prompts.
    pub fn aspect_hint(&self) -> &'static str {
        match self {
            Self::Square => "square 1:1 composition",
            Self::Portrait => "vertical 9:16 composition",
        }
    }
}

/// A request to an image backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Image prompt.
    pub prompt: String,
    /// Output dimensions.
    pub size: ImageSize,
}

/// Image returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageData {
    /// Decoded image bytes.
    Bytes(Vec<u8>),
    /// Hosted image location.
    Url(url::Url),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Backend call failures, before any retry policy is applied.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network failure or timeout.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The body was not the JSON shape the backend documents.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Non-2xx status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// Status code.
        status: u16,
        /// Body with keys redacted and length capped.
        body: String,
    },
    /// Nothing to call, e.g. an exhausted test script.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Whether the failure is network or rate-limit class and worth one retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::HttpStatus { status, .. } => {
                matches!(status, 408 | 429 | 529) || (500..=599).contains(status)
            }
            Self::Parse(_) | Self::Unavailable(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Characters of an error body kept for logs and user messages.
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Key shapes scrubbed from error bodies before they are logged.
const KEY_PATTERNS: [&str; 3] = [
    r"sk-ant-[A-Za-z0-9_\-]{10,}",
    r"sk-proj-[A-Za-z0-9_\-]{10,}",
    r"sk-[A-Za-z0-9]{32,}",
];

/// Send a JSON request and return the body of a 2xx response.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure and
/// `ProviderError::HttpStatus` on any non-2xx status.
pub(crate) async fn post_json<T: Serialize + Sync>(
    request: reqwest::RequestBuilder,
    body: &T,
) -> Result<String, ProviderError> {
    let response = request.json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;
    if status.is_success() {
        Ok(text)
    } else {
        Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&text),
        })
    }
}

/// Single-line, key-free, length-capped copy of an error body.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let mut clean = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    for pattern in KEY_PATTERNS {
        if let Ok(regex) = Regex::new(pattern) {
            clean = regex.replace_all(&clean, "[REDACTED]").into_owned();
        }
    }

    if clean.chars().count() <= MAX_ERROR_BODY_CHARS {
        return clean;
    }
    let head: String = clean.chars().take(MAX_ERROR_BODY_CHARS).collect();
    format!("{head}...[truncated]")
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Text generation backend. One instance serves every session.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one stateless completion.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`]; retry decisions belong to the caller.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// `<provider>/<model>` spec, for logs.
    fn model_id(&self) -> &str;
}

/// Image generation backend.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generate one image.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, or decode failure.
    async fn generate(&self, request: ImageRequest) -> Result<ImageData, ProviderError>;

    /// `<provider>/<model>` spec, for logs.
    fn model_id(&self) -> &str;
}
