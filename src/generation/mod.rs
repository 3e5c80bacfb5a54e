//! Generation client: sends composed prompts to the text backend and turns
//! replies into draft options or calendar plans.
//!
//! Transient backend failures get at most one automatic retry after a
//! jittered delay. Parse failures are never retried here; they go back to
//! the conversation engine so the user can choose to regenerate.
//!
//! The image path is independent: an image failure never affects a text
//! result that has already been produced.

pub mod parse;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GenerationConfig;
use crate::platform::Platform;
use crate::prompt::{CalendarScope, ComposedPrompt};
use crate::providers::router::{ModelRouter, RouterError, ROLE_CALENDAR, ROLE_POST};
use crate::providers::{
    CompletionRequest, CompletionResponse, ImageData, ImageProvider, ImageRequest,
    ProviderError, StopReason,
};
use crate::types::{CalendarPlan, DraftSet, ImageRef};

pub use self::parse::{
    count_hashtags, extract_hashtags, parse_calendar_plan, parse_draft_options,
    GenerationParseError,
};

/// Characters of an unparseable reply included in the warning log.
const RAW_PREVIEW_CHARS: usize = 400;

/// Text generation failures.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Network or rate-limit failure that persisted through the retry.
    #[error("backend temporarily unavailable after {attempts} attempts: {source}")]
    Transient {
        /// Attempts made, including the retry.
        attempts: u32,
        /// Last underlying failure.
        source: ProviderError,
    },
    /// Non-transient backend failure (bad key, bad request, ...).
    #[error("backend error: {0}")]
    Backend(ProviderError),
    /// The reply did not match the output contract.
    #[error(transparent)]
    Parse(#[from] GenerationParseError),
    /// No provider is configured for the request mode.
    #[error("no text backend available: {0}")]
    Router(#[from] RouterError),
}

impl GenerationError {
    /// Whether asking again has a reasonable chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Parse(_))
    }
}

/// Image generation failures. Never fatal to the text result.
#[derive(Debug, thiserror::Error)]
pub enum ImageGenerationError {
    /// No image backend is configured.
    #[error("image generation is not enabled")]
    Disabled,
    /// The image backend failed.
    #[error("image backend error: {0}")]
    Backend(#[from] ProviderError),
    /// The image could not be saved.
    #[error("failed to save image: {0}")]
    Save(#[from] std::io::Error),
}

/// Caps and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Output token cap for single-post requests.
    pub max_tokens_post: u32,
    /// Output token cap for calendar requests.
    pub max_tokens_calendar: u32,
    /// Base delay before the transient retry.
    pub retry_delay: Duration,
}

impl GenerationSettings {
    /// Settings from the `[generation]` config section.
    pub fn from_config(config: &GenerationConfig) -> Self {
        Self {
            max_tokens_post: config.max_tokens_post,
            max_tokens_calendar: config.max_tokens_calendar,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&GenerationConfig::default())
    }
}

/// Text and image generation front end.
#[derive(Clone)]
pub struct GenerationClient {
    router: Arc<ModelRouter>,
    images: Option<Arc<dyn ImageProvider>>,
    settings: GenerationSettings,
    image_dir: PathBuf,
}

impl GenerationClient {
    /// Create a client.
    pub fn new(
        router: Arc<ModelRouter>,
        images: Option<Arc<dyn ImageProvider>>,
        settings: GenerationSettings,
        image_dir: PathBuf,
    ) -> Self {
        Self {
            router,
            images,
            settings,
            image_dir,
        }
    }

    /// Whether an image backend is configured.
    pub fn images_enabled(&self) -> bool {
        self.images.is_some()
    }

    /// Generate exactly two draft options.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] on backend failure or a malformed reply.
    pub async fn generate_drafts(
        &self,
        prompt: &ComposedPrompt,
    ) -> Result<DraftSet, GenerationError> {
        let response = self
            .complete_with_retry(ROLE_POST, prompt, self.settings.max_tokens_post)
            .await?;
        let drafts = parse_draft_options(&response.text)
            .map_err(|e| annotate_parse_error(e, &response))?;
        info!(
            model = %response.model,
            output_tokens = response.usage.output_tokens,
            "draft options generated"
        );
        Ok(drafts)
    }

    /// Generate a calendar plan sized to `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] on backend failure or a malformed reply.
    pub async fn generate_calendar(
        &self,
        prompt: &ComposedPrompt,
        scope: &CalendarScope,
        default_platform: Platform,
    ) -> Result<CalendarPlan, GenerationError> {
        let response = self
            .complete_with_retry(ROLE_CALENDAR, prompt, self.settings.max_tokens_calendar)
            .await?;
        let plan = parse_calendar_plan(&response.text, scope, default_platform)
            .map_err(|e| annotate_parse_error(e, &response))?;
        info!(
            model = %response.model,
            posts = plan.entries.len(),
            "calendar plan generated"
        );
        Ok(plan)
    }

    /// Generate one image, saving returned bytes under the image directory.
    ///
    /// # Errors
    ///
    /// Returns [`ImageGenerationError`] when no backend is configured, the
    /// backend fails, or the file cannot be written.
    pub async fn generate_image(
        &self,
        request: ImageRequest,
    ) -> Result<ImageRef, ImageGenerationError> {
        let provider = self.images.as_ref().ok_or(ImageGenerationError::Disabled)?;
        let size = request.size;
        let data = provider.generate(request).await?;
        let image = match data {
            ImageData::Url(url) => ImageRef::Url(url),
            ImageData::Bytes(bytes) => {
                tokio::fs::create_dir_all(&self.image_dir).await?;
                let path = self.image_dir.join(format!("{}.png", Uuid::new_v4()));
                tokio::fs::write(&path, &bytes).await?;
                ImageRef::File(path)
            }
        };
        info!(model = provider.model_id(), size = size.as_str(), image = %image, "image generated");
        Ok(image)
    }

    async fn complete_with_retry(
        &self,
        role: &str,
        prompt: &ComposedPrompt,
        max_tokens: u32,
    ) -> Result<CompletionResponse, GenerationError> {
        let provider = self.router.resolve(role)?;
        let request = CompletionRequest {
            system: Some(prompt.system_prompt()),
            prompt: prompt.user_message().to_owned(),
            max_tokens: Some(max_tokens),
        };

        debug!(model = provider.model_id(), role, max_tokens, "requesting completion");
        match provider.complete(request.clone()).await {
            Ok(response) => Ok(response),
            Err(first) if first.is_transient() => {
                let delay = self.retry_delay();
                warn!(
                    model = provider.model_id(),
                    error = %first,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "transient backend failure, retrying once"
                );
                tokio::time::sleep(delay).await;
                provider.complete(request).await.map_err(|second| {
                    if second.is_transient() {
                        GenerationError::Transient {
                            attempts: 2,
                            source: second,
                        }
                    } else {
                        GenerationError::Backend(second)
                    }
                })
            }
            Err(e) => Err(GenerationError::Backend(e)),
        }
    }

    fn retry_delay(&self) -> Duration {
        let base = self.settings.retry_delay;
        let max_jitter = u64::try_from(base.as_millis() / 2).unwrap_or(0);
        let jitter = rand::thread_rng().gen_range(0..=max_jitter);
        base.saturating_add(Duration::from_millis(jitter))
    }
}

fn annotate_parse_error(
    mut error: GenerationParseError,
    response: &CompletionResponse,
) -> GenerationError {
    if response.stop_reason == StopReason::MaxTokens {
        error.reason.push_str(" (reply was cut off at the output cap)");
    }
    let preview: String = error.raw.chars().take(RAW_PREVIEW_CHARS).collect();
    warn!(
        model = %response.model,
        reason = %error.reason,
        raw_preview = %preview,
        "unparseable backend reply"
    );
    GenerationError::Parse(error)
}
