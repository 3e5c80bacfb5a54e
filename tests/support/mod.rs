//! Scripted backends and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use postcraft::brand::{BrandVoiceSource, InMemoryBrandVoice};
use postcraft::conversation::{ConversationEngine, EngineSettings};
use postcraft::generation::{GenerationClient, GenerationSettings};
use postcraft::memory::PreferenceMemory;
use postcraft::providers::router::ModelRouter;
use postcraft::providers::{
    CompletionRequest, CompletionResponse, ImageData, ImageProvider, ImageRequest, LlmProvider,
    ProviderError, StopReason, UsageStats,
};

pub const MODEL_SPEC: &str = "anthropic/scripted";

pub const VOICE: &str = "Warm, grounded, and curious. We write like a friend who has been there.";

/// Two well-formed options with explicit fields.
pub fn draft_reply(a_caption: &str, b_caption: &str) -> String {
    format!(
        "Here you go.\n\n\
         ===== OPTION A (Reflective) =====\n\
         Content Type: Feed Post - single feeling\n\
         Title: Slow mornings\n\
         Caption: {a_caption}\n\
         Hashtags: #rest #slowliving\n\
         Visual Suggestion: A cup of tea by a rainy window\n\n\
         ===== OPTION B (Direct) =====\n\
         Content Type: Carousel\n\
         Title: Three rest rules\n\
         Caption: {b_caption}\n\
         Hashtags: #rest #boundaries #energy\n\
         Visual Suggestion: Bold text slides on cream\n"
    )
}

/// A calendar reply with `n` day sections.
pub fn calendar_reply(n: usize) -> String {
    let mut out = String::from("Plan:\n\n");
    for day in 1..=n {
        out.push_str(&format!(
            "====== DAY {day} ======\nDay: Day {day}\nPlatform: instagram\nTopic: Topic number {day}\nAngle: Angle {day}\n\n"
        ));
    }
    out
}

pub fn ok(text: impl Into<String>) -> Result<CompletionResponse, ProviderError> {
    Ok(CompletionResponse {
        text: text.into(),
        stop_reason: StopReason::EndTurn,
        usage: UsageStats {
            input_tokens: 100,
            output_tokens: 200,
        },
        model: "scripted".to_owned(),
    })
}

pub fn transient() -> ProviderError {
    ProviderError::HttpStatus {
        status: 503,
        body: "overloaded".to_owned(),
    }
}

/// Optional gate that holds a completion until the test releases it.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
}

/// Text provider returning queued replies in order and recording requests.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    gate: Option<Arc<Gate>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<CompletionResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated(
        replies: Vec<Result<CompletionResponse, ProviderError>>,
        gate: Arc<Gate>,
    ) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// System prompt of the `n`th request.
    pub fn system(&self, n: usize) -> String {
        self.requests()
            .get(n)
            .and_then(|r| r.system.clone())
            .expect("request should exist")
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        self.requests.lock().expect("requests lock").push(request);
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("script exhausted".to_owned())))
    }

    fn model_id(&self) -> &str {
        MODEL_SPEC
    }
}

/// Image provider with a single canned result.
pub struct ScriptedImages {
    result: Mutex<Option<Result<ImageData, ProviderError>>>,
    prompts: Mutex<Vec<ImageRequest>>,
}

impl ScriptedImages {
    pub fn new(result: Result<ImageData, ProviderError>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(result)),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<ImageRequest> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl ImageProvider for ScriptedImages {
    async fn generate(&self, request: ImageRequest) -> Result<ImageData, ProviderError> {
        self.prompts.lock().expect("prompts lock").push(request);
        self.result
            .lock()
            .expect("result lock")
            .take()
            .unwrap_or_else(|| Err(ProviderError::Unavailable("no image scripted".to_owned())))
    }

    fn model_id(&self) -> &str {
        "openai/scripted-image"
    }
}

pub fn client(
    provider: Arc<ScriptedProvider>,
    images: Option<Arc<dyn ImageProvider>>,
    image_dir: PathBuf,
) -> GenerationClient {
    let router = ModelRouter::for_testing(MODEL_SPEC.to_owned(), provider);
    GenerationClient::new(
        Arc::new(router),
        images,
        GenerationSettings {
            retry_delay: std::time::Duration::from_millis(10),
            ..GenerationSettings::default()
        },
        image_dir,
    )
}

/// Everything a conversation test needs to inspect afterwards.
pub struct Harness {
    pub engine: Arc<ConversationEngine>,
    pub provider: Arc<ScriptedProvider>,
    pub memory: PreferenceMemory,
    pub brand: Arc<dyn BrandVoiceSource>,
    pub image_dir: tempfile::TempDir,
}

pub struct HarnessBuilder {
    provider: Arc<ScriptedProvider>,
    images: Option<Arc<dyn ImageProvider>>,
    brand: Arc<dyn BrandVoiceSource>,
    settings: EngineSettings,
}

impl HarnessBuilder {
    pub fn new(provider: Arc<ScriptedProvider>) -> Self {
        Self {
            provider,
            images: None,
            brand: Arc::new(InMemoryBrandVoice::new(VOICE)),
            settings: EngineSettings::default(),
        }
    }

    pub fn images(mut self, images: Arc<dyn ImageProvider>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn brand(mut self, brand: Arc<dyn BrandVoiceSource>) -> Self {
        self.brand = brand;
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Harness {
        let image_dir = tempfile::tempdir().expect("temp image dir");
        let memory = PreferenceMemory::in_memory();
        let generator = client(
            Arc::clone(&self.provider),
            self.images,
            image_dir.path().to_path_buf(),
        );
        let engine = ConversationEngine::new(
            Arc::clone(&self.brand),
            memory.clone(),
            generator,
            self.settings,
        );
        Harness {
            engine: Arc::new(engine),
            provider: self.provider,
            memory,
            brand: self.brand,
            image_dir,
        }
    }
}

/// Text of prompt layer `n` (header included) from a system prompt.
pub fn layer(system: &str, n: usize) -> String {
    let marker = format!("# LAYER {n}:");
    let start = system.find(&marker).expect("layer header present");
    let rest = system.get(start..).expect("valid offset");
    let end = rest
        .get(1..)
        .and_then(|tail| tail.find("# LAYER "))
        .map_or(rest.len(), |i| i.saturating_add(1));
    rest.get(..end).expect("valid end").to_owned()
}
