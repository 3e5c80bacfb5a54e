//! Conversation engine: one guided state machine per user.
//!
//! [`ConversationEngine::dispatch`] is the only entry point transports use.
//! It never fails; every action yields a [`Reply`] carrying the next state.
//!
//! Each session is behind its own lock. The lock is held while a transition
//! is decided and released for backend calls, so a `Cancel` can be recorded
//! while generation is in flight. At most one backend call runs per session;
//! anything else that arrives meanwhile is answered with
//! [`ReplyKind::Busy`].

pub mod action;
pub mod classifier;
pub mod session;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::brand::{BrandVoice, BrandVoiceError, BrandVoiceSource};
use crate::config::{BrandConfig, Config};
use crate::generation::{GenerationClient, GenerationError};
use crate::memory::{PreferenceEntry, PreferenceMemory};
use crate::platform::{validate_draft, Platform, PlatformRegistry};
use crate::prompt::{
    compose, compose_image_prompt, CalendarScope, ComposeRequest, ComposedPrompt, RequestMode,
};
use crate::providers::ImageRequest;
use crate::types::{CalendarPlan, ContentTypeHint, DraftSet, ImageRef, OptionLabel};

pub use self::action::{
    Action, FailureKind, ImageOutcome, Notice, Reply, ReplyKind, VoiceDocument,
};
pub use self::classifier::{parse_calendar_scope, Intent, IntentClassifier, KeywordClassifier};
pub use self::session::{Flow, State};

use self::session::Session;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Engine-level policy.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Inactivity after which a flow is cancelled.
    pub idle_timeout: Duration,
    /// Consecutive failures after which replies say the limit was reached.
    pub max_consecutive_failures: u32,
    /// Platform used when free text names none.
    pub default_platform: Platform,
    /// Brand identity for the persona layer and image style.
    pub brand: BrandConfig,
}

impl EngineSettings {
    /// Settings from the `[session]` and `[brand]` config sections.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured default platform is unknown.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            idle_timeout: config.session.idle_timeout(),
            max_consecutive_failures: config.session.max_consecutive_failures,
            default_platform: config.default_platform()?,
            brand: config.brand.clone(),
        })
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(1800),
            max_consecutive_failures: 3,
            default_platform: Platform::Instagram,
            brand: BrandConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal job types
// ---------------------------------------------------------------------------

/// Inputs captured under the session lock for a draft generation.
struct DraftJob {
    platform: Platform,
    topic: String,
    hint: ContentTypeHint,
    revisions: Vec<String>,
    attempt: u32,
    snapshot: Option<Vec<PreferenceEntry>>,
}

struct CalendarJob {
    platform: Platform,
    scope: CalendarScope,
    revisions: Vec<String>,
    attempt: u32,
    snapshot: Option<Vec<PreferenceEntry>>,
}

/// Approval whose image is still being generated.
struct ImageJob {
    label: OptionLabel,
    platform: Platform,
    clean_copy: String,
    memory_saved: bool,
    request: ImageRequest,
}

/// Backend work that runs with the session lock released.
enum Job {
    Drafts(DraftJob),
    Calendar(CalendarJob),
    Image(ImageJob),
    Voice(VoiceDocument),
}

impl Job {
    fn name(&self) -> &'static str {
        match self {
            Self::Drafts(_) => "drafts",
            Self::Calendar(_) => "calendar",
            Self::Image(_) => "image",
            Self::Voice(_) => "voice",
        }
    }
}

enum Step {
    Done(Reply),
    Run(Job),
}

/// A failed step, already classified for the user.
struct StepFailure {
    kind: FailureKind,
    message: String,
    retryable: bool,
}

impl From<BrandVoiceError> for StepFailure {
    fn from(e: BrandVoiceError) -> Self {
        Self {
            kind: FailureKind::BrandVoiceUnavailable,
            message: e.to_string(),
            retryable: false,
        }
    }
}

impl From<GenerationError> for StepFailure {
    fn from(e: GenerationError) -> Self {
        let retryable = e.is_retryable();
        match e {
            GenerationError::Transient { .. } => Self {
                kind: FailureKind::Transient,
                message: "The writing backend is busy or unreachable. Try again in a moment."
                    .to_owned(),
                retryable,
            },
            GenerationError::Parse(_) => Self {
                kind: FailureKind::Parse,
                message: "The reply did not contain both labelled options. Regenerate to try \
                          again."
                    .to_owned(),
                retryable,
            },
            GenerationError::Backend(_) | GenerationError::Router(_) => Self {
                kind: FailureKind::Backend,
                message: format!("Generation failed: {e}"),
                retryable,
            },
        }
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Start(_) => "start",
        Action::ChoosePlatform(_) => "choose_platform",
        Action::SubmitTopic(_) => "submit_topic",
        Action::SelectOption { .. } => "select_option",
        Action::Approve => "approve",
        Action::Regenerate => "regenerate",
        Action::Revise { .. } => "revise",
        Action::SetCalendarScope(_) => "set_calendar_scope",
        Action::ExpandEntry(_) => "expand_entry",
        Action::UploadVoice(_) => "upload_voice",
        Action::Message(_) => "message",
        Action::Cancel => "cancel",
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Per-user conversation state machines over shared brand voice, preference
/// memory, and generation client.
pub struct ConversationEngine {
    sessions: Mutex<HashMap<i64, Arc<Mutex<Session>>>>,
    brand: Arc<dyn BrandVoiceSource>,
    memory: PreferenceMemory,
    generator: GenerationClient,
    platforms: PlatformRegistry,
    classifier: Arc<dyn IntentClassifier>,
    settings: EngineSettings,
}

impl ConversationEngine {
    /// Create an engine with the built-in platforms and keyword classifier.
    pub fn new(
        brand: Arc<dyn BrandVoiceSource>,
        memory: PreferenceMemory,
        generator: GenerationClient,
        settings: EngineSettings,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            brand,
            memory,
            generator,
            platforms: PlatformRegistry::builtin(),
            classifier: Arc::new(KeywordClassifier),
            settings,
        }
    }

    /// Replace the free-text classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Engine policy.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Whether "pick with image" can be offered.
    pub fn images_enabled(&self) -> bool {
        self.generator.images_enabled()
    }

    /// Current state of `user_id`'s session; `Idle` for unknown users.
    pub async fn state_of(&self, user_id: i64) -> State {
        let session = self.sessions.lock().await.get(&user_id).cloned();
        match session {
            Some(session) => session.lock().await.state,
            None => State::Idle,
        }
    }

    /// Cancel every flow idle for longer than the timeout.
    ///
    /// Returns the affected users so the transport can tell them; their next
    /// reply also carries [`Notice::SessionTimedOut`].
    pub async fn sweep_idle(&self) -> Vec<i64> {
        let sessions: Vec<(i64, Arc<Mutex<Session>>)> = self
            .sessions
            .lock()
            .await
            .iter()
            .map(|(id, s)| (*id, Arc::clone(s)))
            .collect();

        let mut expired = Vec::new();
        for (user_id, session) in sessions {
            let mut s = session.lock().await;
            if s.is_expired(self.settings.idle_timeout) {
                info!(user_id, state = %s.state, "session timed out");
                s.reset();
                s.timed_out = true;
                expired.push(user_id);
            }
        }
        expired
    }

    /// Apply one action to `user_id`'s session.
    pub async fn dispatch(&self, user_id: i64, action: Action) -> Reply {
        let session = self.session(user_id).await;
        let mut guard = session.lock().await;

        let mut timed_out = std::mem::take(&mut guard.timed_out);
        if guard.is_expired(self.settings.idle_timeout) {
            info!(user_id, state = %guard.state, "session timed out");
            guard.reset();
            timed_out = true;
        }
        let notice = timed_out.then_some(Notice::SessionTimedOut);

        if guard.is_busy(self.settings.idle_timeout) {
            let kind = if action == Action::Cancel {
                guard.cancel_requested = true;
                debug!(user_id, "cancel recorded for in-flight request");
                ReplyKind::CancelPending
            } else {
                ReplyKind::Busy
            };
            return with_notice(Reply::new(guard.state, kind), notice);
        }
        guard.touch();

        let name = action_name(&action);
        let from = guard.state;
        let step = self.plan(&mut guard, action).await;
        let reply = match step {
            Step::Done(reply) => reply,
            Step::Run(job) => {
                guard.generating = true;
                guard.cancel_requested = false;
                let epoch = guard.epoch;
                drop(guard);
                debug!(user_id, job = job.name(), "backend call started");
                self.execute(user_id, &session, epoch, job).await
            }
        };
        info!(user_id, action = name, from = %from, to = %reply.state, "action dispatched");
        with_notice(reply, notice)
    }

    async fn session(&self, user_id: i64) -> Arc<Mutex<Session>> {
        let mut sessions = self.sessions.lock().await;
        Arc::clone(
            sessions
                .entry(user_id)
                .or_insert_with(|| Arc::new(Mutex::new(Session::new()))),
        )
    }

    // -- transitions ------------------------------------------------------

    /// Decide the transition for `action`. Runs under the session lock.
    async fn plan(&self, s: &mut Session, action: Action) -> Step {
        match action {
            Action::Start(flow) => Step::Done(start(s, flow)),
            Action::ChoosePlatform(platform) => Step::Done(choose_platform(s, platform)),
            Action::SubmitTopic(text) => self.submit_topic(s, &text),
            Action::SelectOption { label, image } => self.select_option(s, label, image).await,
            Action::Approve => Step::Done(approve(s)),
            Action::Regenerate => regenerate(s),
            Action::Revise {
                target,
                instruction,
            } => revise(s, target, instruction),
            Action::SetCalendarScope(scope) => set_calendar_scope(s, scope),
            Action::ExpandEntry(n) => expand_entry(s, n),
            Action::UploadVoice(doc) => upload_voice(s, doc),
            Action::Message(text) => self.message(s, &text),
            Action::Cancel => Step::Done(cancel(s)),
        }
    }

    fn message(&self, s: &mut Session, text: &str) -> Step {
        match s.state {
            State::Idle | State::AwaitingTopic => self.submit_topic(s, text),
            State::AwaitingPlatform => match text.parse::<Platform>() {
                Ok(platform) => Step::Done(choose_platform(s, platform)),
                Err(_) => Step::Done(Reply::invalid(
                    s.state,
                    "Choose a platform: Instagram or Rednote.",
                )),
            },
            State::OptionsPresented | State::AwaitingRevisionText => {
                let target = s.revision_target;
                revise(s, target, Some(text.to_owned()))
            }
            State::AwaitingCalendarScope => match parse_calendar_scope(text) {
                Some(scope) => set_calendar_scope(s, scope),
                None => Step::Done(Reply::invalid(
                    s.state,
                    "Send how many posts to plan (3 to 7), optionally followed by themes, \
                     e.g. \"5: rest, boundaries\".",
                )),
            },
            State::CalendarPresented => match text.trim().parse::<usize>() {
                Ok(n) => expand_entry(s, n),
                Err(_) => Step::Done(Reply::invalid(
                    s.state,
                    "Send an entry number to expand it, approve the plan, or regenerate.",
                )),
            },
            State::AwaitingVoiceUpload => Step::Done(Reply::invalid(
                s.state,
                "Send the brand voice as a .txt or .md document, or /cancel.",
            )),
        }
    }

    fn submit_topic(&self, s: &mut Session, text: &str) -> Step {
        let topic = text.trim();
        if topic.is_empty() {
            return Step::Done(Reply::invalid(s.state, "Send a topic for the post."));
        }
        let intent = self.classifier.classify(topic);
        match s.state {
            State::Idle => {
                let platform = intent.platform.unwrap_or(self.settings.default_platform);
                s.begin_post(platform, intent.topic, intent.content_hint);
            }
            State::AwaitingTopic => {
                s.topic = Some(intent.topic);
                s.content_hint = intent.content_hint;
            }
            _ => {
                return Step::Done(Reply::invalid(
                    s.state,
                    "Finish the current step or /cancel before starting a new post.",
                ));
            }
        }
        draft_job(s)
    }

    async fn select_option(&self, s: &mut Session, label: OptionLabel, image: bool) -> Step {
        if !matches!(s.state, State::OptionsPresented | State::AwaitingRevisionText) {
            return Step::Done(Reply::invalid(s.state, "There are no options to pick from."));
        }
        let (Some(drafts), Some(platform), Some(topic)) =
            (s.drafts.as_ref(), s.platform, s.topic.as_deref())
        else {
            return Step::Done(Reply::invalid(s.state, "There are no options to pick from."));
        };

        let draft = drafts.get(label).clone();
        let entry = PreferenceEntry::from_approval(platform, topic, &draft, s.revision_notes.clone());
        let memory_saved = match self.memory.record(entry).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to record approval in preference memory");
                false
            }
        };
        let clean_copy = draft.clean_copy();
        s.finish_post();

        let image_outcome = if !image {
            ImageOutcome::NotRequested
        } else if !self.generator.images_enabled() {
            ImageOutcome::Failed("Image generation is not enabled.".to_owned())
        } else {
            let profile = self.platforms.get(platform);
            let request = compose_image_prompt(&draft, profile, &self.settings.brand.image_style);
            return Step::Run(Job::Image(ImageJob {
                label,
                platform,
                clean_copy,
                memory_saved,
                request,
            }));
        };

        Step::Done(Reply::new(
            s.state,
            ReplyKind::Approved {
                label,
                platform,
                clean_copy,
                image: image_outcome,
                memory_saved,
            },
        ))
    }

    // -- backend calls ----------------------------------------------------

    async fn execute(
        &self,
        user_id: i64,
        session: &Mutex<Session>,
        epoch: u64,
        job: Job,
    ) -> Reply {
        match job {
            Job::Drafts(job) => {
                let (result, snapshot) = self.run_drafts(&job).await;
                let mut s = session.lock().await;
                if let Some(reply) = finish_in_flight(&mut s, epoch) {
                    return reply;
                }
                store_snapshot(&mut s, snapshot);
                match result {
                    Ok(drafts) => {
                        s.consecutive_failures = 0;
                        s.revision_target = None;
                        s.state = State::OptionsPresented;
                        let profile = self.platforms.get(job.platform);
                        let warnings = drafts
                            .options
                            .iter()
                            .flat_map(|option| validate_draft(profile, option))
                            .collect();
                        s.drafts = Some(drafts.clone());
                        Reply::new(
                            s.state,
                            ReplyKind::Drafts {
                                drafts,
                                platform: job.platform,
                                warnings,
                                images_available: self.generator.images_enabled(),
                            },
                        )
                    }
                    Err(failure) => {
                        s.state = if s.drafts.is_some() {
                            State::OptionsPresented
                        } else {
                            State::AwaitingTopic
                        };
                        self.failed(user_id, &mut s, failure)
                    }
                }
            }
            Job::Calendar(job) => {
                let (result, snapshot) = self.run_calendar(&job).await;
                let mut s = session.lock().await;
                if let Some(reply) = finish_in_flight(&mut s, epoch) {
                    return reply;
                }
                store_snapshot(&mut s, snapshot);
                match result {
                    Ok(plan) => {
                        s.consecutive_failures = 0;
                        s.state = State::CalendarPresented;
                        s.plan = Some(plan.clone());
                        Reply::new(s.state, ReplyKind::Calendar(plan))
                    }
                    Err(failure) => {
                        s.state = if s.plan.is_some() {
                            State::CalendarPresented
                        } else {
                            State::AwaitingCalendarScope
                        };
                        self.failed(user_id, &mut s, failure)
                    }
                }
            }
            Job::Image(job) => {
                let result = self.generator.generate_image(job.request).await;
                let mut s = session.lock().await;
                let discarded = s.epoch != epoch || s.cancel_requested;
                if s.epoch == epoch {
                    s.generating = false;
                    s.cancel_requested = false;
                }
                let image = match result {
                    Ok(image) if discarded => {
                        discard_image(&image).await;
                        ImageOutcome::Discarded
                    }
                    Ok(image) => ImageOutcome::Ready(image),
                    Err(_) if discarded => ImageOutcome::Discarded,
                    Err(e) => {
                        warn!(user_id, error = %e, "image generation failed, returning text only");
                        ImageOutcome::Failed(e.to_string())
                    }
                };
                Reply::new(
                    s.state,
                    ReplyKind::Approved {
                        label: job.label,
                        platform: job.platform,
                        clean_copy: job.clean_copy,
                        image,
                        memory_saved: job.memory_saved,
                    },
                )
            }
            Job::Voice(doc) => {
                let result = self.brand.replace(&doc.text).await;
                let mut s = session.lock().await;
                if s.epoch == epoch {
                    s.generating = false;
                    s.cancel_requested = false;
                }
                match result {
                    Ok(voice) => {
                        info!(user_id, file = %doc.file_name, "brand voice replaced");
                        s.consecutive_failures = 0;
                        s.reset();
                        Reply::new(s.state, voice_updated(&voice))
                    }
                    Err(e) => {
                        let failure = StepFailure {
                            kind: FailureKind::VoiceUpdate,
                            message: e.to_string(),
                            retryable: true,
                        };
                        self.failed(user_id, &mut s, failure)
                    }
                }
            }
        }
    }

    /// Brand voice plus the preference window for a generation.
    async fn inputs(
        &self,
        snapshot: Option<Vec<PreferenceEntry>>,
    ) -> Result<(BrandVoice, Vec<PreferenceEntry>), StepFailure> {
        let voice = self.brand.read().await?;
        let preferences = match snapshot {
            Some(preferences) => preferences,
            None => self.memory.recent().await.unwrap_or_else(|e| {
                warn!(error = %e, "preference memory unreadable, composing without it");
                Vec::new()
            }),
        };
        Ok((voice, preferences))
    }

    async fn run_drafts(
        &self,
        job: &DraftJob,
    ) -> (Result<DraftSet, StepFailure>, Option<Vec<PreferenceEntry>>) {
        let (voice, preferences) = match self.inputs(job.snapshot.clone()).await {
            Ok(inputs) => inputs,
            Err(failure) => return (Err(failure), None),
        };
        let prompt = self.compose(
            &voice,
            job.platform,
            &preferences,
            &job.topic,
            &RequestMode::SinglePost,
            job.hint,
            &job.revisions,
            job.attempt,
        );
        let result = self
            .generator
            .generate_drafts(&prompt)
            .await
            .map_err(StepFailure::from);
        (result, Some(preferences))
    }

    async fn run_calendar(
        &self,
        job: &CalendarJob,
    ) -> (Result<CalendarPlan, StepFailure>, Option<Vec<PreferenceEntry>>) {
        let (voice, preferences) = match self.inputs(job.snapshot.clone()).await {
            Ok(inputs) => inputs,
            Err(failure) => return (Err(failure), None),
        };
        let mode = RequestMode::Calendar(job.scope.clone());
        let prompt = self.compose(
            &voice,
            job.platform,
            &preferences,
            "",
            &mode,
            ContentTypeHint::Auto,
            &job.revisions,
            job.attempt,
        );
        let result = self
            .generator
            .generate_calendar(&prompt, &job.scope, job.platform)
            .await
            .map_err(StepFailure::from);
        (result, Some(preferences))
    }

    #[allow(clippy::too_many_arguments)]
    fn compose(
        &self,
        voice: &BrandVoice,
        platform: Platform,
        preferences: &[PreferenceEntry],
        topic: &str,
        mode: &RequestMode,
        content_hint: ContentTypeHint,
        revisions: &[String],
        attempt: u32,
    ) -> ComposedPrompt {
        compose(&ComposeRequest {
            voice,
            brand: &self.settings.brand,
            profile: self.platforms.get(platform),
            preferences,
            topic,
            mode,
            content_hint,
            revisions,
            attempt,
        })
    }

    fn failed(&self, user_id: i64, s: &mut Session, failure: StepFailure) -> Reply {
        s.consecutive_failures = s.consecutive_failures.saturating_add(1);
        let limit_reached = s.consecutive_failures >= self.settings.max_consecutive_failures;
        warn!(
            user_id,
            kind = ?failure.kind,
            consecutive = s.consecutive_failures,
            limit_reached,
            message = %failure.message,
            "step failed"
        );
        Reply::new(
            s.state,
            ReplyKind::Failed {
                kind: failure.kind,
                message: failure.message,
                retryable: failure.retryable,
                consecutive: s.consecutive_failures,
                limit_reached,
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Pure transitions
// ---------------------------------------------------------------------------

fn with_notice(mut reply: Reply, notice: Option<Notice>) -> Reply {
    if reply.notice.is_none() {
        reply.notice = notice;
    }
    reply
}

fn start(s: &mut Session, flow: Flow) -> Reply {
    if s.state != State::Idle {
        info!(state = %s.state, "new flow discards the current one");
    }
    s.reset();
    s.flow = Some(flow);
    match flow {
        Flow::Post | Flow::Calendar => {
            s.state = State::AwaitingPlatform;
            Reply::new(s.state, ReplyKind::AskPlatform(flow))
        }
        Flow::VoiceUpdate => {
            s.state = State::AwaitingVoiceUpload;
            Reply::new(s.state, ReplyKind::AskVoiceUpload)
        }
    }
}

fn choose_platform(s: &mut Session, platform: Platform) -> Reply {
    if s.state != State::AwaitingPlatform {
        return Reply::invalid(s.state, "Start with /post or /calendar to choose a platform.");
    }
    s.platform = Some(platform);
    match s.flow {
        Some(Flow::Calendar) => {
            s.state = State::AwaitingCalendarScope;
            Reply::new(s.state, ReplyKind::AskCalendarScope(platform))
        }
        _ => {
            s.flow = Some(Flow::Post);
            s.state = State::AwaitingTopic;
            Reply::new(s.state, ReplyKind::AskTopic(platform))
        }
    }
}

fn approve(s: &mut Session) -> Reply {
    match (s.state, s.plan.as_ref()) {
        (State::CalendarPresented, Some(plan)) => {
            let posts = plan.entries.len();
            s.reset();
            Reply::new(s.state, ReplyKind::CalendarSaved { posts })
        }
        (State::OptionsPresented | State::AwaitingRevisionText, _) => {
            Reply::invalid(s.state, "Pick option A or B to approve it.")
        }
        _ => Reply::invalid(s.state, "There is nothing to approve."),
    }
}

fn regenerate(s: &mut Session) -> Step {
    match s.state {
        State::OptionsPresented | State::AwaitingRevisionText => draft_job(s),
        State::AwaitingTopic if s.topic.is_some() => draft_job(s),
        State::CalendarPresented => calendar_job(s),
        State::AwaitingCalendarScope if s.scope.is_some() => calendar_job(s),
        _ => Step::Done(Reply::invalid(s.state, "There is nothing to regenerate.")),
    }
}

fn revise(s: &mut Session, target: Option<OptionLabel>, instruction: Option<String>) -> Step {
    if !matches!(s.state, State::OptionsPresented | State::AwaitingRevisionText)
        || s.drafts.is_none()
    {
        return Step::Done(Reply::invalid(s.state, "There are no options to revise."));
    }
    let instruction = instruction
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty());
    let Some(instruction) = instruction else {
        s.revision_target = target;
        s.state = State::AwaitingRevisionText;
        return Step::Done(Reply::new(s.state, ReplyKind::AskRevision(target)));
    };

    let target = target.or(s.revision_target);
    let addendum = match target {
        Some(label) => format!(
            "Rework Option {label} ({}): {instruction}. Still return both options.",
            label.style()
        ),
        None => format!("Apply to both options: {instruction}"),
    };
    s.revision_notes.push(instruction);
    s.revision_addenda.push(addendum);
    s.revision_target = target;
    s.state = State::AwaitingRevisionText;
    draft_job(s)
}

fn set_calendar_scope(s: &mut Session, scope: CalendarScope) -> Step {
    if !matches!(
        s.state,
        State::AwaitingCalendarScope | State::CalendarPresented
    ) {
        return Step::Done(Reply::invalid(s.state, "Start a calendar with /calendar first."));
    }
    s.scope = Some(scope);
    calendar_job(s)
}

fn expand_entry(s: &mut Session, n: usize) -> Step {
    if s.state != State::CalendarPresented {
        return Step::Done(Reply::invalid(s.state, "There is no calendar to expand."));
    }
    let Some(entry) = s.plan.as_ref().and_then(|plan| plan.entry(n)).cloned() else {
        let count = s.plan.as_ref().map_or(0, |plan| plan.entries.len());
        return Step::Done(Reply::invalid(
            s.state,
            format!("Pick an entry between 1 and {count}."),
        ));
    };
    if !s.begin_expansion(entry.platform, entry.expansion_topic()) {
        return Step::Done(Reply::invalid(s.state, "There is no calendar to expand."));
    }
    draft_job(s)
}

fn upload_voice(s: &mut Session, doc: VoiceDocument) -> Step {
    if s.state != State::AwaitingVoiceUpload {
        return Step::Done(Reply::invalid(
            s.state,
            "Use /update_voice before sending a brand voice document.",
        ));
    }
    Step::Run(Job::Voice(doc))
}

fn cancel(s: &mut Session) -> Reply {
    if s.state == State::Idle {
        return Reply::new(s.state, ReplyKind::NothingToCancel);
    }
    info!(state = %s.state, "flow cancelled");
    s.reset();
    Reply::new(
        s.state,
        ReplyKind::Cancelled {
            discarded_generation: false,
        },
    )
}

fn draft_job(s: &mut Session) -> Step {
    let (Some(platform), Some(topic)) = (s.platform, s.topic.clone()) else {
        return Step::Done(Reply::invalid(s.state, "Send a topic for the post."));
    };
    s.attempt = s.attempt.saturating_add(1);
    Step::Run(Job::Drafts(DraftJob {
        platform,
        topic,
        hint: s.content_hint,
        revisions: s.revision_addenda.clone(),
        attempt: s.attempt,
        snapshot: s.preference_snapshot.clone(),
    }))
}

fn calendar_job(s: &mut Session) -> Step {
    let (Some(platform), Some(scope)) = (s.platform, s.scope.clone()) else {
        return Step::Done(Reply::invalid(s.state, "Send how many posts to plan (3 to 7)."));
    };
    s.attempt = s.attempt.saturating_add(1);
    Step::Run(Job::Calendar(CalendarJob {
        platform,
        scope,
        revisions: s.revision_addenda.clone(),
        attempt: s.attempt,
        snapshot: s.preference_snapshot.clone(),
    }))
}

/// Clear the in-flight flag. Returns the reply to send instead of the
/// result when the result must be thrown away.
fn finish_in_flight(s: &mut Session, epoch: u64) -> Option<Reply> {
    if s.epoch != epoch {
        debug!("result arrived for a flow that was already reset");
        return Some(Reply::new(
            s.state,
            ReplyKind::Cancelled {
                discarded_generation: true,
            },
        ));
    }
    s.generating = false;
    if s.cancel_requested {
        info!(state = %s.state, "cancel applied, in-flight result discarded");
        s.reset();
        return Some(Reply::new(
            s.state,
            ReplyKind::Cancelled {
                discarded_generation: true,
            },
        ));
    }
    None
}

fn store_snapshot(s: &mut Session, snapshot: Option<Vec<PreferenceEntry>>) {
    if s.preference_snapshot.is_none() {
        s.preference_snapshot = snapshot;
    }
}

fn voice_updated(voice: &BrandVoice) -> ReplyKind {
    ReplyKind::VoiceUpdated {
        chars: voice.text.chars().count(),
        words: voice.word_count(),
    }
}

async fn discard_image(image: &ImageRef) {
    if let ImageRef::File(path) = image {
        if let Err(e) = tokio::fs::remove_file(path).await {
            debug!(path = %path.display(), error = %e, "could not remove discarded image");
        }
    }
}
