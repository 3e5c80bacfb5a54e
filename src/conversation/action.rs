//! Action vocabulary and reply types.
//!
//! Transports translate their native events into [`Action`]s and render
//! [`Reply`]s back. Guided buttons and free text share this one vocabulary.

use crate::platform::Platform;
use crate::prompt::CalendarScope;
use crate::types::{CalendarPlan, DraftSet, ImageRef, OptionLabel};

use super::session::{Flow, State};

/// A plain-text document offered as the new brand voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDocument {
    /// Original file name, for logs.
    pub file_name: String,
    /// Full document text.
    pub text: String,
}

/// Discrete user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Begin a guided flow, discarding any flow in progress.
    Start(Flow),
    /// Pick the target platform.
    ChoosePlatform(Platform),
    /// Provide the topic for a post.
    SubmitTopic(String),
    /// Pick an option; this approves it.
    SelectOption {
        /// Chosen option.
        label: OptionLabel,
        /// Also generate an image for it.
        image: bool,
    },
    /// Approve the presented calendar.
    Approve,
    /// Generate again with the same inputs.
    Regenerate,
    /// Ask for changes. Without an instruction the engine asks for one.
    Revise {
        /// Option the instruction refers to, if any.
        target: Option<OptionLabel>,
        /// What to change.
        instruction: Option<String>,
    },
    /// Set the calendar size and themes.
    SetCalendarScope(CalendarScope),
    /// Turn calendar entry `n` (1-based) into drafts.
    ExpandEntry(usize),
    /// Provide a new brand voice document.
    UploadVoice(VoiceDocument),
    /// Unstructured text, interpreted according to the current state.
    Message(String),
    /// Abandon the current flow.
    Cancel,
}

/// What kind of failure a [`ReplyKind::Failed`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network or rate-limit trouble that outlasted the retry.
    Transient,
    /// The backend reply did not contain the expected sections.
    Parse,
    /// The backend rejected the request.
    Backend,
    /// No usable brand voice.
    BrandVoiceUnavailable,
    /// The brand voice could not be replaced.
    VoiceUpdate,
}

/// Result of the optional image step after approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// No image was asked for.
    NotRequested,
    /// Image generated.
    Ready(ImageRef),
    /// Image generation failed; the text stands on its own.
    Failed(String),
    /// The user cancelled while the image was being generated.
    Discarded,
}

/// Out-of-band information attached to a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The previous flow expired from inactivity and was cancelled.
    SessionTimedOut,
}

/// Reply payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    /// Choose a platform for the given flow.
    AskPlatform(Flow),
    /// Send the topic for a post.
    AskTopic(Platform),
    /// Send the calendar size and optional themes.
    AskCalendarScope(Platform),
    /// Send the revision instruction.
    AskRevision(Option<OptionLabel>),
    /// Send the brand voice document.
    AskVoiceUpload,
    /// Two fresh options.
    Drafts {
        /// The options.
        drafts: DraftSet,
        /// Platform they were written for.
        platform: Platform,
        /// Platform limit violations, if any.
        warnings: Vec<String>,
        /// Whether "pick with image" can be offered.
        images_available: bool,
    },
    /// An option was approved.
    Approved {
        /// Approved option.
        label: OptionLabel,
        /// Platform it was written for.
        platform: Platform,
        /// Copy-paste-ready text.
        clean_copy: String,
        /// Image step result.
        image: ImageOutcome,
        /// Whether the approval reached preference memory.
        memory_saved: bool,
    },
    /// A calendar plan.
    Calendar(CalendarPlan),
    /// The calendar was approved.
    CalendarSaved {
        /// Number of planned posts.
        posts: usize,
    },
    /// The brand voice was replaced.
    VoiceUpdated {
        /// Characters in the new voice.
        chars: usize,
        /// Words in the new voice.
        words: usize,
    },
    /// The flow was cancelled.
    Cancelled {
        /// Whether an in-flight result was thrown away.
        discarded_generation: bool,
    },
    /// Cancel recorded; it applies when the in-flight request returns.
    CancelPending,
    /// Cancel with nothing in progress.
    NothingToCancel,
    /// A generation is already in flight for this user.
    Busy,
    /// The step failed; the session stays usable.
    Failed {
        /// Failure class.
        kind: FailureKind,
        /// User-facing explanation.
        message: String,
        /// Whether regenerating may help.
        retryable: bool,
        /// Consecutive failures in this session.
        consecutive: u32,
        /// Whether the consecutive-failure limit has been reached.
        limit_reached: bool,
    },
    /// The action does not fit the current state.
    Invalid {
        /// What the user can do instead.
        hint: String,
    },
}

/// Engine response to one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Session state after the action.
    pub state: State,
    /// Payload.
    pub kind: ReplyKind,
    /// Extra notice, such as a timeout of the previous flow.
    pub notice: Option<Notice>,
}

impl Reply {
    pub(crate) fn new(state: State, kind: ReplyKind) -> Self {
        Self {
            state,
            kind,
            notice: None,
        }
    }

    pub(crate) fn invalid(state: State, hint: impl Into<String>) -> Self {
        Self::new(state, ReplyKind::Invalid { hint: hint.into() })
    }
}
