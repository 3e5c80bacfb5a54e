//! Per-user conversation state.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::memory::PreferenceEntry;
use crate::platform::Platform;
use crate::prompt::CalendarScope;
use crate::types::{CalendarPlan, ContentTypeHint, DraftSet, OptionLabel};

/// Guided flow a session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Create one post.
    Post,
    /// Plan a content calendar.
    Calendar,
    /// Replace the brand voice.
    VoiceUpdate,
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Post => "post",
            Self::Calendar => "calendar",
            Self::VoiceUpdate => "voice_update",
        })
    }
}

/// Step within a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// No flow in progress.
    Idle,
    /// Waiting for a platform choice.
    AwaitingPlatform,
    /// Waiting for a post topic.
    AwaitingTopic,
    /// Two options are on screen.
    OptionsPresented,
    /// Waiting for the text of a revision.
    AwaitingRevisionText,
    /// Waiting for the calendar size.
    AwaitingCalendarScope,
    /// A calendar plan is on screen.
    CalendarPresented,
    /// Waiting for a brand voice document.
    AwaitingVoiceUpload,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::AwaitingPlatform => "awaiting_platform",
            Self::AwaitingTopic => "awaiting_topic",
            Self::OptionsPresented => "options_presented",
            Self::AwaitingRevisionText => "awaiting_revision_text",
            Self::AwaitingCalendarScope => "awaiting_calendar_scope",
            Self::CalendarPresented => "calendar_presented",
            Self::AwaitingVoiceUpload => "awaiting_voice_upload",
        })
    }
}

/// The calendar a post sub-flow was expanded from.
#[derive(Debug, Clone)]
pub(crate) struct CalendarContext {
    pub(crate) platform: Option<Platform>,
    pub(crate) scope: Option<CalendarScope>,
    pub(crate) plan: CalendarPlan,
    pub(crate) revision_addenda: Vec<String>,
    pub(crate) preference_snapshot: Option<Vec<PreferenceEntry>>,
    pub(crate) attempt: u32,
}

/// Everything one user's conversation has accumulated.
#[derive(Debug)]
pub struct Session {
    pub(crate) state: State,
    pub(crate) flow: Option<Flow>,
    pub(crate) platform: Option<Platform>,
    pub(crate) topic: Option<String>,
    pub(crate) content_hint: ContentTypeHint,
    pub(crate) scope: Option<CalendarScope>,
    pub(crate) drafts: Option<DraftSet>,
    pub(crate) plan: Option<CalendarPlan>,
    /// Set while a calendar entry is being expanded into a post.
    pub(crate) parent_calendar: Option<CalendarContext>,
    /// Raw revision instructions, recorded with the approval.
    pub(crate) revision_notes: Vec<String>,
    /// Revision lines for the task layer.
    pub(crate) revision_addenda: Vec<String>,
    pub(crate) revision_target: Option<OptionLabel>,
    /// Preference window captured at the flow's first generation.
    pub(crate) preference_snapshot: Option<Vec<PreferenceEntry>>,
    pub(crate) attempt: u32,
    pub(crate) consecutive_failures: u32,
    pub(crate) generating: bool,
    pub(crate) cancel_requested: bool,
    /// Bumped on every reset; in-flight results from an older epoch are dropped.
    pub(crate) epoch: u64,
    /// Set when an idle sweep cancelled the flow; cleared by the next reply.
    pub(crate) timed_out: bool,
    pub(crate) last_activity: Instant,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Idle,
            flow: None,
            platform: None,
            topic: None,
            content_hint: ContentTypeHint::Auto,
            scope: None,
            drafts: None,
            plan: None,
            parent_calendar: None,
            revision_notes: Vec::new(),
            revision_addenda: Vec::new(),
            revision_target: None,
            preference_snapshot: None,
            attempt: 0,
            consecutive_failures: 0,
            generating: false,
            cancel_requested: false,
            epoch: 0,
            timed_out: false,
            last_activity: Instant::now(),
        }
    }

    /// Drop all flow state and return to idle. The failure counter survives.
    pub(crate) fn reset(&mut self) {
        let failures = self.consecutive_failures;
        let last_activity = self.last_activity;
        let epoch = self.epoch.wrapping_add(1);
        *self = Self::new();
        self.consecutive_failures = failures;
        self.last_activity = last_activity;
        self.epoch = epoch;
    }

    /// Start a fresh post flow for `platform`, keeping nothing from the
    /// previous flow.
    pub(crate) fn begin_post(&mut self, platform: Platform, topic: String, hint: ContentTypeHint) {
        self.reset();
        self.flow = Some(Flow::Post);
        self.platform = Some(platform);
        self.topic = Some(topic);
        self.content_hint = hint;
    }

    /// Start a post sub-flow for one calendar entry. The calendar is kept
    /// aside and comes back when the post is approved.
    ///
    /// Returns `false` if there is no plan to expand from.
    pub(crate) fn begin_expansion(&mut self, platform: Platform, topic: String) -> bool {
        let Some(plan) = self.plan.take() else {
            return false;
        };
        let parent = CalendarContext {
            platform: self.platform,
            scope: self.scope.take(),
            plan,
            revision_addenda: std::mem::take(&mut self.revision_addenda),
            preference_snapshot: self.preference_snapshot.take(),
            attempt: self.attempt,
        };
        self.begin_post(platform, topic, ContentTypeHint::Auto);
        self.parent_calendar = Some(parent);
        true
    }

    /// Close a finished post flow: back to the calendar it was expanded
    /// from, otherwise idle.
    pub(crate) fn finish_post(&mut self) {
        let parent = self.parent_calendar.take();
        self.reset();
        if let Some(parent) = parent {
            self.flow = Some(Flow::Calendar);
            self.state = State::CalendarPresented;
            self.platform = parent.platform;
            self.scope = parent.scope;
            self.plan = Some(parent.plan);
            self.revision_addenda = parent.revision_addenda;
            self.preference_snapshot = parent.preference_snapshot;
            self.attempt = parent.attempt;
        }
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub(crate) fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// A flow that has seen no activity for `timeout`.
    ///
    /// A generation that has been outstanding that long is treated as lost
    /// so the session cannot stay busy forever.
    pub(crate) fn is_expired(&self, timeout: Duration) -> bool {
        let active = self.state != State::Idle || self.generating;
        active && self.idle_for() >= timeout
    }

    pub(crate) fn is_busy(&self, timeout: Duration) -> bool {
        self.generating && self.idle_for() < timeout
    }
}
