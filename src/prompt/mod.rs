//! Layered prompt composition.
//!
//! Every generation request is built from four layers in a fixed order:
//!
//! 1. persona: brand identity plus the brand voice document
//! 2. platform: the target platform's rules and limits
//! 3. preferences: what the user approved recently, most recent first
//! 4. task: the exact output contract, plus any revision addenda
//!
//! [`compose`] is pure: it reads only its arguments.

pub mod image;
pub mod templates;

use std::fmt::Write as _;

use crate::brand::BrandVoice;
use crate::config::BrandConfig;
use crate::memory::{summarize, PreferenceEntry};
use crate::platform::PlatformProfile;
use crate::types::{CalendarPlan, ContentTypeHint};

pub use self::image::{compose_image_prompt, subject_hint};

use self::templates::{
    day_header, CALENDAR_CONTRACT, CONTENT_TYPE_RULES, DUAL_OPTION_CONTRACT, NEUTRAL_PREFERENCES,
    OPTION_A_HEADER, OPTION_B_HEADER, OPTION_FIELDS, PREFERENCE_GUIDANCE, STYLE_RULES,
};

/// Characters of each approved post quoted in the preference layer.
const EXCERPT_CHARS: usize = 160;

/// Scope of a calendar request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarScope {
    posts: usize,
    /// Optional themes to weave through the plan.
    pub themes: Vec<String>,
}

impl CalendarScope {
    /// Build a scope; `posts` must be within `3..=7`.
    pub fn new(posts: usize, themes: Vec<String>) -> Option<Self> {
        if !(CalendarPlan::MIN_POSTS..=CalendarPlan::MAX_POSTS).contains(&posts) {
            return None;
        }
        let themes = themes
            .into_iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect();
        Some(Self { posts, themes })
    }

    /// Number of planned posts.
    pub fn posts(&self) -> usize {
        self.posts
    }
}

/// What kind of output a request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMode {
    /// Two draft options for one post.
    SinglePost,
    /// A plan of 3 to 7 post ideas.
    Calendar(CalendarScope),
}

/// Inputs to [`compose`].
#[derive(Debug, Clone, Copy)]
pub struct ComposeRequest<'a> {
    /// Freshly read brand voice.
    pub voice: &'a BrandVoice,
    /// Business identity.
    pub brand: &'a BrandConfig,
    /// Target platform profile.
    pub profile: &'a PlatformProfile,
    /// Preference window, most recent first.
    pub preferences: &'a [PreferenceEntry],
    /// Topic or theme the user asked for.
    pub topic: &'a str,
    /// Output kind.
    pub mode: &'a RequestMode,
    /// Content-type hint inferred from the topic.
    pub content_hint: ContentTypeHint,
    /// Revision instructions accumulated in this flow, oldest first.
    pub revisions: &'a [String],
    /// 1 for the first generation, incremented on each regenerate.
    pub attempt: u32,
}

/// The four prompt layers plus the user-turn text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    /// Layer 1.
    pub persona: String,
    /// Layer 2.
    pub platform: String,
    /// Layer 3.
    pub preferences: String,
    /// Layer 4.
    pub task: String,
    /// User-turn message naming the topic.
    pub user: String,
}

impl ComposedPrompt {
    /// Layers 1 to 4 joined under numbered headers.
    pub fn system_prompt(&self) -> String {
        [
            ("# LAYER 1: PERSONA AND BRAND VOICE", &self.persona),
            ("# LAYER 2: PLATFORM RULES", &self.platform),
            ("# LAYER 3: PREFERENCE CONTEXT", &self.preferences),
            ("# LAYER 4: TASK", &self.task),
        ]
        .iter()
        .map(|(header, body)| format!("{header}\n\n{}", body.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
    }

    /// The user-turn message.
    pub fn user_message(&self) -> &str {
        &self.user
    }
}

/// Build the layered prompt for one generation request.
pub fn compose(req: &ComposeRequest<'_>) -> ComposedPrompt {
    ComposedPrompt {
        persona: persona_layer(req.voice, req.brand),
        platform: platform_layer(req.profile),
        preferences: preference_layer(req.preferences),
        task: task_layer(req),
        user: user_message(req),
    }
}

fn persona_layer(voice: &BrandVoice, brand: &BrandConfig) -> String {
    let mut out = format!(
        "You are the content partner for \"{}\". Every post you write must sound like the \
         brand wrote it, not like a marketer.\n",
        brand.name
    );
    if !brand.persona.trim().is_empty() {
        let _ = write!(out, "\n{}\n", brand.persona.trim());
    }
    let _ = write!(out, "\nBRAND VOICE GUIDE:\n{}\n\n{STYLE_RULES}\n", voice.text.trim());
    if !brand.hashtags.is_empty() {
        let _ = write!(
            out,
            "\nAlways include these brand hashtags: {}\n",
            brand.hashtags.join(" ")
        );
    }
    out
}

fn platform_layer(profile: &PlatformProfile) -> String {
    let mut out = format!("{}\n\nLIMITS:\n", profile.rules);
    let _ = writeln!(
        out,
        "- Caption or body: at most {} characters.",
        profile.limits.max_body_chars
    );
    if let Some(title) = profile.limits.max_title_chars {
        let _ = writeln!(out, "- Title: at most {title} characters.");
    }
    let _ = writeln!(
        out,
        "- Hashtags: {} to {} (never more than {}).",
        profile.hashtags.min, profile.hashtags.max, profile.limits.max_hashtags
    );
    let _ = writeln!(out, "- Languages: {}.", profile.languages.join(" and "));
    out
}

fn preference_layer(entries: &[PreferenceEntry]) -> String {
    let Some(summary) = summarize(entries) else {
        return NEUTRAL_PREFERENCES.to_owned();
    };
    let mut out = format!("{summary}\n\nRecent approvals (most recent first):\n");
    for (i, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. [{}] Option {} ({}): {}",
            i.saturating_add(1),
            entry.platform,
            entry.label,
            entry.style,
            entry.excerpt(EXCERPT_CHARS)
        );
    }
    let _ = write!(out, "\n{PREFERENCE_GUIDANCE}\n");
    out
}

fn task_layer(req: &ComposeRequest<'_>) -> String {
    let mut out = match req.mode {
        RequestMode::SinglePost => single_post_task(req),
        RequestMode::Calendar(scope) => calendar_task(req, scope),
    };

    if req.attempt > 1 {
        let _ = write!(
            out,
            "\n\nThis is attempt {} for the same topic. Vary the structure, hooks, and imagery \
             from earlier attempts.",
            req.attempt
        );
    }

    if !req.revisions.is_empty() {
        out.push_str("\n\nREVISION INSTRUCTIONS (apply all, latest last):\n");
        for note in req.revisions {
            let _ = writeln!(out, "- {}", note.trim());
        }
    }
    out
}

fn single_post_task(req: &ComposeRequest<'_>) -> String {
    let mut out = format!(
        "Write a {} post.\n\n{DUAL_OPTION_CONTRACT}\n\n{CONTENT_TYPE_RULES}",
        req.profile.platform.display_name()
    );
    if let Some(label) = req.content_hint.label() {
        let _ = write!(
            out,
            "\nThe user's wording suggests a {label}; prefer it unless the topic clearly suits \
             another type."
        );
    }
    let _ = write!(
        out,
        "\n\n{OPTION_FIELDS}\n\nFORMAT (use these header lines exactly):\n{OPTION_A_HEADER}\n\
         <option A fields>\n\n{OPTION_B_HEADER}\n<option B fields>"
    );
    out
}

fn calendar_task(req: &ComposeRequest<'_>, scope: &CalendarScope) -> String {
    let mut out = format!(
        "Plan a content calendar of EXACTLY {} posts for {}. Do not write the posts \
         themselves; each entry will be expanded into drafts later.\n\n{CALENDAR_CONTRACT}",
        scope.posts(),
        req.profile.platform.display_name()
    );
    if !scope.themes.is_empty() {
        let _ = write!(out, "\n\nThemes to weave through the plan: {}.", scope.themes.join(", "));
    }
    let _ = write!(
        out,
        "\n\nFORMAT (one header line per entry, numbered 1 to {}):\n{}\n<entry fields>\n\n{}\n\
         <entry fields>\n...",
        scope.posts(),
        day_header(1),
        day_header(2)
    );
    out
}

fn user_message(req: &ComposeRequest<'_>) -> String {
    let topic = req.topic.trim();
    match req.mode {
        RequestMode::SinglePost => format!(
            "Write a post for {} about: {topic}",
            req.profile.platform.display_name()
        ),
        RequestMode::Calendar(scope) if topic.is_empty() => format!(
            "Create a {}-post {} content calendar.",
            scope.posts(),
            req.profile.platform.display_name()
        ),
        RequestMode::Calendar(scope) => format!(
            "Create a {}-post {} content calendar around: {topic}",
            scope.posts(),
            req.profile.platform.display_name()
        ),
    }
}
