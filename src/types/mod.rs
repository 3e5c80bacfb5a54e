//! Draft data model shared by the generation client, preference memory, and
//! conversation engine.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::platform::Platform;

/// Label of one of the two draft options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionLabel {
    /// First option, written in the reflective style.
    A,
    /// Second option, written in the direct style.
    B,
}

impl OptionLabel {
    /// Both labels in presentation order.
    pub const BOTH: [OptionLabel; 2] = [OptionLabel::A, OptionLabel::B];

    /// The writing style this label is generated in.
    pub fn style(&self) -> DraftStyle {
        match self {
            Self::A => DraftStyle::Reflective,
            Self::B => DraftStyle::Direct,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => f.write_str("A"),
            Self::B => f.write_str("B"),
        }
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "a" | "A" => Ok(Self::A),
            "b" | "B" => Ok(Self::B),
            other => Err(format!("unknown option '{other}', expected A or B")),
        }
    }
}

/// Writing style of a draft option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStyle {
    /// Opens with a question or introspective statement; narrative.
    Reflective,
    /// Opens with a clear statement; shorter and action-oriented.
    Direct,
}

impl DraftStyle {
    /// Lowercase identifier used in prompts and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reflective => "reflective",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for DraftStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content format a topic suggests, passed to the model as a hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTypeHint {
    /// No signal in the text; the model decides.
    #[default]
    Auto,
    /// Single image with a caption.
    FeedPost,
    /// Multi-slide post.
    Carousel,
    /// Short video caption.
    ReelCaption,
    /// Ephemeral story frame.
    Story,
}

impl ContentTypeHint {
    /// Human-facing name, `None` for [`ContentTypeHint::Auto`].
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::FeedPost => Some("feed post"),
            Self::Carousel => Some("carousel"),
            Self::ReelCaption => Some("reel caption"),
            Self::Story => Some("story"),
        }
    }
}

/// Where a generated image ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    /// Image bytes saved to a local file.
    File(PathBuf),
    /// Image hosted by the backend.
    Url(Url),
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// One generated candidate post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOption {
    /// Which of the two options this is.
    pub label: OptionLabel,
    /// Style the option was written in.
    pub style: DraftStyle,
    /// Full section text as returned by the backend.
    pub body: String,
    /// Content type the model chose (feed post, carousel, ...).
    pub content_type: Option<String>,
    /// Post title, for platforms that show one.
    pub title: Option<String>,
    /// Caption text when the model used an explicit `Caption:` field.
    pub caption: Option<String>,
    /// Hashtags found in the option.
    pub hashtags: Vec<String>,
    /// Suggested visual to pair with the post.
    pub visual: Option<String>,
}

impl DraftOption {
    /// The caption if one was labelled, otherwise the whole section body.
    pub fn caption_or_body(&self) -> &str {
        self.caption.as_deref().unwrap_or(&self.body)
    }

    /// Copy-paste-ready text: caption followed by the hashtag block.
    ///
    /// When no explicit caption was labelled the whole body is returned as is,
    /// since it already carries its hashtags.
    pub fn clean_copy(&self) -> String {
        let Some(caption) = self.caption.as_deref() else {
            return self.body.clone();
        };
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push_str("\n\n");
        }
        out.push_str(caption);
        if !self.hashtags.is_empty() && !caption.contains('#') {
            out.push_str("\n\n");
            out.push_str(&self.hashtags.join(" "));
        }
        out
    }
}

/// Exactly two draft options produced by one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSet {
    /// Identifier of this batch, used to reject stale selections.
    pub id: Uuid,
    /// Options A and B, in that order.
    pub options: [DraftOption; 2],
    /// Raw backend reply, kept for diagnostics.
    pub raw: String,
}

impl DraftSet {
    /// Build a set from options A and B.
    pub fn new(a: DraftOption, b: DraftOption, raw: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            options: [a, b],
            raw,
        }
    }

    /// The option with the given label.
    pub fn get(&self, label: OptionLabel) -> &DraftOption {
        &self.options[label.index()]
    }
}

/// One planned post inside a [`CalendarPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPost {
    /// Position in the plan, starting at 1.
    pub position: usize,
    /// Suggested day label (e.g. "Monday").
    pub day: String,
    /// Platform the post is planned for.
    pub platform: Platform,
    /// Topic to expand into drafts later.
    pub topic: String,
    /// Optional angle or hook idea.
    pub angle: Option<String>,
}

impl PlannedPost {
    /// Topic text handed to a single-post generation when the entry is expanded.
    pub fn expansion_topic(&self) -> String {
        match &self.angle {
            Some(angle) => format!("{}\n\nAngle: {angle}", self.topic),
            None => self.topic.clone(),
        }
    }
}

/// Ordered sequence of 3 to 7 planned posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarPlan {
    /// Identifier of this plan.
    pub id: Uuid,
    /// Planned posts in publishing order.
    pub entries: Vec<PlannedPost>,
    /// Raw backend reply, kept for diagnostics.
    pub raw: String,
}

impl CalendarPlan {
    /// Smallest accepted plan.
    pub const MIN_POSTS: usize = 3;
    /// Largest accepted plan.
    pub const MAX_POSTS: usize = 7;

    /// Build a plan, rejecting entry counts outside `3..=7`.
    pub fn new(entries: Vec<PlannedPost>, raw: String) -> Option<Self> {
        if !(Self::MIN_POSTS..=Self::MAX_POSTS).contains(&entries.len()) {
            return None;
        }
        Some(Self {
            id: Uuid::new_v4(),
            entries,
            raw,
        })
    }

    /// Entry by 1-based position.
    pub fn entry(&self, position: usize) -> Option<&PlannedPost> {
        position
            .checked_sub(1)
            .and_then(|index| self.entries.get(index))
    }
}
