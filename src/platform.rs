//! Target platforms and their fixed drafting rules.
//!
//! A [`PlatformProfile`] is immutable once the [`PlatformRegistry`] is built.
//! The rule text is spliced verbatim into the platform layer of every prompt;
//! the numeric limits drive [`validate_draft`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::providers::ImageSize;
use crate::types::DraftOption;

/// A social platform drafts can be written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Instagram feed, carousel, reel, and story captions.
    Instagram,
    /// Rednote (Xiaohongshu) notes with a visible title.
    Rednote,
}

impl Platform {
    /// All supported platforms in display order.
    pub const ALL: [Platform; 2] = [Platform::Instagram, Platform::Rednote];

    /// Stable lowercase identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Rednote => "rednote",
        }
    }

    /// Human-facing name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Rednote => "Rednote",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a platform name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform '{0}', expected 'instagram' or 'rednote'")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "instagram" | "ig" | "insta" => Ok(Self::Instagram),
            "rednote" | "xiaohongshu" | "xhs" | "小红书" => Ok(Self::Rednote),
            other => Err(UnknownPlatform(other.to_owned())),
        }
    }
}

/// Hard limits a platform enforces on a published post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformLimits {
    /// Maximum caption/body length in characters.
    pub max_body_chars: usize,
    /// Maximum number of hashtags.
    pub max_hashtags: usize,
    /// Maximum title length in characters, for platforms with titles.
    pub max_title_chars: Option<usize>,
}

/// How many hashtags a draft should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashtagPolicy {
    /// Lower bound the model is asked to meet.
    pub min: usize,
    /// Upper bound the model is asked to respect.
    pub max: usize,
}

/// Fixed template rules for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Platform identifier.
    pub platform: Platform,
    /// Languages each draft must be written in.
    pub languages: &'static [&'static str],
    /// Tone, structure, and formatting rules for the prompt.
    pub rules: &'static str,
    /// Publishing limits.
    pub limits: PlatformLimits,
    /// Hashtag count policy.
    pub hashtags: HashtagPolicy,
    /// Image dimensions for generated visuals.
    pub image_size: ImageSize,
}

const INSTAGRAM_RULES: &str = "\
PLATFORM: Instagram
LANGUAGE: English only

CAPTION STRUCTURE (feed post):
1. HOOK: the first line, visible before \"...more\". Under 15 words. A reflective statement or gentle provocation.
2. BODY: two or three short paragraphs separated by blank lines, warm and grounded.
3. INVITATION: a soft call to engage (a question, an invitation to message, or a prompt to save). Never salesy.

CAROUSEL: cover slide title under 10 words, one insight per slide on slides 2-6, a closing summary slide, then a short caption.
REEL CAPTION: hook under 10 words, one or two sentences of context, a simple engagement prompt.

FORMATTING:
- Feed captions run 150-300 words.
- Emojis: 0-2, only where they add warmth.
- Always use contractions and the Oxford comma.
- Address the reader as \"you\".
- Hashtags go in a separate block after the caption.";

const REDNOTE_RULES: &str = "\
PLATFORM: Rednote (Xiaohongshu)
LANGUAGES: English AND Chinese versions of every draft

RULES:
- Every note has a visible title of 10-20 characters, curiosity-driven but honest, optionally with one or two emojis.
- Content is more personal and story-driven than Instagram. Short sentences, frequent paragraph breaks.
- Emojis: 2-4, woven in naturally.

BODY STRUCTURE:
1. PERSONAL OPENING: a relatable moment, feeling, or micro-story.
2. INSIGHT: the core message, conversational.
3. PRACTICAL TAKEAWAY: one reflection prompt or small action.
4. CLOSING: a warm sign-off or question.

CHINESE VERSION: culturally adapted, not a literal translation. Use 你, conversational Mandarin.

LAYOUT PER DRAFT:
Title: [English title]
Caption: [English body]
标题: [Chinese title]
[Chinese body]
Hashtags: #tag1 #tag2 ... (English and Chinese tags)";

/// Immutable lookup of platform profiles.
#[derive(Debug, Clone)]
pub struct PlatformRegistry {
    profiles: HashMap<Platform, PlatformProfile>,
}

impl PlatformRegistry {
    /// Registry with the built-in Instagram and Rednote profiles.
    pub fn builtin() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            Platform::Instagram,
            PlatformProfile {
                platform: Platform::Instagram,
                languages: &["English"],
                rules: INSTAGRAM_RULES,
                limits: PlatformLimits {
                    max_body_chars: 2200,
                    max_hashtags: 30,
                    max_title_chars: None,
                },
                hashtags: HashtagPolicy { min: 8, max: 12 },
                image_size: ImageSize::Square,
            },
        );
        profiles.insert(
            Platform::Rednote,
            PlatformProfile {
                platform: Platform::Rednote,
                languages: &["English", "Chinese"],
                rules: REDNOTE_RULES,
                limits: PlatformLimits {
                    max_body_chars: 1000,
                    max_hashtags: 10,
                    max_title_chars: Some(20),
                },
                hashtags: HashtagPolicy { min: 5, max: 8 },
                image_size: ImageSize::Portrait,
            },
        );
        Self { profiles }
    }

    /// Profile for a platform. Every [`Platform`] variant is registered.
    pub fn get(&self, platform: Platform) -> &PlatformProfile {
        // builtin() registers every variant
        &self.profiles[&platform]
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Check a draft against a platform's publishing limits.
///
/// Returns human-readable warnings; an empty list means the draft fits.
pub fn validate_draft(profile: &PlatformProfile, draft: &DraftOption) -> Vec<String> {
    let mut warnings = Vec::new();
    let label = draft.label;

    let body_chars = draft.caption_or_body().chars().count();
    if body_chars > profile.limits.max_body_chars {
        warnings.push(format!(
            "Option {label}: body is {body_chars} characters (max {})",
            profile.limits.max_body_chars
        ));
    }

    let tags = draft.hashtags.len();
    if tags > profile.limits.max_hashtags {
        warnings.push(format!(
            "Option {label}: {tags} hashtags (max {})",
            profile.limits.max_hashtags
        ));
    }

    if let (Some(max_title), Some(title)) = (profile.limits.max_title_chars, &draft.title) {
        let title_chars = title.chars().count();
        if title_chars > max_title {
            warnings.push(format!(
                "Option {label}: title is {title_chars} characters (max {max_title})"
            ));
        }
    }

    warnings
}
