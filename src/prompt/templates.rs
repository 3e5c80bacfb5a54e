//! Fixed prompt text: output contracts and section delimiters.
//!
//! The delimiters here are the same strings the reply parsers in
//! [`crate::generation::parse`] look for.

/// Section header for option A.
pub const OPTION_A_HEADER: &str = "===== OPTION A (Reflective) =====";
/// Section header for option B.
pub const OPTION_B_HEADER: &str = "===== OPTION B (Direct) =====";

/// Section header for calendar entry `n` (1-based).
pub fn day_header(n: usize) -> String {
    format!("====== DAY {n} ======")
}

pub(crate) const STYLE_RULES: &str = "\
STYLE RULES:
- Write as the brand, in first person where natural. Never sound like a marketer or an AI.
- Follow the brand voice guide exactly: its preferred words, its banned words, its rhythm.
- Use contractions. At most one exclamation mark per post.
- Every draft must be ready to copy and post as-is.";

pub(crate) const DUAL_OPTION_CONTRACT: &str = "\
Produce EXACTLY TWO options. Not one, not three.

OPTION A, \"Reflective\":
- Opens with a question or an introspective statement.
- Contemplative and narrative; slightly longer and more story-driven.

OPTION B, \"Direct\":
- Opens with a bold, clear statement or insight.
- Grounded and action-oriented; slightly shorter and punchier.

Both options must satisfy the brand voice and the platform rules, include complete
hashtags and a visual suggestion, and differ in structure and feel, not just wording.";

pub(crate) const CONTENT_TYPE_RULES: &str = "\
CONTENT TYPE:
Pick the best content type for each option yourself (Feed Post, Carousel, Reel Caption, Story).
Multi-point topics, lists, and steps suit a carousel; a single emotion or narrative suits a feed post.
State the chosen type and a one-line reason at the top of each option.";

pub(crate) const OPTION_FIELDS: &str = "\
Each option uses these labelled fields, each starting on its own line:
Content Type: <type> - <one-line reason>
Title: <title, only for platforms that show one>
Caption: <the full ready-to-post caption>
Hashtags: <#tag1 #tag2 ...>
Visual Suggestion: <one sentence describing the image to pair with it>";

pub(crate) const CALENDAR_CONTRACT: &str = "\
Each entry must be distinct: no repeated themes or phrases across the plan.
Vary the emotional register (reflective, affirming, practical, story-driven) and the structure.
Give the plan an arc: grounding and intention early, deeper exploration in the middle,
rest and integration at the end.

Each entry uses these labelled fields, each starting on its own line:
Day: <suggested day, e.g. Monday>
Platform: <instagram or rednote>
Topic: <the topic to write about, one sentence>
Angle: <the hook or angle, one sentence>";

/// Neutral preference layer used when nothing has been approved yet.
pub(crate) const NEUTRAL_PREFERENCES: &str = "\
No posts have been approved yet. Do not assume any preference between the two styles;
give both options equal care.";

pub(crate) const PREFERENCE_GUIDANCE: &str = "\
Use these tendencies to guide style, but they are not rules. The user may want to try something different.";
