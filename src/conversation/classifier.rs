//! Free-text interpretation for the conversational path.

use crate::platform::Platform;
use crate::prompt::CalendarScope;
use crate::types::ContentTypeHint;

/// What a free-text request asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    /// Platform named in the text, if any.
    pub platform: Option<Platform>,
    /// Content type named in the text.
    pub content_hint: ContentTypeHint,
    /// The topic, as sent.
    pub topic: String,
}

/// Turns a free-text request into an [`Intent`].
pub trait IntentClassifier: Send + Sync {
    /// Classify `text`. Never fails; unknown parts stay unset.
    fn classify(&self, text: &str) -> Intent;
}

const PLATFORM_KEYWORDS: [(&str, Platform); 7] = [
    ("rednote", Platform::Rednote),
    ("xiaohongshu", Platform::Rednote),
    ("小红书", Platform::Rednote),
    ("xhs", Platform::Rednote),
    ("instagram", Platform::Instagram),
    ("insta", Platform::Instagram),
    ("ig", Platform::Instagram),
];

const HINT_KEYWORDS: [(&str, ContentTypeHint); 8] = [
    ("carousel", ContentTypeHint::Carousel),
    ("slides", ContentTypeHint::Carousel),
    ("reel", ContentTypeHint::ReelCaption),
    ("instagram story", ContentTypeHint::Story),
    ("ig story", ContentTypeHint::Story),
    ("story post", ContentTypeHint::Story),
    ("stories", ContentTypeHint::Story),
    ("feed post", ContentTypeHint::FeedPost),
];

/// Keyword matcher over whole words (or phrases) of the lowercased text.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Byte offset of the first standalone occurrence of `term`.
    fn find_term(haystack: &str, term: &str) -> Option<usize> {
        if !term.is_ascii() {
            return haystack.find(term);
        }
        haystack
            .match_indices(term)
            .map(|(start, _)| start)
            .find(|&start| {
                let before = haystack.get(..start).and_then(|s| s.chars().next_back());
                let after = haystack
                    .get(start.saturating_add(term.len())..)
                    .and_then(|s| s.chars().next());
                !before.is_some_and(char::is_alphanumeric)
                    && !after.is_some_and(char::is_alphanumeric)
            })
    }

    /// Value of the keyword mentioned earliest in `haystack`. Keywords at the
    /// same offset keep table order.
    fn earliest<T: Copy>(haystack: &str, table: &[(&str, T)]) -> Option<T> {
        table
            .iter()
            .filter_map(|(keyword, value)| Self::find_term(haystack, keyword).map(|at| (at, *value)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, value)| value)
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Intent {
        let lower = text.to_lowercase();
        Intent {
            platform: Self::earliest(&lower, &PLATFORM_KEYWORDS),
            content_hint: Self::earliest(&lower, &HINT_KEYWORDS).unwrap_or(ContentTypeHint::Auto),
            topic: text.trim().to_owned(),
        }
    }
}

/// Parse a calendar size with optional themes.
///
/// Accepts `5`, `5: rest, boundaries` and `7 posts about rest, boundaries`.
/// Returns `None` when no leading number is present or it is outside `3..=7`.
pub fn parse_calendar_scope(text: &str) -> Option<CalendarScope> {
    let text = text.trim();
    let digits_end = text
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(text.len(), |(i, _)| i);
    let posts: usize = text.get(..digits_end)?.parse().ok()?;

    let mut rest = text.get(digits_end..).unwrap_or_default().trim_start();
    for filler in ["posts", "post", "days", "day"] {
        if let Some(stripped) = rest.strip_prefix(filler) {
            rest = stripped.trim_start();
            break;
        }
    }
    rest = rest.trim_start_matches([':', '-', ',']).trim_start();
    for filler in ["about", "on", "covering"] {
        if let Some(stripped) = rest.strip_prefix(filler) {
            if stripped.starts_with(char::is_whitespace) {
                rest = stripped.trim_start();
                break;
            }
        }
    }

    let themes = rest
        .split([',', ';', '\n'])
        .map(str::to_owned)
        .collect();
    CalendarScope::new(posts, themes)
}
