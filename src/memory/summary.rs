//! Aggregate tendencies over the preference window.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{DraftStyle, OptionLabel};

use super::PreferenceEntry;

/// Content type assumed for entries that did not record one.
const DEFAULT_CONTENT_TYPE: &str = "feed post";

/// Statistics over a non-empty preference window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceSummary {
    /// Number of entries summarised.
    pub total: usize,
    /// Times option A was chosen.
    pub option_a: usize,
    /// Times the reflective style was chosen.
    pub reflective: usize,
    /// Shortest approved caption, in words.
    pub min_words: usize,
    /// Longest approved caption, in words.
    pub max_words: usize,
    /// Mean caption length, in words.
    pub avg_words: usize,
    /// Captions opening with a question.
    pub question_hooks: usize,
    /// Captions containing a personal anecdote.
    pub personal_stories: usize,
    /// Most frequent content type.
    pub favourite_content_type: String,
    /// Mean hashtag count.
    pub avg_hashtags: usize,
    /// Recurring revision requests, already phrased for the prompt.
    pub revision_patterns: Vec<&'static str>,
}

impl PreferenceSummary {
    /// Times option B was chosen.
    pub fn option_b(&self) -> usize {
        self.total.saturating_sub(self.option_a)
    }

    /// Times the direct style was chosen.
    pub fn direct(&self) -> usize {
        self.total.saturating_sub(self.reflective)
    }

    /// The option picked more often; ties go to A.
    pub fn preferred_option(&self) -> OptionLabel {
        if self.option_a >= self.option_b() {
            OptionLabel::A
        } else {
            OptionLabel::B
        }
    }

    /// The style picked more often; ties go to reflective.
    pub fn preferred_style(&self) -> DraftStyle {
        if self.reflective >= self.direct() {
            DraftStyle::Reflective
        } else {
            DraftStyle::Direct
        }
    }

    fn frequency(&self, count: usize) -> &'static str {
        if count > self.total / 2 {
            "often"
        } else if count == 0 {
            "rarely"
        } else {
            "sometimes"
        }
    }
}

impl fmt::Display for PreferenceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let option = self.preferred_option();
        let option_count = self.option_a.max(self.option_b());
        writeln!(f, "Based on {} recently approved posts:", self.total)?;
        writeln!(
            f,
            "- Prefers Option {option} ({}), chosen {option_count}/{} times",
            option.style(),
            self.total
        )?;
        writeln!(
            f,
            "- Preferred style overall: {} ({} reflective, {} direct)",
            self.preferred_style(),
            self.reflective,
            self.direct()
        )?;
        writeln!(
            f,
            "- Preferred caption length: {}-{} words (average {})",
            self.min_words, self.max_words, self.avg_words
        )?;
        writeln!(
            f,
            "- Question hooks: {} used ({}/{})",
            self.frequency(self.question_hooks),
            self.question_hooks,
            self.total
        )?;
        writeln!(
            f,
            "- Personal stories: {} included ({}/{})",
            self.frequency(self.personal_stories),
            self.personal_stories,
            self.total
        )?;
        writeln!(f, "- Favourite content type: {}", self.favourite_content_type)?;
        write!(f, "- Preferred hashtag count: ~{}", self.avg_hashtags)?;
        if !self.revision_patterns.is_empty() {
            write!(
                f,
                "\n- Common revision requests: {}",
                self.revision_patterns.join(", ")
            )?;
        }
        Ok(())
    }
}

/// Summarise a window of entries. Returns `None` for an empty window.
pub fn summarize(entries: &[PreferenceEntry]) -> Option<PreferenceSummary> {
    let total = entries.len();
    if total == 0 {
        return None;
    }

    let count = |pred: &dyn Fn(&PreferenceEntry) -> bool| entries.iter().filter(|e| pred(e)).count();

    let words: Vec<usize> = entries.iter().map(|e| e.word_count).collect();
    let word_sum = words.iter().fold(0usize, |acc, w| acc.saturating_add(*w));
    let hashtag_sum = entries
        .iter()
        .fold(0usize, |acc, e| acc.saturating_add(e.hashtag_count));

    let mut type_counts: BTreeMap<String, usize> = BTreeMap::new();
    for entry in entries {
        let key = entry
            .content_type
            .as_deref()
            .map(|t| t.replace('_', " ").to_lowercase())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());
        let slot = type_counts.entry(key).or_insert(0);
        *slot = slot.saturating_add(1);
    }
    // BTreeMap order makes ties resolve alphabetically.
    let favourite_content_type = type_counts
        .iter()
        .fold(None::<(&String, usize)>, |best, (name, n)| match best {
            Some((_, best_n)) if best_n >= *n => best,
            _ => Some((name, *n)),
        })
        .map(|(name, _)| name.clone())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());

    Some(PreferenceSummary {
        total,
        option_a: count(&|e| e.label == OptionLabel::A),
        reflective: count(&|e| e.style == DraftStyle::Reflective),
        min_words: words.iter().copied().min().unwrap_or(0),
        max_words: words.iter().copied().max().unwrap_or(0),
        avg_words: word_sum.checked_div(total).unwrap_or(0),
        question_hooks: count(&|e| e.has_question_hook),
        personal_stories: count(&|e| e.has_personal_story),
        favourite_content_type,
        avg_hashtags: hashtag_sum.checked_div(total).unwrap_or(0),
        revision_patterns: revision_patterns(entries),
    })
}

fn revision_patterns(entries: &[PreferenceEntry]) -> Vec<&'static str> {
    let notes: Vec<String> = entries
        .iter()
        .flat_map(|e| e.revision_notes.iter())
        .map(|n| n.to_lowercase())
        .collect();
    let mut patterns = Vec::new();
    for (needle, phrase) in [
        ("short", "\"make it shorter\""),
        ("long", "\"make it longer\""),
        ("question", "\"add a question\""),
        ("personal", "\"make it more personal\""),
    ] {
        if notes.iter().any(|n| n.contains(needle)) {
            patterns.push(phrase);
        }
    }
    patterns
}
