//! Reply parsers for draft options and calendar plans.
//!
//! Parsers never guess. A reply that lacks exactly the expected labelled
//! sections is a [`GenerationParseError`] carrying the raw text.

use std::sync::LazyLock;

use regex::Regex;

use crate::platform::Platform;
use crate::prompt::CalendarScope;
use crate::types::{CalendarPlan, DraftOption, DraftSet, OptionLabel, PlannedPost};

static HASHTAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"#[\p{L}\p{N}_]+").ok());

/// A backend reply that does not match the requested output contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not parse backend reply: {reason}")]
pub struct GenerationParseError {
    /// Unmodified reply text, for diagnostics.
    pub raw: String,
    /// What was wrong with it.
    pub reason: String,
}

impl GenerationParseError {
    fn new(raw: &str, reason: impl Into<String>) -> Self {
        Self {
            raw: raw.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Hashtags in `text`, in order of appearance, without duplicates.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let Some(re) = HASHTAG.as_ref() else {
        return Vec::new();
    };
    let mut tags: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let tag = m.as_str().to_owned();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Number of distinct hashtags in `text`.
pub fn count_hashtags(text: &str) -> usize {
    extract_hashtags(text).len()
}

/// Strip decoration (`=`, `*`, `#`, whitespace) around a header line.
fn header_core(line: &str) -> Option<String> {
    let trimmed = line.trim().trim_matches(|c: char| c == '*' || c == '#' || c.is_whitespace());
    if !trimmed.starts_with("===") {
        return None;
    }
    Some(trimmed.trim_matches(|c: char| c == '=' || c.is_whitespace()).to_uppercase())
}

fn option_header(line: &str) -> Option<OptionLabel> {
    let core = header_core(line)?;
    let rest = core.strip_prefix("OPTION")?.trim_start();
    let mut chars = rest.chars();
    let label = match chars.next()? {
        'A' => OptionLabel::A,
        'B' => OptionLabel::B,
        _ => return None,
    };
    match chars.next() {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(label),
    }
}

fn day_header(line: &str) -> Option<usize> {
    let core = header_core(line)?;
    let rest = core.strip_prefix("DAY")?.trim();
    rest.parse().ok()
}

/// Split `raw` into `(header, body)` sections using `detect`.
/// Text before the first header is discarded.
fn sections<T>(raw: &str, detect: impl Fn(&str) -> Option<T>) -> Vec<(T, String)> {
    let mut out: Vec<(T, String)> = Vec::new();
    for line in raw.lines() {
        if let Some(header) = detect(line) {
            out.push((header, String::new()));
        } else if let Some((_, body)) = out.last_mut() {
            body.push_str(line);
            body.push('\n');
        }
    }
    for (_, body) in &mut out {
        *body = body.trim().to_owned();
    }
    out
}

/// Labelled `Name: value` fields, values may continue over following lines
/// until the next known field.
fn fields(body: &str, names: &[&str]) -> Vec<(usize, String)> {
    let mut out: Vec<(usize, String)> = Vec::new();
    for line in body.lines() {
        let plain = line.trim().trim_start_matches(['*', '-', ' ']);
        let matched = names.iter().enumerate().find_map(|(i, name)| {
            let head = plain.get(..name.len())?;
            if !head.eq_ignore_ascii_case(name) {
                return None;
            }
            let rest = plain.get(name.len()..)?.trim_start_matches('*').trim_start();
            let value = rest.strip_prefix(':')?;
            Some((i, value.trim_start_matches('*').trim().to_owned()))
        });
        match matched {
            Some(field) => out.push(field),
            None => {
                if let Some((_, value)) = out.last_mut() {
                    value.push('\n');
                    value.push_str(line);
                }
            }
        }
    }
    for (_, value) in &mut out {
        *value = value.trim().to_owned();
    }
    out
}

fn field<'a>(fields: &'a [(usize, String)], index: usize) -> Option<&'a str> {
    fields
        .iter()
        .find(|(i, value)| *i == index && !value.is_empty())
        .map(|(_, value)| value.as_str())
}

const CONTENT_TYPE: usize = 0;
const TITLE: usize = 1;
const CAPTION: usize = 2;
const HASHTAGS: usize = 3;
const VISUAL: usize = 4;
const OPTION_FIELDS: [&str; 5] = [
    "Content Type",
    "Title",
    "Caption",
    "Hashtags",
    "Visual Suggestion",
];

fn content_type_name(value: &str) -> String {
    let end = [" - ", " \u{2014} ", " \u{2013} ", "(", ":"]
        .iter()
        .filter_map(|sep| value.find(sep))
        .min()
        .unwrap_or(value.len());
    value.get(..end).unwrap_or(value).trim().to_owned()
}

fn draft_option(label: OptionLabel, body: String) -> DraftOption {
    let found = fields(&body, &OPTION_FIELDS);
    let hashtags = match field(&found, HASHTAGS) {
        Some(block) => extract_hashtags(block),
        None => extract_hashtags(&body),
    };
    DraftOption {
        label,
        style: label.style(),
        content_type: field(&found, CONTENT_TYPE).map(content_type_name),
        title: field(&found, TITLE).map(str::to_owned),
        caption: field(&found, CAPTION).map(str::to_owned),
        visual: field(&found, VISUAL).map(str::to_owned),
        hashtags,
        body,
    }
}

/// Parse a single-post reply into options A and B.
///
/// # Errors
///
/// Returns [`GenerationParseError`] unless the reply has exactly one option A
/// section followed by exactly one option B section, both non-empty.
pub fn parse_draft_options(raw: &str) -> Result<DraftSet, GenerationParseError> {
    let found = sections(raw, option_header);
    let labels: Vec<OptionLabel> = found.iter().map(|(label, _)| *label).collect();
    if labels != OptionLabel::BOTH {
        return Err(GenerationParseError::new(
            raw,
            format!(
                "expected option A then option B, found {} labelled section(s): {}",
                labels.len(),
                labels
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ));
    }

    let mut options = found.into_iter();
    let (Some((a_label, a_body)), Some((b_label, b_body))) = (options.next(), options.next())
    else {
        return Err(GenerationParseError::new(raw, "missing option section"));
    };
    for (label, body) in [(a_label, &a_body), (b_label, &b_body)] {
        if body.is_empty() {
            return Err(GenerationParseError::new(
                raw,
                format!("option {label} is empty"),
            ));
        }
    }

    Ok(DraftSet::new(
        draft_option(a_label, a_body),
        draft_option(b_label, b_body),
        raw.to_owned(),
    ))
}

const DAY: usize = 0;
const PLATFORM: usize = 1;
const TOPIC: usize = 2;
const ANGLE: usize = 3;
const CALENDAR_FIELDS: [&str; 4] = ["Day", "Platform", "Topic", "Angle"];

/// Parse a calendar reply into a plan with exactly `scope.posts()` entries.
///
/// Entries whose platform is missing or unknown use `default_platform`.
///
/// # Errors
///
/// Returns [`GenerationParseError`] when the number of day sections differs
/// from the requested scope or an entry has no topic.
pub fn parse_calendar_plan(
    raw: &str,
    scope: &CalendarScope,
    default_platform: Platform,
) -> Result<CalendarPlan, GenerationParseError> {
    let found = sections(raw, day_header);
    if found.len() != scope.posts() {
        return Err(GenerationParseError::new(
            raw,
            format!(
                "expected {} day sections, found {}",
                scope.posts(),
                found.len()
            ),
        ));
    }

    let mut entries = Vec::with_capacity(found.len());
    for (index, (_, body)) in found.into_iter().enumerate() {
        let position = index.saturating_add(1);
        let parsed = fields(&body, &CALENDAR_FIELDS);
        let topic = field(&parsed, TOPIC)
            .map(str::to_owned)
            .or_else(|| {
                body.lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(str::to_owned)
            })
            .ok_or_else(|| {
                GenerationParseError::new(raw, format!("day {position} has no topic"))
            })?;
        let platform = field(&parsed, PLATFORM)
            .and_then(|p| p.parse().ok())
            .unwrap_or(default_platform);
        entries.push(PlannedPost {
            position,
            day: field(&parsed, DAY)
                .map(str::to_owned)
                .unwrap_or_else(|| format!("Day {position}")),
            platform,
            topic,
            angle: field(&parsed, ANGLE).map(str::to_owned),
        });
    }

    CalendarPlan::new(entries, raw.to_owned()).ok_or_else(|| {
        GenerationParseError::new(raw, "calendar size outside the supported range")
    })
}
