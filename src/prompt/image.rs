//! Image prompt derivation from an approved draft.

use crate::platform::PlatformProfile;
use crate::providers::ImageRequest;
use crate::types::DraftOption;

/// Characters of caption quoted in an image prompt.
const CAPTION_EXCERPT_CHARS: usize = 300;

const SUBJECTS: [(&str, &str); 8] = [
    (
        "reflection",
        "An open journal beside a warm cup of tea on a wooden table, soft morning light through a window, plants nearby",
    ),
    (
        "nature",
        "A gentle winding path through golden-lit trees, soft autumn tones, peaceful and inviting",
    ),
    (
        "transition",
        "A doorway with warm light spilling through, suggesting new possibility",
    ),
    (
        "growth",
        "A small plant growing in soft earth, warm natural light, close-up with a blurred background",
    ),
    (
        "clarity",
        "A still lake reflecting a soft golden sky, minimal composition, a sense of calm",
    ),
    (
        "connection",
        "Two comfortable chairs near a window with soft light, a cozy reading nook",
    ),
    (
        "rest",
        "A soft blanket over a chair, warm tea, a candle, evening golden light",
    ),
    (
        "courage",
        "A wide open landscape at dawn, warm colors beginning to emerge, a sense of expansiveness",
    ),
];

const DEFAULT_SUBJECT: &str =
    "A warm, inviting still life with natural elements (journal, tea, plants) in soft golden light";

/// Pick a subject for the image from keywords in `text`.
pub fn subject_hint(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    SUBJECTS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map_or(DEFAULT_SUBJECT, |(_, subject)| subject)
}

/// Build the image request for an approved draft.
///
/// Combines the brand image style, a subject (the draft's own visual
/// suggestion when it has one, otherwise a keyword hint), a caption excerpt
/// for mood, and the platform's aspect ratio.
pub fn compose_image_prompt(
    draft: &DraftOption,
    profile: &PlatformProfile,
    image_style: &str,
) -> ImageRequest {
    let caption = draft.caption_or_body();
    let subject = match draft.visual.as_deref().map(str::trim) {
        Some(visual) if !visual.is_empty() => visual.to_owned(),
        _ => subject_hint(caption).to_owned(),
    };
    let excerpt: String = caption
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(CAPTION_EXCERPT_CHARS)
        .collect();

    let prompt = format!(
        "{subject}.\n\n{}\n\nThe image accompanies this post; match its mood rather than \
         illustrating it literally: \"{excerpt}\"\n\nFormat: {}.",
        image_style.trim(),
        profile.image_size.aspect_hint()
    );

    ImageRequest {
        prompt,
        size: profile.image_size,
    }
}
