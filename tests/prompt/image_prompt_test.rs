//! Image prompts derived from approved drafts.

use postcraft::platform::{Platform, PlatformRegistry};
use postcraft::prompt::compose_image_prompt;
use postcraft::providers::ImageSize;
use postcraft::types::{DraftOption, OptionLabel};

fn draft(caption: &str, visual: Option<&str>) -> DraftOption {
    DraftOption {
        label: OptionLabel::A,
        style: OptionLabel::A.style(),
        body: caption.to_owned(),
        content_type: None,
        title: None,
        caption: Some(caption.to_owned()),
        hashtags: Vec::new(),
        visual: visual.map(str::to_owned),
    }
}

#[test]
fn visual_suggestion_is_the_subject() {
    let registry = PlatformRegistry::builtin();
    let request = compose_image_prompt(
        &draft("Rest is productive.", Some("A hammock between two birch trees")),
        registry.get(Platform::Instagram),
        "Muted film photography.",
    );
    assert!(request.prompt.starts_with("A hammock between two birch trees."));
    assert!(request.prompt.contains("Muted film photography."));
    assert!(request.prompt.contains("\"Rest is productive.\""));
    assert_eq!(request.size, ImageSize::Square);
    assert!(request.prompt.contains("square 1:1 composition"));
}

#[test]
fn keyword_subject_used_without_visual_suggestion() {
    let registry = PlatformRegistry::builtin();
    let request = compose_image_prompt(
        &draft("Courage looks quieter than you think.", Some("   ")),
        registry.get(Platform::Rednote),
        "Warm tones.",
    );
    assert!(request.prompt.starts_with("A wide open landscape at dawn"));
    assert_eq!(request.size, ImageSize::Portrait);
    assert!(request.prompt.contains("vertical 9:16 composition"));
}

#[test]
fn long_captions_are_cut_in_the_prompt() {
    let registry = PlatformRegistry::builtin();
    let caption = "word ".repeat(200);
    let request = compose_image_prompt(
        &draft(&caption, None),
        registry.get(Platform::Instagram),
        "Style.",
    );
    assert!(request.prompt.len() < caption.len());
}
