//! Four-layer prompt assembly.

use chrono::Utc;
use postcraft::brand::BrandVoice;
use postcraft::config::BrandConfig;
use postcraft::memory::PreferenceEntry;
use postcraft::platform::{Platform, PlatformRegistry};
use postcraft::prompt::templates::{day_header, OPTION_A_HEADER, OPTION_B_HEADER};
use postcraft::prompt::{compose, CalendarScope, ComposeRequest, ComposedPrompt, RequestMode};
use postcraft::types::{ContentTypeHint, DraftOption, OptionLabel};

fn voice() -> BrandVoice {
    BrandVoice {
        text: "Gentle, honest, a little playful.".to_owned(),
        updated_at: Utc::now(),
    }
}

fn brand() -> BrandConfig {
    BrandConfig {
        name: "Body Talk".to_owned(),
        persona: "A somatic coach for busy founders.".to_owned(),
        hashtags: vec!["#bodytalk".to_owned()],
        ..BrandConfig::default()
    }
}

fn approval(label: OptionLabel, caption: &str) -> PreferenceEntry {
    let draft = DraftOption {
        label,
        style: label.style(),
        body: caption.to_owned(),
        content_type: None,
        title: None,
        caption: Some(caption.to_owned()),
        hashtags: vec!["#rest".to_owned()],
        visual: None,
    };
    PreferenceEntry::from_approval(Platform::Instagram, "rest", &draft, Vec::new())
}

fn build(
    platform: Platform,
    preferences: &[PreferenceEntry],
    mode: &RequestMode,
    hint: ContentTypeHint,
    revisions: &[String],
    attempt: u32,
) -> ComposedPrompt {
    let registry = PlatformRegistry::builtin();
    let voice = voice();
    let brand = brand();
    compose(&ComposeRequest {
        voice: &voice,
        brand: &brand,
        profile: registry.get(platform),
        preferences,
        topic: "slowing down",
        mode,
        content_hint: hint,
        revisions,
        attempt,
    })
}

#[test]
fn layers_appear_in_fixed_order() {
    let prompt = build(
        Platform::Instagram,
        &[],
        &RequestMode::SinglePost,
        ContentTypeHint::Auto,
        &[],
        1,
    );
    let system = prompt.system_prompt();
    let positions: Vec<usize> = [
        "# LAYER 1: PERSONA AND BRAND VOICE",
        "# LAYER 2: PLATFORM RULES",
        "# LAYER 3: PREFERENCE CONTEXT",
        "# LAYER 4: TASK",
    ]
    .iter()
    .map(|h| system.find(h).expect("header present"))
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    assert!(prompt.persona.contains("\"Body Talk\""));
    assert!(prompt.persona.contains("A somatic coach for busy founders."));
    assert!(prompt.persona.contains("Gentle, honest, a little playful."));
    assert!(prompt.persona.contains("#bodytalk"));
    assert_eq!(
        prompt.user_message(),
        "Write a post for Instagram about: slowing down"
    );
}

#[test]
fn task_layer_demands_both_labelled_options() {
    let prompt = build(
        Platform::Rednote,
        &[],
        &RequestMode::SinglePost,
        ContentTypeHint::Auto,
        &[],
        1,
    );
    assert!(prompt.task.contains(OPTION_A_HEADER));
    assert!(prompt.task.contains(OPTION_B_HEADER));
    assert!(prompt.task.contains("Write a Rednote post."));
    assert!(!prompt.task.contains("suggests a"));
    assert!(!prompt.task.contains("This is attempt"));
}

#[test]
fn platform_layer_carries_limits() {
    let rednote = build(
        Platform::Rednote,
        &[],
        &RequestMode::SinglePost,
        ContentTypeHint::Auto,
        &[],
        1,
    );
    assert!(rednote.platform.contains("at most 1000 characters"));
    assert!(rednote.platform.contains("Title: at most 20 characters"));
    assert!(rednote.platform.contains("English and Chinese"));

    let instagram = build(
        Platform::Instagram,
        &[],
        &RequestMode::SinglePost,
        ContentTypeHint::Auto,
        &[],
        1,
    );
    assert!(instagram.platform.contains("at most 2200 characters"));
    assert!(!instagram.platform.contains("Title:"));
}

#[test]
fn preferences_are_summarised_most_recent_first() {
    let prefs = vec![
        approval(OptionLabel::B, "Newest approval text"),
        approval(OptionLabel::A, "Older approval text"),
    ];
    let prompt = build(
        Platform::Instagram,
        &prefs,
        &RequestMode::SinglePost,
        ContentTypeHint::Auto,
        &[],
        1,
    );
    assert!(prompt
        .preferences
        .starts_with("Based on 2 recently approved posts:"));
    let newest = prompt
        .preferences
        .find("1. [instagram] Option B")
        .expect("newest listed");
    let older = prompt
        .preferences
        .find("2. [instagram] Option A")
        .expect("older listed");
    assert!(newest < older);

    let neutral = build(
        Platform::Instagram,
        &[],
        &RequestMode::SinglePost,
        ContentTypeHint::Auto,
        &[],
        1,
    );
    assert!(!neutral.preferences.contains("Based on"));
    assert!(!neutral.preferences.trim().is_empty());
}

#[test]
fn revisions_and_attempts_only_touch_the_task_layer() {
    let first = build(
        Platform::Instagram,
        &[],
        &RequestMode::SinglePost,
        ContentTypeHint::Carousel,
        &[],
        1,
    );
    let revisions = vec![
        "Apply to both options: warmer".to_owned(),
        "Rework Option A (reflective): shorter. Still return both options.".to_owned(),
    ];
    let revised = build(
        Platform::Instagram,
        &[],
        &RequestMode::SinglePost,
        ContentTypeHint::Carousel,
        &revisions,
        3,
    );

    assert_eq!(first.persona, revised.persona);
    assert_eq!(first.platform, revised.platform);
    assert_eq!(first.preferences, revised.preferences);
    assert_ne!(first.task, revised.task);

    assert!(revised.task.contains("The user's wording suggests a carousel"));
    assert!(revised.task.contains("This is attempt 3 for the same topic"));
    let warmer = revised.task.find("- Apply to both options: warmer").expect("first note");
    let shorter = revised.task.find("- Rework Option A").expect("second note");
    assert!(warmer < shorter);
}

#[test]
fn calendar_task_names_size_and_themes() {
    let scope = CalendarScope::new(4, vec!["rest".to_owned(), "boundaries".to_owned()])
        .expect("valid scope");
    let prompt = build(
        Platform::Instagram,
        &[],
        &RequestMode::Calendar(scope),
        ContentTypeHint::Auto,
        &[],
        1,
    );
    assert!(prompt.task.contains("EXACTLY 4 posts for Instagram"));
    assert!(prompt.task.contains("Themes to weave through the plan: rest, boundaries."));
    assert!(prompt.task.contains(&day_header(1)));
    assert!(!prompt.task.contains(OPTION_A_HEADER));
    assert_eq!(
        prompt.user_message(),
        "Create a 4-post Instagram content calendar around: slowing down"
    );
}
