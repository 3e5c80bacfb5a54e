//! Single-post flows: free text, guided buttons, regeneration, revision, and
//! approval.

use std::sync::Arc;

use postcraft::conversation::{Action, Flow, ImageOutcome, ReplyKind, State};
use postcraft::platform::Platform;
use postcraft::providers::ImageData;
use postcraft::types::{DraftStyle, ImageRef, OptionLabel};

use crate::support::{draft_reply, layer, ok, HarnessBuilder, ScriptedImages, ScriptedProvider};

const USER: i64 = 42;

#[tokio::test]
async fn free_text_request_drafts_and_approves() {
    let provider = ScriptedProvider::new(vec![ok(draft_reply(
        "Rest is a practice, not a prize.",
        "Three rules for protecting your energy.",
    ))]);
    let h = HarnessBuilder::new(Arc::clone(&provider)).build();

    let reply = h
        .engine
        .dispatch(USER, Action::Message("Rednote post about BodyTalk".to_owned()))
        .await;
    assert_eq!(reply.state, State::OptionsPresented);
    let ReplyKind::Drafts {
        drafts, platform, ..
    } = &reply.kind
    else {
        panic!("expected drafts, got {:?}", reply.kind);
    };
    assert_eq!(*platform, Platform::Rednote);
    assert_eq!(drafts.get(OptionLabel::A).style, DraftStyle::Reflective);
    assert_eq!(drafts.get(OptionLabel::B).style, DraftStyle::Direct);

    let request = provider.requests().into_iter().next().expect("one request");
    assert_eq!(
        request.prompt,
        "Write a post for Rednote about: Rednote post about BodyTalk"
    );

    let reply = h
        .engine
        .dispatch(
            USER,
            Action::SelectOption {
                label: OptionLabel::A,
                image: false,
            },
        )
        .await;
    assert_eq!(reply.state, State::Idle);
    let ReplyKind::Approved {
        label,
        clean_copy,
        image,
        memory_saved,
        ..
    } = &reply.kind
    else {
        panic!("expected approval, got {:?}", reply.kind);
    };
    assert_eq!(*label, OptionLabel::A);
    assert!(*memory_saved);
    assert_eq!(*image, ImageOutcome::NotRequested);
    assert!(clean_copy.contains("Rest is a practice, not a prize."));
    assert!(clean_copy.contains("#rest #slowliving"));

    let entries = h.memory.recent().await.expect("memory readable");
    assert_eq!(entries.len(), 1);
    let entry = entries.first().expect("one entry");
    assert_eq!(entry.platform, Platform::Rednote);
    assert_eq!(entry.label, OptionLabel::A);
    assert_eq!(entry.style, DraftStyle::Reflective);
    assert_eq!(entry.hashtag_count, 2);
}

#[tokio::test]
async fn guided_flow_carries_platform_and_content_hint() {
    let provider = ScriptedProvider::new(vec![ok(draft_reply("one", "two"))]);
    let h = HarnessBuilder::new(Arc::clone(&provider)).build();

    let reply = h.engine.dispatch(USER, Action::Start(Flow::Post)).await;
    assert_eq!(reply.kind, ReplyKind::AskPlatform(Flow::Post));
    assert_eq!(reply.state, State::AwaitingPlatform);

    let reply = h
        .engine
        .dispatch(USER, Action::ChoosePlatform(Platform::Instagram))
        .await;
    assert_eq!(reply.kind, ReplyKind::AskTopic(Platform::Instagram));
    assert_eq!(reply.state, State::AwaitingTopic);

    let reply = h
        .engine
        .dispatch(USER, Action::SubmitTopic("carousel about rest".to_owned()))
        .await;
    assert_eq!(reply.state, State::OptionsPresented);

    let system = provider.system(0);
    assert!(system.contains("The user's wording suggests a carousel"));
    assert!(layer(&system, 2).contains("2200"));
    assert!(layer(&system, 1).contains(crate::support::VOICE));
}

#[tokio::test]
async fn platform_accepts_typed_name() {
    let provider = ScriptedProvider::new(vec![]);
    let h = HarnessBuilder::new(provider).build();

    h.engine.dispatch(USER, Action::Start(Flow::Post)).await;
    let reply = h
        .engine
        .dispatch(USER, Action::Message("rednote".to_owned()))
        .await;
    assert_eq!(reply.kind, ReplyKind::AskTopic(Platform::Rednote));

    h.engine.dispatch(USER, Action::Start(Flow::Post)).await;
    let reply = h
        .engine
        .dispatch(USER, Action::Message("tiktok".to_owned()))
        .await;
    assert_eq!(reply.state, State::AwaitingPlatform);
    assert!(matches!(reply.kind, ReplyKind::Invalid { .. }));
}

#[tokio::test]
async fn regenerate_keeps_preference_snapshot_and_counts_attempts() {
    let provider = ScriptedProvider::new(vec![
        ok(draft_reply("first approved", "first other")),
        ok(draft_reply("second a", "second b")),
        ok(draft_reply("third a", "third b")),
        ok(draft_reply("unused a", "unused b")),
    ]);
    let h = HarnessBuilder::new(Arc::clone(&provider)).build();

    // Seed memory with one approval so layer 3 is not neutral.
    h.engine
        .dispatch(USER, Action::Message("post about mornings".to_owned()))
        .await;
    h.engine
        .dispatch(
            USER,
            Action::SelectOption {
                label: OptionLabel::A,
                image: false,
            },
        )
        .await;

    h.engine
        .dispatch(USER, Action::Message("post about evenings".to_owned()))
        .await;
    let snapshot_layer = layer(&provider.system(1), 3);
    assert!(snapshot_layer.contains("Based on 1 recently approved post"));

    let reply = h.engine.dispatch(USER, Action::Regenerate).await;
    assert_eq!(reply.state, State::OptionsPresented);

    let system = provider.system(2);
    assert_eq!(layer(&system, 3), snapshot_layer);
    assert!(layer(&system, 4).contains("This is attempt 2 for the same topic"));
    assert!(!layer(&provider.system(1), 4).contains("This is attempt"));
}

#[tokio::test]
async fn revision_changes_only_the_task_layer() {
    let provider = ScriptedProvider::new(vec![
        ok(draft_reply("long a", "long b")),
        ok(draft_reply("short a", "short b")),
    ]);
    let h = HarnessBuilder::new(Arc::clone(&provider)).build();

    h.engine
        .dispatch(USER, Action::Message("instagram post about rest".to_owned()))
        .await;

    let reply = h
        .engine
        .dispatch(
            USER,
            Action::Revise {
                target: Some(OptionLabel::B),
                instruction: None,
            },
        )
        .await;
    assert_eq!(reply.kind, ReplyKind::AskRevision(Some(OptionLabel::B)));
    assert_eq!(reply.state, State::AwaitingRevisionText);

    let reply = h
        .engine
        .dispatch(USER, Action::Message("make it shorter".to_owned()))
        .await;
    assert_eq!(reply.state, State::OptionsPresented);

    let before = provider.system(0);
    let after = provider.system(1);
    for n in 1..=3 {
        assert_eq!(layer(&before, n), layer(&after, n), "layer {n} changed");
    }
    let task = layer(&after, 4);
    assert!(task.contains("REVISION INSTRUCTIONS (apply all, latest last):"));
    assert!(task.contains("Rework Option B (direct): make it shorter. Still return both options."));

    h.engine
        .dispatch(
            USER,
            Action::SelectOption {
                label: OptionLabel::B,
                image: false,
            },
        )
        .await;
    let entries = h.memory.recent().await.expect("memory readable");
    assert_eq!(
        entries.first().map(|e| e.revision_notes.clone()),
        Some(vec!["make it shorter".to_owned()])
    );
}

#[tokio::test]
async fn pick_with_image_attaches_saved_file() {
    let provider = ScriptedProvider::new(vec![ok(draft_reply("a", "b"))]);
    let images = ScriptedImages::new(Ok(ImageData::Bytes(vec![0x89, 0x50, 0x4e, 0x47])));
    let h = HarnessBuilder::new(provider)
        .images(images.clone())
        .build();

    let reply = h
        .engine
        .dispatch(USER, Action::Message("post about tea".to_owned()))
        .await;
    assert!(matches!(
        reply.kind,
        ReplyKind::Drafts {
            images_available: true,
            ..
        }
    ));

    let reply = h
        .engine
        .dispatch(
            USER,
            Action::SelectOption {
                label: OptionLabel::B,
                image: true,
            },
        )
        .await;
    let ReplyKind::Approved {
        image: ImageOutcome::Ready(ImageRef::File(path)),
        ..
    } = &reply.kind
    else {
        panic!("expected a saved image, got {:?}", reply.kind);
    };
    assert!(path.starts_with(h.image_dir.path()));
    assert!(path.exists());
    assert_eq!(images.prompts().len(), 1);
    assert_eq!(reply.state, State::Idle);
}

#[tokio::test]
async fn pick_with_image_when_disabled_still_approves() {
    let provider = ScriptedProvider::new(vec![ok(draft_reply("a", "b"))]);
    let h = HarnessBuilder::new(provider).build();

    h.engine
        .dispatch(USER, Action::Message("post about tea".to_owned()))
        .await;
    let reply = h
        .engine
        .dispatch(
            USER,
            Action::SelectOption {
                label: OptionLabel::A,
                image: true,
            },
        )
        .await;
    let ReplyKind::Approved {
        image,
        memory_saved,
        ..
    } = &reply.kind
    else {
        panic!("expected approval, got {:?}", reply.kind);
    };
    assert!(matches!(image, ImageOutcome::Failed(_)));
    assert!(*memory_saved);
}

#[tokio::test]
async fn actions_out_of_place_are_invalid() {
    let provider = ScriptedProvider::new(vec![]);
    let h = HarnessBuilder::new(Arc::clone(&provider)).build();

    for action in [
        Action::SelectOption {
            label: OptionLabel::A,
            image: false,
        },
        Action::Approve,
        Action::Regenerate,
        Action::ExpandEntry(1),
        Action::ChoosePlatform(Platform::Instagram),
    ] {
        let reply = h.engine.dispatch(USER, action).await;
        assert_eq!(reply.state, State::Idle);
        assert!(matches!(reply.kind, ReplyKind::Invalid { .. }));
    }
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn sessions_are_independent_per_user() {
    let provider = ScriptedProvider::new(vec![ok(draft_reply("a", "b"))]);
    let h = HarnessBuilder::new(provider).build();

    h.engine.dispatch(1, Action::Start(Flow::Calendar)).await;
    h.engine
        .dispatch(2, Action::Message("post about tea".to_owned()))
        .await;

    assert_eq!(h.engine.state_of(1).await, State::AwaitingPlatform);
    assert_eq!(h.engine.state_of(2).await, State::OptionsPresented);
    assert_eq!(h.engine.state_of(3).await, State::Idle);
}
