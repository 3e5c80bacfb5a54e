//! Brand voice updates through the conversation.

use std::sync::Arc;

use postcraft::brand::InMemoryBrandVoice;
use postcraft::conversation::{Action, FailureKind, Flow, ReplyKind, State, VoiceDocument};

use crate::support::{draft_reply, layer, ok, HarnessBuilder, ScriptedProvider, VOICE};

const USER: i64 = 11;

fn document(text: &str) -> VoiceDocument {
    VoiceDocument {
        file_name: "voice.md".to_owned(),
        text: text.to_owned(),
    }
}

#[tokio::test]
async fn uploaded_voice_is_used_by_the_next_generation() {
    let provider = ScriptedProvider::new(vec![ok(draft_reply("a", "b"))]);
    let h = HarnessBuilder::new(Arc::clone(&provider)).build();

    let reply = h.engine.dispatch(USER, Action::Start(Flow::VoiceUpdate)).await;
    assert_eq!(reply.kind, ReplyKind::AskVoiceUpload);

    let reply = h
        .engine
        .dispatch(
            USER,
            Action::UploadVoice(document("Playful and plain spoken, never preachy.")),
        )
        .await;
    assert_eq!(
        reply.kind,
        ReplyKind::VoiceUpdated {
            chars: 40,
            words: 6
        }
    );
    assert_eq!(reply.state, State::Idle);

    let voice = h.brand.read().await.expect("voice readable");
    assert_eq!(voice.text, "Playful and plain spoken, never preachy.");

    h.engine
        .dispatch(USER, Action::Message("post about play".to_owned()))
        .await;
    let persona = layer(&provider.system(0), 1);
    assert!(persona.contains("Playful and plain spoken"));
    assert!(!persona.contains(VOICE));
}

#[tokio::test]
async fn blank_document_keeps_previous_voice() {
    let h = HarnessBuilder::new(ScriptedProvider::new(vec![])).build();

    h.engine.dispatch(USER, Action::Start(Flow::VoiceUpdate)).await;
    let reply = h
        .engine
        .dispatch(USER, Action::UploadVoice(document("  \n ")))
        .await;
    assert!(matches!(
        reply.kind,
        ReplyKind::Failed {
            kind: FailureKind::VoiceUpdate,
            retryable: true,
            ..
        }
    ));
    assert_eq!(reply.state, State::AwaitingVoiceUpload);
    assert_eq!(h.brand.read().await.expect("voice readable").text, VOICE);
}

#[tokio::test]
async fn upload_outside_voice_flow_is_invalid() {
    let h = HarnessBuilder::new(ScriptedProvider::new(vec![])).build();

    let reply = h
        .engine
        .dispatch(USER, Action::UploadVoice(document("new voice")))
        .await;
    assert!(matches!(reply.kind, ReplyKind::Invalid { .. }));
    assert_eq!(h.brand.read().await.expect("voice readable").text, VOICE);
}

#[tokio::test]
async fn text_while_waiting_for_document_is_invalid() {
    let h = HarnessBuilder::new(ScriptedProvider::new(vec![])).build();

    h.engine.dispatch(USER, Action::Start(Flow::VoiceUpdate)).await;
    let reply = h
        .engine
        .dispatch(USER, Action::Message("here is my voice".to_owned()))
        .await;
    assert!(matches!(reply.kind, ReplyKind::Invalid { .. }));
    assert_eq!(reply.state, State::AwaitingVoiceUpload);
}

#[tokio::test]
async fn missing_voice_fails_without_calling_the_backend() {
    let provider = ScriptedProvider::new(vec![ok(draft_reply("a", "b"))]);
    let h = HarnessBuilder::new(Arc::clone(&provider))
        .brand(Arc::new(InMemoryBrandVoice::default()))
        .build();

    let reply = h
        .engine
        .dispatch(USER, Action::Message("post about rest".to_owned()))
        .await;
    assert!(matches!(
        reply.kind,
        ReplyKind::Failed {
            kind: FailureKind::BrandVoiceUnavailable,
            retryable: false,
            ..
        }
    ));
    assert_eq!(reply.state, State::AwaitingTopic);
    assert!(provider.requests().is_empty());
}
