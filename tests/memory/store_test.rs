//! File-backed preference log: eviction, ordering, persistence, corruption.

use std::sync::Arc;

use postcraft::memory::{
    summarize, JsonFileStore, MemoryError, PreferenceEntry, PreferenceMemory, PreferenceStore,
};
use postcraft::platform::Platform;
use postcraft::types::{DraftOption, OptionLabel};

fn entry(n: usize) -> PreferenceEntry {
    let label = if n % 2 == 0 {
        OptionLabel::A
    } else {
        OptionLabel::B
    };
    let draft = DraftOption {
        label,
        style: label.style(),
        body: format!("post number {n}"),
        content_type: Some("Carousel".to_owned()),
        title: None,
        caption: Some(format!("Caption for post {n}")),
        hashtags: vec!["#rest".to_owned()],
        visual: None,
    };
    PreferenceEntry::from_approval(Platform::Instagram, &format!("topic {n}"), &draft, Vec::new())
}

#[tokio::test]
async fn eleventh_append_evicts_the_oldest() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = JsonFileStore::new(dir.path().join("data").join("preferences.json"), 10);

    for n in 1..=11 {
        store.append(entry(n)).await.expect("append succeeds");
    }

    let recent = store.read_recent(20).await.expect("read succeeds");
    assert_eq!(recent.len(), 10);
    assert_eq!(recent.first().map(|e| e.topic.as_str()), Some("topic 11"));
    assert_eq!(recent.last().map(|e| e.topic.as_str()), Some("topic 2"));
}

#[tokio::test]
async fn entries_survive_a_new_store_instance() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("preferences.json");

    {
        let store = JsonFileStore::new(path.clone(), 10);
        store.append(entry(1)).await.expect("append succeeds");
        store.append(entry(2)).await.expect("append succeeds");
    }

    let reopened = JsonFileStore::new(path.clone(), 10);
    let recent = reopened.read_recent(1).await.expect("read succeeds");
    assert_eq!(recent.len(), 1);
    assert_eq!(recent.first().map(|e| e.topic.as_str()), Some("topic 2"));

    let raw = std::fs::read_to_string(&path).expect("log on disk");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("log is json");
    assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    assert_eq!(parsed[0]["style"], "direct");
}

#[tokio::test]
async fn missing_or_blank_file_reads_as_empty() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("preferences.json");
    let store = JsonFileStore::new(path.clone(), 10);
    assert!(store.read_recent(10).await.expect("read succeeds").is_empty());

    std::fs::write(&path, "  \n").expect("write blank");
    assert!(store.read_recent(10).await.expect("read succeeds").is_empty());
}

#[tokio::test]
async fn corrupt_file_is_reported_and_left_alone() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("preferences.json");
    std::fs::write(&path, "{not json").expect("write garbage");
    let store = JsonFileStore::new(path.clone(), 10);

    let err = store.read_recent(10).await.expect_err("corrupt log should fail");
    assert!(matches!(err, MemoryError::Corrupt(_)));
    assert!(store.append(entry(1)).await.is_err());
    assert_eq!(
        std::fs::read_to_string(&path).expect("file still there"),
        "{not json"
    );
}

#[tokio::test]
async fn memory_window_bounds_the_prompt_context() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(JsonFileStore::new(dir.path().join("p.json"), 10));
    let memory = PreferenceMemory::new(store, 3);

    for n in 1..=5 {
        memory.record(entry(n)).await.expect("record succeeds");
    }
    let window = memory.recent().await.expect("read succeeds");
    assert_eq!(window.len(), 3);

    let summary = summarize(&window).expect("non-empty window");
    assert_eq!(summary.total, 3);
    assert_eq!(summary.favourite_content_type, "carousel");
    assert!(summarize(&[]).is_none());
}

#[tokio::test]
async fn concurrent_appends_are_all_kept() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(JsonFileStore::new(dir.path().join("p.json"), 10));

    let mut handles = Vec::new();
    for n in 1..=6 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.append(entry(n)).await }));
    }
    for handle in handles {
        handle
            .await
            .expect("task joins")
            .expect("append succeeds");
    }

    assert_eq!(store.read_recent(10).await.expect("read succeeds").len(), 6);
}
