//! Document type checks and filename sanitizing.

use postcraft::telegram::media::{is_plain_text_document, sanitize_filename};

#[test]
fn only_plain_text_extensions_are_accepted() {
    assert!(is_plain_text_document("voice.txt"));
    assert!(is_plain_text_document("Brand Voice.MD"));
    assert!(is_plain_text_document("notes.markdown"));

    assert!(!is_plain_text_document("voice.pdf"));
    assert!(!is_plain_text_document("voice.docx"));
    assert!(!is_plain_text_document("voice"));
    assert!(!is_plain_text_document(""));
}

#[test]
fn filenames_stay_inside_the_inbox() {
    assert_eq!(sanitize_filename("voice.txt"), "voice.txt");
    assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
    assert_eq!(sanitize_filename("a\\b.md"), "a_b.md");
    assert_eq!(sanitize_filename(".hidden.txt"), "hidden.txt");
}

#[test]
fn empty_filename_gets_a_timestamped_fallback() {
    let name = sanitize_filename("...");
    assert!(name.starts_with("voice_"));
    assert!(name.ends_with(".txt"));
}
