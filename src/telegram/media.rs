//! Brand voice document uploads.
//!
//! Only plain-text documents (`.txt`, `.md`) are accepted. Other formats
//! need a conversion step this bot does not perform, so they are declined
//! before anything is downloaded. Accepted uploads are kept in the inbox
//! directory as a record of what the voice was replaced with.

use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::Document;
use tracing::debug;

use crate::conversation::VoiceDocument;

/// Largest document accepted as a brand voice.
pub const MAX_VOICE_DOCUMENT_BYTES: u32 = 1_048_576;

const ACCEPTED_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

/// Whether `name` has a plain-text extension.
pub fn is_plain_text_document(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
}

/// Fetch a voice document, keep a copy in `inbox_dir`, and decode it.
///
/// # Errors
///
/// Returns an error if the document is not plain text, too large, cannot be
/// downloaded, or is not valid UTF-8.
pub async fn read_voice_document(
    bot: &Bot,
    document: &Document,
    inbox_dir: &Path,
) -> anyhow::Result<VoiceDocument> {
    let original = document.file_name.as_deref().unwrap_or_default();
    anyhow::ensure!(
        is_plain_text_document(original),
        "only .txt and .md documents can be used as a brand voice"
    );
    anyhow::ensure!(
        document.file.size <= MAX_VOICE_DOCUMENT_BYTES,
        "document is {} bytes; the limit is {MAX_VOICE_DOCUMENT_BYTES}",
        document.file.size
    );

    let meta = bot
        .get_file(document.file.id.as_str())
        .await
        .context("failed to get file info from Telegram")?;
    let mut bytes: Vec<u8> = Vec::new();
    bot.download_file(&meta.path, &mut bytes)
        .await
        .context("failed to download file from Telegram")?;

    let file_name = sanitize_filename(original);
    let kept = inbox_dir.join(&file_name);
    tokio::fs::create_dir_all(inbox_dir)
        .await
        .with_context(|| format!("failed to create {}", inbox_dir.display()))?;
    tokio::fs::write(&kept, &bytes)
        .await
        .with_context(|| format!("failed to write {}", kept.display()))?;
    debug!(path = %kept.display(), bytes = bytes.len(), "voice document stored");

    let text = String::from_utf8(bytes).context("document is not valid UTF-8 text")?;
    Ok(VoiceDocument { file_name, text })
}

/// File name safe to join onto the inbox directory.
///
/// Path separators become `_` and leading dots are dropped. An empty result
/// falls back to `voice_<timestamp>.txt`.
pub fn sanitize_filename(name: &str) -> String {
    let flat: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let trimmed = flat.trim_start_matches('.');
    if trimmed.is_empty() {
        format!("voice_{}.txt", Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        trimmed.to_owned()
    }
}
