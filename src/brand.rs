//! Brand voice source: the persona document spliced into every prompt.
//!
//! The voice is re-read on every generation call. Replacement is atomic with
//! respect to readers: a read observes either the old or the new document in
//! full, and a read that starts after [`BrandVoiceSource::replace`] returns
//! sees the new text.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Current brand voice text and when it was committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandVoice {
    /// Opaque persona text.
    pub text: String,
    /// Commit time of this version.
    pub updated_at: DateTime<Utc>,
}

impl BrandVoice {
    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Brand voice access errors.
#[derive(Debug, thiserror::Error)]
pub enum BrandVoiceError {
    /// No voice document exists yet.
    #[error("brand voice not found at {path}; upload one with /update_voice or `postcraft voice set`")]
    Missing {
        /// Expected location.
        path: PathBuf,
    },
    /// The document exists but holds no text.
    #[error("brand voice is empty; upload a non-empty document")]
    Empty,
    /// A replacement was refused before anything was written.
    #[error("brand voice update rejected: {0}")]
    Rejected(String),
    /// Filesystem failure.
    #[error("brand voice I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read/replace access to the brand voice.
#[async_trait]
pub trait BrandVoiceSource: Send + Sync {
    /// Read the latest committed voice.
    ///
    /// # Errors
    ///
    /// Returns [`BrandVoiceError::Missing`] or [`BrandVoiceError::Empty`]
    /// when no usable voice exists, or an I/O error.
    async fn read(&self) -> Result<BrandVoice, BrandVoiceError>;

    /// Atomically replace the voice with `new_text`.
    ///
    /// # Errors
    ///
    /// Returns [`BrandVoiceError::Rejected`] for blank text, or an I/O error.
    /// On error the previous voice stays in place.
    async fn replace(&self, new_text: &str) -> Result<BrandVoice, BrandVoiceError>;
}

/// Brand voice stored as a plain-text file.
///
/// Replacement writes a sibling temp file, copies the current document to the
/// backup path, then renames the temp file over the original.
#[derive(Debug)]
pub struct FileBrandVoice {
    path: PathBuf,
    backup_path: PathBuf,
    lock: RwLock<()>,
}

impl FileBrandVoice {
    /// Create a file-backed source.
    pub fn new(path: PathBuf, backup_path: PathBuf) -> Self {
        Self {
            path,
            backup_path,
            lock: RwLock::new(()),
        }
    }

    /// Location of the current document.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl BrandVoiceSource for FileBrandVoice {
    async fn read(&self) -> Result<BrandVoice, BrandVoiceError> {
        let _guard = self.lock.read().await;
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BrandVoiceError::Missing {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Err(BrandVoiceError::Empty);
        }
        let updated_at = tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        Ok(BrandVoice { text, updated_at })
    }

    async fn replace(&self, new_text: &str) -> Result<BrandVoice, BrandVoiceError> {
        let text = new_text.trim();
        if text.is_empty() {
            return Err(BrandVoiceError::Rejected("document has no text".to_owned()));
        }

        let _guard = self.lock.write().await;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(dir).await?;
        let tmp_path = dir.join(format!(".brand_voice.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp_path, text).await?;

        if tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            if let Err(e) = tokio::fs::copy(&self.path, &self.backup_path).await {
                tracing::warn!(error = %e, "failed to back up previous brand voice");
            }
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::info!(
            path = %self.path.display(),
            chars = text.chars().count(),
            "brand voice replaced"
        );

        Ok(BrandVoice {
            text: text.to_owned(),
            updated_at: Utc::now(),
        })
    }
}

/// Brand voice held in memory, for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct InMemoryBrandVoice {
    current: RwLock<Option<BrandVoice>>,
}

impl InMemoryBrandVoice {
    /// Create a source holding `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(Some(BrandVoice {
                text: text.into(),
                updated_at: Utc::now(),
            })),
        }
    }
}

#[async_trait]
impl BrandVoiceSource for InMemoryBrandVoice {
    async fn read(&self) -> Result<BrandVoice, BrandVoiceError> {
        let guard = self.current.read().await;
        match guard.as_ref() {
            None => Err(BrandVoiceError::Missing {
                path: PathBuf::from("<memory>"),
            }),
            Some(voice) if voice.text.trim().is_empty() => Err(BrandVoiceError::Empty),
            Some(voice) => Ok(voice.clone()),
        }
    }

    async fn replace(&self, new_text: &str) -> Result<BrandVoice, BrandVoiceError> {
        let text = new_text.trim();
        if text.is_empty() {
            return Err(BrandVoiceError::Rejected("document has no text".to_owned()));
        }
        let voice = BrandVoice {
            text: text.to_owned(),
            updated_at: Utc::now(),
        };
        *self.current.write().await = Some(voice.clone());
        Ok(voice)
    }
}
