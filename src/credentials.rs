//! API keys and the bot token, read from the runtime `.env` with the
//! process environment as a fallback.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::RuntimePaths;

/// Environment key holding the Anthropic API key.
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
/// Environment key holding the OpenAI API key.
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Runtime credentials loaded from the `.env` file.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a credential value for a key, if present and non-empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns a required credential or an error when missing.
    ///
    /// # Errors
    ///
    /// Returns an error when the key does not exist in loaded credentials.
    pub fn require(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .map(str::to_owned)
            .ok_or_else(|| anyhow::anyhow!("missing required credential: {key}"))
    }

    /// Returns the API key stored under `key`, wrapped so it never prints.
    pub fn api_key(&self, key: &str) -> Option<ApiKey> {
        self.get(key).map(|value| ApiKey(value.to_owned()))
    }

    /// Fill keys missing from the file using the given resolver.
    ///
    /// Used with `std::env::var` so exported variables work without a `.env`
    /// entry. File values always win.
    pub fn fill_missing(&mut self, keys: &[&str], env: impl Fn(&str) -> Option<String>) {
        for key in keys {
            if self.get(key).is_some() {
                continue;
            }
            if let Some(value) = env(key).filter(|v| !v.trim().is_empty()) {
                self.vars.insert((*key).to_owned(), value);
            }
        }
    }
}

/// An API key that redacts itself in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for request headers only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

/// Read `KEY=value` pairs from a `.env` file that only its owner can read.
///
/// A missing file yields empty credentials; process environment can still
/// fill them through [`Credentials::fill_missing`].
///
/// # Errors
///
/// Returns an error if group or other can access the file, or a line does
/// not parse.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Ok(Credentials::default());
    }
    ensure_owner_only(path)?;

    let vars = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .with_context(|| format!("malformed line in credentials file {}", path.display()))?;
    Ok(Credentials { vars })
}

/// Load credentials from the runtime `.env`, filling gaps from the process
/// environment for the API keys and `extra_keys`.
///
/// # Errors
///
/// Returns an error when the credentials file is invalid.
pub fn load_runtime_credentials(
    paths: &RuntimePaths,
    extra_keys: &[&str],
) -> anyhow::Result<Credentials> {
    let mut credentials = load_credentials(&paths.env_file)?;
    let mut keys = vec![ANTHROPIC_API_KEY, OPENAI_API_KEY];
    keys.extend_from_slice(extra_keys);
    credentials.fill_missing(&keys, |key| std::env::var(key).ok());
    Ok(credentials)
}

#[cfg(unix)]
fn ensure_owner_only(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?
        .permissions()
        .mode()
        & 0o777;
    anyhow::ensure!(
        mode & 0o077 == 0,
        "credentials file {} must be 0600, found {mode:o}",
        path.display()
    );
    Ok(())
}

#[cfg(not(unix))]
fn ensure_owner_only(path: &Path) -> anyhow::Result<()> {
    fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?;
    Ok(())
}
