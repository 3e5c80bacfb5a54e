//! Configuration loading and validation.
//!
//! Runtime state lives under `~/.postcraft/`:
//! - `config.toml`: human-owned settings (models, caps, session policy)
//! - `.env`: API keys and the bot token, see [`crate::credentials`]
//! - `assets/`: the brand voice document and its backup
//! - `data/`: the preference log, generated images, uploaded documents
//!
//! Precedence: env vars > config file > defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::platform::Platform;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Text backends.
    pub models: ModelsConfig,

    /// Output caps and retry policy.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Image backend settings.
    #[serde(default)]
    pub images: ImagesConfig,

    /// Preference memory window.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Conversation session policy.
    #[serde(default)]
    pub session: SessionConfig,

    /// Business identity injected into the persona layer.
    #[serde(default)]
    pub brand: BrandConfig,

    /// Chat transport configuration.
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Model routing: default model and per-mode overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// `<provider>/<model>` used when no role override applies.
    pub default: String,

    /// Per-role overrides keyed by `post` or `calendar`.
    #[serde(default)]
    pub roles: HashMap<String, String>,
}

/// Generation caps and retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Output token cap for single-post requests.
    #[serde(default = "default_max_tokens_post")]
    pub max_tokens_post: u32,

    /// Output token cap for calendar requests.
    #[serde(default = "default_max_tokens_calendar")]
    pub max_tokens_calendar: u32,

    /// Base delay before the single transient retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens_post: default_max_tokens_post(),
            max_tokens_calendar: default_max_tokens_calendar(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Image backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Whether image generation is offered at all.
    #[serde(default)]
    pub enabled: bool,

    /// Image model spec (`<provider>/<model>`).
    #[serde(default = "default_image_model")]
    pub model: String,

    /// Quality tier passed to the backend.
    #[serde(default = "default_image_quality")]
    pub quality: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_image_model(),
            quality: default_image_quality(),
        }
    }
}

/// Preference memory settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Number of approved posts kept and fed back into prompts.
    #[serde(default = "default_memory_window")]
    pub window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window: default_memory_window(),
        }
    }
}

/// Conversation session policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Seconds without activity before a flow is cancelled.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Consecutive generation failures reported before the user is told to
    /// check the backend.
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,

    /// Platform used when free text does not name one.
    #[serde(default = "default_platform")]
    pub default_platform: String,
}

impl SessionConfig {
    /// Idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            max_consecutive_failures: default_max_consecutive_failures(),
            default_platform: default_platform(),
        }
    }
}

/// Business identity for the persona layer and image prompts.
#[derive(Debug, Clone, Deserialize)]
pub struct BrandConfig {
    /// Business or account name.
    #[serde(default = "default_brand_name")]
    pub name: String,

    /// One-paragraph description of who is speaking.
    #[serde(default)]
    pub persona: String,

    /// Hashtags included in every post.
    #[serde(default)]
    pub hashtags: Vec<String>,

    /// Visual style appended to every image prompt.
    #[serde(default = "default_image_style")]
    pub image_style: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: default_brand_name(),
            persona: String::new(),
            hashtags: Vec::new(),
            image_style: default_image_style(),
        }
    }
}

/// Channel configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelsConfig {
    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,
}

/// Telegram-specific configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Environment variable name holding the bot token.
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Telegram user IDs allowed to use the bot.
    #[serde(default)]
    pub allowed_users: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_bot_token_env(),
            allowed_users: Vec::new(),
        }
    }
}

// Default value functions for serde

fn default_max_tokens_post() -> u32 {
    3000
}
fn default_max_tokens_calendar() -> u32 {
    8000
}
fn default_retry_delay_ms() -> u64 {
    750
}
fn default_image_model() -> String {
    "openai/dall-e-3".to_owned()
}
fn default_image_quality() -> String {
    "standard".to_owned()
}
fn default_memory_window() -> usize {
    10
}
fn default_idle_timeout_secs() -> u64 {
    1800
}
fn default_max_consecutive_failures() -> u32 {
    3
}
fn default_platform() -> String {
    "instagram".to_owned()
}
fn default_brand_name() -> String {
    "the brand".to_owned()
}
fn default_image_style() -> String {
    "Warm editorial photography, soft natural light, earth tones. \
     No text, words, or letters in the image. No faces. \
     Clean minimal composition with breathing room."
        .to_owned()
}
fn default_bot_token_env() -> String {
    "POSTCRAFT_TELEGRAM_TOKEN".to_owned()
}

impl Config {
    /// Parse a TOML string into config.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or `[models]` is missing.
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(toml_str).context("failed to parse config TOML")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Takes a resolver so tests do not have to mutate the process
    /// environment. Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("POSTCRAFT_MODEL").filter(|v| !v.trim().is_empty()) {
            self.models.default = v;
        }
        if let Some(n) = parse_override(&env, "POSTCRAFT_MAX_TOKENS_POST") {
            self.generation.max_tokens_post = n;
        }
        if let Some(n) = parse_override(&env, "POSTCRAFT_MAX_TOKENS_CALENDAR") {
            self.generation.max_tokens_calendar = n;
        }
        if let Some(n) = parse_override(&env, "POSTCRAFT_SESSION_TIMEOUT_SECS") {
            self.session.idle_timeout_secs = n;
        }
    }

    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.memory.window == 0 {
            anyhow::bail!("memory.window must be at least 1");
        }
        if self.generation.max_tokens_post == 0 || self.generation.max_tokens_calendar == 0 {
            anyhow::bail!("generation token caps must be greater than zero");
        }
        if self.session.max_consecutive_failures == 0 {
            anyhow::bail!("session.max_consecutive_failures must be at least 1");
        }
        self.default_platform()?;
        Ok(())
    }

    /// The configured fallback platform.
    ///
    /// # Errors
    ///
    /// Returns an error if `session.default_platform` is not a known platform.
    pub fn default_platform(&self) -> anyhow::Result<Platform> {
        self.session
            .default_platform
            .parse()
            .context("invalid session.default_platform")
    }
}

fn parse_override<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Option<T> {
    let value = env(var)?;
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(var, value = %value, "ignoring invalid env override");
            None
        }
    }
}

/// Load config from a TOML file, apply process env overrides, and validate.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let mut config = Config::from_toml(&contents)
        .with_context(|| format!("invalid config at {}", path.display()))?;
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Resolve the default config directory (`~/.postcraft/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".postcraft"))
}

/// Every runtime file and directory location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    /// Root directory.
    pub root: PathBuf,
    /// `config.toml`.
    pub config_toml: PathBuf,
    /// `.env` with secrets.
    pub env_file: PathBuf,
    /// Current brand voice document.
    pub brand_voice: PathBuf,
    /// Previous brand voice, kept on every replace.
    pub brand_voice_backup: PathBuf,
    /// Preference log.
    pub preferences: PathBuf,
    /// Saved generated images.
    pub images_dir: PathBuf,
    /// Downloaded user documents.
    pub inbox_dir: PathBuf,
    /// Rolling log files.
    pub logs_dir: PathBuf,
}

impl RuntimePaths {
    /// Lay out runtime paths under `root`.
    pub fn under(root: PathBuf) -> Self {
        let assets = root.join("assets");
        let data = root.join("data");
        Self {
            config_toml: root.join("config.toml"),
            env_file: root.join(".env"),
            brand_voice: assets.join("brand_voice.txt"),
            brand_voice_backup: assets.join("brand_voice.bak.txt"),
            preferences: data.join("preferences.json"),
            images_dir: data.join("images"),
            inbox_dir: data.join("inbox"),
            logs_dir: root.join("logs"),
            root,
        }
    }

    /// Create every directory the runtime writes into.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> anyhow::Result<()> {
        let assets = self.brand_voice.parent().unwrap_or(&self.root);
        for dir in [
            self.root.as_path(),
            assets,
            self.images_dir.as_path(),
            self.inbox_dir.as_path(),
            self.logs_dir.as_path(),
        ] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Resolve runtime paths under `~/.postcraft/`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn runtime_paths() -> anyhow::Result<RuntimePaths> {
    Ok(RuntimePaths::under(config_dir()?))
}

/// Starter `config.toml` written by `postcraft init`.
pub const STARTER_CONFIG: &str = r#"[models]
default = "anthropic/claude-sonnet-4-5-20250929"

[generation]
max_tokens_post = 3000
max_tokens_calendar = 8000

[images]
enabled = false
model = "openai/dall-e-3"

[memory]
window = 10

[session]
idle_timeout_secs = 1800
default_platform = "instagram"

[brand]
name = "My Studio"
persona = ""
hashtags = []

[channels.telegram]
bot_token_env = "POSTCRAFT_TELEGRAM_TOKEN"
allowed_users = []
"#;
