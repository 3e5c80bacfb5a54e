//! Config parsing, defaults, overrides, and validation.

use std::collections::HashMap;
use std::time::Duration;

use postcraft::config::{load_config, Config, RuntimePaths};
use postcraft::platform::Platform;

const MINIMAL: &str = r#"
[models]
default = "anthropic/claude-sonnet-4-5"
"#;

#[test]
fn minimal_config_gets_defaults() {
    let config = Config::from_toml(MINIMAL).expect("minimal config parses");
    config.validate().expect("defaults validate");

    assert_eq!(config.generation.max_tokens_post, 3000);
    assert_eq!(config.generation.max_tokens_calendar, 8000);
    assert!(!config.images.enabled);
    assert_eq!(config.memory.window, 10);
    assert_eq!(config.session.idle_timeout(), Duration::from_secs(1800));
    assert_eq!(
        config.default_platform().expect("default platform"),
        Platform::Instagram
    );
    assert_eq!(
        config.channels.telegram.bot_token_env,
        "POSTCRAFT_TELEGRAM_TOKEN"
    );
    assert!(config.channels.telegram.allowed_users.is_empty());
}

#[test]
fn full_config_round_trips_every_section() {
    let toml = r##"
[models]
default = "openai/gpt-4o"
roles = { calendar = "anthropic/claude-sonnet-4-5" }

[generation]
max_tokens_post = 2000
max_tokens_calendar = 6000
retry_delay_ms = 100

[images]
enabled = true
model = "openai/dall-e-3"
quality = "hd"

[memory]
window = 5

[session]
idle_timeout_secs = 600
max_consecutive_failures = 2
default_platform = "rednote"

[brand]
name = "Body Talk"
persona = "A somatic coach."
hashtags = ["#bodytalk"]

[channels.telegram]
bot_token_env = "MY_TOKEN"
allowed_users = [123, 456]
"##;
    let config = Config::from_toml(toml).expect("full config parses");
    config.validate().expect("full config validates");

    assert_eq!(
        config.models.roles.get("calendar").map(String::as_str),
        Some("anthropic/claude-sonnet-4-5")
    );
    assert_eq!(config.generation.retry_delay_ms, 100);
    assert_eq!(config.images.quality, "hd");
    assert_eq!(config.memory.window, 5);
    assert_eq!(config.session.max_consecutive_failures, 2);
    assert_eq!(
        config.default_platform().expect("default platform"),
        Platform::Rednote
    );
    assert_eq!(config.brand.hashtags, vec!["#bodytalk".to_owned()]);
    assert_eq!(config.channels.telegram.allowed_users, vec![123, 456]);
}

#[test]
fn missing_models_section_is_rejected() {
    assert!(Config::from_toml("[memory]\nwindow = 3\n").is_err());
}

#[test]
fn invalid_values_fail_validation() {
    let mut config = Config::from_toml(MINIMAL).expect("minimal config parses");
    config.memory.window = 0;
    assert!(config.validate().is_err());

    let mut config = Config::from_toml(MINIMAL).expect("minimal config parses");
    config.session.default_platform = "tiktok".to_owned();
    let err = config.validate().expect_err("unknown platform should fail");
    assert!(format!("{err:#}").contains("default_platform"));

    let mut config = Config::from_toml(MINIMAL).expect("minimal config parses");
    config.generation.max_tokens_post = 0;
    assert!(config.validate().is_err());
}

#[test]
fn env_overrides_take_precedence() {
    let env: HashMap<&str, &str> = HashMap::from([
        ("POSTCRAFT_MODEL", "openai/gpt-4o"),
        ("POSTCRAFT_MAX_TOKENS_POST", "1234"),
        ("POSTCRAFT_SESSION_TIMEOUT_SECS", "not-a-number"),
    ]);
    let mut config = Config::from_toml(MINIMAL).expect("minimal config parses");
    config.apply_overrides(|key| env.get(key).map(|v| (*v).to_owned()));

    assert_eq!(config.models.default, "openai/gpt-4o");
    assert_eq!(config.generation.max_tokens_post, 1234);
    assert_eq!(config.session.idle_timeout_secs, 1800);
}

#[test]
fn load_config_reads_file_from_disk() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, MINIMAL).expect("write config");

    let config = load_config(&path).expect("config loads");
    assert_eq!(config.memory.window, 10);

    let missing = dir.path().join("nope.toml");
    let err = load_config(&missing).expect_err("missing file should fail");
    assert!(format!("{err:#}").contains("failed to read config"));
}

#[test]
fn ensure_dirs_creates_runtime_layout() {
    let dir = tempfile::tempdir().expect("temp dir");
    let paths = RuntimePaths::under(dir.path().join("home"));
    paths.ensure_dirs().expect("dirs created");

    assert!(paths.images_dir.is_dir());
    assert!(paths.inbox_dir.is_dir());
    assert!(paths.logs_dir.is_dir());
    assert!(paths
        .brand_voice
        .parent()
        .expect("voice has a parent")
        .is_dir());
    assert_eq!(paths.env_file, dir.path().join("home").join(".env"));
}
