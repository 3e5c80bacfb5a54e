//! Postcraft CLI entry point.
//!
//! `init` lays out the runtime directory, `start` runs the Telegram bot, and
//! the remaining subcommands drive the same conversation engine from the
//! terminal.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use postcraft::brand::{BrandVoiceSource, FileBrandVoice};
use postcraft::config::{load_config, runtime_paths, Config, RuntimePaths, STARTER_CONFIG};
use postcraft::conversation::{
    Action, ConversationEngine, EngineSettings, Flow, ImageOutcome, Reply, ReplyKind,
};
use postcraft::credentials::{load_runtime_credentials, Credentials};
use postcraft::generation::{GenerationClient, GenerationSettings};
use postcraft::memory::{summarize, JsonFileStore, PreferenceMemory, DEFAULT_WINDOW};
use postcraft::platform::Platform;
use postcraft::prompt::CalendarScope;
use postcraft::providers::router::{image_provider_from_config, ModelRouter};
use postcraft::types::OptionLabel;

/// Session id used for terminal runs.
const CLI_USER: i64 = 0;

/// Postcraft: on-brand social post drafting.
#[derive(Parser)]
#[command(name = "postcraft", version, about)]
struct Cli {
    /// Runtime directory (default: ~/.postcraft).
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Create the runtime directory with a starter config.
    Init,
    /// Run the Telegram bot.
    Start,
    /// Generate two options for one post.
    Generate {
        /// Post topic; may name the platform, e.g. "rednote post about rest".
        #[arg(required = true)]
        topic: Vec<String>,
        /// Target platform, overriding anything named in the topic.
        #[arg(long)]
        platform: Option<Platform>,
        /// Approve this option right away.
        #[arg(long)]
        pick: Option<OptionLabel>,
        /// Also generate an image for the picked option.
        #[arg(long, requires = "pick")]
        image: bool,
    },
    /// Plan a content calendar.
    Calendar {
        /// Number of posts to plan (3 to 7).
        posts: usize,
        /// Target platform.
        #[arg(long)]
        platform: Option<Platform>,
        /// Theme to weave through the plan; repeatable.
        #[arg(long = "theme")]
        themes: Vec<String>,
    },
    /// Show or replace the brand voice.
    Voice {
        /// Voice action.
        #[command(subcommand)]
        action: VoiceCommand,
    },
    /// Summarise recently approved posts.
    Prefs,
}

/// Brand voice subcommands.
#[derive(Subcommand)]
enum VoiceCommand {
    /// Print the current brand voice.
    Show,
    /// Replace the brand voice with the contents of a text file.
    Set {
        /// Plain-text document.
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let paths = match cli.home {
        Some(root) => RuntimePaths::under(root),
        None => runtime_paths()?,
    };

    match cli.command {
        Command::Init => handle_init(&paths),
        Command::Start => handle_start(&paths).await,
        Command::Generate {
            topic,
            platform,
            pick,
            image,
        } => {
            postcraft::logging::init_cli();
            handle_generate(&paths, &topic.join(" "), platform, pick, image).await
        }
        Command::Calendar {
            posts,
            platform,
            themes,
        } => {
            postcraft::logging::init_cli();
            handle_calendar(&paths, posts, platform, themes).await
        }
        Command::Voice { action } => {
            postcraft::logging::init_cli();
            handle_voice(&paths, action).await
        }
        Command::Prefs => {
            postcraft::logging::init_cli();
            handle_prefs(&paths).await
        }
    }
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Create the runtime layout, keeping any existing files.
fn handle_init(paths: &RuntimePaths) -> anyhow::Result<()> {
    paths.ensure_dirs()?;

    if paths.config_toml.exists() {
        println!("config exists: {}", paths.config_toml.display());
    } else {
        std::fs::write(&paths.config_toml, STARTER_CONFIG)
            .with_context(|| format!("failed to write {}", paths.config_toml.display()))?;
        println!("wrote {}", paths.config_toml.display());
    }

    if paths.env_file.exists() {
        println!("credentials exist: {}", paths.env_file.display());
    } else {
        write_env_template(&paths.env_file)?;
        println!("wrote {} (mode 0600)", paths.env_file.display());
    }

    if !paths.brand_voice.exists() {
        println!(
            "next: add your brand voice with `postcraft voice set <file>` (expected at {})",
            paths.brand_voice.display()
        );
    }
    Ok(())
}

fn write_env_template(path: &Path) -> anyhow::Result<()> {
    let template = "ANTHROPIC_API_KEY=\nOPENAI_API_KEY=\nPOSTCRAFT_TELEGRAM_TOKEN=\n";
    std::fs::write(path, template)
        .with_context(|| format!("failed to write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to restrict {}", path.display()))?;
    }
    Ok(())
}

/// Run the Telegram bot until Ctrl+C.
async fn handle_start(paths: &RuntimePaths) -> anyhow::Result<()> {
    paths.ensure_dirs()?;
    let _logging_guard = postcraft::logging::init_production(&paths.logs_dir)?;

    let config = load_config(&paths.config_toml)?;
    let token_env = config.channels.telegram.bot_token_env.clone();
    let credentials = load_runtime_credentials(paths, &[token_env.as_str()])
        .with_context(|| format!("failed to load {}", paths.env_file.display()))?;
    let token = credentials.require(&token_env)?;

    let allowed_users = config.channels.telegram.allowed_users.clone();
    if allowed_users.is_empty() {
        warn!("channels.telegram.allowed_users is empty; every message will be dropped");
    }

    let engine = Arc::new(build_engine(&config, paths, &credentials)?);
    info!(
        images = engine.images_enabled(),
        users = allowed_users.len(),
        "postcraft starting"
    );

    postcraft::telegram::run_telegram(&token, engine, allowed_users, paths.inbox_dir.clone())
        .await
}

async fn handle_generate(
    paths: &RuntimePaths,
    topic: &str,
    platform: Option<Platform>,
    pick: Option<OptionLabel>,
    image: bool,
) -> anyhow::Result<()> {
    let engine = engine_from_disk(paths)?;

    let reply = match platform {
        Some(platform) => {
            engine.dispatch(CLI_USER, Action::Start(Flow::Post)).await;
            engine
                .dispatch(CLI_USER, Action::ChoosePlatform(platform))
                .await;
            engine
                .dispatch(CLI_USER, Action::SubmitTopic(topic.to_owned()))
                .await
        }
        None => {
            engine
                .dispatch(CLI_USER, Action::Message(topic.to_owned()))
                .await
        }
    };
    print_reply(&reply)?;

    if let (Some(label), ReplyKind::Drafts { .. }) = (pick, &reply.kind) {
        let approved = engine
            .dispatch(CLI_USER, Action::SelectOption { label, image })
            .await;
        print_reply(&approved)?;
    }
    Ok(())
}

async fn handle_calendar(
    paths: &RuntimePaths,
    posts: usize,
    platform: Option<Platform>,
    themes: Vec<String>,
) -> anyhow::Result<()> {
    let scope = CalendarScope::new(posts, themes)
        .ok_or_else(|| anyhow::anyhow!("a calendar plans 3 to 7 posts, got {posts}"))?;
    let engine = engine_from_disk(paths)?;
    let platform = platform.unwrap_or(engine.settings().default_platform);

    engine
        .dispatch(CLI_USER, Action::Start(Flow::Calendar))
        .await;
    engine
        .dispatch(CLI_USER, Action::ChoosePlatform(platform))
        .await;
    let reply = engine
        .dispatch(CLI_USER, Action::SetCalendarScope(scope))
        .await;
    print_reply(&reply)
}

async fn handle_voice(paths: &RuntimePaths, action: VoiceCommand) -> anyhow::Result<()> {
    let source = FileBrandVoice::new(paths.brand_voice.clone(), paths.brand_voice_backup.clone());
    match action {
        VoiceCommand::Show => {
            let voice = source.read().await?;
            println!("{}", voice.text.trim_end());
        }
        VoiceCommand::Set { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            paths.ensure_dirs()?;
            let voice = source.replace(&text).await?;
            println!(
                "brand voice updated: {} words, {} characters",
                voice.word_count(),
                voice.text.chars().count()
            );
        }
    }
    Ok(())
}

async fn handle_prefs(paths: &RuntimePaths) -> anyhow::Result<()> {
    let window = if paths.config_toml.exists() {
        load_config(&paths.config_toml)?.memory.window
    } else {
        DEFAULT_WINDOW
    };
    let memory = PreferenceMemory::new(
        Arc::new(JsonFileStore::new(paths.preferences.clone(), window)),
        window,
    );
    let entries = memory.recent().await?;
    let Some(summary) = summarize(&entries) else {
        println!("No approved posts yet.");
        return Ok(());
    };
    println!("{summary}\n");
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{}. {} [{}] Option {} ({}): {}",
            i.saturating_add(1),
            entry.approved_at.format("%Y-%m-%d"),
            entry.platform,
            entry.label,
            entry.style,
            entry.excerpt(80)
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn engine_from_disk(paths: &RuntimePaths) -> anyhow::Result<ConversationEngine> {
    let config = load_config(&paths.config_toml)
        .context("no usable config; run `postcraft init` first")?;
    let credentials = load_runtime_credentials(paths, &[])
        .with_context(|| format!("failed to load {}", paths.env_file.display()))?;
    build_engine(&config, paths, &credentials)
}

fn build_engine(
    config: &Config,
    paths: &RuntimePaths,
    credentials: &Credentials,
) -> anyhow::Result<ConversationEngine> {
    let router = Arc::new(
        ModelRouter::from_config(&config.models, credentials)
            .context("failed to create model router")?,
    );
    info!(routes = ?router.routes(), "model routes");
    let images = image_provider_from_config(&config.images, credentials)
        .context("failed to configure image generation")?;
    let generator = GenerationClient::new(
        router,
        images,
        GenerationSettings::from_config(&config.generation),
        paths.images_dir.clone(),
    );

    let brand = Arc::new(FileBrandVoice::new(
        paths.brand_voice.clone(),
        paths.brand_voice_backup.clone(),
    ));
    let memory = PreferenceMemory::new(
        Arc::new(JsonFileStore::new(
            paths.preferences.clone(),
            config.memory.window,
        )),
        config.memory.window,
    );

    Ok(ConversationEngine::new(
        brand,
        memory,
        generator,
        EngineSettings::from_config(config)?,
    ))
}

// ---------------------------------------------------------------------------
// Terminal rendering
// ---------------------------------------------------------------------------

/// Print a reply as plain text. Failures become a non-zero exit.
fn print_reply(reply: &Reply) -> anyhow::Result<()> {
    match &reply.kind {
        ReplyKind::Drafts {
            drafts, warnings, ..
        } => {
            for option in &drafts.options {
                println!("===== OPTION {} ({}) =====", option.label, option.style);
                println!("{}\n", option.body.trim());
            }
            for warning in warnings {
                println!("warning: {warning}");
            }
        }
        ReplyKind::Approved {
            label,
            clean_copy,
            image,
            memory_saved,
            ..
        } => {
            println!("approved option {label}:\n\n{clean_copy}");
            if !memory_saved {
                println!("\nwarning: approval was not saved to preference memory");
            }
            match image {
                ImageOutcome::Ready(image) => println!("\nimage: {image}"),
                ImageOutcome::Failed(reason) => println!("\nimage failed: {reason}"),
                ImageOutcome::NotRequested | ImageOutcome::Discarded => {}
            }
        }
        ReplyKind::Calendar(plan) => {
            for entry in &plan.entries {
                println!(
                    "{}. {} [{}] {}",
                    entry.position, entry.day, entry.platform, entry.topic
                );
                if let Some(angle) = &entry.angle {
                    println!("   angle: {angle}");
                }
            }
        }
        ReplyKind::Failed { message, .. } => anyhow::bail!("{message}"),
        ReplyKind::Invalid { hint } => anyhow::bail!("{hint}"),
        other => println!("{other:?}"),
    }
    Ok(())
}
