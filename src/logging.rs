//! Tracing setup for the bot and for one-shot commands.
//!
//! `start` logs JSON to a daily file under `logs/` and a readable copy to
//! stderr. The other subcommands print their results on stdout, so they
//! only log warnings to stderr unless `RUST_LOG` says otherwise.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Bot default. HTTP client internals stay at warn.
const BOT_FILTER: &str = "info,hyper=warn,reqwest=warn";
/// One-shot default.
const CLI_FILTER: &str = "warn";
const LOG_FILE_PREFIX: &str = "postcraft.log";

/// Keeps the file writer alive; drop it last so buffered lines are flushed.
pub struct LoggingGuard {
    _file: WorkerGuard,
}

/// Logging for `postcraft start`.
///
/// # Errors
///
/// Returns an error if `logs_dir` cannot be created.
pub fn init_production(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX));

    tracing_subscriber::registry()
        .with(filter(BOT_FILTER))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(file_writer),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(LoggingGuard { _file: guard })
}

/// Logging for the terminal subcommands.
pub fn init_cli() {
    tracing_subscriber::fmt()
        .with_env_filter(filter(CLI_FILTER))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
