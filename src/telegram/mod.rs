//! Telegram adapter: slash commands, inline buttons, document uploads, and
//! the bot dispatcher.
//!
//! Every update is translated into one conversation [`Action`] and the
//! engine's reply is rendered back with [`ui::render_reply`]. Dispatch runs
//! in its own task so a `/cancel` can reach the engine while a generation
//! for the same chat is still in flight.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, ParseMode, User};
use tracing::{debug, info, warn};

use crate::conversation::{Action, ConversationEngine};
use crate::types::ImageRef;

pub mod commands;
pub mod media;
pub mod ui;

use self::commands::{parse_callback, parse_command, Command, ParsedCommand};
use self::ui::{escape_html, render_reply, Outgoing};

/// How often idle sessions are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Handler dependencies, cloned into each update via `dptree::deps!`.
#[derive(Clone)]
struct BotContext {
    engine: Arc<ConversationEngine>,
    allowed_users: Arc<Vec<i64>>,
    inbox_dir: PathBuf,
}

impl BotContext {
    /// Sender id if the sender may use the bot.
    fn authorize(&self, user: &User, what: &str) -> Option<i64> {
        let Ok(user_id) = i64::try_from(user.id.0) else {
            warn!(raw_id = user.id.0, "{what} dropped: user id out of range");
            return None;
        };
        if self.allowed_users.contains(&user_id) {
            Some(user_id)
        } else {
            warn!(user_id, "{what} dropped: user not in allowed_users");
            None
        }
    }
}

/// Run the bot until Ctrl+C.
///
/// Also starts a background task that cancels idle flows. Updates from
/// users outside `allowed_users` are dropped.
///
/// # Errors
///
/// Currently only returns `Ok`; the signature leaves room for startup checks.
pub async fn run_telegram(
    bot_token: &str,
    engine: Arc<ConversationEngine>,
    allowed_users: Vec<i64>,
    inbox_dir: PathBuf,
) -> anyhow::Result<()> {
    let sweeper = tokio::spawn(sweep_idle_sessions(Arc::clone(&engine)));

    let context = BotContext {
        engine,
        allowed_users: Arc::new(allowed_users),
        inbox_dir,
    };
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("telegram dispatcher starting");
    Dispatcher::builder(Bot::new(bot_token), handler)
        .dependencies(dptree::deps![context])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    sweeper.abort();
    info!("telegram dispatcher stopped");
    Ok(())
}

async fn sweep_idle_sessions(engine: Arc<ConversationEngine>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        let expired = engine.sweep_idle().await;
        if !expired.is_empty() {
            info!(users = ?expired, "idle flows cancelled");
        }
    }
}

async fn send_html(bot: &Bot, chat_id: ChatId, html: impl Into<String>) -> ResponseResult<()> {
    bot.send_message(chat_id, html)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Commands, voice documents, and free text.
async fn on_message(bot: Bot, msg: Message, context: BotContext) -> ResponseResult<()> {
    let Some(user_id) = msg.from.as_ref().and_then(|u| context.authorize(u, "message")) else {
        return Ok(());
    };
    let chat_id = msg.chat.id;
    debug!(user_id, "telegram message received");

    let action = if let Some(document) = msg.document() {
        match media::read_voice_document(&bot, document, &context.inbox_dir).await {
            Ok(doc) => Action::UploadVoice(doc),
            Err(e) => {
                warn!(user_id, error = %e, "voice document rejected");
                return send_html(&bot, chat_id, escape_html(&format!("{e:#}"))).await;
            }
        }
    } else if let Some(text) = msg.text() {
        match parse_command(text) {
            None => Action::Message(text.to_owned()),
            Some(ParsedCommand::Known(Command::Help)) => {
                return send_html(&bot, chat_id, commands::help_text()).await;
            }
            Some(ParsedCommand::Known(command)) => match command.action() {
                Some(action) => action,
                None => return Ok(()),
            },
            Some(ParsedCommand::Unknown(name)) => {
                let html = format!(
                    "Unknown command: /{}. Send /help for the list.",
                    escape_html(&name)
                );
                return send_html(&bot, chat_id, html).await;
            }
        }
    } else {
        debug!(user_id, "unsupported message type, ignoring");
        return Ok(());
    };

    spawn_dispatch(bot, chat_id, user_id, action, context);
    Ok(())
}

/// Inline keyboard presses.
async fn on_callback(bot: Bot, query: CallbackQuery, context: BotContext) -> ResponseResult<()> {
    let Some(user_id) = context.authorize(&query.from, "callback") else {
        bot.answer_callback_query(&query.id).await?;
        return Ok(());
    };

    let Some(action) = query.data.as_deref().and_then(parse_callback) else {
        bot.answer_callback_query(&query.id)
            .text("This button is no longer valid")
            .await?;
        return Ok(());
    };

    bot.answer_callback_query(&query.id).await?;
    // Private chats share the user's id.
    spawn_dispatch(bot, ChatId(user_id), user_id, action, context);
    Ok(())
}

fn spawn_dispatch(bot: Bot, chat_id: ChatId, user_id: i64, action: Action, context: BotContext) {
    tokio::spawn(async move {
        if action != Action::Cancel {
            if let Err(e) = bot.send_chat_action(chat_id, ChatAction::Typing).await {
                debug!(error = %e, "failed to send typing indicator");
            }
        }
        let reply = context.engine.dispatch(user_id, action).await;
        deliver(&bot, chat_id, render_reply(&reply)).await;
    });
}

/// Send rendered messages in order. A failed send is logged and the rest
/// still go out.
async fn deliver(bot: &Bot, chat_id: ChatId, messages: Vec<Outgoing>) {
    for message in messages {
        let sent = match message {
            Outgoing::Text { html, keyboard } => {
                let request = bot.send_message(chat_id, html).parse_mode(ParseMode::Html);
                match keyboard {
                    Some(keyboard) => request.reply_markup(keyboard).await,
                    None => request.await,
                }
            }
            Outgoing::Image(ImageRef::File(path)) => {
                bot.send_photo(chat_id, InputFile::file(path)).await
            }
            Outgoing::Image(ImageRef::Url(url)) => bot.send_photo(chat_id, InputFile::url(url)).await,
        };
        if let Err(e) = sent {
            warn!(error = %e, "failed to send telegram message");
        }
    }
}
