//! HTML formatting and inline keyboard helpers for Telegram messages.
//!
//! All output uses HTML parse mode (never MarkdownV2). Rendering is pure so
//! it can be tested without a bot.

use std::fmt::Write as _;

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::conversation::{Flow, FailureKind, ImageOutcome, Notice, Reply, ReplyKind, State};
use crate::platform::Platform;
use crate::types::{CalendarPlan, DraftOption, DraftSet, ImageRef, OptionLabel};

use super::commands::{
    expand_data, pick_data, platform_data, revise_data, APPROVE_CALENDAR_DATA, CANCEL_DATA,
    REGENERATE_DATA,
};

/// Telegram rejects messages over 4096 characters; leave room for markup.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// One message to send.
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// HTML text, with an optional keyboard.
    Text {
        /// HTML body.
        html: String,
        /// Inline keyboard attached to the message.
        keyboard: Option<InlineKeyboardMarkup>,
    },
    /// A generated image.
    Image(ImageRef),
}

impl Outgoing {
    fn text(html: impl Into<String>) -> Self {
        Self::Text {
            html: html.into(),
            keyboard: None,
        }
    }

    fn with_keyboard(html: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Self::Text {
            html: html.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Escape special HTML characters in user-provided text.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Split `text` into messages of at most `max_chars`, breaking on blank
/// lines. A single block longer than the limit is split hard.
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for block in text.split("\n\n") {
        let block_chars = block.chars().count();
        let needed = if current.is_empty() {
            block_chars
        } else {
            current_chars.saturating_add(2).saturating_add(block_chars)
        };
        if needed <= max_chars {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(block);
            current_chars = needed;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if block_chars <= max_chars {
            current.push_str(block);
            current_chars = block_chars;
        } else {
            let chars: Vec<char> = block.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

// ---------------------------------------------------------------------------
// Keyboards
// ---------------------------------------------------------------------------

fn button(label: &str, data: impl Into<String>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label.to_owned(), data.into())
}

fn cancel_row() -> Vec<InlineKeyboardButton> {
    vec![button("\u{274C} Cancel", CANCEL_DATA)]
}

/// Platform choice buttons.
pub fn platform_keyboard() -> InlineKeyboardMarkup {
    let platforms = Platform::ALL
        .iter()
        .map(|p| button(p.display_name(), platform_data(*p)))
        .collect();
    InlineKeyboardMarkup::new(vec![platforms, cancel_row()])
}

/// Pick, revise, regenerate, and cancel buttons under a pair of options.
pub fn options_keyboard(images_available: bool) -> InlineKeyboardMarkup {
    let mut rows = vec![OptionLabel::BOTH
        .iter()
        .map(|l| button(&format!("\u{2705} Pick {l}"), pick_data(*l, false)))
        .collect::<Vec<_>>()];
    if images_available {
        rows.push(
            OptionLabel::BOTH
                .iter()
                .map(|l| button(&format!("\u{1F5BC} Pick {l} + image"), pick_data(*l, true)))
                .collect(),
        );
    }
    rows.push(
        OptionLabel::BOTH
            .iter()
            .map(|l| button(&format!("\u{270F} Revise {l}"), revise_data(*l)))
            .collect(),
    );
    rows.push(vec![
        button("\u{1F504} Regenerate", REGENERATE_DATA),
        button("\u{274C} Cancel", CANCEL_DATA),
    ]);
    InlineKeyboardMarkup::new(rows)
}

/// Expand buttons for each entry, then approve/regenerate/cancel.
pub fn calendar_keyboard(plan: &CalendarPlan) -> InlineKeyboardMarkup {
    let expand: Vec<InlineKeyboardButton> = plan
        .entries
        .iter()
        .map(|e| button(&format!("Expand {}", e.position), expand_data(e.position)))
        .collect();
    let mut rows: Vec<Vec<InlineKeyboardButton>> =
        expand.chunks(4).map(<[InlineKeyboardButton]>::to_vec).collect();
    rows.push(vec![
        button("\u{2705} Approve plan", APPROVE_CALENDAR_DATA),
        button("\u{1F504} Regenerate", REGENERATE_DATA),
    ]);
    rows.push(cancel_row());
    InlineKeyboardMarkup::new(rows)
}

fn failure_keyboard(retryable: bool) -> InlineKeyboardMarkup {
    if retryable {
        InlineKeyboardMarkup::new(vec![vec![
            button("\u{1F504} Try again", REGENERATE_DATA),
            button("\u{274C} Cancel", CANCEL_DATA),
        ]])
    } else {
        InlineKeyboardMarkup::new(vec![cancel_row()])
    }
}

// ---------------------------------------------------------------------------
// Reply rendering
// ---------------------------------------------------------------------------

fn format_option(option: &DraftOption) -> String {
    let mut out = format!("<b>Option {}: {}</b>", option.label, option.style);
    if let Some(content_type) = &option.content_type {
        let _ = write!(out, " <i>({})</i>", escape_html(content_type));
    }
    let _ = write!(out, "\n\n{}", escape_html(option.body.trim()));
    out
}

fn format_drafts(drafts: &DraftSet, platform: Platform, warnings: &[String]) -> String {
    let mut out = format!("<b>Two options for {}</b>", platform.display_name());
    for option in &drafts.options {
        let _ = write!(out, "\n\n{}", format_option(option));
    }
    if !warnings.is_empty() {
        out.push_str("\n\n<b>Platform limits:</b>");
        for warning in warnings {
            let _ = write!(out, "\n\u{26A0} {}", escape_html(warning));
        }
    }
    out
}

fn format_calendar(plan: &CalendarPlan) -> String {
    let mut out = format!("<b>Content plan</b> ({} posts)", plan.entries.len());
    for entry in &plan.entries {
        let _ = write!(
            out,
            "\n\n<b>{}. {}</b> [{}]\n{}",
            entry.position,
            escape_html(&entry.day),
            entry.platform.display_name(),
            escape_html(&entry.topic)
        );
        if let Some(angle) = &entry.angle {
            let _ = write!(out, "\n<i>Angle: {}</i>", escape_html(angle));
        }
    }
    out
}

fn failure_text(kind: FailureKind, message: &str, consecutive: u32, limit_reached: bool) -> String {
    let heading = match kind {
        FailureKind::Transient => "Backend unavailable",
        FailureKind::Parse => "Unusable reply",
        FailureKind::Backend => "Generation failed",
        FailureKind::BrandVoiceUnavailable => "No brand voice",
        FailureKind::VoiceUpdate => "Brand voice not updated",
    };
    let mut out = format!("\u{26A0} <b>{heading}</b>\n{}", escape_html(message));
    if limit_reached {
        let _ = write!(
            out,
            "\n\n{consecutive} failures in a row. Check the backend configuration or try again later."
        );
    }
    out
}

/// Attach `keyboard` to the last text message in `chunks`.
fn chunks_with_keyboard(html: &str, keyboard: Option<InlineKeyboardMarkup>) -> Vec<Outgoing> {
    let mut out: Vec<Outgoing> = chunk_message(html, MAX_MESSAGE_CHARS)
        .into_iter()
        .map(Outgoing::text)
        .collect();
    if let (Some(Outgoing::Text { keyboard: slot, .. }), Some(keyboard)) =
        (out.last_mut(), keyboard)
    {
        *slot = Some(keyboard);
    }
    out
}

/// Render an engine reply as Telegram messages.
pub fn render_reply(reply: &Reply) -> Vec<Outgoing> {
    let mut out = Vec::new();
    if reply.notice == Some(Notice::SessionTimedOut) {
        out.push(Outgoing::text(
            "\u{23F1} Your previous flow timed out and was cancelled.",
        ));
    }

    match &reply.kind {
        ReplyKind::AskPlatform(flow) => {
            let what = match flow {
                Flow::Calendar => "calendar",
                Flow::Post | Flow::VoiceUpdate => "post",
            };
            out.push(Outgoing::with_keyboard(
                format!("Which platform is this {what} for?"),
                platform_keyboard(),
            ));
        }
        ReplyKind::AskTopic(platform) => out.push(Outgoing::with_keyboard(
            format!(
                "What should the {} post be about?",
                platform.display_name()
            ),
            InlineKeyboardMarkup::new(vec![cancel_row()]),
        )),
        ReplyKind::AskCalendarScope(platform) => out.push(Outgoing::with_keyboard(
            format!(
                "How many {} posts should I plan? Send 3 to 7, optionally with themes, \
                 e.g. <code>5: rest, boundaries</code>.",
                platform.display_name()
            ),
            InlineKeyboardMarkup::new(vec![cancel_row()]),
        )),
        ReplyKind::AskRevision(target) => {
            let text = match target {
                Some(label) => format!("What should change in Option {label}?"),
                None => "What should change?".to_owned(),
            };
            out.push(Outgoing::text(text));
        }
        ReplyKind::AskVoiceUpload => out.push(Outgoing::with_keyboard(
            "Send the new brand voice as a <b>.txt</b> or <b>.md</b> document.",
            InlineKeyboardMarkup::new(vec![cancel_row()]),
        )),
        ReplyKind::Drafts {
            drafts,
            platform,
            warnings,
            images_available,
        } => out.extend(chunks_with_keyboard(
            &format_drafts(drafts, *platform, warnings),
            Some(options_keyboard(*images_available)),
        )),
        ReplyKind::Approved {
            label,
            platform,
            clean_copy,
            image,
            memory_saved,
        } => {
            let mut html = format!(
                "\u{2705} <b>Option {label} approved</b> for {}. Ready to copy:\n\n{}",
                platform.display_name(),
                escape_html(clean_copy)
            );
            if !memory_saved {
                html.push_str("\n\n<i>This approval could not be saved to preferences.</i>");
            }
            out.extend(chunks_with_keyboard(&html, None));
            match image {
                ImageOutcome::NotRequested => {}
                ImageOutcome::Ready(image) => out.push(Outgoing::Image(image.clone())),
                ImageOutcome::Failed(reason) => out.push(Outgoing::text(format!(
                    "The image could not be generated ({}). The text stands on its own.",
                    escape_html(reason)
                ))),
                ImageOutcome::Discarded => {
                    out.push(Outgoing::text("Image generation cancelled."));
                }
            }
            if reply.state == State::CalendarPresented {
                out.push(Outgoing::text(
                    "Back to the calendar. Send another entry number to expand it, or approve the plan.",
                ));
            }
        }
        ReplyKind::Calendar(plan) => out.extend(chunks_with_keyboard(
            &format_calendar(plan),
            Some(calendar_keyboard(plan)),
        )),
        ReplyKind::CalendarSaved { posts } => out.push(Outgoing::text(format!(
            "\u{2705} Calendar approved with {posts} posts."
        ))),
        ReplyKind::VoiceUpdated { chars, words } => out.push(Outgoing::text(format!(
            "\u{2705} Brand voice updated ({words} words, {chars} characters)."
        ))),
        ReplyKind::Cancelled {
            discarded_generation,
        } => out.push(Outgoing::text(if *discarded_generation {
            "Cancelled. The pending result was discarded."
        } else {
            "Cancelled."
        })),
        ReplyKind::CancelPending => out.push(Outgoing::text(
            "Cancelling as soon as the current request returns.",
        )),
        ReplyKind::NothingToCancel => out.push(Outgoing::text("Nothing to cancel.")),
        ReplyKind::Busy => out.push(Outgoing::text(
            "Still working on your previous request. Send /cancel to abandon it.",
        )),
        ReplyKind::Failed {
            kind,
            message,
            retryable,
            consecutive,
            limit_reached,
        } => out.push(Outgoing::with_keyboard(
            failure_text(*kind, message, *consecutive, *limit_reached),
            failure_keyboard(*retryable),
        )),
        ReplyKind::Invalid { hint } => out.push(Outgoing::text(escape_html(hint))),
    }
    out
}
