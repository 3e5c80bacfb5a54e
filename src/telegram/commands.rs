//! Slash commands and inline-button callbacks, mapped onto engine actions.

use crate::conversation::{Action, Flow};
use crate::platform::Platform;
use crate::types::OptionLabel;

/// A recognised slash command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `/start` or `/help`.
    Help,
    /// `/post`: guided single-post flow.
    Post,
    /// `/calendar`: guided calendar flow.
    Calendar,
    /// `/update_voice`: replace the brand voice.
    UpdateVoice,
    /// `/cancel`.
    Cancel,
}

impl Command {
    /// The engine action for this command, if it maps to one.
    pub fn action(self) -> Option<Action> {
        match self {
            Self::Help => None,
            Self::Post => Some(Action::Start(Flow::Post)),
            Self::Calendar => Some(Action::Start(Flow::Calendar)),
            Self::UpdateVoice => Some(Action::Start(Flow::VoiceUpdate)),
            Self::Cancel => Some(Action::Cancel),
        }
    }
}

/// Outcome of parsing a message that starts with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedCommand {
    /// A known command.
    Known(Command),
    /// Anything else; carries the bare command name.
    Unknown(String),
}

/// Parse `/name[@bot] [args]`. Returns `None` for text without a leading `/`.
pub fn parse_command(text: &str) -> Option<ParsedCommand> {
    let without_slash = text.trim().strip_prefix('/')?;
    let full_command = without_slash
        .split_whitespace()
        .next()
        .unwrap_or(without_slash);
    let command = full_command.split('@').next().unwrap_or(full_command);

    let known = match command.to_lowercase().as_str() {
        "start" | "help" => Command::Help,
        "post" | "new" => Command::Post,
        "calendar" | "plan" => Command::Calendar,
        "update_voice" | "voice" => Command::UpdateVoice,
        "cancel" | "reset" => Command::Cancel,
        _ => return Some(ParsedCommand::Unknown(command.to_owned())),
    };
    Some(ParsedCommand::Known(known))
}

/// Help text listing the commands.
pub fn help_text() -> String {
    [
        "<b>Postcraft</b> drafts on-brand posts in two styles.",
        "",
        "/post: write one post, step by step",
        "/calendar: plan 3 to 7 posts",
        "/update_voice: replace the brand voice document",
        "/cancel: abandon the current flow",
        "/help: show this message",
        "",
        "Or just send a topic, e.g. <i>Rednote post about morning routines</i>.",
    ]
    .join("\n")
}

// ---------------------------------------------------------------------------
// Callback data
// ---------------------------------------------------------------------------

/// Callback data for a platform button.
pub fn platform_data(platform: Platform) -> String {
    format!("plat:{}", platform.as_str())
}

/// Callback data for picking an option, optionally with an image.
pub fn pick_data(label: OptionLabel, image: bool) -> String {
    let label = label.to_string().to_lowercase();
    if image {
        format!("pick:{label}:img")
    } else {
        format!("pick:{label}")
    }
}

/// Callback data for revising one option.
pub fn revise_data(label: OptionLabel) -> String {
    format!("rev:{}", label.to_string().to_lowercase())
}

/// Callback data for expanding calendar entry `n`.
pub fn expand_data(n: usize) -> String {
    format!("cal:expand:{n}")
}

/// Callback data for regenerating.
pub const REGENERATE_DATA: &str = "regen";
/// Callback data for cancelling.
pub const CANCEL_DATA: &str = "cancel";
/// Callback data for approving a calendar.
pub const APPROVE_CALENDAR_DATA: &str = "cal:approve";

/// Map inline-button callback data to an action.
pub fn parse_callback(data: &str) -> Option<Action> {
    let mut parts = data.split(':');
    let action = match (parts.next()?, parts.next(), parts.next()) {
        ("plat", Some(platform), None) => Action::ChoosePlatform(platform.parse().ok()?),
        ("pick", Some(label), extra) => Action::SelectOption {
            label: label.parse().ok()?,
            image: match extra {
                None => false,
                Some("img") => true,
                Some(_) => return None,
            },
        },
        ("rev", Some(label), None) => Action::Revise {
            target: Some(label.parse().ok()?),
            instruction: None,
        },
        ("regen", None, None) => Action::Regenerate,
        ("cancel", None, None) => Action::Cancel,
        ("cal", Some("approve"), None) => Action::Approve,
        ("cal", Some("expand"), Some(n)) => Action::ExpandEntry(n.parse().ok()?),
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(action)
}
